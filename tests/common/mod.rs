pub mod builders;
pub mod mock_collaborators;
pub mod strategies;

pub use builders::*;
pub use mock_collaborators::*;
