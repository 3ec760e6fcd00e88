//! # Database Operations
//!
//! MySQL connection management for the migration run. One explicitly
//! constructed pool is shared by the record source and the record updater;
//! there is no process-wide connection singleton.
//!
//! ## Key Components
//!
//! - [`connection`] - Pool construction, health check and shutdown

pub mod connection;

pub use connection::DatabaseConnection;
