//! Error types for the image migrator.
//!
//! Two layers of failure exist and they never mix:
//! - [`MigrationError`] is fatal. It aborts the whole run and reaches the
//!   process entry point.
//! - [`StepError`] belongs to a single record's pipeline. It is logged at the
//!   pipeline boundary and never leaves the worker task.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigurationError;

/// Fatal errors that terminate a migration run
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Failed to prepare output directory '{path}': {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch page after id {after_id}: {source}")]
    Source {
        after_id: i64,
        #[source]
        source: SourceError,
    },

    #[error("Record source returned id {record_id} which is not above watermark {watermark}")]
    NonMonotonicPage { record_id: i64, watermark: i64 },

    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

/// Errors raised by a [`RecordSource`](crate::migration::RecordSource) while fetching a page
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Connection error: {0}")]
    Connection(String),
}

/// The four steps of a record's pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStep {
    Decode,
    LocalPersist,
    RemoteUpload,
    RecordUpdate,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::Decode => "decode",
            PipelineStep::LocalPersist => "local_persist",
            PipelineStep::RemoteUpload => "remote_upload",
            PipelineStep::RecordUpdate => "record_update",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-record failure, tagged by the step that produced it
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Failed to decode image payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Failed to write image to '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to upload object '{key}': {source}")]
    Upload {
        key: String,
        #[source]
        source: object_store::Error,
    },

    #[error("Failed to update record {record_id}: {source}")]
    Update {
        record_id: i64,
        #[source]
        source: sqlx::Error,
    },
}

impl StepError {
    /// The pipeline step this error was raised from
    pub fn step(&self) -> PipelineStep {
        match self {
            StepError::Decode(_) => PipelineStep::Decode,
            StepError::Io { .. } => PipelineStep::LocalPersist,
            StepError::Upload { .. } => PipelineStep::RemoteUpload,
            StepError::Update { .. } => PipelineStep::RecordUpdate,
        }
    }
}

/// Result type alias for fatal run errors
pub type Result<T> = std::result::Result<T, MigrationError>;

/// Result type alias for a single pipeline step
pub type StepResult<T> = std::result::Result<T, StepError>;
