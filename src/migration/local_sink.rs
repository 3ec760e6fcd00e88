//! Local copies of migrated images.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::config::local_image_path;
use crate::error::{MigrationError, StepError, StepResult};

/// Persists raw bytes under a path derived from the record id
#[async_trait]
pub trait LocalSink: Send + Sync + 'static {
    /// Write `bytes` for `record_id`, returning the path written
    async fn write(&self, record_id: i64, bytes: &[u8]) -> StepResult<PathBuf>;
}

/// Writes `user_<id>.png` files under a fixed output directory
#[derive(Debug, Clone)]
pub struct FsLocalSink {
    output_dir: PathBuf,
}

impl FsLocalSink {
    /// Create the sink, creating the output directory if it is absent
    pub async fn create(output_dir: impl Into<PathBuf>) -> Result<Self, MigrationError> {
        let output_dir = output_dir.into();
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|source| MigrationError::OutputDirectory {
                path: output_dir.clone(),
                source,
            })?;

        debug!(output_dir = %output_dir.display(), "Local output directory ready");
        Ok(Self { output_dir })
    }
}

#[async_trait]
impl LocalSink for FsLocalSink {
    async fn write(&self, record_id: i64, bytes: &[u8]) -> StepResult<PathBuf> {
        let path = local_image_path(&self.output_dir, record_id);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StepError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}
