//! # Per-Record Pipeline
//!
//! decode → local persist → remote upload → record update
//!
//! Each step returns a [`StepResult`] and the chain short-circuits on the
//! first failure. Nothing is compensated: a failed upload leaves the local
//! file in place, a failed update leaves the uploaded object in place.
//! [`RecordPipeline::run`] is the isolation boundary; failures stop at it.

use std::sync::Arc;

use bytes::Bytes;

use super::codec::{Base64ImageCodec, ImageCodec};
use super::local_sink::LocalSink;
use super::record_updater::RecordUpdater;
use super::remote_sink::RemoteSink;
use super::types::{MigratedRecord, PipelineTask};
use crate::error::{PipelineStep, StepResult};
use crate::logging::{log_record_failure, log_record_operation};

/// The four collaborators a record passes through
#[derive(Clone)]
pub struct RecordPipeline {
    codec: Arc<dyn ImageCodec>,
    local: Arc<dyn LocalSink>,
    remote: Arc<dyn RemoteSink>,
    updater: Arc<dyn RecordUpdater>,
}

impl std::fmt::Debug for RecordPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordPipeline").finish_non_exhaustive()
    }
}

impl RecordPipeline {
    /// Pipeline with the base64 codec
    pub fn new(
        local: Arc<dyn LocalSink>,
        remote: Arc<dyn RemoteSink>,
        updater: Arc<dyn RecordUpdater>,
    ) -> Self {
        Self {
            codec: Arc::new(Base64ImageCodec),
            local,
            remote,
            updater,
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn ImageCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Run all four steps, stopping at the first failure
    pub async fn execute(&self, task: &PipelineTask) -> StepResult<MigratedRecord> {
        let record_id = task.record_id;

        let decoded = self.codec.decode(&task.payload)?;

        let local_path = self.local.write(record_id, &decoded).await?;
        log_record_operation(
            record_id,
            PipelineStep::LocalPersist,
            "completed",
            Some(local_path.display().to_string().as_str()),
        );

        let bytes = Bytes::from(decoded);
        let size = bytes.len();
        let address = self.remote.put(&task.storage_key, bytes).await?;
        log_record_operation(
            record_id,
            PipelineStep::RemoteUpload,
            "completed",
            Some(task.storage_key.as_str()),
        );

        self.updater.update(record_id, &address).await?;
        log_record_operation(
            record_id,
            PipelineStep::RecordUpdate,
            "completed",
            Some(address.as_str()),
        );

        Ok(MigratedRecord {
            record_id,
            local_path,
            storage_key: task.storage_key.clone(),
            address,
            bytes: size,
        })
    }

    /// Execute the task and absorb its failure
    ///
    /// The error is logged with the record id and the failing step. It is not
    /// retried and nothing is rolled back.
    pub async fn run(&self, task: PipelineTask) {
        if let Err(error) = self.execute(&task).await {
            log_record_failure(task.record_id, error.step(), &error.to_string());
        }
    }
}
