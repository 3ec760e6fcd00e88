//! Fixture assembly for driver and pipeline tests.

#![allow(dead_code)]

use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};

use image_migrator::config::MigrationConfig;
use image_migrator::migration::{MigrationDriver, Record, RecordPipeline};

use super::mock_collaborators::{
    InMemoryRecordSource, RecordingLocalSink, RecordingRemoteSink, RecordingUpdater,
};

/// Raw bytes standing in for the image of record `id`
pub fn image_bytes(id: i64) -> Vec<u8> {
    format!("\u{89}PNG-image-of-{id}").into_bytes()
}

pub fn valid_record(id: i64) -> Record {
    Record::new(id, general_purpose::STANDARD.encode(image_bytes(id)))
}

pub fn corrupt_record(id: i64) -> Record {
    Record::new(id, "%%% definitely not base64 %%%")
}

/// All four collaborators, kept around for assertions after a run
pub struct MigrationFixture {
    pub source: Arc<InMemoryRecordSource>,
    pub local: Arc<RecordingLocalSink>,
    pub remote: Arc<RecordingRemoteSink>,
    pub updater: Arc<RecordingUpdater>,
    pub config: MigrationConfig,
}

impl MigrationFixture {
    pub fn new(source: InMemoryRecordSource) -> Self {
        Self {
            source: Arc::new(source),
            local: Arc::new(RecordingLocalSink::new()),
            remote: Arc::new(RecordingRemoteSink::new()),
            updater: Arc::new(RecordingUpdater::new()),
            config: MigrationConfig::default(),
        }
    }

    pub fn with_local(mut self, local: RecordingLocalSink) -> Self {
        self.local = Arc::new(local);
        self
    }

    pub fn with_remote(mut self, remote: RecordingRemoteSink) -> Self {
        self.remote = Arc::new(remote);
        self
    }

    pub fn with_updater(mut self, updater: RecordingUpdater) -> Self {
        self.updater = Arc::new(updater);
        self
    }

    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn with_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.max_concurrency = max_concurrency;
        self
    }

    pub fn with_start_after(mut self, start_after_id: i64) -> Self {
        self.config.start_after_id = start_after_id;
        self
    }

    pub fn pipeline(&self) -> RecordPipeline {
        RecordPipeline::new(
            self.local.clone(),
            self.remote.clone(),
            self.updater.clone(),
        )
    }

    pub fn driver(&self) -> MigrationDriver {
        MigrationDriver::new(self.source.clone(), self.pipeline(), self.config.clone())
    }
}
