//! # Migration Driver
//!
//! Pages through the record source in ascending id order and dispatches
//! every record into the worker pool.
//!
//! The watermark moves to a record's id right after that record is
//! dispatched, not after its pipeline finishes. A record whose pipeline
//! fails is therefore never revisited in the same run.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::pipeline::RecordPipeline;
use super::record_source::RecordSource;
use super::types::{MigrationSummary, PipelineTask, Watermark};
use super::worker_pool::WorkerPool;
use crate::config::MigrationConfig;
use crate::error::{MigrationError, Result};

pub struct MigrationDriver {
    run_id: Uuid,
    source: Arc<dyn RecordSource>,
    pipeline: Arc<RecordPipeline>,
    pool: WorkerPool,
    config: MigrationConfig,
}

impl std::fmt::Debug for MigrationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationDriver")
            .field("run_id", &self.run_id)
            .field("pool", &self.pool)
            .field("config", &self.config)
            .finish()
    }
}

impl MigrationDriver {
    pub fn new(
        source: Arc<dyn RecordSource>,
        pipeline: RecordPipeline,
        config: MigrationConfig,
    ) -> Self {
        let pool = WorkerPool::new(config.max_concurrency);
        Self {
            run_id: Uuid::new_v4(),
            source,
            pipeline: Arc::new(pipeline),
            pool,
            config,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Process every eligible record, then wait for all pipelines to finish
    ///
    /// A page fetch failure ends the run at once with an error; tasks still
    /// in flight are aborted, not awaited. Per-record failures never surface
    /// here.
    pub async fn run(mut self) -> Result<MigrationSummary> {
        let run_id = self.run_id;
        let mut watermark = Watermark::new(self.config.start_after_id);
        let mut pages_fetched = 0u64;

        info!(
            run_id = %run_id,
            start_after_id = watermark.value(),
            batch_size = self.config.batch_size,
            max_concurrency = self.pool.capacity(),
            "Starting image migration"
        );

        let outcome = self.dispatch_all(&mut watermark, &mut pages_fetched).await;

        if let Err(e) = outcome {
            let abandoned = self.pool.abort();
            error!(
                run_id = %run_id,
                watermark = watermark.value(),
                records_dispatched = self.pool.submitted(),
                abandoned = abandoned,
                error = %e,
                "Migration aborted"
            );
            return Err(e);
        }

        self.pool.drain().await;

        let summary = MigrationSummary {
            run_id,
            pages_fetched,
            records_dispatched: self.pool.submitted(),
            final_watermark: watermark.value(),
        };

        info!(
            run_id = %run_id,
            pages_fetched = summary.pages_fetched,
            records_dispatched = summary.records_dispatched,
            final_watermark = summary.final_watermark,
            "All records processed"
        );

        Ok(summary)
    }

    async fn dispatch_all(
        &mut self,
        watermark: &mut Watermark,
        pages_fetched: &mut u64,
    ) -> Result<()> {
        loop {
            let after_id = watermark.value();
            let page = self
                .source
                .next_page(after_id, self.config.batch_size)
                .await
                .map_err(|source| MigrationError::Source { after_id, source })?;
            *pages_fetched += 1;

            if page.is_empty() {
                debug!(
                    run_id = %self.run_id,
                    after_id = after_id,
                    "Empty page, record set exhausted"
                );
                return Ok(());
            }

            debug!(
                run_id = %self.run_id,
                after_id = after_id,
                page_len = page.len(),
                last_id = page.last_id(),
                "Fetched page"
            );

            for record in page {
                if !watermark.admits(record.id) {
                    return Err(MigrationError::NonMonotonicPage {
                        record_id: record.id,
                        watermark: watermark.value(),
                    });
                }

                let record_id = record.id;
                if !record.is_eligible() {
                    warn!(
                        run_id = %self.run_id,
                        record_id = record_id,
                        "Skipping record without payload"
                    );
                    watermark.advance(record_id);
                    continue;
                }

                debug!(
                    run_id = %self.run_id,
                    record_id = record_id,
                    name = record.name.as_deref(),
                    username = record.username.as_deref(),
                    "Fetched record"
                );

                let task = PipelineTask::new(record, self.config.storage_key(record_id));
                let pipeline = Arc::clone(&self.pipeline);
                self.pool
                    .submit(async move { pipeline.run(task).await })
                    .await?;

                watermark.advance(record_id);
            }
        }
    }
}
