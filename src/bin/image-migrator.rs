//! # Image Migrator
//!
//! Migrates every eligible user image into object storage, then exits.
//! Configuration comes entirely from the environment (`DB_*`, `AWS_*`,
//! `MIGRATION_*`). Exits non-zero only when the run itself fails; individual
//! record failures are reported in the log.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use image_migrator::config::MigratorConfig;
use image_migrator::database::DatabaseConnection;
use image_migrator::logging;
use image_migrator::migration::{
    FsLocalSink, MigrationDriver, MySqlRecordSource, MySqlRecordUpdater, ObjectStoreRemoteSink,
    RecordPipeline,
};
use image_migrator::MigrationSummary;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_structured_logging();

    match run().await {
        Ok(summary) => {
            info!(
                run_id = %summary.run_id,
                records_dispatched = summary.records_dispatched,
                "All user images processed. Exiting"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "Image migration failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<MigrationSummary> {
    let config = MigratorConfig::from_env().context("failed to load configuration")?;
    info!(config = %config.sanitized(), "Configuration loaded");

    let db = DatabaseConnection::connect(&config.database)
        .await
        .context("failed to initialize the database connection")?;

    let local = FsLocalSink::create(&config.migration.output_dir)
        .await
        .context("failed to prepare local output directory")?;
    let remote = ObjectStoreRemoteSink::from_config(&config.storage, &config.migration)
        .context("failed to create object store client")?;

    let pipeline = RecordPipeline::new(
        Arc::new(local),
        Arc::new(remote),
        Arc::new(MySqlRecordUpdater::new(db.pool().clone())),
    );
    let source = Arc::new(MySqlRecordSource::new(db.pool().clone()));

    let outcome = MigrationDriver::new(source, pipeline, config.migration.clone())
        .run()
        .await;

    db.close().await;

    Ok(outcome?)
}
