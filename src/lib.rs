#![allow(clippy::doc_markdown)] // Allow technical terms like MySQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Image Migrator
//!
//! Moves base64 images embedded in MySQL rows into S3-compatible object
//! storage and rewrites each row to point at the uploaded object.
//!
//! ## Architecture
//!
//! ```text
//! MigrationDriver ──next_page(watermark, batch)──▶ RecordSource
//!       │
//!       └─submit─▶ WorkerPool (K slots) ─▶ RecordPipeline
//!                                            decode → LocalSink → RemoteSink → RecordUpdater
//! ```
//!
//! - Pages are fetched in ascending id order; an empty page ends the run.
//! - At most K record pipelines run at once; the driver waits for a free slot.
//! - A failing record is logged and dropped without affecting its siblings.
//! - A failing page fetch aborts the run.
//!
//! ## Module Organization
//!
//! - [`config`] - Environment-driven configuration
//! - [`database`] - MySQL connection pool
//! - [`error`] - Fatal and per-record error types
//! - [`logging`] - Structured logging setup
//! - [`migration`] - Driver, worker pool, pipeline and collaborators
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use image_migrator::config::MigratorConfig;
//! use image_migrator::database::DatabaseConnection;
//! use image_migrator::migration::{
//!     FsLocalSink, MigrationDriver, MySqlRecordSource, MySqlRecordUpdater,
//!     ObjectStoreRemoteSink, RecordPipeline,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MigratorConfig::from_env()?;
//! let db = DatabaseConnection::connect(&config.database).await?;
//!
//! let pipeline = RecordPipeline::new(
//!     Arc::new(FsLocalSink::create(&config.migration.output_dir).await?),
//!     Arc::new(ObjectStoreRemoteSink::from_config(&config.storage, &config.migration)?),
//!     Arc::new(MySqlRecordUpdater::new(db.pool().clone())),
//! );
//! let source = Arc::new(MySqlRecordSource::new(db.pool().clone()));
//!
//! let summary = MigrationDriver::new(source, pipeline, config.migration.clone())
//!     .run()
//!     .await?;
//! println!("dispatched {} records", summary.records_dispatched);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod migration;

pub use config::{ConfigurationError, MigratorConfig};
pub use error::{MigrationError, PipelineStep, Result, SourceError, StepError};
pub use migration::{MigrationDriver, MigrationSummary, RecordPipeline, WorkerPool};
