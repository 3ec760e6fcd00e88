//! # Migration
//!
//! The bounded-concurrency migration pipeline.
//!
//! ## Components
//!
//! - [`record_source`] - Paginated access to eligible records
//! - [`codec`] - Payload decoding
//! - [`local_sink`] - Local copies of images
//! - [`remote_sink`] - Object storage uploads
//! - [`record_updater`] - Writing resolved addresses back
//! - [`worker_pool`] - Bounded concurrency and the drain barrier
//! - [`pipeline`] - The per-record step chain
//! - [`driver`] - Pagination, dispatch and watermark bookkeeping

pub mod codec;
pub mod driver;
pub mod local_sink;
pub mod pipeline;
pub mod record_source;
pub mod record_updater;
pub mod remote_sink;
pub mod types;
pub mod worker_pool;

pub use codec::{Base64ImageCodec, ImageCodec};
pub use driver::MigrationDriver;
pub use local_sink::{FsLocalSink, LocalSink};
pub use pipeline::RecordPipeline;
pub use record_source::{MySqlRecordSource, RecordSource};
pub use record_updater::{MySqlRecordUpdater, RecordUpdater};
pub use remote_sink::{ObjectStoreRemoteSink, RemoteSink};
pub use types::{MigratedRecord, MigrationSummary, Page, PipelineTask, Record, Watermark};
pub use worker_pool::WorkerPool;
