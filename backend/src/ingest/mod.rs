//! Product ingestion.
//!
//! - Normalize: raw rows to candidate records
//! - Pipeline: the batch importer (synchronous path)
//! - Jobs: queued imports handled by background workers (asynchronous path)

pub mod jobs;
pub mod normalize;
pub mod pipeline;

pub use jobs::{handle_job, spawn_workers, ImportJob, JobOptions, JobOutcome, JobQueue, JobReceiver};
pub use normalize::{parse_price, to_candidate};
pub use pipeline::{BatchImporter, ImportOptions};
