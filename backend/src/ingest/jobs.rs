//! Queued imports.
//!
//! An upload can be handed off as an [`ImportJob`] instead of being imported
//! inline. Workers pull jobs from the queue and run the same
//! [`BatchImporter`]; since nobody is waiting for the answer, the outcome is
//! only logged. A failing job is logged with its filename and dropped, never
//! retried and never allowed to take the worker down.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::pipeline::{BatchImporter, ImportOptions};
use crate::api::logs::{LogEntry, LogLevel};
use crate::error::{CsvError, QueueError};
use crate::models::BatchResult;
use crate::parser::Separator;

/// Per-job options as delivered by the producer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
}

/// One uploaded file waiting to be imported.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportJob {
    pub id: Uuid,
    pub filename: String,
    pub buffer: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<JobOptions>,
    pub enqueued_at: DateTime<Utc>,
}

impl ImportJob {
    pub fn new(filename: impl Into<String>, buffer: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            buffer,
            options: None,
            enqueued_at: Utc::now(),
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.options = Some(JobOptions {
            separator: Some(separator.into()),
        });
        self
    }

    fn import_options(&self) -> Result<ImportOptions, CsvError> {
        let separator = match self.options.as_ref().and_then(|o| o.separator.as_deref()) {
            Some(raw) => raw.parse()?,
            None => Separator::default(),
        };
        Ok(ImportOptions::with_separator(separator))
    }
}

/// How a job ended. Only used for logging and tests.
#[derive(Debug)]
pub enum JobOutcome {
    Completed(BatchResult),
    Failed { kind: &'static str, message: String },
}

/// Import one job. Never returns an error: every failure is logged against
/// the job's filename.
#[tracing::instrument(skip(importer, job), fields(job_id = %job.id, filename = %job.filename))]
pub async fn handle_job(importer: &BatchImporter, job: ImportJob) -> JobOutcome {
    let log = importer.log();
    log.log(LogEntry::new(LogLevel::Info, "Processing queued CSV file").with_filename(&job.filename));

    let outcome = match job.import_options() {
        Err(err) => JobOutcome::Failed {
            kind: "invalid_options",
            message: err.to_string(),
        },
        Ok(options) => match importer.process_batch(&job.buffer, &options).await {
            Ok(result) => JobOutcome::Completed(result),
            Err(err) => JobOutcome::Failed {
                kind: err.kind(),
                message: err.to_string(),
            },
        },
    };

    let entry = match &outcome {
        JobOutcome::Completed(result) => {
            let level = if result.error_count == 0 { LogLevel::Success } else { LogLevel::Warning };
            LogEntry::new(
                level,
                format!(
                    "Queued import finished: {} stored, {} rejected",
                    result.success_count, result.error_count
                ),
            )
        }
        JobOutcome::Failed { kind, message } => {
            LogEntry::new(LogLevel::Error, format!("Queued import failed [{}]: {}", kind, message))
        }
    };
    log.log(entry.with_filename(&job.filename));

    outcome
}

/// Producer side of the import queue.
#[derive(Debug, Clone)]
pub struct JobQueue {
    sender: mpsc::Sender<ImportJob>,
}

/// Consumer side, handed to [`spawn_workers`].
pub type JobReceiver = mpsc::Receiver<ImportJob>;

impl JobQueue {
    /// Bounded queue; `enqueue` waits while it is full.
    pub fn channel(capacity: usize) -> (Self, JobReceiver) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    pub async fn enqueue(&self, job: ImportJob) -> Result<Uuid, QueueError> {
        let id = job.id;
        self.sender.send(job).await.map_err(|_| QueueError::Closed)?;
        tracing::debug!(job_id = %id, "Import job enqueued");
        Ok(id)
    }
}

/// Start `count` workers draining `receiver`. They stop once every
/// [`JobQueue`] handle has been dropped and the queue is empty.
pub fn spawn_workers(count: usize, receiver: JobReceiver, importer: BatchImporter) -> Vec<JoinHandle<()>> {
    let receiver = Arc::new(Mutex::new(receiver));

    (0..count.max(1))
        .map(|worker| {
            let receiver = Arc::clone(&receiver);
            let importer = importer.clone();
            tokio::spawn(async move {
                tracing::info!(worker, "Import worker started");
                loop {
                    let next = receiver.lock().await.recv().await;
                    let Some(job) = next else { break };
                    handle_job(&importer, job).await;
                }
                tracing::info!(worker, "Import worker stopped");
            })
        })
        .collect()
}
