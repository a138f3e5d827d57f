//! HTTP Server for the Prodload API.
//!
//! # API Endpoints
//!
//! | Method | Path                          | Description                            |
//! |--------|-------------------------------|----------------------------------------|
//! | GET    | `/health`                     | Health check                           |
//! | GET    | `/api/products`               | List stored products                   |
//! | POST   | `/api/products/upload`        | Import a CSV and return per-row result |
//! | POST   | `/api/products/upload/async`  | Queue a CSV for background import      |
//! | GET    | `/api/logs`                   | SSE stream of import logs              |
//!
//! Uploads are multipart forms with a `file` field and an optional
//! `separator` field.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use tokio::sync::watch;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::logs::ImportLog;
use super::types::{ApiError, QueuedResponse, UploadResponse, UploadedFile};
use crate::config::Config;
use crate::error::{ImportError, UploadError};
use crate::ingest::{spawn_workers, BatchImporter, ImportJob, ImportOptions, JobQueue};
use crate::models::StoredProduct;
use crate::parser::Separator;
use crate::store::{ProductGateway, ProductStore};

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Upload handling settings.
#[derive(Debug, Clone, Copy)]
pub struct UploadSettings {
    pub max_upload_bytes: usize,
    pub default_separator: Separator,
}

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub importer: BatchImporter,
    pub gateway: ProductGateway,
    pub queue: JobQueue,
    pub log: ImportLog,
    pub settings: UploadSettings,
    /// Flips to `true` once the server starts shutting down.
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(store: Arc<dyn ProductStore>, queue: JobQueue, log: ImportLog, settings: UploadSettings) -> Self {
        let gateway = ProductGateway::new(store, log.clone());
        let importer = BatchImporter::new(Arc::new(gateway.clone()), log.clone());
        let (_, shutdown) = watch::channel(false);
        Self {
            importer,
            gateway,
            queue,
            log,
            settings,
            shutdown,
        }
    }

    /// Tie long-lived responses (the log stream) to a shutdown flag.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    let body_limit = state
        .settings
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/products", get(list_products))
        .route("/api/products/upload", post(upload_csv))
        .route("/api/products/upload/async", post(upload_csv_async))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Start the HTTP server and the import workers.
pub async fn start_server(config: &Config, store: Arc<dyn ProductStore>) -> Result<(), Box<dyn std::error::Error>> {
    let log = ImportLog::new();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (queue, receiver) = JobQueue::channel(config.import.queue_capacity);
    let state = AppState::new(
        store,
        queue,
        log.clone(),
        UploadSettings {
            max_upload_bytes: config.import.max_upload_bytes,
            default_separator: config.import.separator,
        },
    )
    .with_shutdown(shutdown_rx);
    let workers = spawn_workers(config.import.workers, receiver, state.importer.clone());

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let app = router(state).layer(cors).layer(TraceLayer::new_for_http());

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, workers = workers.len(), "Prodload server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Open log streams end, so the connections can drain.
            shutdown_tx.send_replace(true);
        })
        .await?;

    // The router (and its queue handles) is gone: workers finish what is
    // queued and stop.
    for worker in workers {
        if let Err(e) = worker.await {
            log.error(format!("Import worker panicked: {}", e));
        }
    }
    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Resolves once `shutdown` reads `true`. Never resolves if the flag's owner
/// is gone without setting it.
async fn shutdown_requested(mut shutdown: watch::Receiver<bool>) {
    let flagged = shutdown.wait_for(|stop| *stop).await.is_ok();
    if !flagged {
        std::future::pending::<()>().await;
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "prodload",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "products": "GET /api/products",
            "upload": "POST /api/products/upload",
            "uploadAsync": "POST /api/products/upload/async",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<StoredProduct>>, ApiError> {
    Ok(Json(state.gateway.list_all().await?))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.log.subscribe();

    let entries = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });
    let stream = futures::StreamExt::take_until(entries, shutdown_requested(state.shutdown.clone()));

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// A body cut off by the size limit is reported as a too-large file.
fn upload_error(err: MultipartError, max_bytes: usize) -> UploadError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::FileTooLarge { max_bytes }
    } else {
        UploadError::Multipart(err.to_string())
    }
}

/// Pull the `file` and optional `separator` fields out of the form.
async fn read_upload(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<(UploadedFile, Option<String>), ApiError> {
    let mut file = UploadedFile::default();
    let mut separator = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e, max_bytes))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                file.filename = field.file_name().map(|s| s.to_string());
                file.bytes = field
                    .bytes()
                    .await
                    .map_err(|e| upload_error(e, max_bytes))?
                    .to_vec();
            }
            "separator" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| upload_error(e, max_bytes))?;
                if !text.is_empty() {
                    separator = Some(text);
                }
            }
            _ => {}
        }
    }

    Ok((file, separator))
}

/// Synchronous import: the caller gets the per-row result.
async fn upload_csv(State(state): State<AppState>, multipart: Multipart) -> Result<Json<UploadResponse>, ApiError> {
    let (file, separator) = read_upload(multipart, state.settings.max_upload_bytes).await?;
    file.check(state.settings.max_upload_bytes)?;

    let separator: Separator = match separator {
        Some(raw) => raw.parse().map_err(ImportError::from)?,
        None => state.settings.default_separator,
    };

    tracing::info!(filename = file.display_name(), bytes = file.bytes.len(), "New upload");

    let result = state
        .importer
        .process_batch(&file.bytes, &ImportOptions::with_separator(separator))
        .await
        .map_err(|e| {
            tracing::error!(filename = file.display_name(), kind = e.kind(), error = %e, "CSV import failed");
            e
        })?;

    Ok(Json(UploadResponse::from(result)))
}

/// Asynchronous import: the file is queued and the request returns at once.
async fn upload_csv_async(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<QueuedResponse>), ApiError> {
    let (file, separator) = read_upload(multipart, state.settings.max_upload_bytes).await?;
    file.check(state.settings.max_upload_bytes)?;

    let filename = file.display_name().to_string();
    let mut job = ImportJob::new(filename.clone(), file.bytes);
    if let Some(raw) = separator {
        job = job.with_separator(raw);
    }

    let job_id = state.queue.enqueue(job).await?;
    tracing::info!(%job_id, filename = %filename, "Upload queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(QueuedResponse {
            message: "File queued for processing".to_string(),
            job_id,
            filename,
        }),
    ))
}
