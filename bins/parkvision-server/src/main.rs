// SPDX-License-Identifier: Apache-2.0
//! HTTP transport binary for the parkvision image-analysis serving layer.
//!
//! Wires the concrete production collaborators (`MemoryStore`,
//! `HttpBlobStore`, `HttpVisionProvider`) into a [`Context`] and exposes the
//! twelve operations in spec §6 as an `axum::Router`. Nothing routing-shaped
//! lives in the library crates; this binary is the only place that knows
//! about HTTP.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context as _;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::Mutex as TokioMutex;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use parkvision_blobstore::HttpBlobStore;
use parkvision_cas::MemoryStore;
use parkvision_config_fs::FsConfigStore;
use parkvision_coordinator::config::{AppConfig, ConfigService};
use parkvision_coordinator::rate_limit::{AllowAll, RateLimitDecision};
use parkvision_coordinator::requests::{
    AnalyzeNatureRequest, AnalyzeRequest, ClearCacheRequest, DownloadAnnotatedRequest,
    ListImagesRequest, UploadImageRequest,
};
use parkvision_coordinator::{validate, Context};
use parkvision_render::{RenderRequest, Renderer};
use parkvision_types::{CoreError, Envelope, ErrorCode, Kind};
use parkvision_vision::HttpVisionProvider;

type AppContext = Context<MemoryStore, HttpBlobStore, HttpVisionProvider>;

#[derive(Clone)]
struct AppState {
    context: Arc<AppContext>,
    config_service: Arc<ConfigService<FsConfigStore>>,
    versions: Arc<TokioMutex<BTreeMap<Kind, u64>>>,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address the HTTP API listens on.
    #[arg(long, default_value = "0.0.0.0:3000")]
    listen: SocketAddr,
    /// Base URL of the blob store's HTTP backend (spec §4.2).
    #[arg(long)]
    blob_base_url: String,
    /// Base URL of the vision provider's HTTP backend (spec §4.3).
    #[arg(long)]
    vision_base_url: String,
    /// TrueType/OpenType font used to draw detection/face labels (spec §4.6).
    #[arg(long)]
    font_path: PathBuf,
}

fn now_unix_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn status_for(err: &CoreError) -> StatusCode {
    match err.code() {
        ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
        ErrorCode::NotFoundError => StatusCode::NOT_FOUND,
        ErrorCode::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::VisionServiceError | ErrorCode::StorageError => StatusCode::BAD_GATEWAY,
        ErrorCode::ServiceUnavailableError => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::TimeoutError => StatusCode::GATEWAY_TIMEOUT,
        ErrorCode::ProcessingError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn ok_response<T: Serialize>(result: T, from_cache: bool, processing_time_ms: u64) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::OK, Json(Envelope::ok(result, from_cache, processing_time_ms)))
}

fn err_response<T>(err: &CoreError, processing_time_ms: u64) -> (StatusCode, Json<Envelope<T>>) {
    (status_for(err), Json(Envelope::err(err, processing_time_ms)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config_store = FsConfigStore::new().map_err(|err| anyhow::anyhow!("opening config store: {err}"))?;
    let config_service = Arc::new(ConfigService::new(config_store));
    let app_config: AppConfig = config_service
        .load_or_default("config")
        .map_err(|err| anyhow::anyhow!("loading config: {err}"))?;

    let font_bytes = std::fs::read(&args.font_path)
        .with_context(|| format!("reading font at {}", args.font_path.display()))?;
    let renderer = Renderer::new(font_bytes).map_err(|err| anyhow::anyhow!("building renderer: {err}"))?;

    let content_store = MemoryStore::new();
    let blob_store = HttpBlobStore::new(args.blob_base_url.clone());
    let vision_provider = HttpVisionProvider::new(args.vision_base_url.clone());
    let rate_limiter: Arc<dyn RateLimitDecision> = Arc::new(AllowAll);

    let context = Context::new(content_store, blob_store, vision_provider, renderer, rate_limiter, app_config);

    let versions: BTreeMap<Kind, u64> = config_service
        .load_or_default("versions")
        .map_err(|err| anyhow::anyhow!("loading version counters: {err}"))?;
    for (kind, version) in &versions {
        context.cache.restore_version(*kind, *version);
    }

    let state = AppState {
        context: Arc::new(context),
        config_service,
        versions: Arc::new(TokioMutex::new(versions)),
    };

    let app = Router::new()
        .route("/images", post(upload_image_handler).get(list_images_handler))
        .route(
            "/images/:hash",
            get(get_image_info_handler).delete(delete_image_handler),
        )
        .route("/images/:hash/duplicates", get(check_duplicate_handler))
        .route("/images/:hash/analyze", post(analyze_handler))
        .route("/images/:hash/nature", post(analyze_nature_handler))
        .route("/images/:hash/annotate", post(download_annotated_handler))
        .route("/batch/analyze", post(batch_analyze_handler))
        .route("/cache/invalidate/:kind", post(invalidate_version_handler))
        .route("/stats", get(stats_handler))
        .route("/cache/clear", post(clear_cache_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    let listener = TcpListener::bind(args.listen).await?;
    info!("parkvision-server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install ctrl-c handler, shutdown signal disabled");
    }
}

#[derive(Debug, Deserialize)]
struct UploadQuery {
    filename: String,
    mime: String,
}

async fn upload_image_handler(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> impl IntoResponse {
    let started = Instant::now();
    let request = UploadImageRequest {
        bytes: body.to_vec(),
        filename: query.filename,
        mime: query.mime,
    };
    match state.context.upload_image(request, now_unix_ms()).await {
        Ok(response) => ok_response(response, false, elapsed_ms(started)).into_response(),
        Err(err) => err_response::<()>(&err, elapsed_ms(started)).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ListImagesQuery {
    #[serde(default)]
    page: usize,
    #[serde(default = "default_page_size")]
    page_size: usize,
}

fn default_page_size() -> usize {
    20
}

async fn list_images_handler(State(state): State<AppState>, Query(query): Query<ListImagesQuery>) -> impl IntoResponse {
    let started = Instant::now();
    let response = state
        .context
        .list_images(ListImagesRequest {
            page: query.page,
            page_size: query.page_size,
        })
        .await;
    ok_response(response, false, elapsed_ms(started))
}

async fn get_image_info_handler(State(state): State<AppState>, Path(hash): Path<String>) -> impl IntoResponse {
    let started = Instant::now();
    match state.context.get_image_info(&hash).await {
        Ok(record) => ok_response(record, false, elapsed_ms(started)).into_response(),
        Err(err) => err_response::<()>(&err, elapsed_ms(started)).into_response(),
    }
}

async fn delete_image_handler(State(state): State<AppState>, Path(hash): Path<String>) -> impl IntoResponse {
    let started = Instant::now();
    match state.context.delete_image(&hash).await {
        Ok(()) => ok_response((), false, elapsed_ms(started)).into_response(),
        Err(err) => err_response::<()>(&err, elapsed_ms(started)).into_response(),
    }
}

async fn check_duplicate_handler(State(state): State<AppState>, Path(hash): Path<String>) -> impl IntoResponse {
    let started = Instant::now();
    match state.context.check_duplicate(&hash).await {
        Ok(response) => ok_response(response, false, elapsed_ms(started)).into_response(),
        Err(err) => err_response::<()>(&err, elapsed_ms(started)).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeBody {
    kind: Kind,
    #[serde(default)]
    params: serde_json::Value,
    #[serde(default)]
    force_refresh: bool,
}

async fn analyze_handler(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Json(body): Json<AnalyzeBody>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request = AnalyzeRequest {
        image_hash: hash,
        kind: body.kind,
        params: body.params,
        force_refresh: body.force_refresh,
    };
    match state.context.analyze(request, now_unix_ms()).await {
        Ok((artifact, from_cache)) => ok_response(artifact, from_cache, elapsed_ms(started)).into_response(),
        Err(err) => err_response::<()>(&err, elapsed_ms(started)).into_response(),
    }
}

fn default_nature_confidence_threshold() -> f32 {
    parkvision_nature::DEFAULT_CONFIDENCE_THRESHOLD
}

#[derive(Debug, Deserialize)]
struct AnalyzeNatureBody {
    #[serde(default = "default_nature_confidence_threshold")]
    confidence_threshold: f32,
    #[serde(default)]
    force_refresh: bool,
}

async fn analyze_nature_handler(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Json(body): Json<AnalyzeNatureBody>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request = AnalyzeNatureRequest {
        image_hash: hash,
        confidence_threshold: body.confidence_threshold,
        force_refresh: body.force_refresh,
    };
    match state.context.analyze_nature(request, now_unix_ms()).await {
        Ok((artifact, from_cache)) => ok_response(artifact, from_cache, elapsed_ms(started)).into_response(),
        Err(err) => err_response::<()>(&err, elapsed_ms(started)).into_response(),
    }
}

async fn download_annotated_handler(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Json(render_request): Json<RenderRequest>,
) -> impl IntoResponse {
    let started = Instant::now();
    let request = DownloadAnnotatedRequest {
        image_hash: hash,
        render_request,
    };
    match state.context.download_annotated(request, now_unix_ms()).await {
        Ok(response) => {
            let from_cache = response.from_cache;
            ok_response(response, from_cache, elapsed_ms(started)).into_response()
        }
        Err(err) => err_response::<()>(&err, elapsed_ms(started)).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct BatchAnalyzeBody {
    image_hashes: Vec<String>,
    kinds: Vec<Kind>,
    #[serde(default)]
    params_json: serde_json::Value,
    #[serde(default)]
    concurrency_limit: Option<usize>,
}

async fn batch_analyze_handler(State(state): State<AppState>, Json(body): Json<BatchAnalyzeBody>) -> impl IntoResponse {
    let started = Instant::now();
    if let Err(err) = validate::non_empty_batch(&body.image_hashes, &body.kinds) {
        return err_response::<()>(&err, elapsed_ms(started)).into_response();
    }
    let request = parkvision_batch::BatchRequest {
        image_hashes: body.image_hashes,
        kinds: body.kinds,
        params_json: body.params_json,
        concurrency_limit: body.concurrency_limit,
    };
    let result = state
        .context
        .batch_analyze(request, CancellationToken::new(), now_unix_ms())
        .await;
    ok_response(result, false, elapsed_ms(started)).into_response()
}

async fn invalidate_version_handler(State(state): State<AppState>, Path(kind): Path<Kind>) -> impl IntoResponse {
    let started = Instant::now();
    let new_version = state.context.invalidate_version(kind);
    let mut versions = state.versions.lock().await;
    versions.insert(kind, new_version);
    if let Err(err) = state.config_service.save("versions", &*versions) {
        tracing::warn!(%err, "failed to persist version counters");
    }
    ok_response(new_version, false, elapsed_ms(started))
}

async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    let started = Instant::now();
    let response = state.context.stats().await;
    ok_response(response, false, elapsed_ms(started))
}

#[derive(Debug, Deserialize, Default)]
struct ClearCacheBody {
    #[serde(default)]
    image_hash: Option<String>,
}

async fn clear_cache_handler(State(state): State<AppState>, Json(body): Json<ClearCacheBody>) -> impl IntoResponse {
    let started = Instant::now();
    let removed = state.context.clear_cache(ClearCacheRequest {
        image_hash: body.image_hash,
    });
    ok_response(removed, false, elapsed_ms(started))
}
