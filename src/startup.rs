use crate::config::{Settings, StorageClient};
use crate::imagorpath::hasher::{suffix_result_storage_hasher, verify_hash};
use crate::imagorpath::params::Params;
use crate::processor::blob::Blob;
use crate::processor::error::{Cancellation, ProcessorError};
use crate::processor::processor::Processor;
use crate::state::AppStateDyn;
use crate::storage::file::FileStorage;
use crate::storage::gcs::GCloudStorage;
use crate::storage::s3::S3Storage;
use crate::storage::storage::ImageStorage;
use axum::body::Body;
use axum::extract::{MatchedPath, Request, State};
use axum::http::{header, Response, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::{serve::Serve, Router};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use libvips::VipsApp;
use secrecy::ExposeSecret;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, warn};

pub struct Application {
    pub port: u16,
    server: Serve<Router, Router>,

    /// Keeps the native vips runtime alive for the lifetime of the process;
    /// dropping it tears down the backend, so it must outlive `server`.
    _vips_app: VipsApp,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self> {
        let _vips_app = VipsApp::new("imagor_rs", true).wrap_err("Failed to initialize VipsApp")?;
        if let Some(concurrency) = config.processor.concurrency {
            _vips_app.concurrency_set(concurrency);
        }

        let address = format!("{}:{}", config.application.host, config.application.port);
        let listener = TcpListener::bind(address).await.wrap_err(
            "Failed to bind to the port. Make sure you have the correct permissions to bind to the port",
        )?;
        let port = listener.local_addr()?.port();

        let processor = Processor::new(&config.processor);

        let server = match config.storage.client.clone() {
            StorageClient::S3(s3_settings) => {
                let storage = S3Storage::new(
                    config.storage.base_dir.clone(),
                    config.storage.path_prefix.clone(),
                    config.storage.safe_chars.clone(),
                    s3_settings.region,
                    s3_settings.bucket,
                    s3_settings.access_key.expose_secret(),
                    s3_settings.secret_key.expose_secret(),
                )
                .await;

                storage.ensure_bucket_exists().await?;

                run(listener, storage, processor)
            }
            StorageClient::GCS(gcs_settings) => {
                let storage = GCloudStorage::new(
                    config.storage.base_dir.clone(),
                    config.storage.path_prefix.clone(),
                    config.storage.safe_chars.clone(),
                    gcs_settings.bucket,
                )
                .await;

                run(listener, storage, processor)
            }
            StorageClient::Filesystem(filesystem_settings) => {
                let storage = FileStorage::new(
                    PathBuf::from(filesystem_settings.base_dir),
                    config.storage.path_prefix.clone(),
                    config.storage.safe_chars.clone(),
                );

                run(listener, storage, processor)
            }
        };

        Ok(Self {
            port,
            server,
            _vips_app,
        })
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

fn run<S>(listener: TcpListener, storage: S, processor: Processor) -> Serve<Router, Router>
where
    S: ImageStorage + Clone + Send + Sync + 'static,
{
    let state = AppStateDyn {
        storage: Arc::new(storage),
        processor: Arc::new(processor),
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/", get(root))
        .route("/params/*imagorpath", get(params))
        .route("/*imagorpath", get(handler))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let matched_path = request
                    .extensions()
                    .get::<MatchedPath>()
                    .map(MatchedPath::as_str);

                info_span!(
                    "http_request",
                    method = ?request.method(),
                    matched_path,
                )
            }),
        )
        .with_state(state);

    tracing::debug!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app)
}

/// Fetches a named asset for the `watermark` filter. Runs on the same
/// blocking thread as the processor, so the async storage call is driven to
/// completion via `block_on` rather than handed back to the reactor.
fn make_loader(storage: Arc<dyn ImageStorage + Send + Sync>) -> impl Fn(&str) -> Result<Vec<u8>, ProcessorError> {
    move |name: &str| {
        let decoded = urlencoding::decode(name)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| name.to_string());
        let storage = storage.clone();
        let handle = tokio::runtime::Handle::current();
        let blob = handle
            .block_on(async move { storage.get(&decoded).await })
            .map_err(|e| ProcessorError::LoadFailed(e.to_string()))?;
        Ok(blob.data)
    }
}

#[tracing::instrument(skip(state))]
async fn handler(
    State(state): State<AppStateDyn>,
    params: Params,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    info!("params: {:?}", params);

    if let (Some(hash), Some(path)) = (&params.hash, &params.path) {
        verify_hash(hash.to_owned().into(), path.to_owned().into()).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to verify hash: {}", e),
            )
        })?;
    }

    let params_hash = suffix_result_storage_hasher(&params);
    if let Ok(blob) = state.storage.get(&params_hash).await {
        return respond(blob);
    }

    let img = params.image.as_ref().ok_or((
        StatusCode::BAD_REQUEST,
        "Image parameter is missing".to_string(),
    ))?;

    let blob = if img.starts_with("https://") || img.starts_with("http://") {
        let raw_bytes = reqwest::get(img)
            .await
            .map_err(|e| (StatusCode::NOT_FOUND, format!("Failed to fetch image: {}", e)))?
            .bytes()
            .await
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to fetch image: {}", e),
                )
            })?
            .to_vec();

        Blob::new(raw_bytes)
    } else {
        state.storage.get(img).await.map_err(|e| {
            (
                StatusCode::NOT_FOUND,
                format!("Failed to fetch image: {}", e),
            )
        })?
    };

    let processor = state.processor.clone();
    let storage = state.storage.clone();
    let result = task::spawn_blocking(move || {
        let load = make_loader(storage);
        let cancellation = Cancellation::new();
        processor.process(&blob, &params, &load, &cancellation)
    })
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("joining spawned task failed: {}", e),
        )
    })?
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to process image: {}", e),
        )
    })?;

    if let Err(e) = state.storage.put(&params_hash, &result).await {
        warn!("Failed to save result image [{}]: {}", &params_hash, e);
    }

    respond(result)
}

fn respond(blob: Blob) -> Result<Response<Body>, (StatusCode, String)> {
    Response::builder()
        .header(header::CONTENT_TYPE, blob.content_type)
        .body(Body::from(blob.data))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to build response: {}", e),
            )
        })
}

#[tracing::instrument]
async fn params(params: Params) -> Result<Json<Params>, (StatusCode, String)> {
    info!("params: {:?}", params);
    Ok(Json(params))
}

#[tracing::instrument]
async fn root() -> &'static str {
    "Hello, World"
}

#[tracing::instrument]
async fn health_check() -> &'static str {
    tracing::info!("Health check called");
    "OK"
}
