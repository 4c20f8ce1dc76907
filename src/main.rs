//! Document Intelligence Gateway - async submit/poll/normalize server for a
//! remote document analysis service, plus an image-upscale proxy.

mod analysis;
mod config;
mod document;
mod error;
mod normalize;
mod upscale;

use analysis::azure::AzureTransport;
use analysis::poller::{Analyzer, PollConfig};
use analysis::{AnalysisRequest, CancelToken};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use config::{ModelMap, ServiceConfig, UpscaleConfig};
use document::AnalysisRecord;
use error::AnalysisError;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use upscale::{UpscaleClient, UpscaleRequest, UpscaleResponse};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    analyses: Arc<RwLock<HashMap<String, AnalysisRecord>>>,
    analyzer: Arc<Analyzer>,
    models: Arc<ModelMap>,
    upscaler: Option<Arc<UpscaleClient>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docintel_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let service_config = ServiceConfig::from_env()?;
    info!("Analysis service endpoint: {}", service_config.endpoint);

    let http = reqwest::Client::new();
    let transport = Arc::new(AzureTransport::new(http.clone(), service_config));
    let analyzer = Arc::new(Analyzer::new(transport, PollConfig::default()));

    // Upscaling is optional; the gateway runs without it.
    let upscaler = match UpscaleConfig::from_env() {
        Ok(config) => {
            info!("Upscale host: {}", config.endpoint);
            Some(Arc::new(UpscaleClient::new(http, config)))
        }
        Err(e) => {
            info!("Image upscaling disabled: {}", e);
            None
        }
    };

    let state = AppState {
        analyses: Arc::new(RwLock::new(HashMap::new())),
        analyzer,
        models: Arc::new(ModelMap::default()),
        upscaler,
    };

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .route("/models", get(list_models))
        .route("/analyze", post(analyze_document))
        .route("/analyses/:id", get(get_analysis))
        .route("/upscale", post(upscale_image))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024)) // 100MB
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Run server
    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    info!("Server listening on http://0.0.0.0:3000");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// List logical model names callers may select.
async fn list_models(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.models.names())
}

#[derive(serde::Deserialize)]
struct AnalyzeQuery {
    model: Option<String>,
}

/// Upload a document and run the full submit/poll/normalize pipeline.
async fn analyze_document(
    State(state): State<AppState>,
    Query(query): Query<AnalyzeQuery>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisRecord>, (StatusCode, String)> {
    let model = query.model.as_deref().unwrap_or("mixed");
    let service_model = state.models.resolve(model).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!(
                "Unknown model: {}. Available: {:?}",
                model,
                state.models.names()
            ),
        )
    })?;
    let service_model = service_model.to_string();

    // Read the uploaded file
    let mut filename = String::new();
    let mut file_data = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            filename = field.file_name().unwrap_or("document").to_string();
            file_data = field
                .bytes()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read file: {}", e)))?
                .to_vec();
            break;
        }
    }

    if file_data.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "No file uploaded".to_string()));
    }

    info!(
        "Received file: {} ({} bytes) with model: {} -> {}",
        filename,
        file_data.len(),
        model,
        service_model
    );

    let content_hash = {
        let mut hasher = Sha256::new();
        hasher.update(&file_data);
        format!("{:x}", hasher.finalize())
    };

    let request = AnalysisRequest {
        file_bytes: file_data,
        model_id: service_model.clone(),
    };

    let document = state
        .analyzer
        .analyze(request, &CancelToken::new())
        .await
        .map_err(|e| {
            error!("Analysis failed: {}", e);
            (analysis_status(&e), e.to_string())
        })?;

    let record = AnalysisRecord::new(
        filename,
        model.to_string(),
        service_model,
        content_hash,
        document,
    );

    {
        let mut analyses = state.analyses.write().unwrap();
        analyses.insert(record.id.clone(), record.clone());
    }

    info!("Analysis complete: {}", record.id);
    Ok(Json(record))
}

/// Get a stored analysis by ID.
async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AnalysisRecord>, StatusCode> {
    let analyses = state.analyses.read().unwrap();
    analyses
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Proxy one image through the upscaling model host.
async fn upscale_image(
    State(state): State<AppState>,
    Json(request): Json<UpscaleRequest>,
) -> Result<Json<UpscaleResponse>, (StatusCode, String)> {
    let upscaler = state.upscaler.as_ref().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        "Image upscaling is not configured".to_string(),
    ))?;

    if !upscale::validate_scale(request.scale) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!(
                "Unsupported scale: {}. Allowed: {:?}",
                request.scale,
                upscale::ALLOWED_SCALES
            ),
        ));
    }

    let response = upscaler.upscale(&request).await.map_err(|e| {
        error!("Upscale failed: {}", e);
        (StatusCode::BAD_GATEWAY, format!("Upscale failed: {}", e))
    })?;

    Ok(Json(response))
}

// ============================================================================
// Helper functions
// ============================================================================

/// Map each analysis failure kind to a distinct HTTP status so callers can
/// tell "service rejected" from "service never decided".
fn analysis_status(err: &AnalysisError) -> StatusCode {
    match err {
        AnalysisError::Submission { .. } => StatusCode::BAD_GATEWAY,
        AnalysisError::PollFailed { .. } => StatusCode::BAD_GATEWAY,
        AnalysisError::TimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
        // Client went away; 499 in the nginx tradition.
        AnalysisError::Cancelled => {
            StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
