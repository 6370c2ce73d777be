//! HTTP adapter: `/health`, `/translate`, `/analytics` and `/validate`.

use crate::bundle::LocalizationBundle;
use crate::config::Config;
use crate::error::TranslateError;
use crate::metrics::{AnalyticsReport, ServiceMetrics};
use crate::orchestrator::{
    OrchestratorSettings, TranslationOrchestrator, TranslationRequest, TranslationResult,
    DEFAULT_SOURCE_LANGUAGE,
};
use crate::providers::SharedProvider;
use crate::staging::{ResourceStage, TempFileStage};
use crate::validator::{BundleValidator, ValidationReport};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const BASE_FEATURES: [&str; 3] = ["ai_translation", "context_aware", "multi_provider"];

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub provider: Arc<SharedProvider>,
    pub stage: Arc<dyn ResourceStage>,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// State backed by the configured staging directory.
    pub fn new(config: Config, provider: SharedProvider, metrics: Arc<ServiceMetrics>) -> Self {
        let stage = Arc::new(TempFileStage::new(config.staging_dir.clone()));
        Self {
            config: Arc::new(config),
            provider: Arc::new(provider),
            stage,
            metrics,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/translate", post(translate))
        .route("/analytics", get(analytics))
        .route("/validate", post(validate))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error body returned by every endpoint: `{"error": message}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("Translation failed: {}", message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<TranslateError> for ApiError {
    fn from(e: TranslateError) -> Self {
        if e.is_input_error() {
            ApiError::bad_request(e.to_string())
        } else {
            error!("Translation request failed: {}", e);
            ApiError::internal(e)
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                ApiError::bad_request("No JSON payload provided")
            }
            other => ApiError::bad_request(format!("Invalid JSON payload: {}", other.body_text())),
        }
    }
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Request handler panicked: {}", detail);
    ApiError::internal("internal error").into_response()
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub features: Vec<&'static str>,
    pub providers: Vec<&'static str>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = &state.config;
    let mut features = BASE_FEATURES.to_vec();
    if config.enable_caching {
        features.push("caching");
    }
    if config.enable_analytics {
        features.push("analytics");
    }

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        features,
        providers: config
            .configured_providers()
            .into_iter()
            .map(|kind| kind.name())
            .collect(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslatePayload {
    content: Option<Value>,
    languages: Option<Vec<String>>,
    source_language: Option<String>,
}

/// The request body, rejecting an empty or `null` document.
fn require_payload(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    let Json(body) = payload?;
    let empty = match &body {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        return Err(ApiError::bad_request("No JSON payload provided"));
    }
    Ok(body)
}

async fn translate(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TranslationResult>, ApiError> {
    let payload: TranslatePayload = serde_json::from_value(require_payload(payload)?)
        .map_err(|e| ApiError::bad_request(format!("Invalid JSON payload: {}", e)))?;

    let content = match payload.content {
        None | Some(Value::Null) => return Err(TranslateError::EmptyContent.into()),
        Some(value) => value,
    };
    let bundle =
        LocalizationBundle::from_value(content).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let request = TranslationRequest::new(bundle, payload.languages.unwrap_or_default())
        .with_source_language(
            payload
                .source_language
                .unwrap_or_else(|| DEFAULT_SOURCE_LANGUAGE.to_string()),
        );
    request.check()?;

    info!(
        "Translating {} keys to {:?}",
        request.bundle.message_count(),
        request.target_languages
    );

    let provider = state.provider.get().await.map_err(|e| {
        error!("Failed to initialize translation provider: {:#}", e);
        ApiError::internal(format!("{:#}", e))
    })?;

    let mut orchestrator = TranslationOrchestrator::new(
        provider,
        state.stage.clone(),
        OrchestratorSettings::from_config(&state.config),
    );
    if state.config.enable_analytics {
        orchestrator = orchestrator.with_metrics(state.metrics.clone());
    }

    let result = orchestrator.orchestrate(request).await?;
    Ok(Json(result))
}

async fn analytics(State(state): State<AppState>) -> Json<AnalyticsReport> {
    Json(state.metrics.report())
}

/// A body without `content` validates an empty bundle.
async fn validate(
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ValidationReport>, ApiError> {
    let body = require_payload(payload)?;
    let content = body
        .get("content")
        .cloned()
        .unwrap_or_else(|| Value::Object(Default::default()));
    Ok(Json(BundleValidator::validate(&content)))
}
