//! # REST API
//!
//! Builds the axum router that exposes the registry over HTTP. All
//! endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                    | Description                          |
//! |--------|-------------------------|--------------------------------------|
//! | GET    | `/health`               | Liveness probe                       |
//! | GET    | `/status`               | Chain height and tip                 |
//! | GET    | `/block/height/:height` | Block by height                      |
//! | GET    | `/block/hash/:hash`     | Block by hash                        |
//! | POST   | `/requestValidation`    | Ownership challenge for an address   |
//! | POST   | `/submitstar`           | Register a star with a signed proof  |
//! | GET    | `/blocks/:address`      | Stars owned by an address            |
//! | GET    | `/validateChain`        | Full-chain integrity report          |

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use star_registry::{Chain, ChainError, ValidationIssue};

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone; everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The one chain this process serves.
    pub chain: Arc<Chain>,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/block/height/:height", get(block_by_height_handler))
        .route("/block/hash/:hash", get(block_by_hash_handler))
        .route("/requestValidation", post(request_validation_handler))
        .route("/submitstar", post(submit_star_handler))
        .route("/blocks/:address", get(stars_by_address_handler))
        .route("/validateChain", get(validate_chain_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Body of `POST /requestValidation`.
#[derive(Debug, Deserialize)]
pub struct ValidationRequest {
    pub address: Option<String>,
}

/// Body of `POST /submitstar`.
#[derive(Debug, Deserialize)]
pub struct SubmitStarRequest {
    pub address: Option<String>,
    pub message: Option<String>,
    pub signature: Option<String>,
    pub star: Option<Value>,
}

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Height of the chain tip.
    pub chain_height: u64,
    /// Hash of the chain tip.
    pub tip_hash: Option<String>,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /validateChain`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateResponse {
    /// True when no issues were found.
    pub valid: bool,
    /// Human-readable issue descriptions, in chain order.
    pub errors: Vec<String>,
    /// The same issues in structured form.
    pub issues: Vec<ValidationIssue>,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

/// HTTP status for a chain error.
fn status_for(err: &ChainError) -> StatusCode {
    match err {
        ChainError::InvalidMessage(_)
        | ChainError::FutureMessage { .. }
        | ChainError::ExpiredMessage { .. } => StatusCode::BAD_REQUEST,
        ChainError::SignatureVerification(_) => StatusCode::UNAUTHORIZED,
        ChainError::GenesisBlock
        | ChainError::Decode { .. }
        | ChainError::Encode(_)
        | ChainError::ChainValidation(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Unwraps a JSON body, turning axum's plain-text rejection into an
/// [`ErrorResponse`] with the same status.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| error_response(rejection.status(), rejection.body_text()))
}

fn required(field: Option<String>, name: &str) -> Result<String, Response> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(error_response(
            StatusCode::BAD_REQUEST,
            format!("missing required field: {name}"),
        )),
    }
}

/// Refreshes the height gauge from the chain itself.
async fn record_chain_height(state: &AppState) {
    state
        .metrics
        .chain_height
        .set(state.chain.chain_height().await as i64);
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — returns the chain height and tip hash.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let tip = state.chain.tip().await;
    if let Some(block) = &tip {
        state.metrics.chain_height.set(block.height as i64);
    }
    Json(StatusResponse {
        version: state.version.clone(),
        chain_height: tip.as_ref().map(|b| b.height).unwrap_or_default(),
        tip_hash: tip.and_then(|b| b.hash),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `GET /block/height/:height` — returns the block at a height, or 404.
async fn block_by_height_handler(
    Path(height): Path<u64>,
    State(state): State<AppState>,
) -> Response {
    match state.chain.block_by_height(height).await {
        Some(block) => (StatusCode::OK, Json(block)).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Block not found at height {}", height),
        ),
    }
}

/// `GET /block/hash/:hash` — returns the block with a hash, or 404.
async fn block_by_hash_handler(
    Path(hash): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match state.chain.block_by_hash(&hash).await {
        Some(block) => (StatusCode::OK, Json(block)).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("Block not found: {}", hash)),
    }
}

/// `POST /requestValidation` — returns the challenge string the wallet
/// must sign.
async fn request_validation_handler(
    State(state): State<AppState>,
    payload: Result<Json<ValidationRequest>, JsonRejection>,
) -> Response {
    let address = match json_body(payload).and_then(|req| required(req.address, "address")) {
        Ok(address) => address,
        Err(resp) => return resp,
    };
    let challenge = state.chain.request_ownership_verification(&address);
    tracing::debug!(%address, "ownership challenge issued");
    (StatusCode::OK, Json(challenge)).into_response()
}

/// `POST /submitstar` — verifies the signed challenge and registers the star.
async fn submit_star_handler(
    State(state): State<AppState>,
    payload: Result<Json<SubmitStarRequest>, JsonRejection>,
) -> Response {
    let fields = json_body(payload).and_then(|req| {
        let address = required(req.address, "address")?;
        let message = required(req.message, "message")?;
        let signature = required(req.signature, "signature")?;
        let star = req.star.ok_or_else(|| {
            error_response(StatusCode::BAD_REQUEST, "missing required field: star")
        })?;
        Ok((address, message, signature, star))
    });
    let (address, message, signature, star) = match fields {
        Ok(fields) => fields,
        Err(resp) => {
            state.metrics.submissions_rejected_total.inc();
            return resp;
        }
    };

    match state
        .chain
        .submit_star(&address, &message, &signature, star)
        .await
    {
        Ok(block) => {
            state.metrics.stars_submitted_total.inc();
            record_chain_height(&state).await;
            (StatusCode::OK, Json(block)).into_response()
        }
        Err(e) => {
            state.metrics.submissions_rejected_total.inc();
            error_response(status_for(&e), e)
        }
    }
}

/// `GET /blocks/:address` — returns the stars owned by an address.
async fn stars_by_address_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Response {
    match state.chain.stars_by_wallet_address(&address).await {
        Ok(stars) => (StatusCode::OK, Json(stars)).into_response(),
        Err(e) => {
            tracing::error!(%address, error = %e, "star lookup failed");
            error_response(status_for(&e), e)
        }
    }
}

/// `GET /validateChain` — runs the full-chain integrity check.
async fn validate_chain_handler(State(state): State<AppState>) -> impl IntoResponse {
    let issues = state.chain.validate_chain().await;
    state.metrics.validation_issues.set(issues.len() as i64);
    record_chain_height(&state).await;
    if !issues.is_empty() {
        tracing::warn!(issues = issues.len(), "chain validation reported issues");
    }
    Json(ValidateResponse {
        valid: issues.is_empty(),
        errors: issues.iter().map(ToString::to_string).collect(),
        issues,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
