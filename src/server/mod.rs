use crate::accounts::AuthVerifier;
use crate::client::SearchOrchestrator;
use crate::credits::{CreditAccount, CreditLedger};
use crate::tools::{DiscoverInput, DiscoverResponse, DiscoverTool, VerifyInput, VerifyReport, VerifyTool};
use crate::{Error, Result};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub discover: Arc<DiscoverTool>,
    pub verify: Arc<VerifyTool>,
    pub orchestrator: Arc<SearchOrchestrator>,
    pub auth: Arc<dyn AuthVerifier>,
    pub ledger: Arc<CreditLedger>,
}

/// Error wrapper carrying the HTTP mapping of the error taxonomy
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            Error::AuthRequired | Error::AccountNotFound { .. } => {
                (StatusCode::UNAUTHORIZED, self.0.to_string())
            }
            Error::InsufficientCredits { .. } | Error::WordLimitExceeded { .. } => {
                (StatusCode::FORBIDDEN, self.0.to_string())
            }
            Error::InvalidInput { .. } => (StatusCode::BAD_REQUEST, self.0.to_string()),
            other => {
                error!("Unhandled error reached the HTTP boundary: {}", other);
                // Internal detail only leaves the process in debug builds
                let message = if cfg!(debug_assertions) {
                    other.to_string()
                } else {
                    "Internal server error".to_string()
                };
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Request body for POST /discover; `text` validated by hand so a
/// missing field maps to 400 rather than an extractor rejection
#[derive(Debug, Deserialize)]
struct DiscoverBody {
    text: Option<String>,
    step: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct VerifyBody {
    text: Option<String>,
}

/// Pull the caller's token from the Authorization header or the
/// `session` cookie
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == "session").then(|| value.trim().to_string())
    })
}

/// Authenticate the request and load the caller's account, applying the
/// lazy credit reset
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<CreditAccount> {
    let token = extract_token(headers).ok_or(Error::AuthRequired)?;
    let email = state
        .auth
        .verify(&token)
        .await?
        .ok_or(Error::AuthRequired)?;
    state.ledger.prepare(&email).await
}

fn require_text(text: Option<String>) -> Result<String> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(Error::InvalidInput {
            field: "text".to_string(),
            reason: "text is required".to_string(),
        }),
    }
}

#[instrument(skip_all)]
async fn discover_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<DiscoverBody>,
) -> std::result::Result<Json<DiscoverResponse>, ApiError> {
    let text = require_text(body.text)?;
    let account = authenticate(&state, &headers).await?;

    let input = DiscoverInput {
        text,
        step: body.step,
    };
    let response = state.discover.run(&account, &input).await?;
    Ok(Json(response))
}

#[instrument(skip_all)]
async fn verify_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<VerifyBody>,
) -> std::result::Result<Json<VerifyReport>, ApiError> {
    let text = require_text(body.text)?;
    let account = authenticate(&state, &headers).await?;

    let input = VerifyInput { text };
    let report = state.verify.run(&account, &input).await?;
    Ok(Json(report))
}

async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let checks = state.orchestrator.health().await;
    let databases: HashMap<String, bool> = checks
        .into_iter()
        .map(|(db, healthy)| (db.to_string(), healthy))
        .collect();
    let healthy = databases.values().any(|&up| up);

    if !healthy {
        warn!("No bibliographic database is reachable");
    }

    Json(json!({
        "status": if healthy { "ok" } else { "degraded" },
        "databases": databases,
    }))
}

/// Build the application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/discover", post(discover_handler))
        .route("/verify", post(verify_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until ctrl-c
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let app = create_app(state);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| Error::Service(format!("Invalid listen address: {e}")))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Service(format!("Failed to bind {addr}: {e}")))?;

    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .map_err(|e| Error::Service(format!("Server error: {e}")))?;

    Ok(())
}
