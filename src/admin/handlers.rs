use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::admin::AdminState;
use crate::http::response::iso8601;
use crate::security::{ClientKey, StoreError};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("invalid method {0:?}")]
    InvalidMethod(String),

    #[error("client must not be empty")]
    EmptyClient,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match self {
            AdminError::InvalidMethod(_) | AdminError::EmptyClient => StatusCode::BAD_REQUEST,
            AdminError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub environment: &'static str,
    pub tracked_windows: usize,
    pub limit: u32,
    pub window_secs: i64,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let limiter = state.gatekeeper.limiter();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        environment: state.gatekeeper.environment().as_str(),
        tracked_windows: limiter.tracked_windows(),
        limit: limiter.limit(),
        window_secs: limiter.window_secs(),
    })
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub client: String,
    pub method: String,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub key: String,
    pub reset_at: String,
}

pub async fn reset_rate_limit(
    State(state): State<AdminState>,
    Json(body): Json<ResetRequest>,
) -> Result<Json<ResetResponse>, AdminError> {
    let client = body.client.trim();
    if client.is_empty() {
        return Err(AdminError::EmptyClient);
    }
    let method = Method::from_bytes(body.method.to_ascii_uppercase().as_bytes())
        .map_err(|_| AdminError::InvalidMethod(body.method.clone()))?;

    let key = ClientKey::new(client, method);
    let window = state.gatekeeper.limiter().reset(key.clone())?;
    tracing::info!(key = %key, "Rate limit window reset by admin");

    Ok(Json(ResetResponse {
        key: key.to_string(),
        reset_at: iso8601(window.reset_at),
    }))
}
