//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the Axum router: gatekeeper, security headers, timeout, tracing
//! - Forward admitted requests to the configured upstream application
//! - Serve until the shutdown broadcast fires

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        HeaderName, HeaderValue, Request, StatusCode, Uri, Version,
    },
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{set_header::SetResponseHeaderLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{GatekeeperConfig, SecurityHeadersConfig};
use crate::http::request::RequestIdExt;
use crate::observability::metrics;
use crate::security::{gatekeeper_middleware, Gatekeeper, GatekeeperError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Gatekeeper(#[from] GatekeeperError),

    #[error("invalid upstream address {0:?}")]
    Upstream(String),
}

/// Application state injected into the proxy handler.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
    pub upstream: Authority,
}

/// Reverse proxy with the gatekeeper in front of the upstream.
pub struct HttpServer {
    router: Router,
    gatekeeper: Arc<Gatekeeper>,
}

impl HttpServer {
    pub fn new(config: &GatekeeperConfig) -> Result<Self, ServerError> {
        let gatekeeper = Arc::new(Gatekeeper::from_config(config)?);
        Self::with_gatekeeper(config, gatekeeper)
    }

    /// Build around an existing gatekeeper, e.g. one sharing a window store.
    pub fn with_gatekeeper(
        config: &GatekeeperConfig,
        gatekeeper: Arc<Gatekeeper>,
    ) -> Result<Self, ServerError> {
        let upstream = Authority::from_str(&config.upstream.address)
            .map_err(|_| ServerError::Upstream(config.upstream.address.clone()))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let state = AppState { client, upstream };

        let router = Self::build_router(config, state, gatekeeper.clone());
        Ok(Self { router, gatekeeper })
    }

    #[allow(deprecated)]
    fn build_router(config: &GatekeeperConfig, state: AppState, gatekeeper: Arc<Gatekeeper>) -> Router {
        let app = Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state);

        protect(app, gatekeeper, &config.security_headers)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
    }

    pub fn gatekeeper(&self) -> Arc<Gatekeeper> {
        self.gatekeeper.clone()
    }

    /// The assembled router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Put the gatekeeper and the static security headers in front of `router`.
///
/// Security headers sit outside the gatekeeper, so denials carry them too.
/// Headers the application already set are left alone.
pub fn protect(router: Router, gatekeeper: Arc<Gatekeeper>, headers: &SecurityHeadersConfig) -> Router {
    let mut router = router.layer(middleware::from_fn_with_state(gatekeeper, gatekeeper_middleware));

    if !headers.enabled {
        return router;
    }

    for (name, value) in &headers.values {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                router = router.layer(SetResponseHeaderLayer::if_not_present(name, value));
            }
            _ => tracing::warn!(header = %name, "Skipping invalid security header"),
        }
    }
    router
}

/// Forward an admitted request to the upstream application.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request
        .request_id()
        .map(|id| id.to_string())
        .unwrap_or_default();

    let (mut parts, body) = request.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.upstream.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    // The upstream connection is HTTP/1.1 regardless of the client's protocol.
    parts.version = Version::HTTP_11;
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build upstream URI");
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        method = %parts.method,
        uri = %parts.uri,
        "Forwarding request"
    );

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            metrics::record_upstream(response.status().as_u16(), start);
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            metrics::record_upstream(StatusCode::BAD_GATEWAY.as_u16(), start);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
