//! Axum middleware running the gatekeeper in front of the application.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::http::request::{RequestContext, RequestId, X_REQUEST_ID};
use crate::http::response::{decorate_admitted, denial_response};
use crate::security::decision::SecurityDecision;
use crate::security::gatekeeper::Gatekeeper;

/// Install with `axum::middleware::from_fn_with_state(gatekeeper, gatekeeper_middleware)`.
pub async fn gatekeeper_middleware(
    State(gatekeeper): State<Arc<Gatekeeper>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let request_id = RequestId::new();

    // Scope is decided on the canonical path, so `/assets/../.env` is inspected.
    let decision = {
        let ctx = RequestContext::from_request(request_id.clone(), &request);
        gatekeeper
            .in_scope(&ctx.canonical_path)
            .then(|| gatekeeper.evaluate(&ctx))
    };
    let Some(decision) = decision else {
        return next.run(request).await;
    };

    let quota = match decision {
        SecurityDecision::Admit { quota } => quota,
        denied => return denial_response(&denied, &request_id, gatekeeper.now()),
    };

    // Overwrites any client-supplied value.
    request
        .headers_mut()
        .insert(X_REQUEST_ID, request_id.header_value());
    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).await;

    let elapsed = (!gatekeeper.environment().is_production()).then(|| start.elapsed());
    decorate_admitted(response.headers_mut(), &request_id, quota.as_ref(), elapsed);

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatekeeperConfig;
    use crate::http::request::RequestIdExt;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn app(config: &GatekeeperConfig) -> Router {
        let gatekeeper = Arc::new(Gatekeeper::from_config(config).unwrap());
        Router::new()
            .route(
                "/{*path}",
                get(|request: Request<Body>| async move {
                    request
                        .request_id()
                        .map(|id| id.to_string())
                        .unwrap_or_default()
                }),
            )
            .layer(middleware::from_fn_with_state(gatekeeper, gatekeeper_middleware))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("user-agent", "Mozilla/5.0")
            .header("x-forwarded-for", "1.2.3.4")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_admitted_request_sees_request_id() {
        let response = app(&GatekeeperConfig::default())
            .oneshot(get_request("/dashboard"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let header_id = response.headers()[X_REQUEST_ID].to_str().unwrap().to_string();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(body, header_id.as_bytes());
    }

    #[tokio::test]
    async fn test_excluded_path_skips_checks() {
        let response = app(&GatekeeperConfig::default())
            .oneshot(get_request("/assets/app.js?q=%3Cscript%3E"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(X_REQUEST_ID).is_none());
    }

    #[tokio::test]
    async fn test_traversal_out_of_excluded_prefix_is_inspected() {
        let response = app(&GatekeeperConfig::default())
            .oneshot(get_request("/assets/../.env"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get(X_REQUEST_ID).is_some());
    }

    #[tokio::test]
    async fn test_denied_request_never_reaches_handler() {
        let response = app(&GatekeeperConfig::default())
            .oneshot(get_request("/wp-admin/setup.php"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Access denied");
    }
}
