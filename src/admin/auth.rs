use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::admin::AdminState;

pub async fn admin_auth_middleware(
    State(state): State<AdminState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) if token_matches(token, &state.api_key) => Ok(next.run(request).await),
        _ => {
            tracing::warn!(path = %request.uri().path(), "Rejected admin request");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Compares in time independent of where the first mismatch is.
fn token_matches(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::admin::setup_admin_router;
    use crate::config::{AdminConfig, GatekeeperConfig};
    use crate::security::Gatekeeper;
    use tower::ServiceExt;

    fn router() -> axum::Router {
        let gatekeeper = Arc::new(Gatekeeper::from_config(&GatekeeperConfig::default()).unwrap());
        let config = AdminConfig {
            api_key: "s3cret-admin-key".into(),
            ..AdminConfig::default()
        };
        setup_admin_router(gatekeeper, &config)
    }

    async fn status_with(authorization: Option<&str>) -> StatusCode {
        let mut builder = Request::builder().uri("/admin/status");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        router()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[test]
    fn test_token_comparison() {
        assert!(token_matches("s3cret-admin-key", "s3cret-admin-key"));
        assert!(!token_matches("s3cret-admin-kez", "s3cret-admin-key"));
        assert!(!token_matches("s3cret", "s3cret-admin-key"));
        assert!(!token_matches("", "s3cret-admin-key"));
    }

    #[tokio::test]
    async fn test_admin_routes_require_exact_bearer_token() {
        assert_eq!(status_with(None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_with(Some("Bearer s3cret-admin-kez")).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_with(Some("Basic s3cret-admin-key")).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_with(Some("Bearer s3cret-admin-key")).await,
            StatusCode::OK
        );
    }
}
