// =============================================================================
// Bearer Token Authentication — Axum Extractor
// =============================================================================
//
// Validates `Authorization: Bearer <token>` against the admin token held in
// `AppState` (loaded from `ORACLE_ADMIN_TOKEN` at startup). Comparison is
// constant time.
//
//   async fn handler(_auth: AuthBearer, ...) { ... }
//
// A missing, malformed or wrong token short-circuits with 403 before the
// handler body runs. With no token configured every protected route is 403.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::app_state::AppState;

/// Compare two byte slices in constant time for equal lengths.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Yields the presented token once it has been validated.
pub struct AuthBearer(pub String);

/// Rejection type returned when authentication fails.
pub struct AuthRejection {
    status: StatusCode,
    message: &'static str,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, axum::Json(body)).into_response()
    }
}

fn reject(message: &'static str) -> AuthRejection {
    AuthRejection {
        status: StatusCode::FORBIDDEN,
        message,
    }
}

impl FromRequestParts<Arc<AppState>> for AuthBearer {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_token.as_deref() else {
            warn!("ORACLE_ADMIN_TOKEN is not set, rejecting authenticated request");
            return Err(reject("Server authentication not configured"));
        };

        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        let Some(token) = token else {
            warn!("Missing or malformed Authorization header");
            return Err(reject("Missing or invalid authorization token"));
        };

        if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
            warn!("Invalid admin token presented");
            return Err(reject("Invalid authorization token"));
        }

        Ok(AuthBearer(token.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    use crate::engine::PredictionEngine;
    use crate::runtime_config::EngineConfig;

    fn state(token: Option<&str>) -> Arc<AppState> {
        Arc::new(AppState::new(
            EngineConfig::default(),
            None,
            PredictionEngine::default(),
            token.map(str::to_string),
        ))
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/decisions");
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    async fn extract(token: Option<&str>, authorization: Option<&str>) -> bool {
        let mut parts = parts(authorization);
        AuthBearer::from_request_parts(&mut parts, &state(token))
            .await
            .is_ok()
    }

    #[test]
    fn compare_requires_equal_length_and_bytes() {
        assert!(constant_time_eq(b"oracle", b"oracle"));
        assert!(!constant_time_eq(b"oracle", b"oraclf"));
        assert!(!constant_time_eq(b"oracle", b"oracle-admin"));
    }

    #[tokio::test]
    async fn matching_bearer_token_is_accepted() {
        assert!(extract(Some("s3cret"), Some("Bearer s3cret")).await);
    }

    #[tokio::test]
    async fn wrong_or_malformed_token_is_rejected() {
        assert!(!extract(Some("s3cret"), Some("Bearer nope")).await);
        assert!(!extract(Some("s3cret"), Some("s3cret")).await);
        assert!(!extract(Some("s3cret"), None).await);
    }

    #[tokio::test]
    async fn unconfigured_server_rejects_everything() {
        assert!(!extract(None, Some("Bearer anything")).await);
    }
}
