use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("Integration not connected")]
    NotConnected,

    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("No API key stored for service: {0}")]
    KeyNotFound(String),

    #[error("Unsupported service: {0}")]
    UnsupportedService(String),

    #[error("Vendor rate limit hit, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Upstream error ({status}): {body}")]
    UpstreamError { status: u16, body: String },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotAuthenticated => {
                (StatusCode::UNAUTHORIZED, "not_authenticated", self.to_string())
            }
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            AppError::NotConnected => {
                (StatusCode::NOT_FOUND, "not_connected", self.to_string())
            }
            AppError::ExchangeFailed(_) => {
                (StatusCode::BAD_GATEWAY, "exchange_failed", self.to_string())
            }
            AppError::KeyNotFound(_) => {
                (StatusCode::NOT_FOUND, "key_not_found", self.to_string())
            }
            AppError::UnsupportedService(_) => {
                (StatusCode::BAD_REQUEST, "unsupported_service", self.to_string())
            }
            AppError::RateLimited { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "rate_limited", self.to_string())
            }
            AppError::UpstreamError { status, .. } => {
                tracing::warn!("Upstream returned {status}");
                (StatusCode::BAD_GATEWAY, "upstream_error", self.to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
            ),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
            AppError::Jwt(_) => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "Invalid token".to_string(),
            ),
            AppError::HttpClient(e) => {
                tracing::error!("HTTP client error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "vendor_unreachable",
                    "External vendor unreachable".to_string(),
                )
            }
        };

        let mut body = json!({
            "error": error_type,
            "message": message,
        });

        // Rate-limit responses carry the vendor's retry-after both in the
        // body and as a standard header so callers can back off mechanically.
        if let AppError::RateLimited { retry_after_secs } = &self {
            body["retry_after_secs"] = json!(retry_after_secs);
            let mut resp = (status, axum::Json(body)).into_response();
            if let Ok(v) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                resp.headers_mut().insert(header::RETRY_AFTER, v);
            }
            return resp;
        }

        (status, axum::Json(body)).into_response()
    }
}
