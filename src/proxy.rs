use std::collections::HashMap;

use reqwest::Method;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

use crate::audit::{self, SecurityEventType};
use crate::auth::middleware::ClientMeta;
use crate::error::AppError;
use crate::vault::{self, cipher::KeyCipher};
use crate::vendors::CrmVendor;

/// The single contract every secondary-CRM call goes through.
#[derive(Debug, Deserialize)]
pub struct ForwardRequest {
    pub service_name: String,
    /// Absolute URL at the vendor.
    pub endpoint: String,
    pub method: String,
    pub body: Option<serde_json::Value>,
    pub headers: Option<HashMap<String, String>>,
}

#[derive(Debug, Serialize)]
pub struct ForwardResponse {
    pub success: bool,
    pub status: u16,
    pub data: serde_json::Value,
}

/// Endpoint with query parameters stripped, safe for the audit log. Query
/// strings routinely carry credentials and PII; the path does not.
pub fn audit_endpoint(endpoint: &str) -> String {
    match reqwest::Url::parse(endpoint) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => endpoint.to_string(),
    }
}

fn parse_method(method: &str) -> Result<Method, AppError> {
    match method.to_ascii_uppercase().as_str() {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "DELETE" => Ok(Method::DELETE),
        other => Err(AppError::BadRequest(format!(
            "method {other} not allowed through the proxy"
        ))),
    }
}

/// Load the vault entry, attach the vendor auth header, forward, reshape.
/// Retry policy belongs to the caller: a vendor 429 comes back as a typed
/// `RateLimited` carrying the retry-after, never as an internal retry loop.
pub async fn forward(
    db: &DatabaseConnection,
    key_cipher: &KeyCipher,
    http: &reqwest::Client,
    user_id: &str,
    client: &ClientMeta,
    req: &ForwardRequest,
) -> Result<ForwardResponse, AppError> {
    let vendor = CrmVendor::from_service(&req.service_name)?;
    let method = parse_method(&req.method)?;

    let url = reqwest::Url::parse(&req.endpoint)
        .map_err(|_| AppError::BadRequest("endpoint must be an absolute URL".to_string()))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(AppError::BadRequest("endpoint must be http(s)".to_string()));
    }

    let api_key = vault::retrieve(db, key_cipher, user_id, &req.service_name).await?;
    audit::record(
        db,
        user_id,
        SecurityEventType::KeyRetrieved,
        serde_json::json!({
            "service_name": req.service_name,
            "purpose": "proxy_forward",
        }),
        client,
    )
    .await;
    let mut headers = vendor.auth_headers(&api_key)?;

    if let Some(extra) = &req.headers {
        for (name, value) in extra {
            // The vendor mapping owns Authorization; callers cannot override it.
            if name.eq_ignore_ascii_case("authorization") {
                continue;
            }
            let name: reqwest::header::HeaderName = name
                .parse()
                .map_err(|_| AppError::BadRequest(format!("invalid header name: {name}")))?;
            let value = reqwest::header::HeaderValue::from_str(value)
                .map_err(|_| AppError::BadRequest("invalid header value".to_string()))?;
            headers.insert(name, value);
        }
    }

    let mut builder = http.request(method, url).headers(headers);
    if let Some(body) = &req.body {
        builder = builder.json(body);
    }

    let resp = builder.send().await?;
    let status = resp.status();

    if status.as_u16() == 429 {
        let retry_after_secs = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);
        return Err(AppError::RateLimited { retry_after_secs });
    }

    let body_text = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        return Err(AppError::UpstreamError {
            status: status.as_u16(),
            body: body_text,
        });
    }

    // Vendor body passed through verbatim; non-JSON bodies ride as a string.
    let data = serde_json::from_str(&body_text)
        .unwrap_or_else(|_| serde_json::Value::String(body_text));

    Ok(ForwardResponse {
        success: true,
        status: status.as_u16(),
        data,
    })
}
