mod common;

use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use common::TestApp;
use serial_test::serial;

/// Minimal stand-in for a vendor HTTP API, bound to an ephemeral local port.
async fn spawn_vendor_stub() -> String {
    let router = Router::new()
        .route(
            "/contacts",
            get(|| async { Json(serde_json::json!({"results": [{"id": "c-1"}]})) }),
        )
        .route(
            "/contacts",
            post(|Json(body): Json<serde_json::Value>| async move {
                Json(serde_json::json!({"created": body}))
            }),
        )
        .route(
            "/echo-auth",
            get(|headers: HeaderMap| async move {
                let auth = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let custom = headers
                    .get("x-custom")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Json(serde_json::json!({"auth": auth, "custom": custom}))
            }),
        )
        .route(
            "/limited",
            get(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, "7")],
                    "slow down",
                )
            }),
        )
        .route(
            "/boom",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "vendor exploded") }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn store_hubspot_key(app: &TestApp, auth: &str, key: &str) {
    app.post_json(
        "/api/vault/keys",
        auth,
        serde_json::json!({"service_name": "hubspot", "api_key": key}),
    )
    .await
    .assert_status(StatusCode::OK);
}

// ─── Forwarding ──────────────────────────────────────────────────────────────

#[serial]
#[tokio::test]
async fn forward_attaches_vendor_auth_and_returns_body() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");
    let base = spawn_vendor_stub().await;
    store_hubspot_key(&app, &auth, "pat-token").await;

    let resp = app
        .post_json(
            "/api/proxy",
            &auth,
            serde_json::json!({
                "service_name": "hubspot",
                "endpoint": format!("{base}/echo-auth"),
                "method": "GET",
            }),
        )
        .await;
    resp.assert_status(StatusCode::OK);

    let json: serde_json::Value = resp.json();
    assert_eq!(json["success"], true);
    assert_eq!(json["status"], 200);
    assert_eq!(json["data"]["auth"], "Bearer pat-token");
}

#[serial]
#[tokio::test]
async fn forward_passes_body_and_custom_headers_but_not_authorization() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");
    let base = spawn_vendor_stub().await;
    store_hubspot_key(&app, &auth, "pat-token").await;

    let resp = app
        .post_json(
            "/api/proxy",
            &auth,
            serde_json::json!({
                "service_name": "hubspot",
                "endpoint": format!("{base}/echo-auth"),
                "method": "GET",
                "headers": {
                    "X-Custom": "custom-value",
                    "Authorization": "Bearer attacker-token",
                },
            }),
        )
        .await;
    resp.assert_status(StatusCode::OK);

    let json: serde_json::Value = resp.json();
    // The vendor mapping owns the auth header; the caller's override is dropped.
    assert_eq!(json["data"]["auth"], "Bearer pat-token");
    assert_eq!(json["data"]["custom"], "custom-value");
}

#[serial]
#[tokio::test]
async fn forward_post_round_trips_json() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");
    let base = spawn_vendor_stub().await;
    store_hubspot_key(&app, &auth, "pat-token").await;

    let resp = app
        .post_json(
            "/api/proxy",
            &auth,
            serde_json::json!({
                "service_name": "hubspot",
                "endpoint": format!("{base}/contacts"),
                "method": "POST",
                "body": {"email": "a@b.c"},
            }),
        )
        .await;
    resp.assert_status(StatusCode::OK);

    let json: serde_json::Value = resp.json();
    assert_eq!(json["data"]["created"]["email"], "a@b.c");
}

// ─── Error mapping ───────────────────────────────────────────────────────────

#[serial]
#[tokio::test]
async fn vendor_429_maps_to_typed_rate_limited() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");
    let base = spawn_vendor_stub().await;
    store_hubspot_key(&app, &auth, "pat-token").await;

    let resp = app
        .post_json(
            "/api/proxy",
            &auth,
            serde_json::json!({
                "service_name": "hubspot",
                "endpoint": format!("{base}/limited"),
                "method": "GET",
            }),
        )
        .await;
    resp.assert_status(StatusCode::TOO_MANY_REQUESTS);

    let json: serde_json::Value = resp.json();
    assert_eq!(json["error"], "rate_limited");
    // The retry-after always rides along, structured.
    assert_eq!(json["retry_after_secs"], 7);
}

#[serial]
#[tokio::test]
async fn vendor_5xx_maps_to_upstream_error() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");
    let base = spawn_vendor_stub().await;
    store_hubspot_key(&app, &auth, "pat-token").await;

    let resp = app
        .post_json(
            "/api/proxy",
            &auth,
            serde_json::json!({
                "service_name": "hubspot",
                "endpoint": format!("{base}/boom"),
                "method": "GET",
            }),
        )
        .await;
    resp.assert_status(StatusCode::BAD_GATEWAY);

    let json: serde_json::Value = resp.json();
    assert_eq!(json["error"], "upstream_error");
}

#[serial]
#[tokio::test]
async fn forward_without_stored_key_is_key_not_found() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");
    let base = spawn_vendor_stub().await;

    let resp = app
        .post_json(
            "/api/proxy",
            &auth,
            serde_json::json!({
                "service_name": "hubspot",
                "endpoint": format!("{base}/contacts"),
                "method": "GET",
            }),
        )
        .await;
    resp.assert_status(StatusCode::NOT_FOUND);

    let json: serde_json::Value = resp.json();
    assert_eq!(json["error"], "key_not_found");
}

#[serial]
#[tokio::test]
async fn forward_rejects_unknown_method_and_service() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");
    let base = spawn_vendor_stub().await;
    store_hubspot_key(&app, &auth, "pat-token").await;

    let resp = app
        .post_json(
            "/api/proxy",
            &auth,
            serde_json::json!({
                "service_name": "hubspot",
                "endpoint": format!("{base}/contacts"),
                "method": "PATCH",
            }),
        )
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);

    let resp = app
        .post_json(
            "/api/proxy",
            &auth,
            serde_json::json!({
                "service_name": "pipedrive",
                "endpoint": format!("{base}/contacts"),
                "method": "GET",
            }),
        )
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
}

// ─── Auditing ────────────────────────────────────────────────────────────────

#[serial]
#[tokio::test]
async fn every_proxy_call_is_audited_with_query_stripped() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");
    let base = spawn_vendor_stub().await;
    store_hubspot_key(&app, &auth, "pat-token").await;

    let before = app.security_event_count().await;

    app.post_json(
        "/api/proxy",
        &auth,
        serde_json::json!({
            "service_name": "hubspot",
            "endpoint": format!("{base}/contacts?hapikey=super-secret&email=pii@example.com"),
            "method": "GET",
        }),
    )
    .await
    .assert_status(StatusCode::OK);

    // One event for the request itself, one for the key retrieval it caused.
    assert_eq!(app.security_event_count().await, before + 2);

    let events = integration_service::audit::list(&app.state.db, 2, 0)
        .await
        .unwrap();

    let retrieval = events
        .iter()
        .find(|e| e.event_type == "key_retrieved")
        .expect("key retrieval event");
    assert!(retrieval.event_details.contains("hubspot"));
    assert!(!retrieval.event_details.contains("pat-token"));

    let request = events
        .iter()
        .find(|e| e.event_type == "api_request")
        .expect("api request event");
    assert!(request.event_details.contains("/contacts"));
    assert!(!request.event_details.contains("super-secret"));
    assert!(!request.event_details.contains("pii@example.com"));
}

#[serial]
#[tokio::test]
async fn failed_proxy_calls_are_audited_too() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");
    let base = spawn_vendor_stub().await;

    let before = app.security_event_count().await;

    // Key missing: the call never reaches the vendor, but the attempt is logged.
    app.post_json(
        "/api/proxy",
        &auth,
        serde_json::json!({
            "service_name": "hubspot",
            "endpoint": format!("{base}/contacts"),
            "method": "GET",
        }),
    )
    .await
    .assert_status(StatusCode::NOT_FOUND);

    // Exactly the request event: no key was retrieved, so none is claimed.
    assert_eq!(app.security_event_count().await, before + 1);
    let events = integration_service::audit::list(&app.state.db, 1, 0)
        .await
        .unwrap();
    assert_eq!(events[0].event_type, "api_request");
}
