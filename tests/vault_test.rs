mod common;

use axum::http::StatusCode;
use common::TestApp;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serial_test::serial;

use integration_service::vault;

const GH_KEY: &str = "abcdef0123456789abcdef0123456789";

async fn vault_row_count(app: &TestApp, user_id: &str, service: &str) -> u64 {
    entity::vault_entry::Entity::find()
        .filter(entity::vault_entry::Column::UserId.eq(user_id))
        .filter(entity::vault_entry::Column::ServiceName.eq(service))
        .count(&app.state.db)
        .await
        .unwrap()
}

// ─── Store ───────────────────────────────────────────────────────────────────

#[serial]
#[tokio::test]
async fn store_encrypts_and_never_echoes_the_key() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");

    let resp = app
        .post_json(
            "/api/vault/keys",
            &auth,
            serde_json::json!({
                "service_name": "hubspot",
                "api_key": "pat-na1-secret-token",
                "key_label": "Production",
            }),
        )
        .await;
    resp.assert_status(StatusCode::OK);
    assert!(!resp.text().contains("pat-na1-secret-token"));

    let row = entity::vault_entry::Entity::find()
        .filter(entity::vault_entry::Column::ServiceName.eq("hubspot"))
        .one(&app.state.db)
        .await
        .unwrap()
        .unwrap();
    // Ciphertext at rest, not the plaintext and not plain base64 of it.
    assert_ne!(row.encrypted_key, "pat-na1-secret-token");
    assert!(!row.encrypted_key.contains("pat-na1"));
    assert_eq!(
        app.state.cipher.decrypt(&row.encrypted_key).unwrap(),
        "pat-na1-secret-token"
    );
}

#[serial]
#[tokio::test]
async fn store_twice_supersedes_in_place() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");

    for key in ["first-key", "second-key"] {
        let resp = app
            .post_json(
                "/api/vault/keys",
                &auth,
                serde_json::json!({"service_name": "hubspot", "api_key": key}),
            )
            .await;
        resp.assert_status(StatusCode::OK);
    }

    assert_eq!(vault_row_count(&app, "user-1", "hubspot").await, 1);

    let retrieved = vault::retrieve(&app.state.db, &app.state.cipher, "user-1", "hubspot")
        .await
        .unwrap();
    assert_eq!(retrieved, "second-key");
}

#[serial]
#[tokio::test]
async fn store_rejects_empty_key_and_unknown_service() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");

    let resp = app
        .post_json(
            "/api/vault/keys",
            &auth,
            serde_json::json!({"service_name": "hubspot", "api_key": "  "}),
        )
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);

    let resp = app
        .post_json(
            "/api/vault/keys",
            &auth,
            serde_json::json!({"service_name": "salesforce", "api_key": "k"}),
        )
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let json: serde_json::Value = resp.json();
    assert_eq!(json["error"], "unsupported_service");
}

// ─── List / delete / retrieve ────────────────────────────────────────────────

#[serial]
#[tokio::test]
async fn list_exposes_metadata_only() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");

    app.post_json(
        "/api/vault/keys",
        &auth,
        serde_json::json!({"service_name": "greenhouse", "api_key": GH_KEY, "key_label": "Harvest"}),
    )
    .await
    .assert_status(StatusCode::OK);

    let resp = app.get("/api/vault/keys", &auth).await;
    resp.assert_status(StatusCode::OK);

    let json: serde_json::Value = resp.json();
    assert_eq!(json[0]["service_name"], "greenhouse");
    assert_eq!(json[0]["key_label"], "Harvest");
    assert!(!resp.text().contains(GH_KEY));
}

#[serial]
#[tokio::test]
async fn delete_is_soft_and_idempotent() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");

    app.post_json(
        "/api/vault/keys",
        &auth,
        serde_json::json!({"service_name": "hubspot", "api_key": "tok"}),
    )
    .await
    .assert_status(StatusCode::OK);

    for _ in 0..2 {
        let resp = app.delete("/api/vault/keys/hubspot", &auth).await;
        resp.assert_status(StatusCode::OK);
    }

    // Row survives for audit continuity, but retrieval misses.
    assert_eq!(vault_row_count(&app, "user-1", "hubspot").await, 1);
    let err = vault::retrieve(&app.state.db, &app.state.cipher, "user-1", "hubspot").await;
    assert!(matches!(
        err,
        Err(integration_service::error::AppError::KeyNotFound(_))
    ));

    let resp = app.get("/api/vault/keys", &auth).await;
    let json: serde_json::Value = resp.json();
    assert_eq!(json.as_array().unwrap().len(), 0);
}

#[serial]
#[tokio::test]
async fn superseding_a_deleted_entry_reactivates_it() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");

    app.post_json(
        "/api/vault/keys",
        &auth,
        serde_json::json!({"service_name": "hubspot", "api_key": "old"}),
    )
    .await
    .assert_status(StatusCode::OK);
    app.delete("/api/vault/keys/hubspot", &auth)
        .await
        .assert_status(StatusCode::OK);

    app.post_json(
        "/api/vault/keys",
        &auth,
        serde_json::json!({"service_name": "hubspot", "api_key": "new"}),
    )
    .await
    .assert_status(StatusCode::OK);

    let retrieved = vault::retrieve(&app.state.db, &app.state.cipher, "user-1", "hubspot")
        .await
        .unwrap();
    assert_eq!(retrieved, "new");
    assert_eq!(vault_row_count(&app, "user-1", "hubspot").await, 1);
}

#[serial]
#[tokio::test]
async fn entries_are_scoped_per_user() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");

    app.post_json(
        "/api/vault/keys",
        &auth,
        serde_json::json!({"service_name": "hubspot", "api_key": "tok"}),
    )
    .await
    .assert_status(StatusCode::OK);

    let err = vault::retrieve(&app.state.db, &app.state.cipher, "user-2", "hubspot").await;
    assert!(matches!(
        err,
        Err(integration_service::error::AppError::KeyNotFound(_))
    ));
}

// ─── Test probe ──────────────────────────────────────────────────────────────

#[serial]
#[tokio::test]
async fn probe_reports_validity_without_leaking_the_key() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");

    app.post_json(
        "/api/vault/keys",
        &auth,
        serde_json::json!({"service_name": "greenhouse", "api_key": GH_KEY}),
    )
    .await
    .assert_status(StatusCode::OK);

    let resp = app
        .post_json(
            "/api/vault/keys/greenhouse/test",
            &auth,
            serde_json::json!({}),
        )
        .await;
    resp.assert_status(StatusCode::OK);

    let json: serde_json::Value = resp.json();
    assert_eq!(json["valid"], true);
    assert!(!resp.text().contains(GH_KEY));
}

#[serial]
#[tokio::test]
async fn probe_flags_a_malformed_key() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");

    app.post_json(
        "/api/vault/keys",
        &auth,
        serde_json::json!({"service_name": "greenhouse", "api_key": "too short"}),
    )
    .await
    .assert_status(StatusCode::OK);

    let resp = app
        .post_json(
            "/api/vault/keys/greenhouse/test",
            &auth,
            serde_json::json!({}),
        )
        .await;
    resp.assert_status(StatusCode::OK);

    let json: serde_json::Value = resp.json();
    assert_eq!(json["valid"], false);
}

#[serial]
#[tokio::test]
async fn probe_without_stored_key_is_key_not_found() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");

    let resp = app
        .post_json(
            "/api/vault/keys/greenhouse/test",
            &auth,
            serde_json::json!({}),
        )
        .await;
    resp.assert_status(StatusCode::NOT_FOUND);
}

// ─── Audit completeness ──────────────────────────────────────────────────────

#[serial]
#[tokio::test]
async fn every_vault_operation_appends_exactly_one_event() {
    let app = TestApp::new().await;
    let auth = app.bearer_for("user-1");

    let mut expected = app.security_event_count().await;

    // store (success)
    app.post_json(
        "/api/vault/keys",
        &auth,
        serde_json::json!({"service_name": "greenhouse", "api_key": GH_KEY}),
    )
    .await
    .assert_status(StatusCode::OK);
    expected += 1;
    assert_eq!(app.security_event_count().await, expected);

    // store (failure: empty key) — still audited
    app.post_json(
        "/api/vault/keys",
        &auth,
        serde_json::json!({"service_name": "greenhouse", "api_key": ""}),
    )
    .await
    .assert_status(StatusCode::BAD_REQUEST);
    expected += 1;
    assert_eq!(app.security_event_count().await, expected);

    // test (success)
    app.post_json(
        "/api/vault/keys/greenhouse/test",
        &auth,
        serde_json::json!({}),
    )
    .await
    .assert_status(StatusCode::OK);
    expected += 1;
    assert_eq!(app.security_event_count().await, expected);

    // delete (success), then delete again (no-op) — both audited
    for _ in 0..2 {
        app.delete("/api/vault/keys/greenhouse", &auth)
            .await
            .assert_status(StatusCode::OK);
        expected += 1;
        assert_eq!(app.security_event_count().await, expected);
    }

    // test (failure: key gone) — still audited
    app.post_json(
        "/api/vault/keys/greenhouse/test",
        &auth,
        serde_json::json!({}),
    )
    .await
    .assert_status(StatusCode::NOT_FOUND);
    expected += 1;
    assert_eq!(app.security_event_count().await, expected);
}
