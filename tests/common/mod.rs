#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::Engine;
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::Database;
use tokio::sync::Mutex;
use tower::ServiceExt;

use integration_service::auth::jwt::JwtManager;
use integration_service::config::Config;
use integration_service::error::AppError;
use integration_service::routes::create_router;
use integration_service::vault::cipher::KeyCipher;
use integration_service::vendors::ats::{
    AtsApi, CandidateDraft, JobDraft, RemoteCandidate, RemoteJob, TokenGrant, ATS_INTEGRATION,
};
use integration_service::AppState;

pub const ADMIN_KEY: &str = "test-admin-key-12345";

// ─── MockAts ─────────────────────────────────────────────────────────────────

/// In-memory stand-in for the external system of record.
///
/// Trigger words in payloads drive failure modes:
/// - a title/name containing "FAIL" → HTTP 500 from the vendor
/// - a title/name containing "RATE" → one 429 (retry-after 0), then success
/// - code "bad-code" / refresh token "rt-expired" → vendor refusal
pub struct MockAts {
    pub remote_jobs: Mutex<Vec<RemoteJob>>,
    pub remote_candidates: Mutex<Vec<RemoteCandidate>>,
    rate_limited_once: Mutex<HashSet<String>>,
    next_id: AtomicU64,
}

impl MockAts {
    pub fn new() -> Self {
        Self {
            remote_jobs: Mutex::new(Vec::new()),
            remote_candidates: Mutex::new(Vec::new()),
            rate_limited_once: Mutex::new(HashSet::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn seed_remote_job(&self, id: &str, title: &str) {
        self.remote_jobs.lock().await.push(RemoteJob {
            id: id.to_string(),
            title: title.to_string(),
            status: "open".to_string(),
        });
    }

    pub async fn seed_remote_candidate(&self, id: &str, name: &str) {
        self.remote_candidates.lock().await.push(RemoteCandidate {
            id: id.to_string(),
            name: name.to_string(),
            email: None,
            phone: None,
        });
    }

    fn grant(&self, suffix: &str) -> TokenGrant {
        TokenGrant {
            access_token: format!("at-{suffix}"),
            refresh_token: format!("rt-{suffix}"),
            expires_in: 3600,
            api_domain: Some("https://recruit.mock".to_string()),
            accounts_server: Some("https://accounts.mock".to_string()),
            scope: "mock.modules.ALL".to_string(),
        }
    }

    async fn check_triggers(&self, text: &str) -> Result<(), AppError> {
        if text.contains("FAIL") {
            return Err(AppError::UpstreamError {
                status: 500,
                body: "mock vendor error".to_string(),
            });
        }
        if text.contains("RATE") {
            let mut seen = self.rate_limited_once.lock().await;
            if seen.insert(text.to_string()) {
                return Err(AppError::RateLimited { retry_after_secs: 0 });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AtsApi for MockAts {
    fn integration_id(&self) -> &'static str {
        ATS_INTEGRATION
    }

    async fn exchange_code(&self, code: &str, _redirect_uri: &str) -> Result<TokenGrant, AppError> {
        if code == "bad-code" {
            return Err(AppError::ExchangeFailed("invalid_code".to_string()));
        }
        Ok(self.grant(code))
    }

    async fn refresh_grant(&self, refresh_token: &str) -> Result<TokenGrant, AppError> {
        if refresh_token == "rt-expired" {
            return Err(AppError::ExchangeFailed("invalid_grant".to_string()));
        }
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut grant = self.grant(&format!("refreshed-{n}"));
        // The mock does not rotate refresh tokens.
        grant.refresh_token = String::new();
        Ok(grant)
    }

    async fn create_job(&self, _access_token: &str, draft: &JobDraft) -> Result<String, AppError> {
        self.check_triggers(&draft.title).await?;
        let id = format!("mock-job-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.remote_jobs.lock().await.push(RemoteJob {
            id: id.clone(),
            title: draft.title.clone(),
            status: draft.status.clone(),
        });
        Ok(id)
    }

    async fn list_jobs(&self, _access_token: &str) -> Result<Vec<RemoteJob>, AppError> {
        Ok(self.remote_jobs.lock().await.clone())
    }

    async fn create_candidate(
        &self,
        _access_token: &str,
        draft: &CandidateDraft,
    ) -> Result<String, AppError> {
        self.check_triggers(&draft.name).await?;
        let id = format!("mock-cand-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.remote_candidates.lock().await.push(RemoteCandidate {
            id: id.clone(),
            name: draft.name.clone(),
            email: draft.email.clone(),
            phone: draft.phone.clone(),
        });
        Ok(id)
    }

    async fn list_candidates(&self, _access_token: &str) -> Result<Vec<RemoteCandidate>, AppError> {
        Ok(self.remote_candidates.lock().await.clone())
    }
}

// ─── TestResponse ────────────────────────────────────────────────────────────

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: Vec<u8>,
}

impl TestResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes).to_string()
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body_bytes).unwrap_or_else(|e| {
            panic!(
                "Failed to deserialize response as {}: {e}\nBody: {}",
                std::any::type_name::<T>(),
                self.text()
            )
        })
    }

    pub fn assert_status(&self, expected: StatusCode) {
        assert_eq!(
            self.status, expected,
            "Expected status {expected}, got {}. Body: {}",
            self.status,
            self.text()
        );
    }
}

// ─── TestApp ─────────────────────────────────────────────────────────────────

pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub mock: Arc<MockAts>,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = Config {
            database_url: "sqlite::memory:".to_string(),
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret-test-secret-test-secret!".to_string(),
            jwt_issuer: "integration-service-test".to_string(),
            admin_api_key: ADMIN_KEY.to_string(),
            vault_master_key: base64::engine::general_purpose::STANDARD.encode([42u8; 32]),
            ats_client_id: Some("1000.TEST_CLIENT".to_string()),
            ats_client_secret: "test-client-secret".to_string(),
            ats_redirect_uri: "http://localhost:3000/oauth/callback".to_string(),
            ats_accounts_base: "https://accounts.mock".to_string(),
            ats_api_base: "https://recruit.mock/recruit/v2".to_string(),
            ats_scopes: "mock.modules.ALL".to_string(),
            token_refresh_window_secs: 600,
            cors_allowed_origins: "http://localhost:5173".to_string(),
        };

        let db = Database::connect(&config.database_url)
            .await
            .expect("Failed to connect to in-memory SQLite");

        migration::Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let jwt = JwtManager::new(&config).expect("Failed to init JwtManager");
        let cipher =
            KeyCipher::from_master_key(&config.vault_master_key).expect("Failed to init cipher");
        let mock = Arc::new(MockAts::new());

        let state = AppState {
            db,
            jwt,
            config,
            cipher,
            http: reqwest::Client::new(),
            ats: mock.clone(),
        };

        let router = create_router(state.clone());

        Self {
            router,
            state,
            mock,
        }
    }

    pub async fn request(&self, req: Request<Body>) -> TestResponse {
        let resp = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("oneshot failed");

        let status = resp.status();
        let body_bytes = resp
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes()
            .to_vec();

        TestResponse { status, body_bytes }
    }

    // ── Session helpers ──────────────────────────────────────────────────

    pub fn bearer_for(&self, user_id: &str) -> String {
        let token = self
            .state
            .jwt
            .issue_session_token(user_id, "user", 3600)
            .expect("failed to issue session token");
        format!("Bearer {token}")
    }

    pub fn admin_bearer_for(&self, user_id: &str) -> String {
        let token = self
            .state
            .jwt
            .issue_session_token(user_id, "admin", 3600)
            .expect("failed to issue session token");
        format!("Bearer {token}")
    }

    pub async fn get(&self, uri: &str, auth: &str) -> TestResponse {
        let req = Request::builder()
            .method("GET")
            .uri(uri)
            .header("Authorization", auth)
            .body(Body::empty())
            .unwrap();
        self.request(req).await
    }

    pub async fn post_json(&self, uri: &str, auth: &str, body: serde_json::Value) -> TestResponse {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .header("Authorization", auth)
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        self.request(req).await
    }

    pub async fn delete(&self, uri: &str, auth: &str) -> TestResponse {
        let req = Request::builder()
            .method("DELETE")
            .uri(uri)
            .header("Authorization", auth)
            .body(Body::empty())
            .unwrap();
        self.request(req).await
    }

    // ── Domain helpers ───────────────────────────────────────────────────

    pub async fn connect_user(&self, user_id: &str) {
        let auth = self.bearer_for(user_id);
        let resp = self
            .post_json(
                "/api/oauth/exchange",
                &auth,
                serde_json::json!({"code": "good-code"}),
            )
            .await;
        resp.assert_status(StatusCode::OK);
    }

    pub async fn create_local_job(&self, user_id: &str, title: &str) -> String {
        let auth = self.bearer_for(user_id);
        let resp = self
            .post_json("/api/jobs", &auth, serde_json::json!({"title": title}))
            .await;
        resp.assert_status(StatusCode::OK);
        let json: serde_json::Value = resp.json();
        json["id"].as_str().unwrap().to_string()
    }

    pub async fn security_event_count(&self) -> u64 {
        integration_service::audit::count(&self.state.db)
            .await
            .expect("failed to count security events")
    }
}
