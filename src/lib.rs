pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod oauth;
pub mod proxy;
pub mod rate_limit;
pub mod routes;
pub mod sync;
pub mod vault;
pub mod vendors;

use std::sync::Arc;

use config::Config;
use sea_orm::DatabaseConnection;
use vault::cipher::KeyCipher;
use vendors::ats::AtsApi;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub jwt: auth::jwt::JwtManager,
    pub config: Config,
    pub cipher: KeyCipher,
    pub http: reqwest::Client,
    /// Injected system-of-record client; tests substitute their own.
    pub ats: Arc<dyn AtsApi>,
}

impl AsRef<AppState> for AppState {
    fn as_ref(&self) -> &AppState {
        self
    }
}
