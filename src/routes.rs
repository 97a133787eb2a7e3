use std::time::Duration;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Rate limiters: per-IP sliding window
    // OAuth: 30 requests per 60 seconds (exchange is vendor-facing)
    let oauth_limiter = RateLimiter::new(30, Duration::from_secs(60));
    // Proxy: 120 requests per 60 seconds
    let proxy_limiter = RateLimiter::new(120, Duration::from_secs(60));

    // ATS connection lifecycle
    let oauth_routes = Router::new()
        .route("/authorize-url", get(handlers::oauth::authorize_url))
        .route("/exchange", post(handlers::oauth::exchange))
        .route("/status", get(handlers::oauth::status))
        .route("/connection", delete(handlers::oauth::disconnect))
        .route_layer(middleware::from_fn_with_state(
            oauth_limiter,
            rate_limit_middleware,
        ));

    // Credential vault (key material never leaves the server)
    let vault_routes = Router::new()
        .route(
            "/keys",
            post(handlers::vault::store_key).get(handlers::vault::list_keys),
        )
        .route("/keys/:service", delete(handlers::vault::delete_key))
        .route("/keys/:service/test", post(handlers::vault::test_key));

    // Secondary-CRM proxy
    let proxy_routes = Router::new()
        .route("/", post(handlers::proxy::forward))
        .route_layer(middleware::from_fn_with_state(
            proxy_limiter,
            rate_limit_middleware,
        ));

    // Local records + sync
    let record_routes = Router::new()
        .route(
            "/jobs",
            get(handlers::records::list_jobs).post(handlers::records::create_job),
        )
        .route("/jobs/remote", get(handlers::records::list_remote_jobs))
        .route("/candidates", post(handlers::records::create_candidate))
        .route("/sync/:entity", post(handlers::sync::run));

    // Admin (X-Admin-Key or Bearer with admin role)
    let admin_routes = Router::new()
        .route(
            "/security-events",
            get(handlers::admin::list_security_events),
        )
        .route("/stats", get(handlers::admin::stats))
        .route("/oauth/refresh-sweep", post(handlers::admin::refresh_sweep));

    Router::new()
        .nest("/api/oauth", oauth_routes)
        .nest("/api/vault", vault_routes)
        .nest("/api/proxy", proxy_routes)
        .nest("/api", record_routes)
        .nest("/admin", admin_routes)
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}
