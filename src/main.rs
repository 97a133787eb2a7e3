use std::net::SocketAddr;
use std::sync::Arc;

use migration::MigratorTrait;

use integration_service::config::Config;
use integration_service::vendors::ats::RecruitClient;
use integration_service::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "integration_service=debug,tower_http=debug".into()),
        )
        .init();

    // Load config
    let config = Config::from_env().expect("Failed to load configuration");

    // Connect to database
    let db = sea_orm::Database::connect(&config.database_url).await?;
    tracing::info!("Connected to database");

    // Run migrations
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Migrations applied");

    // Build app state
    let jwt = integration_service::auth::jwt::JwtManager::new(&config)?;
    let cipher = integration_service::vault::cipher::KeyCipher::from_master_key(
        &config.vault_master_key,
    )?;
    let http = reqwest::Client::new();
    let ats = Arc::new(RecruitClient::new(&config, http.clone()));

    let state = AppState {
        db,
        jwt,
        config: config.clone(),
        cipher,
        http,
        ats,
    };

    // Build router
    let app = integration_service::routes::create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .expect("Invalid server address");

    tracing::info!("Starting server on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
