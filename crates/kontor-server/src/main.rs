//! Kontor back-office platform - main server

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::Settings;
use kontor_api::{AppState, TokenService};
use kontor_db::{create_pool, DatabaseConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    let settings = Settings::load().context("Failed to load configuration")?;

    info!(
        "Starting Kontor back-office platform v{}",
        env!("CARGO_PKG_VERSION")
    );

    let state = initialize_services(&settings).await?;
    let app = create_app(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;

    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kontor=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

async fn initialize_services(settings: &Settings) -> Result<AppState> {
    info!("Connecting to PostgreSQL...");
    let db_config = DatabaseConfig {
        url: settings.database.url.clone(),
        max_connections: settings.database.max_connections,
        min_connections: 2,
        acquire_timeout_secs: 30,
        idle_timeout_secs: 600,
    };
    let db_pool = create_pool(&db_config).await?;
    info!("PostgreSQL connection established");

    kontor_db::apply_schema(&db_pool).await?;

    let token_service = TokenService::new(
        settings.jwt.secret.clone(),
        settings.jwt.issuer.clone(),
        settings.jwt.access_token_expiry_secs,
        settings.jwt.refresh_token_expiry_secs,
    );

    let state = AppState::new(db_pool, token_service);
    info!("All services initialized");
    Ok(state)
}

fn create_app(state: AppState) -> Router {
    kontor_api::create_router_with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
