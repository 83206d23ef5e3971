use axum::{
    routing::{get, post, put},
    Router,
};
use dotenvy::dotenv;
use std::env;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeFile;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod db;
mod error;
mod query;
mod shaper;
mod state;

use config::Config;
use query::TableRef;
use state::AppState;

#[tokio::main]
async fn main() {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Avaliacoes Backend...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return;
        }
    };

    let table = match TableRef::new(&config.db_schema, &config.db_table) {
        Ok(table) => table,
        Err(e) => {
            tracing::error!("Invalid table configuration: {}", e);
            return;
        }
    };

    let pool = match db::init_pool(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to build connection pool: {}", e);
            return;
        }
    };

    // The pool is lazy; probe once so connectivity problems show up in
    // the logs at startup instead of on the first request.
    match db::ping(&pool).await {
        Ok(()) => tracing::info!("Database connection established"),
        Err(e) => tracing::warn!("Database not reachable yet: {}", e),
    }

    let app_state = AppState {
        pool,
        table,
        environment: config.environment.clone(),
    };

    let app = Router::new()
        .route_service("/", ServeFile::new("static/dashboard.html"))
        .route("/health", get(commands::system::health_check))
        .route("/api/avaliacoes", get(commands::avaliacao::list_avaliacoes))
        .route(
            "/api/avaliacoes/:id",
            put(commands::avaliacao::update_avaliacao),
        )
        .route(
            "/api/avaliacoes/bulk-update",
            post(commands::avaliacao::bulk_update_avaliacoes),
        )
        .route("/api/fazendas", get(commands::avaliacao::list_fazendas))
        .route("/api/talhoes", get(commands::avaliacao::list_talhoes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state);

    let addr_str = format!("{}:{}", config.listen_host, config.listen_port);
    let addr = match addr_str.parse::<SocketAddr>() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid listen address {}: {}", addr_str, e);
            return;
        }
    };

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
