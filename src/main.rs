use std::sync::Arc;

use anyhow::Context;

mod app;
mod auth;
mod config;
mod error;
mod posts;
mod state;
mod store;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::store::{MemStore, PgStore, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "curbfind=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);

    let store: Arc<dyn Store> = match config.database_url.as_deref() {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .context("connect to database")?;
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("run migrations")?;
            tracing::info!("using postgres store");
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store");
            Arc::new(MemStore::new())
        }
    };

    let state = AppState::from_parts(store, config);
    let app = app::build_app(state);
    app::serve(app).await
}
