use std::sync::Arc;

use tracing_subscriber::EnvFilter;

mod app;
mod auth;
mod config;
mod contacts;
mod db;
mod envelope;
mod error;
mod extract;
mod state;
mod store;
mod users;

use crate::{config::AppConfig, state::AppState, store::PgStore};

/// `RUST_LOG` overrides the default filter; `LOG_FORMAT=json` switches to
/// one JSON object per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gymo=debug,axum=info,tower_http=info"));
    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.with_target(false).json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing();

    let config = AppConfig::from_env()?;
    let pool = db::connect(&config.db).await?;
    db::migrate(&pool).await?;

    let state = AppState::new(&config.jwt, Arc::new(PgStore::new(pool)));
    let app = app::build_app(state);
    app::serve(app, &config).await
}
