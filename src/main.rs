use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

mod ads;
mod app;
mod auth;
mod config;
mod db;
mod error;
#[cfg(test)]
mod fake;
mod info;
mod state;
mod users;
mod workers;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.env.default_filter()));
    if config.env.json_logs() {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(env = ?config.env, "starting handyman api");

    let state = AppState::init(&config).await?;
    sqlx::migrate!("./migrations").run(&state.db).await?;

    let app = app::build_app(state);
    app::serve(app, addr).await
}
