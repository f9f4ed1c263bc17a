//! harbor server binary.
//!
//! Startup order: config, registry pool + migrations, admin seed, engine
//! connectors, one advisory reconcile pass against the local engine, then
//! the HTTP listener.

mod api;
mod auth;
mod db;
mod engine;
mod error;
mod gateway;
mod provisioning;
mod registry;
mod router;
mod state;
mod users;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use harbor_core::config::load_dotenv;
use harbor_core::Config;

use crate::engine::{EngineSet, Origin};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    config.log_summary();

    let pool = db::init_pool(&config.registry).await?;
    users::seed_admin(&pool, &config.auth).await?;
    let admin_user_id = users::default_admin_id(&pool, &config.auth).await?;

    let engines = EngineSet::from_config(&config);

    // Advisory: pick up databases created outside the control plane. The
    // server still starts when the local engine is down.
    match registry::reconcile(&pool, &engines.local, Origin::Local, admin_user_id).await {
        Ok(outcome) => info!(
            "Startup sync: {} databases on local engine, {} newly registered",
            outcome.scanned.len(),
            outcome.inserted.len()
        ),
        Err(e) => warn!("Startup sync skipped: {}", e),
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState {
        pool,
        engines,
        config,
        admin_user_id,
    });

    let app = router::build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
