use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use harbor_core::config::RegistryConfig;

/// Create the registry metadata pool and run migrations. Unlike the engine
/// sessions, this pool is long-lived: the registry is queried on every
/// authenticated request.
pub async fn init_pool(config: &RegistryConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url())
        .await?;
    info!("Registry store connected: {}:{}", config.host, config.port);

    sqlx::migrate!("../../migrations").run(&pool).await?;
    info!("Registry migrations applied");
    Ok(pool)
}
