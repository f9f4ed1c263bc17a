//! Short-lived sessions against the backing relational engines.
//!
//! Every operation opens a dedicated connection from `PgConnectOptions` and
//! closes it before returning, on success and on error alike. There is no
//! pooling across requests; isolation is traded for connection-setup cost.

use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection, Executor};

use harbor_core::config::{Config, EngineConfig};

use crate::error::ApiError;

// ── Origin tag ────────────────────────────────────────────────────

/// Which engine cluster a registration's database physically lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Local,
    Cloud,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Local => "local",
            Origin::Cloud => "cloud",
        }
    }

    pub fn parse(tag: &str) -> Option<Origin> {
        match tag {
            "local" => Some(Origin::Local),
            "cloud" => Some(Origin::Cloud),
            _ => None,
        }
    }
}

// ── Connector ─────────────────────────────────────────────────────

pub struct EngineConnector {
    cfg: EngineConfig,
}

/// Extract the engine's own message from a sqlx error where one exists,
/// falling back to the driver-level rendering.
pub fn engine_message(e: &sqlx::Error) -> String {
    e.as_database_error()
        .map(|db| db.message().to_string())
        .unwrap_or_else(|| e.to_string())
}

impl EngineConnector {
    pub fn new(cfg: EngineConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Open a session to one database on this engine.
    pub async fn open(&self, database: &str) -> Result<PgConnection, sqlx::Error> {
        PgConnectOptions::new()
            .host(&self.cfg.host)
            .port(self.cfg.port)
            .username(&self.cfg.username)
            .password(&self.cfg.password)
            .database(database)
            .connect()
            .await
    }

    async fn open_admin(&self) -> Result<PgConnection, ApiError> {
        self.open(&self.cfg.admin_database)
            .await
            .map_err(|e| ApiError::EngineFailed(engine_message(&e)))
    }

    /// List all non-template databases in the engine's catalog.
    pub async fn list_databases(&self) -> Result<Vec<String>, ApiError> {
        let mut conn = self.open_admin().await?;
        let names = sqlx::query_scalar::<_, String>(
            "SELECT datname FROM pg_database WHERE datistemplate = false ORDER BY datname",
        )
        .fetch_all(&mut conn)
        .await;
        conn.close().await.ok();
        names.map_err(|e| ApiError::EngineFailed(engine_message(&e)))
    }

    pub async fn database_exists(&self, name: &str) -> Result<bool, ApiError> {
        let mut conn = self.open_admin().await?;
        let found = sqlx::query_scalar::<_, i32>("SELECT 1 FROM pg_database WHERE datname = $1")
            .bind(name)
            .fetch_optional(&mut conn)
            .await;
        conn.close().await.ok();
        found
            .map(|f| f.is_some())
            .map_err(|e| ApiError::EngineFailed(engine_message(&e)))
    }

    /// Issue CREATE DATABASE. The name must already be validated against the
    /// identifier allow-list; it is interpolated because CREATE DATABASE
    /// does not accept bind parameters.
    pub async fn create_database(&self, name: &str) -> Result<(), ApiError> {
        let mut conn = self.open_admin().await?;
        let result = conn
            .execute(format!("CREATE DATABASE \"{}\"", name).as_str())
            .await;
        conn.close().await.ok();
        result
            .map(|_| ())
            .map_err(|e| ApiError::EngineFailed(engine_message(&e)))
    }

    /// Issue DROP DATABASE. Callers treat failure as non-fatal.
    pub async fn drop_database(&self, name: &str) -> Result<(), ApiError> {
        let mut conn = self.open_admin().await?;
        let result = conn
            .execute(format!("DROP DATABASE \"{}\"", name).as_str())
            .await;
        conn.close().await.ok();
        result
            .map(|_| ())
            .map_err(|e| ApiError::EngineFailed(engine_message(&e)))
    }
}

// ── Engine set ────────────────────────────────────────────────────

/// Both backing clusters, resolved once from config at startup.
pub struct EngineSet {
    pub local: EngineConnector,
    pub cloud: EngineConnector,
}

impl EngineSet {
    pub fn from_config(config: &Config) -> Self {
        Self {
            local: EngineConnector::new(config.local_engine.clone()),
            cloud: EngineConnector::new(config.cloud_engine.clone()),
        }
    }

    pub fn by_origin(&self, origin: Origin) -> &EngineConnector {
        match origin {
            Origin::Local => &self.local,
            Origin::Cloud => &self.cloud,
        }
    }

    /// Resolve the engine for a registration: by origin tag when it parses,
    /// otherwise by matching the registration's port against the cloud
    /// engine's known port.
    pub fn for_registration(&self, origin_tag: &str, port: u16) -> &EngineConnector {
        match Origin::parse(origin_tag) {
            Some(origin) => self.by_origin(origin),
            None if port == self.cloud.cfg.port => &self.cloud,
            None => &self.local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(port: u16) -> EngineConfig {
        EngineConfig {
            host: "localhost".to_string(),
            port,
            username: "postgres".to_string(),
            password: "".to_string(),
            admin_database: "postgres".to_string(),
        }
    }

    fn set() -> EngineSet {
        EngineSet {
            local: EngineConnector::new(engine(5432)),
            cloud: EngineConnector::new(engine(5433)),
        }
    }

    #[test]
    fn test_origin_tags() {
        assert_eq!(Origin::parse("local"), Some(Origin::Local));
        assert_eq!(Origin::parse("cloud"), Some(Origin::Cloud));
        assert_eq!(Origin::parse("unknown"), None);
        assert_eq!(Origin::Cloud.as_str(), "cloud");
    }

    #[test]
    fn test_for_registration_prefers_tag() {
        let engines = set();
        let conn = engines.for_registration("cloud", 5432);
        assert_eq!(conn.config().port, 5433);
    }

    #[test]
    fn test_for_registration_falls_back_to_port() {
        let engines = set();
        assert_eq!(engines.for_registration("", 5433).config().port, 5433);
        assert_eq!(engines.for_registration("", 5432).config().port, 5432);
    }
}
