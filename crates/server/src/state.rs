use sqlx::PgPool;
use uuid::Uuid;

use harbor_core::Config;

use crate::engine::EngineSet;

pub struct AppState {
    /// Pool for the registry metadata store (users + databases tables).
    pub pool: PgPool,
    pub engines: EngineSet,
    pub config: Config,
    /// Owner for registrations discovered by reconciliation.
    pub admin_user_id: Uuid,
}
