//! OpenAPI documentation aggregator.
//!
//! Collects all `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single OpenAPI 3.1 spec, served via Scalar UI at `/docs`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "harbor API",
        version = "0.1.0",
        description = "Self-service control plane for provisioning and querying logical databases across local and cloud Postgres clusters.",
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Server readiness"),
        (name = "Auth", description = "Account registration, login, and token verification"),
        (name = "Databases", description = "Database provisioning, registration, and catalog sync"),
        (name = "SQL", description = "SQL execution against registered or raw targets"),
        (name = "Usage", description = "Per-user usage statistics"),
    ),
    paths(
        // Health
        crate::api::health::health,
        // Auth
        crate::api::auth::login,
        crate::api::auth::register,
        crate::api::auth::verify_token,
        crate::api::auth::me,
        // Databases
        crate::api::databases::databases_list,
        crate::api::databases::databases_create,
        crate::api::databases::databases_delete,
        crate::api::databases::databases_connection,
        crate::api::databases::sync_databases,
        // SQL
        crate::api::query::execute_sql,
        crate::api::query::direct_sql,
        // Usage
        crate::api::usage::usage,
    ),
    components(schemas(
        // Shared
        crate::error::ErrorBody,
        // Health
        crate::api::health::HealthResponse,
        // Auth
        crate::api::auth::LoginRequest,
        crate::api::auth::RegisterRequest,
        crate::api::auth::AuthResponse,
        crate::users::User,
        // Databases
        crate::api::databases::CreateDatabaseRequest,
        crate::api::databases::MessageResponse,
        crate::api::databases::SyncResponse,
        crate::registry::Registration,
        crate::provisioning::ConnectionInfo,
        crate::provisioning::ConnectionCoordinates,
        // SQL
        crate::api::query::ExecuteSqlRequest,
        crate::api::query::ConnectionOverride,
        crate::api::query::ExecuteSqlResponse,
        crate::api::query::DirectSqlRequest,
        crate::api::query::DirectSqlResponse,
        crate::gateway::FieldInfo,
        // Usage
        crate::api::usage::UsageResponse,
        crate::api::usage::DatabaseUsage,
    ))
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
