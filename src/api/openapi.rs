//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{audit, auth, health, library, records, users};

/// Registers the bearer scheme referenced by `security(("bearer_auth" = []))`
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
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

#[derive(OpenApi)]
#[openapi(
    info(
        title = "EduSys API",
        version = "1.0.0",
        description = "School management back office REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "EduSys Team", email = "dev@edusys.com")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&BearerAuth),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::login,
        auth::me,
        auth::permissions,
        // Users
        users::list_users,
        users::create_user,
        users::set_user_active,
        // Records
        records::list_records,
        records::get_record,
        records::create_record,
        records::update_record,
        records::delete_record,
        audit::list_audit_logs,
        // Library
        library::list_books,
        library::add_book,
        library::increase_copies,
        library::decrease_copies,
        library::delete_book,
        library::availability,
        library::active_borrows,
        library::issue_book,
        library::return_book,
        library::list_fines,
        library::pay_fine,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth::LoginRequest,
            crate::services::auth::LoginResponse,
            crate::models::user::SessionUser,
            crate::models::user::Role,
            auth::PermissionsResponse,
            // Users
            crate::services::auth::RegisterUser,
            crate::models::user::UserAccount,
            crate::models::user::ActivePatch,
            // Records
            crate::models::Record,
            crate::models::audit::AuditLogEntry,
            crate::models::audit::AuditAction,
            // Library
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::BookAvailability,
            crate::models::borrow::Borrow,
            crate::models::borrow::BorrowMethod,
            crate::models::borrow::ActiveBorrow,
            crate::models::fine::Fine,
            crate::models::fine::FineStatus,
            crate::services::circulation::IssueRequest,
            crate::services::circulation::ReturnRequest,
            crate::services::circulation::ReturnOutcome,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication and permissions"),
        (name = "users", description = "Account management"),
        (name = "records", description = "Generic record store"),
        (name = "audit", description = "Audit trail"),
        (name = "library", description = "Catalog, circulation and fines")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
