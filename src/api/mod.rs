//! API handlers for EduSys REST endpoints

pub mod audit;
pub mod auth;
pub mod health;
pub mod library;
pub mod openapi;
pub mod records;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = state.services.auth.verify_token(token)?;
        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/permissions", get(auth::permissions))
        // User management
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/:id/active", put(users::set_user_active))
        // Generic records
        .route(
            "/records/:resource",
            get(records::list_records).post(records::create_record),
        )
        .route(
            "/records/:resource/:id",
            get(records::get_record)
                .put(records::update_record)
                .delete(records::delete_record),
        )
        .route("/audit-logs", get(audit::list_audit_logs))
        // Library
        .route("/library/books", get(library::list_books).post(library::add_book))
        .route("/library/books/:id", delete(library::delete_book))
        .route("/library/books/:id/copies/increase", post(library::increase_copies))
        .route("/library/books/:id/copies/decrease", post(library::decrease_copies))
        .route("/library/availability", get(library::availability))
        .route("/library/borrows/active", get(library::active_borrows))
        .route("/library/issue", post(library::issue_book))
        .route("/library/return", post(library::return_book))
        .route("/library/fines", get(library::list_fines))
        .route("/library/fines/:id/pay", post(library::pay_fine))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
