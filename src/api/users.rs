//! Admin user management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::user::{ActivePatch, UserAccount},
    services::{auth::RegisterUser, permissions::MANAGE_USERS},
    AppState,
};

use super::AuthenticatedUser;

/// List portal accounts
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Accounts, newest first", body = Vec<UserAccount>),
        (status = 403, description = "Insufficient permissions", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<UserAccount>>> {
    claims.require(MANAGE_USERS)?;

    let users = state.services.auth.list_users().await?;
    Ok(Json(users.iter().map(UserAccount::from).collect()))
}

/// Create an account with a hashed password
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = RegisterUser,
    responses(
        (status = 201, description = "Account created", body = UserAccount),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already in use", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<RegisterUser>,
) -> AppResult<(StatusCode, Json<UserAccount>)> {
    claims.require(MANAGE_USERS)?;

    let user = state
        .services
        .auth
        .register_user(request, Some(claims.actor()))
        .await?;
    Ok((StatusCode::CREATED, Json(UserAccount::from(&user))))
}

/// Enable or disable an account
#[utoipa::path(
    put,
    path = "/users/{id}/active",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "User ID")
    ),
    request_body = ActivePatch,
    responses(
        (status = 200, description = "Account updated", body = UserAccount),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn set_user_active(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
    Json(patch): Json<ActivePatch>,
) -> AppResult<Json<UserAccount>> {
    claims.require(MANAGE_USERS)?;

    let user = state
        .services
        .auth
        .set_active(&id, patch.active, Some(claims.actor()))
        .await?;
    Ok(Json(UserAccount::from(&user)))
}
