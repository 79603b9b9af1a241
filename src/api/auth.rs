//! Authentication endpoints

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::user::{Role, SessionUser},
    services::{
        auth::{LoginRequest, LoginResponse},
        permissions,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Capabilities of the current user and the full role table
#[derive(Serialize, ToSchema)]
pub struct PermissionsResponse {
    pub role: Role,
    /// `["*"]` for Admin
    pub capabilities: Vec<String>,
    #[schema(value_type = Object)]
    pub table: BTreeMap<Role, Vec<String>>,
}

/// Sign in to the portal
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Malformed request or unknown role", body = crate::error::ErrorResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse),
        (status = 403, description = "User does not hold the requested role", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = state.services.auth.login(request).await?;
    Ok(Json(response))
}

/// Current user, as stored
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = SessionUser),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<SessionUser>> {
    let user = state.services.auth.get_user(&claims.sub).await?;
    Ok(Json(SessionUser::from(&user)))
}

/// Role permission table
#[utoipa::path(
    get,
    path = "/permissions",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Permission table", body = PermissionsResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn permissions(
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Json<PermissionsResponse> {
    let owned = |caps: Vec<&str>| caps.into_iter().map(str::to_string).collect::<Vec<_>>();
    Json(PermissionsResponse {
        role: claims.user.role,
        capabilities: owned(permissions::capabilities(claims.user.role)),
        table: permissions::table()
            .into_iter()
            .map(|(role, caps)| (role, owned(caps)))
            .collect(),
    })
}
