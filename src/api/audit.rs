//! Audit trail endpoint

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{AuditLogEntry, AuditQuery},
    services::permissions::VIEW_AUDIT,
    AppState,
};

use super::AuthenticatedUser;

#[utoipa::path(
    get,
    path = "/audit-logs",
    tag = "audit",
    security(("bearer_auth" = [])),
    params(
        ("resource" = Option<String>, Query, description = "Only entries for this collection"),
        ("action" = Option<String>, Query, description = "create, update or delete"),
        ("actor" = Option<String>, Query, description = "Only entries by this actor"),
        ("limit" = Option<usize>, Query, description = "Maximum number of entries")
    ),
    responses(
        (status = 200, description = "Audit entries, newest first", body = Vec<AuditLogEntry>),
        (status = 403, description = "Insufficient permissions", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<AuditQuery>,
) -> AppResult<Json<Vec<AuditLogEntry>>> {
    claims.require(VIEW_AUDIT)?;

    let entries = state.services.repository.audit_logs(&query).await?;
    Ok(Json(entries))
}
