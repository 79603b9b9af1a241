//! Generic record endpoints over any collection

use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{Map, Value};

use crate::{
    error::{AppError, AppResult},
    models::{Filter, Record},
    services::{auth::seal_password_field, permissions::MANAGE_RECORDS},
    AppState,
};

use super::AuthenticatedUser;

/// List records; every query parameter is an equality filter on a string field
#[utoipa::path(
    get,
    path = "/records/{resource}",
    tag = "records",
    security(("bearer_auth" = [])),
    params(
        ("resource" = String, Path, description = "Collection name, e.g. books or auditLogs")
    ),
    responses(
        (status = 200, description = "Matching records, newest first", body = Vec<Record>),
        (status = 403, description = "Insufficient permissions", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_records(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> AppResult<Json<Vec<Record>>> {
    claims.require(MANAGE_RECORDS)?;

    let filter = params
        .into_iter()
        .fold(Filter::new(), |filter, (field, value)| filter.eq(&field, value));
    let records = state.services.repository.list(&resource, &filter).await?;
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/records/{resource}/{id}",
    tag = "records",
    security(("bearer_auth" = [])),
    params(
        ("resource" = String, Path, description = "Collection name"),
        ("id" = String, Path, description = "Record ID")
    ),
    responses(
        (status = 200, description = "Record", body = Record),
        (status = 404, description = "Record not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_record(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((resource, id)): Path<(String, String)>,
) -> AppResult<Json<Record>> {
    claims.require(MANAGE_RECORDS)?;

    let record = state
        .services
        .repository
        .get(&resource, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} record {} not found", resource, id)))?;
    Ok(Json(record))
}

/// Create a record; the id is always generated
///
/// A plain `password` on a user record is stored as its hash.
#[utoipa::path(
    post,
    path = "/records/{resource}",
    tag = "records",
    security(("bearer_auth" = [])),
    params(
        ("resource" = String, Path, description = "Collection name")
    ),
    request_body(content = Record, description = "Record fields; any id is ignored"),
    responses(
        (status = 201, description = "Record created", body = Record),
        (status = 400, description = "Invalid resource name or field value", body = crate::error::ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_record(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(resource): Path<String>,
    Json(mut fields): Json<Map<String, Value>>,
) -> AppResult<(StatusCode, Json<Record>)> {
    claims.require(MANAGE_RECORDS)?;
    seal_password_field(&resource, &mut fields)?;

    let record = state
        .services
        .repository
        .create(&resource, fields, Some(claims.actor()))
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Shallow-merge fields into a record
#[utoipa::path(
    put,
    path = "/records/{resource}/{id}",
    tag = "records",
    security(("bearer_auth" = [])),
    params(
        ("resource" = String, Path, description = "Collection name"),
        ("id" = String, Path, description = "Record ID")
    ),
    request_body(content = Record, description = "Fields to merge"),
    responses(
        (status = 200, description = "Record updated", body = Record),
        (status = 400, description = "Invalid field value", body = crate::error::ErrorResponse),
        (status = 404, description = "Record not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_record(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((resource, id)): Path<(String, String)>,
    Json(mut patch): Json<Map<String, Value>>,
) -> AppResult<Json<Record>> {
    claims.require(MANAGE_RECORDS)?;
    seal_password_field(&resource, &mut patch)?;

    let record = state
        .services
        .repository
        .update(&resource, &id, patch, Some(claims.actor()))
        .await?;
    Ok(Json(record))
}

/// Delete a record; unknown ids are not an error
#[utoipa::path(
    delete,
    path = "/records/{resource}/{id}",
    tag = "records",
    security(("bearer_auth" = [])),
    params(
        ("resource" = String, Path, description = "Collection name"),
        ("id" = String, Path, description = "Record ID")
    ),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 403, description = "Insufficient permissions", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_record(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((resource, id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    claims.require(MANAGE_RECORDS)?;

    state
        .services
        .repository
        .remove(&resource, &id, Some(claims.actor()))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
