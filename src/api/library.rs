//! Library endpoints: catalog, circulation and fines

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookAvailability, CreateBook},
        borrow::{ActiveBorrow, Borrow},
        fine::{Fine, FineQuery},
    },
    services::{
        circulation::{IssueRequest, ReturnOutcome, ReturnRequest},
        permissions::{ISSUE_BOOKS, MANAGE_FINES, MANAGE_LIBRARY, RETURN_BOOKS},
    },
    AppState,
};

use super::AuthenticatedUser;

#[utoipa::path(
    get,
    path = "/library/books",
    tag = "library",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Catalog, newest first", body = Vec<Book>),
        (status = 403, description = "Insufficient permissions", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Book>>> {
    claims.require(MANAGE_LIBRARY)?;
    Ok(Json(state.services.catalog.list_books().await?))
}

#[utoipa::path(
    post,
    path = "/library/books",
    tag = "library",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book added", body = Book),
        (status = 400, description = "Invalid book", body = crate::error::ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(book): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    claims.require(MANAGE_LIBRARY)?;

    let book = state.services.catalog.add_book(book, Some(claims.actor())).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

#[utoipa::path(
    post,
    path = "/library/books/{id}/copies/increase",
    tag = "library",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Copy added", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn increase_copies(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<Book>> {
    claims.require(MANAGE_LIBRARY)?;

    let book = state
        .services
        .catalog
        .increase_copies(&id, Some(claims.actor()))
        .await?;
    Ok(Json(book))
}

#[utoipa::path(
    post,
    path = "/library/books/{id}/copies/decrease",
    tag = "library",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Copy removed", body = Book),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Last copy, or every spare copy is on loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn decrease_copies(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<Book>> {
    claims.require(MANAGE_LIBRARY)?;

    let book = state
        .services
        .catalog
        .decrease_copies(&id, Some(claims.actor()))
        .await?;
    Ok(Json(book))
}

#[utoipa::path(
    delete,
    path = "/library/books/{id}",
    tag = "library",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 403, description = "Insufficient permissions", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    claims.require(MANAGE_LIBRARY)?;

    state.services.catalog.delete_book(&id, Some(claims.actor())).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/library/availability",
    tag = "library",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Copies available per book", body = Vec<BookAvailability>),
        (status = 403, description = "Insufficient permissions", body = crate::error::ErrorResponse)
    )
)]
pub async fn availability(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BookAvailability>>> {
    claims.require(MANAGE_LIBRARY)?;
    Ok(Json(state.services.circulation.availability().await?))
}

#[utoipa::path(
    get,
    path = "/library/borrows/active",
    tag = "library",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Books currently out on loan", body = Vec<ActiveBorrow>),
        (status = 403, description = "Insufficient permissions", body = crate::error::ErrorResponse)
    )
)]
pub async fn active_borrows(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ActiveBorrow>>> {
    claims.require(MANAGE_LIBRARY)?;
    Ok(Json(state.services.circulation.active_borrows().await?))
}

/// Lend a book
#[utoipa::path(
    post,
    path = "/library/issue",
    tag = "library",
    security(("bearer_auth" = [])),
    request_body = IssueRequest,
    responses(
        (status = 201, description = "Book issued", body = Borrow),
        (status = 400, description = "Missing book or borrower", body = crate::error::ErrorResponse),
        (status = 404, description = "Book or borrower not found", body = crate::error::ErrorResponse),
        (status = 422, description = "No copies available", body = crate::error::ErrorResponse)
    )
)]
pub async fn issue_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<IssueRequest>,
) -> AppResult<(StatusCode, Json<Borrow>)> {
    claims.require(ISSUE_BOOKS)?;

    let borrow = state
        .services
        .circulation
        .issue(request, Some(claims.actor()))
        .await?;
    Ok((StatusCode::CREATED, Json(borrow)))
}

/// Take a book back, raising a fine when it is late
#[utoipa::path(
    post,
    path = "/library/return",
    tag = "library",
    security(("bearer_auth" = [])),
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Book returned", body = ReturnOutcome),
        (status = 404, description = "Borrow, book or borrower not found", body = crate::error::ErrorResponse),
        (status = 422, description = "No active borrow", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<ReturnRequest>,
) -> AppResult<Json<ReturnOutcome>> {
    claims.require(RETURN_BOOKS)?;

    let outcome = state
        .services
        .circulation
        .return_book(request, Some(claims.actor()))
        .await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    get,
    path = "/library/fines",
    tag = "library",
    security(("bearer_auth" = [])),
    params(
        ("status" = Option<String>, Query, description = "unpaid or paid"),
        ("borrowerId" = Option<String>, Query, description = "Only fines of this borrower")
    ),
    responses(
        (status = 200, description = "Fines, newest first", body = Vec<Fine>),
        (status = 403, description = "Insufficient permissions", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_fines(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<FineQuery>,
) -> AppResult<Json<Vec<Fine>>> {
    claims.require(MANAGE_FINES)?;
    Ok(Json(state.services.fines.list(&query).await?))
}

#[utoipa::path(
    post,
    path = "/library/fines/{id}/pay",
    tag = "library",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Fine ID")),
    responses(
        (status = 200, description = "Fine marked paid", body = Fine),
        (status = 404, description = "Fine not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Fine already paid", body = crate::error::ErrorResponse)
    )
)]
pub async fn pay_fine(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<Fine>> {
    claims.require(MANAGE_FINES)?;

    let fine = state.services.fines.mark_paid(&id, Some(claims.actor())).await?;
    Ok(Json(fine))
}
