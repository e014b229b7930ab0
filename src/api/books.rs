//! Book catalog and lending endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{BookRequest, BookResponse, BorrowedBookResponse},
        page::{PageQuery, PageRequest, PageResponse},
    },
    AppState,
};

use super::AuthenticatedUser;

/// Multipart body of a cover upload
#[derive(Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct CoverUpload {
    /// Image file
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Register a new book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = BookRequest,
    responses(
        (status = 200, description = "Book ID", body = i32),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Json(request): Json<BookRequest>,
) -> AppResult<Json<i32>> {
    caller.require_user()?;

    let id = state.services.books.create(request, &caller).await?;
    Ok(Json(id))
}

/// Get one book
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book", body = BookResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<BookResponse>> {
    caller.require_user()?;

    let book = state.services.books.find_by_id(book_id).await?;
    Ok(Json(book))
}

/// Browse shared books and the caller's own
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Book page", body = crate::models::page::PageBookResponse)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PageResponse<BookResponse>>> {
    caller.require_user()?;

    let page = state.services.books.list_catalog(PageRequest::from(&query), &caller).await?;
    Ok(Json(page))
}

/// List the caller's books
#[utoipa::path(
    get,
    path = "/books/owner",
    tag = "books",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Book page", body = crate::models::page::PageBookResponse)
    )
)]
pub async fn list_owned_books(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PageResponse<BookResponse>>> {
    caller.require_user()?;

    let page = state.services.books.list_owned(PageRequest::from(&query), &caller).await?;
    Ok(Json(page))
}

/// List books the caller has borrowed
#[utoipa::path(
    get,
    path = "/books/borrowed",
    tag = "books",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Borrowed books", body = crate::models::page::PageBorrowedBookResponse)
    )
)]
pub async fn list_borrowed_books(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PageResponse<BorrowedBookResponse>>> {
    caller.require_user()?;

    let page = state.services.books.list_borrowed(PageRequest::from(&query), &caller).await?;
    Ok(Json(page))
}

/// List lending transactions on the caller's books
#[utoipa::path(
    get,
    path = "/books/returned",
    tag = "books",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Lent books", body = crate::models::page::PageBorrowedBookResponse)
    )
)]
pub async fn list_returned_books(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PageResponse<BorrowedBookResponse>>> {
    caller.require_user()?;

    let page = state.services.books.list_returned(PageRequest::from(&query), &caller).await?;
    Ok(Json(page))
}

/// Flip the shareable flag of one of the caller's books
#[utoipa::path(
    patch,
    path = "/books/shareable/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book ID", body = i32),
        (status = 403, description = "Not the owner", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn toggle_shareable(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<i32>> {
    caller.require_user()?;

    let id = state.services.books.toggle_shareable(book_id, &caller).await?;
    Ok(Json(id))
}

/// Flip the archived flag of one of the caller's books
#[utoipa::path(
    patch,
    path = "/books/archived/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book ID", body = i32),
        (status = 403, description = "Not the owner", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn toggle_archived(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<i32>> {
    caller.require_user()?;

    let id = state.services.books.toggle_archived(book_id, &caller).await?;
    Ok(Json(id))
}

/// Upload a cover image for one of the caller's books
#[utoipa::path(
    post,
    path = "/books/cover/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    request_body(content = CoverUpload, content_type = "multipart/form-data"),
    responses(
        (status = 202, description = "Cover stored"),
        (status = 400, description = "Missing or empty file", body = crate::error::ErrorResponse),
        (status = 403, description = "Not the owner", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn upload_cover(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(book_id): Path<i32>,
    mut multipart: Multipart,
) -> AppResult<StatusCode> {
    caller.require_user()?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read uploaded file: {}", e)))?;

        state
            .services
            .books
            .upload_cover(book_id, content.to_vec(), file_name, &caller)
            .await?;
        return Ok(StatusCode::ACCEPTED);
    }

    Err(AppError::BadRequest("Missing multipart field 'file'".to_string()))
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/books/borrow/{id}",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Transaction ID", body = i32),
        (status = 403, description = "Own, archived, not shareable or already borrowed book", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<i32>> {
    caller.require_user()?;

    let id = state.services.lending.borrow(book_id, &caller).await?;
    Ok(Json(id))
}

/// Give a borrowed book back
#[utoipa::path(
    patch,
    path = "/books/borrow/return/{id}",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Transaction ID", body = i32),
        (status = 403, description = "Book not borrowed by the caller", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<i32>> {
    caller.require_user()?;

    let id = state.services.lending.return_book(book_id, &caller).await?;
    Ok(Json(id))
}

/// Confirm a returned book is back with its owner
#[utoipa::path(
    patch,
    path = "/books/borrow/return/approve/{id}",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Transaction ID", body = i32),
        (status = 403, description = "Not the owner or book not returned yet", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn approve_return(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<i32>> {
    caller.require_user()?;

    let id = state.services.lending.approve_return(book_id, &caller).await?;
    Ok(Json(id))
}
