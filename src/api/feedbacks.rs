//! Feedback endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        feedback::{FeedbackRequest, FeedbackResponse},
        page::{PageQuery, PageRequest, PageResponse},
    },
    AppState,
};

use super::AuthenticatedUser;

/// Leave feedback on a book
#[utoipa::path(
    post,
    path = "/feedbacks",
    tag = "feedbacks",
    security(("bearer_auth" = [])),
    request_body = FeedbackRequest,
    responses(
        (status = 200, description = "Feedback ID", body = i32),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 403, description = "Own, archived or not shareable book", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn submit_feedback(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Json(request): Json<FeedbackRequest>,
) -> AppResult<Json<i32>> {
    caller.require_user()?;

    let id = state.services.feedback.submit(request, &caller).await?;
    Ok(Json(id))
}

/// List feedback left on a book
#[utoipa::path(
    get,
    path = "/feedbacks/book/{id}",
    tag = "feedbacks",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Feedback page", body = crate::models::page::PageFeedbackResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_book_feedbacks(
    State(state): State<AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(book_id): Path<i32>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PageResponse<FeedbackResponse>>> {
    caller.require_user()?;

    let page = state
        .services
        .feedback
        .list_for_book(book_id, PageRequest::from(&query), &caller)
        .await?;
    Ok(Json(page))
}
