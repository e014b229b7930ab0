//! API handlers for Book Network REST endpoints

pub mod auth;
pub mod books;
pub mod feedbacks;
pub mod health;
pub mod openapi;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, patch, post},
    Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{
    error::AppError,
    models::user::{Identity, UserClaims},
    AppState,
};

/// Extractor for the caller identity carried by the bearer token
pub struct AuthenticatedUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    AppError::Authentication("Missing or invalid authorization header".to_string())
                })?;

        let claims = UserClaims::from_token(bearer.token(), &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims.into()))
    }
}

/// Build the `/api/v1` routes
pub fn create_router(state: AppState) -> Router {
    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/register", post(auth::register))
        .route("/auth/authenticate", post(auth::authenticate))
        .route("/auth/activate-account", get(auth::activate_account))
        // Books
        .route("/books", post(books::create_book).get(books::list_books))
        .route("/books/owner", get(books::list_owned_books))
        .route("/books/borrowed", get(books::list_borrowed_books))
        .route("/books/returned", get(books::list_returned_books))
        .route("/books/:id", get(books::get_book))
        .route("/books/shareable/:id", patch(books::toggle_shareable))
        .route("/books/archived/:id", patch(books::toggle_archived))
        .route("/books/cover/:id", post(books::upload_cover))
        // Lending
        .route("/books/borrow/:id", post(books::borrow_book))
        .route("/books/borrow/return/:id", patch(books::return_book))
        .route("/books/borrow/return/approve/:id", patch(books::approve_return))
        // Feedback
        .route("/feedbacks", post(feedbacks::submit_feedback))
        .route("/feedbacks/book/:id", get(feedbacks::list_book_feedbacks))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
}
