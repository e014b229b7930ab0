//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, feedbacks, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Book Network API",
        version = "1.0.0",
        description = "Book lending social network REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::authenticate,
        auth::activate_account,
        // Books
        books::create_book,
        books::get_book,
        books::list_books,
        books::list_owned_books,
        books::list_borrowed_books,
        books::list_returned_books,
        books::toggle_shareable,
        books::toggle_archived,
        books::upload_cover,
        // Lending
        books::borrow_book,
        books::return_book,
        books::approve_return,
        // Feedback
        feedbacks::submit_feedback,
        feedbacks::list_book_feedbacks,
    ),
    components(
        schemas(
            // Auth
            crate::models::user::RegistrationRequest,
            crate::models::user::AuthenticationRequest,
            crate::models::user::AuthenticationResponse,
            auth::ActivationQuery,
            // Books
            crate::models::book::BookRequest,
            crate::models::book::BookResponse,
            crate::models::book::BorrowedBookResponse,
            books::CoverUpload,
            // Feedback
            crate::models::feedback::FeedbackRequest,
            crate::models::feedback::FeedbackResponse,
            // Paging
            crate::models::page::PageBookResponse,
            crate::models::page::PageBorrowedBookResponse,
            crate::models::page::PageFeedbackResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and authentication"),
        (name = "books", description = "Book catalog"),
        (name = "lending", description = "Borrow, return and approve"),
        (name = "feedbacks", description = "Book feedback")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
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

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
