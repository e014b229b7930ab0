//! Business logic services

pub mod auth;
pub mod books;
pub mod email;
pub mod feedback;
pub mod lending;
pub mod redis;
pub mod storage;

use std::sync::Arc;

use crate::{
    config::{AuthConfig, EmailConfig},
    error::{AppError, AppResult},
    models::book::Book,
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub books: books::BooksService,
    pub lending: lending::LendingService,
    pub feedback: feedback::FeedbackService,
    pub redis: redis::RedisService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        storage: Arc<dyn storage::FileStorage>,
        auth_config: AuthConfig,
        email_config: EmailConfig,
        redis_service: redis::RedisService,
    ) -> Self {
        Self {
            auth: auth::AuthService::new(
                repository.clone(),
                auth_config,
                Arc::new(redis_service.clone()),
                Arc::new(email::EmailService::new(email_config)),
            ),
            books: books::BooksService::new(repository.clone(), storage),
            lending: lending::LendingService::new(repository.clone()),
            feedback: feedback::FeedbackService::new(repository),
            redis: redis_service,
        }
    }
}

/// Load a book or fail with NotFound
pub(crate) async fn find_book(repository: &Repository, id: i32) -> AppResult<Book> {
    repository
        .books
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No book found with the ID:: {}", id)))
}
