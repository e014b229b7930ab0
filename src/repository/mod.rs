//! Repository layer for database operations

pub mod books;
pub mod feedbacks;
pub mod histories;
pub mod users;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

pub use books::BookRepository;
pub use feedbacks::FeedbackRepository;
pub use histories::TransactionHistoryRepository;
pub use users::UserRepository;

/// Main repository struct holding one handle per aggregate
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookRepository>,
    pub histories: Arc<dyn TransactionHistoryRepository>,
    pub feedbacks: Arc<dyn FeedbackRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::PgBookRepository::new(pool.clone())),
            histories: Arc::new(histories::PgTransactionHistoryRepository::new(pool.clone())),
            feedbacks: Arc::new(feedbacks::PgFeedbackRepository::new(pool.clone())),
            users: Arc::new(users::PgUserRepository::new(pool)),
        }
    }
}
