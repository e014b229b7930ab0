//! Feedbacks repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{feedback::Feedback, page::PageRequest},
};

/// Fields of a feedback about to be inserted
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub note: f64,
    pub comment: String,
    pub book_id: i32,
    pub created_by: i32,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn create(&self, feedback: NewFeedback) -> AppResult<i32>;

    async fn find_all_by_book(
        &self,
        book_id: i32,
        page: PageRequest,
    ) -> AppResult<(Vec<Feedback>, i64)>;
}

#[derive(Clone)]
pub struct PgFeedbackRepository {
    pool: Pool<Postgres>,
}

impl PgFeedbackRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedbackRepository for PgFeedbackRepository {
    async fn create(&self, feedback: NewFeedback) -> AppResult<i32> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO feedbacks (note, comment, book_id, created_by, created_date)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id
            "#,
        )
        .bind(feedback.note)
        .bind(&feedback.comment)
        .bind(feedback.book_id)
        .bind(feedback.created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn find_all_by_book(
        &self,
        book_id: i32,
        page: PageRequest,
    ) -> AppResult<(Vec<Feedback>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM feedbacks WHERE book_id = $1")
            .bind(book_id)
            .fetch_one(&self.pool)
            .await?;

        let feedbacks = sqlx::query_as::<_, Feedback>(
            r#"
            SELECT * FROM feedbacks
            WHERE book_id = $1
            ORDER BY created_date DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(book_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((feedbacks, total))
    }
}
