//! Book transaction history repository

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::BorrowedBookResponse,
        history::BookTransactionHistory,
        page::PageRequest,
    },
};

pub const ALREADY_BORROWED_MESSAGE: &str = "The requested book is already borrowed";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionHistoryRepository: Send + Sync {
    /// Whether the borrower holds a transaction on the book that is not yet approved
    async fn is_already_borrowed_by_user(&self, book_id: i32, user_id: i32) -> AppResult<bool>;

    /// Open a BORROWED transaction
    async fn create(&self, book_id: i32, user_id: i32) -> AppResult<i32>;

    /// The borrower's transaction on the book still in BORROWED state
    async fn find_borrowed_by_book_and_user(
        &self,
        book_id: i32,
        user_id: i32,
    ) -> AppResult<Option<BookTransactionHistory>>;

    /// Oldest RETURNED transaction of a book owned by `owner_id`
    async fn find_returned_by_book_and_owner(
        &self,
        book_id: i32,
        owner_id: i32,
    ) -> AppResult<Option<BookTransactionHistory>>;

    /// Persist BORROWED -> RETURNED; false when the row was no longer BORROWED
    async fn mark_returned(&self, id: i32, modified_by: i32) -> AppResult<bool>;

    /// Persist RETURNED -> APPROVED; false when the row was no longer RETURNED
    async fn approve_return(&self, id: i32, modified_by: i32) -> AppResult<bool>;

    /// Every transaction where the user is the borrower
    async fn find_all_borrowed(
        &self,
        user_id: i32,
        page: PageRequest,
    ) -> AppResult<(Vec<BorrowedBookResponse>, i64)>;

    /// Every transaction on books the user owns
    async fn find_all_returned(
        &self,
        owner_id: i32,
        page: PageRequest,
    ) -> AppResult<(Vec<BorrowedBookResponse>, i64)>;
}

const BORROWED_SELECT: &str = r#"
    SELECT b.id, b.title, b.author_name, b.isbn,
           COALESCE((
               SELECT ROUND(AVG(f.note)::numeric, 1)::float8
               FROM feedbacks f
               WHERE f.book_id = b.id
           ), 0::float8) AS rate,
           h.returned, h.return_approved
    FROM book_transaction_histories h
    JOIN books b ON b.id = h.book_id
"#;

#[derive(Clone)]
pub struct PgTransactionHistoryRepository {
    pool: Pool<Postgres>,
}

impl PgTransactionHistoryRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn page_where(
        &self,
        where_clause: &str,
        user_id: i32,
        page: PageRequest,
    ) -> AppResult<(Vec<BorrowedBookResponse>, i64)> {
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM book_transaction_histories h JOIN books b ON b.id = h.book_id WHERE {}",
            where_clause
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, BorrowedBookResponse>(&format!(
            "{} WHERE {} ORDER BY h.created_date DESC, h.id DESC LIMIT $2 OFFSET $3",
            BORROWED_SELECT, where_clause
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((rows, total))
    }
}

#[async_trait]
impl TransactionHistoryRepository for PgTransactionHistoryRepository {
    async fn is_already_borrowed_by_user(&self, book_id: i32, user_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM book_transaction_histories
                WHERE book_id = $1 AND user_id = $2 AND return_approved = FALSE
            )
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create(&self, book_id: i32, user_id: i32) -> AppResult<i32> {
        let result = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO book_transaction_histories (book_id, user_id, returned, return_approved, created_by, created_date)
            VALUES ($1, $2, FALSE, FALSE, $2, NOW())
            RETURNING id
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(id) => Ok(id),
            // Lost a race against a concurrent borrow of the same book by the same user
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(
                AppError::OperationNotPermitted(ALREADY_BORROWED_MESSAGE.to_string()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_borrowed_by_book_and_user(
        &self,
        book_id: i32,
        user_id: i32,
    ) -> AppResult<Option<BookTransactionHistory>> {
        let history = sqlx::query_as::<_, BookTransactionHistory>(
            r#"
            SELECT * FROM book_transaction_histories
            WHERE book_id = $1 AND user_id = $2 AND returned = FALSE AND return_approved = FALSE
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(history)
    }

    async fn find_returned_by_book_and_owner(
        &self,
        book_id: i32,
        owner_id: i32,
    ) -> AppResult<Option<BookTransactionHistory>> {
        let history = sqlx::query_as::<_, BookTransactionHistory>(
            r#"
            SELECT h.* FROM book_transaction_histories h
            JOIN books b ON b.id = h.book_id
            WHERE h.book_id = $1 AND b.created_by = $2
              AND h.returned = TRUE AND h.return_approved = FALSE
            ORDER BY h.created_date, h.id
            LIMIT 1
            "#,
        )
        .bind(book_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(history)
    }

    async fn mark_returned(&self, id: i32, modified_by: i32) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE book_transaction_histories
            SET returned = TRUE, last_modified_by = $2, last_modified_date = NOW()
            WHERE id = $1 AND returned = FALSE AND return_approved = FALSE
            "#,
        )
        .bind(id)
        .bind(modified_by)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn approve_return(&self, id: i32, modified_by: i32) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE book_transaction_histories
            SET return_approved = TRUE, last_modified_by = $2, last_modified_date = NOW()
            WHERE id = $1 AND returned = TRUE AND return_approved = FALSE
            "#,
        )
        .bind(id)
        .bind(modified_by)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_all_borrowed(
        &self,
        user_id: i32,
        page: PageRequest,
    ) -> AppResult<(Vec<BorrowedBookResponse>, i64)> {
        self.page_where("h.user_id = $1", user_id, page).await
    }

    async fn find_all_returned(
        &self,
        owner_id: i32,
        page: PageRequest,
    ) -> AppResult<(Vec<BorrowedBookResponse>, i64)> {
        self.page_where("b.created_by = $1", owner_id, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::books::tests::{insert_book, insert_user};
    use sqlx::PgPool;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore] // Needs DATABASE_URL: cargo test -- --ignored
    async fn test_second_active_borrow_hits_unique_index(pool: PgPool) {
        let owner = insert_user(&pool, "owner@mail.com").await;
        let borrower = insert_user(&pool, "borrower@mail.com").await;
        let other = insert_user(&pool, "other@mail.com").await;
        let book = insert_book(&pool, owner, "shared", true).await;
        let repo = PgTransactionHistoryRepository::new(pool);

        repo.create(book, borrower).await.unwrap();
        match repo.create(book, borrower).await {
            Err(AppError::OperationNotPermitted(message)) => {
                assert_eq!(message, ALREADY_BORROWED_MESSAGE)
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(repo.is_already_borrowed_by_user(book, borrower).await.unwrap());

        repo.create(book, other).await.unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_transitions_apply_once(pool: PgPool) {
        let owner = insert_user(&pool, "owner@mail.com").await;
        let borrower = insert_user(&pool, "borrower@mail.com").await;
        let book = insert_book(&pool, owner, "shared", true).await;
        let repo = PgTransactionHistoryRepository::new(pool);

        let id = repo.create(book, borrower).await.unwrap();
        assert!(!repo.approve_return(id, owner).await.unwrap());
        assert!(repo.find_returned_by_book_and_owner(book, owner).await.unwrap().is_none());

        assert!(repo.mark_returned(id, borrower).await.unwrap());
        assert!(!repo.mark_returned(id, borrower).await.unwrap());
        assert!(repo.find_borrowed_by_book_and_user(book, borrower).await.unwrap().is_none());

        let returned = repo.find_returned_by_book_and_owner(book, owner).await.unwrap();
        assert_eq!(returned.map(|tx| tx.id), Some(id));
        assert!(repo.find_returned_by_book_and_owner(book, borrower).await.unwrap().is_none());

        assert!(repo.approve_return(id, owner).await.unwrap());
        assert!(!repo.approve_return(id, owner).await.unwrap());
        assert!(!repo.mark_returned(id, borrower).await.unwrap());

        assert!(!repo.is_already_borrowed_by_user(book, borrower).await.unwrap());
        let again = repo.create(book, borrower).await.unwrap();
        assert_ne!(again, id);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_listings_split_borrower_and_owner_views(pool: PgPool) {
        let owner = insert_user(&pool, "owner@mail.com").await;
        let borrower = insert_user(&pool, "borrower@mail.com").await;
        let book = insert_book(&pool, owner, "shared", true).await;
        let repo = PgTransactionHistoryRepository::new(pool);

        let id = repo.create(book, borrower).await.unwrap();
        repo.mark_returned(id, borrower).await.unwrap();
        let page = PageRequest::new(0, 10);

        let (borrowed, total) = repo.find_all_borrowed(borrower, page).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(borrowed[0].id, book);
        assert!(borrowed[0].returned && !borrowed[0].return_approved);

        let (lent, total) = repo.find_all_returned(owner, page).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(lent[0].title, "shared");

        assert_eq!(repo.find_all_borrowed(owner, page).await.unwrap().1, 0);
        assert_eq!(repo.find_all_returned(borrower, page).await.unwrap().1, 0);
    }
}
