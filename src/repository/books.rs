//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookDetails, NewBook},
        page::PageRequest,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Book>>;

    /// Book with owner name and average feedback note
    async fn find_details(&self, id: i32) -> AppResult<Option<BookDetails>>;

    async fn create(&self, book: NewBook) -> AppResult<i32>;

    /// Flip `shareable` on a book created by `owner_id`. False when no such book.
    async fn toggle_shareable(&self, id: i32, owner_id: i32) -> AppResult<bool>;

    /// Flip `archived` on a book created by `owner_id`. False when no such book.
    async fn toggle_archived(&self, id: i32, owner_id: i32) -> AppResult<bool>;

    async fn set_cover(&self, id: i32, cover: String, modified_by: i32) -> AppResult<()>;

    /// Shareable non-archived books plus the caller's own books, newest first
    async fn find_displayable(
        &self,
        user_id: i32,
        page: PageRequest,
    ) -> AppResult<(Vec<BookDetails>, i64)>;

    async fn find_by_owner(
        &self,
        owner_id: i32,
        page: PageRequest,
    ) -> AppResult<(Vec<BookDetails>, i64)>;
}

const DETAILS_SELECT: &str = r#"
    SELECT b.*,
           (u.firstname || ' ' || u.lastname) AS owner_name,
           COALESCE((
               SELECT ROUND(AVG(f.note)::numeric, 1)::float8
               FROM feedbacks f
               WHERE f.book_id = b.id
           ), 0::float8) AS rate
    FROM books b
    JOIN users u ON u.id = b.owner_id
"#;

#[derive(Clone)]
pub struct PgBookRepository {
    pool: Pool<Postgres>,
}

impl PgBookRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn page_where(
        &self,
        where_clause: &str,
        user_id: i32,
        page: PageRequest,
    ) -> AppResult<(Vec<BookDetails>, i64)> {
        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM books b WHERE {}",
            where_clause
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        let books = sqlx::query_as::<_, BookDetails>(&format!(
            "{} WHERE {} ORDER BY b.created_date DESC, b.id DESC LIMIT $2 OFFSET $3",
            DETAILS_SELECT, where_clause
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((books, total))
    }
}

#[async_trait]
impl BookRepository for PgBookRepository {
    async fn find_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn find_details(&self, id: i32) -> AppResult<Option<BookDetails>> {
        let book = sqlx::query_as::<_, BookDetails>(&format!("{} WHERE b.id = $1", DETAILS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn create(&self, book: NewBook) -> AppResult<i32> {
        let id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO books (title, author_name, isbn, synopsis, archived, shareable, owner_id, created_by, created_date)
            VALUES ($1, $2, $3, $4, FALSE, $5, $6, $6, NOW())
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.author_name)
        .bind(&book.isbn)
        .bind(&book.synopsis)
        .bind(book.shareable)
        .bind(book.owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn toggle_shareable(&self, id: i32, owner_id: i32) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET shareable = NOT shareable, last_modified_by = $2, last_modified_date = NOW()
            WHERE id = $1 AND created_by = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn toggle_archived(&self, id: i32, owner_id: i32) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET archived = NOT archived, last_modified_by = $2, last_modified_date = NOW()
            WHERE id = $1 AND created_by = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_cover(&self, id: i32, cover: String, modified_by: i32) -> AppResult<()> {
        sqlx::query(
            "UPDATE books SET book_cover = $2, last_modified_by = $3, last_modified_date = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(cover)
        .bind(modified_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_displayable(
        &self,
        user_id: i32,
        page: PageRequest,
    ) -> AppResult<(Vec<BookDetails>, i64)> {
        self.page_where(
            "((b.archived = FALSE AND b.shareable = TRUE) OR b.created_by = $1)",
            user_id,
            page,
        )
        .await
    }

    async fn find_by_owner(
        &self,
        owner_id: i32,
        page: PageRequest,
    ) -> AppResult<(Vec<BookDetails>, i64)> {
        self.page_where("b.created_by = $1", owner_id, page).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        models::user::{NewUser, ROLE_USER},
        repository::users::{PgUserRepository, UserRepository},
    };
    use sqlx::PgPool;

    pub(crate) async fn insert_user(pool: &PgPool, email: &str) -> i32 {
        PgUserRepository::new(pool.clone())
            .create(
                NewUser {
                    firstname: "Test".to_string(),
                    lastname: "Reader".to_string(),
                    email: email.to_string(),
                    password_hash: "hash".to_string(),
                },
                ROLE_USER,
            )
            .await
            .unwrap()
    }

    pub(crate) async fn insert_book(
        pool: &PgPool,
        owner_id: i32,
        title: &str,
        shareable: bool,
    ) -> i32 {
        PgBookRepository::new(pool.clone())
            .create(NewBook {
                title: title.to_string(),
                author_name: "Author".to_string(),
                isbn: "9780000000000".to_string(),
                synopsis: None,
                shareable,
                owner_id,
            })
            .await
            .unwrap()
    }

    fn titles(books: &[BookDetails]) -> Vec<&str> {
        let mut titles: Vec<&str> = books.iter().map(|d| d.book.title.as_str()).collect();
        titles.sort();
        titles
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore] // Needs DATABASE_URL: cargo test -- --ignored
    async fn test_catalog_hides_archived_and_private_books_from_others(pool: PgPool) {
        let owner = insert_user(&pool, "owner@mail.com").await;
        let other = insert_user(&pool, "other@mail.com").await;
        let repo = PgBookRepository::new(pool.clone());

        insert_book(&pool, owner, "shared", true).await;
        insert_book(&pool, owner, "private", false).await;
        let archived = insert_book(&pool, owner, "archived", true).await;
        assert!(repo.toggle_archived(archived, owner).await.unwrap());
        insert_book(&pool, other, "mine", false).await;

        let page = PageRequest::new(0, 10);
        let (books, total) = repo.find_displayable(other, page).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(titles(&books), vec!["mine", "shared"]);
        assert!(books.iter().all(|d| d.owner_name == "Test Reader"));

        let (books, total) = repo.find_displayable(owner, page).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(titles(&books), vec!["archived", "private", "shared"]);

        let (books, total) = repo.find_by_owner(owner, page).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(books.len(), 3);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_toggles_flip_in_place_for_the_creator_only(pool: PgPool) {
        let owner = insert_user(&pool, "owner@mail.com").await;
        let other = insert_user(&pool, "other@mail.com").await;
        let repo = PgBookRepository::new(pool.clone());
        let id = insert_book(&pool, owner, "flip", true).await;

        assert!(repo.toggle_shareable(id, owner).await.unwrap());
        assert!(repo.toggle_shareable(id, owner).await.unwrap());
        assert!(repo.toggle_archived(id, owner).await.unwrap());
        assert!(!repo.toggle_shareable(id, other).await.unwrap());
        assert!(!repo.toggle_archived(id, other).await.unwrap());
        assert!(!repo.toggle_archived(id + 1000, owner).await.unwrap());

        let book = repo.find_by_id(id).await.unwrap().unwrap();
        assert!(book.shareable);
        assert!(book.archived);
        assert_eq!(book.last_modified_by, Some(owner));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_concurrent_toggles_are_not_lost(pool: PgPool) {
        let owner = insert_user(&pool, "owner@mail.com").await;
        let id = insert_book(&pool, owner, "busy", true).await;

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..9 {
            let repo = PgBookRepository::new(pool.clone());
            tasks.spawn(async move { repo.toggle_shareable(id, owner).await });
        }
        while let Some(result) = tasks.join_next().await {
            assert!(result.unwrap().unwrap());
        }

        let book = PgBookRepository::new(pool).find_by_id(id).await.unwrap().unwrap();
        assert!(!book.shareable);
    }
}
