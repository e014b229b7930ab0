//! Book model, request and response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Book row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author_name: String,
    pub isbn: String,
    pub synopsis: Option<String>,
    /// Stored cover reference returned by the file storage
    pub book_cover: Option<String>,
    pub archived: bool,
    pub shareable: bool,
    pub owner_id: i32,
    pub created_by: i32,
    pub last_modified_by: Option<i32>,
    pub created_date: DateTime<Utc>,
    pub last_modified_date: Option<DateTime<Utc>>,
}

impl Book {
    /// Ownership is decided on the creator audit field
    pub fn is_owned_by(&self, user_id: i32) -> bool {
        self.created_by == user_id
    }

    /// Only shareable, non-archived books take part in lending and feedback
    pub fn is_lendable(&self) -> bool {
        self.shareable && !self.archived
    }

    pub fn ensure_lendable(&self, message: &str) -> AppResult<()> {
        if self.is_lendable() {
            Ok(())
        } else {
            Err(AppError::OperationNotPermitted(message.to_string()))
        }
    }

    pub fn ensure_owned_by(&self, user_id: i32, message: &str) -> AppResult<()> {
        if self.is_owned_by(user_id) {
            Ok(())
        } else {
            Err(AppError::OperationNotPermitted(message.to_string()))
        }
    }

    pub fn ensure_not_owned_by(&self, user_id: i32, message: &str) -> AppResult<()> {
        if self.is_owned_by(user_id) {
            Err(AppError::OperationNotPermitted(message.to_string()))
        } else {
            Ok(())
        }
    }
}

/// Book joined with its owner name and average rating
#[derive(Debug, Clone, FromRow)]
pub struct BookDetails {
    #[sqlx(flatten)]
    pub book: Book,
    pub owner_name: String,
    pub rate: f64,
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookRequest {
    #[validate(length(min = 1, message = "Title is mandatory"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author name is mandatory"))]
    pub author_name: String,
    #[validate(length(min = 1, message = "ISBN is mandatory"))]
    pub isbn: String,
    pub synopsis: Option<String>,
    #[serde(default)]
    pub shareable: bool,
}

impl BookRequest {
    /// Trim text fields so whitespace-only values fail validation
    pub fn trimmed(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            author_name: self.author_name.trim().to_string(),
            isbn: self.isbn.trim().to_string(),
            synopsis: self
                .synopsis
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            shareable: self.shareable,
        }
    }
}

/// Fields of a book about to be inserted
#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author_name: String,
    pub isbn: String,
    pub synopsis: Option<String>,
    pub shareable: bool,
    pub owner_id: i32,
}

impl NewBook {
    pub fn from_request(request: BookRequest, owner_id: i32) -> Self {
        Self {
            title: request.title,
            author_name: request.author_name,
            isbn: request.isbn,
            synopsis: request.synopsis,
            shareable: request.shareable,
            owner_id,
        }
    }
}

/// Book as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookResponse {
    pub id: i32,
    pub title: String,
    pub author_name: String,
    pub isbn: String,
    pub synopsis: Option<String>,
    /// Owner full name
    pub owner: String,
    /// Base64-encoded cover image
    pub cover: Option<String>,
    /// Average feedback note
    pub rate: f64,
    pub archived: bool,
    pub shareable: bool,
}

impl BookResponse {
    pub fn from_details(details: BookDetails, cover: Option<String>) -> Self {
        let BookDetails { book, owner_name, rate } = details;
        Self {
            id: book.id,
            title: book.title,
            author_name: book.author_name,
            isbn: book.isbn,
            synopsis: book.synopsis,
            owner: owner_name,
            cover,
            rate,
            archived: book.archived,
            shareable: book.shareable,
        }
    }
}

/// Book seen through one of its lending transactions
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BorrowedBookResponse {
    /// Book ID
    pub id: i32,
    pub title: String,
    pub author_name: String,
    pub isbn: String,
    pub rate: f64,
    pub returned: bool,
    pub return_approved: bool,
}
