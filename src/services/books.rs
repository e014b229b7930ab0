//! Book catalog service

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{BookDetails, BookRequest, BookResponse, BorrowedBookResponse, NewBook},
        page::{PageRequest, PageResponse},
        user::Identity,
    },
    repository::Repository,
    services::{find_book, storage::FileStorage},
};

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
    storage: Arc<dyn FileStorage>,
}

impl BooksService {
    pub fn new(repository: Repository, storage: Arc<dyn FileStorage>) -> Self {
        Self { repository, storage }
    }

    /// Register a new book owned by the caller
    pub async fn create(&self, request: BookRequest, caller: &Identity) -> AppResult<i32> {
        let request = request.trimmed();
        request.validate()?;

        let id = self
            .repository
            .books
            .create(NewBook::from_request(request, caller.user_id))
            .await?;
        tracing::info!("User {} created book {}", caller.user_id, id);
        Ok(id)
    }

    pub async fn find_by_id(&self, book_id: i32) -> AppResult<BookResponse> {
        let details = self
            .repository
            .books
            .find_details(book_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No book found with the ID:: {}", book_id))
            })?;
        Ok(self.to_response(details).await)
    }

    /// Books visible to the caller: shared books plus the caller's own
    pub async fn list_catalog(
        &self,
        page: PageRequest,
        caller: &Identity,
    ) -> AppResult<PageResponse<BookResponse>> {
        let (books, total) = self.repository.books.find_displayable(caller.user_id, page).await?;
        Ok(PageResponse::new(self.to_responses(books).await, page, total))
    }

    /// Caller's own books regardless of their flags
    pub async fn list_owned(
        &self,
        page: PageRequest,
        caller: &Identity,
    ) -> AppResult<PageResponse<BookResponse>> {
        let (books, total) = self.repository.books.find_by_owner(caller.user_id, page).await?;
        Ok(PageResponse::new(self.to_responses(books).await, page, total))
    }

    /// Transactions where the caller is the borrower
    pub async fn list_borrowed(
        &self,
        page: PageRequest,
        caller: &Identity,
    ) -> AppResult<PageResponse<BorrowedBookResponse>> {
        let (items, total) = self
            .repository
            .histories
            .find_all_borrowed(caller.user_id, page)
            .await?;
        Ok(PageResponse::new(items, page, total))
    }

    /// Transactions on books the caller owns
    pub async fn list_returned(
        &self,
        page: PageRequest,
        caller: &Identity,
    ) -> AppResult<PageResponse<BorrowedBookResponse>> {
        let (items, total) = self
            .repository
            .histories
            .find_all_returned(caller.user_id, page)
            .await?;
        Ok(PageResponse::new(items, page, total))
    }

    pub async fn toggle_shareable(&self, book_id: i32, caller: &Identity) -> AppResult<i32> {
        let book = find_book(&self.repository, book_id).await?;
        book.ensure_owned_by(caller.user_id, "You cannot update others books shareable status")?;

        if !self.repository.books.toggle_shareable(book_id, caller.user_id).await? {
            return Err(AppError::NotFound(format!("No book found with the ID:: {}", book_id)));
        }
        Ok(book_id)
    }

    pub async fn toggle_archived(&self, book_id: i32, caller: &Identity) -> AppResult<i32> {
        let book = find_book(&self.repository, book_id).await?;
        book.ensure_owned_by(caller.user_id, "You cannot update others books archived status")?;

        if !self.repository.books.toggle_archived(book_id, caller.user_id).await? {
            return Err(AppError::NotFound(format!("No book found with the ID:: {}", book_id)));
        }
        Ok(book_id)
    }

    /// Store a cover image and attach it to the book. Owner only.
    pub async fn upload_cover(
        &self,
        book_id: i32,
        content: Vec<u8>,
        file_name: Option<String>,
        caller: &Identity,
    ) -> AppResult<()> {
        let book = find_book(&self.repository, book_id).await?;
        book.ensure_owned_by(
            caller.user_id,
            "You cannot update the cover of a book you do not own",
        )?;

        let reference = self
            .storage
            .save(content, file_name, caller.user_id.to_string())
            .await?;
        self.repository
            .books
            .set_cover(book_id, reference, caller.user_id)
            .await
    }

    async fn to_response(&self, details: BookDetails) -> BookResponse {
        let cover = match details.book.book_cover.clone() {
            Some(reference) => self
                .storage
                .read(reference)
                .await
                .map(|bytes| STANDARD.encode(bytes)),
            None => None,
        };
        BookResponse::from_details(details, cover)
    }

    async fn to_responses(&self, books: Vec<BookDetails>) -> Vec<BookResponse> {
        let mut responses = Vec::with_capacity(books.len());
        for details in books {
            responses.push(self.to_response(details).await);
        }
        responses
    }
}
