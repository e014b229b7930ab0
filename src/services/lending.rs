//! Lending workflow: borrow -> return -> approve
//!
//! Every operation re-reads the book and checks the caller against it before
//! touching the transaction. Several borrowers may hold the same book at the
//! same time; only one active transaction per (book, borrower) is allowed.

use crate::{
    error::{AppError, AppResult},
    models::{history, user::Identity},
    repository::{histories::ALREADY_BORROWED_MESSAGE, Repository},
    services::find_book,
};

const NOT_LENDABLE_MESSAGE: &str =
    "The requested book cannot be borrowed since it is archived or not shareable";

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
}

impl LendingService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Open a transaction in BORROWED state. Returns the transaction id.
    pub async fn borrow(&self, book_id: i32, caller: &Identity) -> AppResult<i32> {
        let book = find_book(&self.repository, book_id).await?;
        book.ensure_lendable(NOT_LENDABLE_MESSAGE)?;
        book.ensure_not_owned_by(caller.user_id, "You cannot borrow your own book")?;

        if self
            .repository
            .histories
            .is_already_borrowed_by_user(book_id, caller.user_id)
            .await?
        {
            return Err(AppError::OperationNotPermitted(ALREADY_BORROWED_MESSAGE.to_string()));
        }

        let id = self.repository.histories.create(book_id, caller.user_id).await?;
        tracing::info!(
            "User {} borrowed book {} (transaction {})",
            caller.user_id,
            book_id,
            id
        );
        Ok(id)
    }

    /// BORROWED -> RETURNED, by the borrower. Returns the transaction id.
    pub async fn return_book(&self, book_id: i32, caller: &Identity) -> AppResult<i32> {
        let book = find_book(&self.repository, book_id).await?;
        book.ensure_lendable(NOT_LENDABLE_MESSAGE)?;
        book.ensure_not_owned_by(caller.user_id, "You cannot borrow or return your own book")?;

        let mut transaction = self
            .repository
            .histories
            .find_borrowed_by_book_and_user(book_id, caller.user_id)
            .await?
            .ok_or_else(|| {
                AppError::OperationNotPermitted(history::NOT_BORROWED_MESSAGE.to_string())
            })?;
        transaction.mark_returned()?;

        if !self
            .repository
            .histories
            .mark_returned(transaction.id, caller.user_id)
            .await?
        {
            return Err(AppError::OperationNotPermitted(history::NOT_BORROWED_MESSAGE.to_string()));
        }

        tracing::info!(
            "User {} returned book {} (transaction {})",
            caller.user_id,
            book_id,
            transaction.id
        );
        Ok(transaction.id)
    }

    /// RETURNED -> APPROVED, by the book owner. Returns the transaction id.
    pub async fn approve_return(&self, book_id: i32, caller: &Identity) -> AppResult<i32> {
        let book = find_book(&self.repository, book_id).await?;
        book.ensure_lendable(NOT_LENDABLE_MESSAGE)?;
        book.ensure_owned_by(
            caller.user_id,
            "You cannot approve the return of a book you do not own",
        )?;

        let mut transaction = self
            .repository
            .histories
            .find_returned_by_book_and_owner(book_id, caller.user_id)
            .await?
            .ok_or_else(|| {
                AppError::OperationNotPermitted(history::NOT_RETURNED_MESSAGE.to_string())
            })?;
        transaction.approve_return()?;

        if !self
            .repository
            .histories
            .approve_return(transaction.id, caller.user_id)
            .await?
        {
            return Err(AppError::OperationNotPermitted(history::NOT_RETURNED_MESSAGE.to_string()));
        }

        tracing::info!(
            "User {} approved return of book {} (transaction {})",
            caller.user_id,
            book_id,
            transaction.id
        );
        Ok(transaction.id)
    }
}
