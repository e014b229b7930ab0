//! Book transaction history: one borrow lifecycle of a book by a borrower

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

pub const NOT_BORROWED_MESSAGE: &str = "You did not borrow this book";
pub const NOT_RETURNED_MESSAGE: &str =
    "The book is not returned yet. You cannot approve its return";

/// Lending state of a transaction. A transaction that does not exist is the
/// implicit initial state; `Approved` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LendingState {
    Borrowed,
    Returned,
    Approved,
}

/// Transaction row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookTransactionHistory {
    pub id: i32,
    pub book_id: i32,
    /// Borrower
    pub user_id: i32,
    pub returned: bool,
    pub return_approved: bool,
    pub created_by: i32,
    pub last_modified_by: Option<i32>,
    pub created_date: DateTime<Utc>,
    pub last_modified_date: Option<DateTime<Utc>>,
}

impl BookTransactionHistory {
    pub fn state(&self) -> LendingState {
        match (self.returned, self.return_approved) {
            (_, true) => LendingState::Approved,
            (true, false) => LendingState::Returned,
            (false, false) => LendingState::Borrowed,
        }
    }

    /// BORROWED -> RETURNED
    pub fn mark_returned(&mut self) -> AppResult<()> {
        if self.state() != LendingState::Borrowed {
            return Err(AppError::OperationNotPermitted(NOT_BORROWED_MESSAGE.to_string()));
        }
        self.returned = true;
        Ok(())
    }

    /// RETURNED -> APPROVED
    pub fn approve_return(&mut self) -> AppResult<()> {
        if self.state() != LendingState::Returned {
            return Err(AppError::OperationNotPermitted(NOT_RETURNED_MESSAGE.to_string()));
        }
        self.return_approved = true;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn transaction(id: i32, book_id: i32, user_id: i32) -> BookTransactionHistory {
        BookTransactionHistory {
            id,
            book_id,
            user_id,
            returned: false,
            return_approved: false,
            created_by: user_id,
            last_modified_by: None,
            created_date: Utc::now(),
            last_modified_date: None,
        }
    }

    #[test]
    fn test_full_lifecycle() {
        let mut tx = transaction(1, 10, 2);
        assert_eq!(tx.state(), LendingState::Borrowed);

        tx.mark_returned().unwrap();
        assert_eq!(tx.state(), LendingState::Returned);

        tx.approve_return().unwrap();
        assert_eq!(tx.state(), LendingState::Approved);
    }

    #[test]
    fn test_cannot_approve_before_return() {
        let mut tx = transaction(1, 10, 2);
        let err = tx.approve_return().unwrap_err();
        assert!(matches!(err, AppError::OperationNotPermitted(ref m) if m == NOT_RETURNED_MESSAGE));
        assert!(!tx.return_approved);
    }

    #[test]
    fn test_approved_is_terminal() {
        let mut tx = transaction(1, 10, 2);
        tx.mark_returned().unwrap();
        tx.approve_return().unwrap();

        assert!(tx.mark_returned().is_err());
        assert!(tx.approve_return().is_err());
        assert_eq!(tx.state(), LendingState::Approved);
    }

    #[test]
    fn test_cannot_return_twice() {
        let mut tx = transaction(1, 10, 2);
        tx.mark_returned().unwrap();
        let err = tx.mark_returned().unwrap_err();
        assert!(matches!(err, AppError::OperationNotPermitted(ref m) if m == NOT_BORROWED_MESSAGE));
    }
}
