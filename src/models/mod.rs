//! Data models for Book Network

pub mod book;
pub mod feedback;
pub mod history;
pub mod page;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookDetails, BookRequest, BookResponse, BorrowedBookResponse};
pub use feedback::{Feedback, FeedbackRequest, FeedbackResponse};
pub use history::{BookTransactionHistory, LendingState};
pub use page::{PageQuery, PageRequest, PageResponse};
pub use user::{Identity, User, UserClaims};
