//! Feedback service

use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        feedback::{FeedbackRequest, FeedbackResponse},
        page::{PageRequest, PageResponse},
        user::Identity,
    },
    repository::{feedbacks::NewFeedback, Repository},
    services::find_book,
};

#[derive(Clone)]
pub struct FeedbackService {
    repository: Repository,
}

impl FeedbackService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Rate a shareable book the caller does not own
    pub async fn submit(&self, request: FeedbackRequest, caller: &Identity) -> AppResult<i32> {
        let request = FeedbackRequest {
            comment: request.comment.trim().to_string(),
            ..request
        };
        request.validate()?;

        let book = find_book(&self.repository, request.book_id).await?;
        book.ensure_lendable("You cannot give a feedback for an archived or not shareable book")?;
        book.ensure_not_owned_by(caller.user_id, "You cannot give a feedback to your own book")?;

        let id = self
            .repository
            .feedbacks
            .create(NewFeedback {
                note: request.note,
                comment: request.comment,
                book_id: book.id,
                created_by: caller.user_id,
            })
            .await?;
        tracing::info!("User {} left feedback {} on book {}", caller.user_id, id, book.id);
        Ok(id)
    }

    /// Feedback on a book, flagged with whether the caller wrote it
    pub async fn list_for_book(
        &self,
        book_id: i32,
        page: PageRequest,
        caller: &Identity,
    ) -> AppResult<PageResponse<FeedbackResponse>> {
        find_book(&self.repository, book_id).await?;

        let (feedbacks, total) = self.repository.feedbacks.find_all_by_book(book_id, page).await?;
        let items = feedbacks
            .iter()
            .map(|f| f.to_response(caller.user_id))
            .collect();
        Ok(PageResponse::new(items, page, total))
    }
}
