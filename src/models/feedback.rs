//! Feedback model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Feedback row from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Feedback {
    pub id: i32,
    pub note: f64,
    pub comment: String,
    pub book_id: i32,
    pub created_by: i32,
    pub last_modified_by: Option<i32>,
    pub created_date: DateTime<Utc>,
    pub last_modified_date: Option<DateTime<Utc>>,
}

impl Feedback {
    pub fn to_response(&self, caller_id: i32) -> FeedbackResponse {
        FeedbackResponse {
            note: self.note,
            comment: self.comment.clone(),
            own_feedback: self.created_by == caller_id,
        }
    }
}

/// Submit feedback request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct FeedbackRequest {
    /// Rating between 0 and 5
    #[validate(range(min = 0.0, max = 5.0, message = "Note must be between 0 and 5"))]
    pub note: f64,
    #[validate(length(min = 1, message = "Comment is mandatory"))]
    pub comment: String,
    pub book_id: i32,
}

/// Feedback as seen by the caller
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FeedbackResponse {
    pub note: f64,
    pub comment: String,
    /// True when the caller wrote this feedback
    pub own_feedback: bool,
}
