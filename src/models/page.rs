//! Paging request and response containers

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::book::{BookResponse, BorrowedBookResponse};
use super::feedback::FeedbackResponse;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Highest page index whose offset still fits an i64 at any page size
pub const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE - 1;

/// Paging query parameters (`page` is 0-based)
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

/// Resolved page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

impl PageRequest {
    pub fn new(page: i64, size: i64) -> Self {
        Self {
            page: page.clamp(0, MAX_PAGE),
            size: size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        self.page * self.size
    }

    pub fn limit(&self) -> i64 {
        self.size
    }
}

impl From<&PageQuery> for PageRequest {
    fn from(query: &PageQuery) -> Self {
        PageRequest::new(
            query.page.unwrap_or(0),
            query.size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    PageBookResponse = PageResponse<BookResponse>,
    PageBorrowedBookResponse = PageResponse<BorrowedBookResponse>,
    PageFeedbackResponse = PageResponse<FeedbackResponse>
)]
pub struct PageResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Items on this page
    pub items: Vec<T>,
    /// 0-based page index
    pub page: i64,
    /// Requested page size
    pub size: i64,
    /// Total number of elements across all pages
    pub total_elements: i64,
    pub total_pages: i64,
    pub first: bool,
    pub last: bool,
}

impl<T> PageResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>, request: PageRequest, total_elements: i64) -> Self {
        let total_pages = if total_elements == 0 {
            0
        } else {
            (total_elements + request.size - 1) / request.size
        };
        Self {
            items,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages,
            first: request.page == 0,
            last: request.page + 1 >= total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(items: usize, page: i64, size: i64, total: i64) -> PageResponse<FeedbackResponse> {
        let items = (0..items)
            .map(|_| FeedbackResponse {
                note: 4.0,
                comment: "ok".to_string(),
                own_feedback: false,
            })
            .collect();
        PageResponse::new(items, PageRequest::new(page, size), total)
    }

    #[test]
    fn test_first_of_several_pages() {
        let p = page(10, 0, 10, 25);
        assert_eq!(p.total_pages, 3);
        assert!(p.first);
        assert!(!p.last);
    }

    #[test]
    fn test_last_page() {
        let p = page(5, 2, 10, 25);
        assert!(!p.first);
        assert!(p.last);
    }

    #[test]
    fn test_empty_result_is_first_and_last() {
        let p = page(0, 0, 10, 0);
        assert_eq!(p.total_pages, 0);
        assert!(p.first && p.last);
    }

    #[test]
    fn test_request_is_clamped() {
        let request = PageRequest::new(-3, 10_000);
        assert_eq!(request, PageRequest { page: 0, size: MAX_PAGE_SIZE });
        assert_eq!(PageRequest::new(2, 0).size, 1);
        assert_eq!(PageRequest::new(3, 20).offset(), 60);
    }

    #[test]
    fn test_huge_page_index_does_not_overflow() {
        let request = PageRequest::from(&PageQuery {
            page: Some(i64::MAX),
            size: Some(MAX_PAGE_SIZE),
        });
        assert_eq!(request.page, MAX_PAGE);
        assert!(request.offset() > 0);

        let p: PageResponse<FeedbackResponse> = PageResponse::new(Vec::new(), request, 3);
        assert!(p.last);
        assert!(!p.first);
    }

    #[test]
    fn test_query_defaults() {
        let request = PageRequest::from(&PageQuery::default());
        assert_eq!(request, PageRequest { page: 0, size: DEFAULT_PAGE_SIZE });
    }
}
