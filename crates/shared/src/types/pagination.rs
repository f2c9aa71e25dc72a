//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};

/// Largest page size a client may request.
pub const MAX_LIMIT: u64 = 100;

/// Request parameters for paginated queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u64,
    /// Number of items per page.
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    20
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageRequest {
    /// Creates a page request, clamping both values into range.
    #[must_use]
    pub fn new(page: u64, limit: u64) -> Self {
        Self { page, limit }.normalized()
    }

    /// Returns a copy with `page >= 1` and `1 <= limit <= MAX_LIMIT`.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Calculates the offset for database queries.
    #[must_use]
    pub fn offset(&self) -> u64 {
        let page = self.normalized();
        (page.page - 1).saturating_mul(page.limit)
    }

    /// Returns the limit for database queries.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.normalized().limit
    }
}

/// Response wrapper for paginated data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// The items in the current page.
    pub items: Vec<T>,
    /// Total number of items across all pages.
    pub total: u64,
    /// Current page number.
    pub page: u64,
    /// Items per page.
    pub limit: u64,
}

impl<T> PageResponse<T> {
    /// Creates a new paginated response.
    #[must_use]
    pub fn new(items: Vec<T>, request: &PageRequest, total: u64) -> Self {
        let request = request.normalized();
        Self {
            items,
            total,
            page: request.page,
            limit: request.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 20, 0)]
    #[case(2, 20, 20)]
    #[case(3, 10, 20)]
    #[case(0, 20, 0)]
    fn test_offset(#[case] page: u64, #[case] limit: u64, #[case] expected: u64) {
        assert_eq!(PageRequest { page, limit }.offset(), expected);
    }

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(PageRequest { page: 1, limit: 500 }.limit(), MAX_LIMIT);
        assert_eq!(PageRequest { page: 1, limit: 0 }.limit(), 1);
    }

    #[test]
    fn test_defaults_from_empty_query() {
        let request: PageRequest = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, 20);
    }

    #[test]
    fn test_response_shape() {
        let response = PageResponse::new(vec![1, 2, 3], &PageRequest::new(2, 3), 7);
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["items"], serde_json::json!([1, 2, 3]));
        assert_eq!(json["total"], 7);
        assert_eq!(json["page"], 2);
        assert_eq!(json["limit"], 3);
    }

    #[test]
    fn test_out_of_range_request_is_normalized_in_response() {
        let response: PageResponse<u8> =
            PageResponse::new(vec![], &PageRequest { page: 0, limit: 500 }, 0);
        assert_eq!(response.page, 1);
        assert_eq!(response.limit, MAX_LIMIT);
    }
}
