//! Offset pagination for the admin list endpoints.

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Default number of items to return per page.
pub const DEFAULT_LIMIT: i64 = 10;

/// Maximum number of items that can be requested per page.
pub const MAX_LIMIT: i64 = 100;

/// `skip` / `limit` query parameters. `limit` is clamped to `1..=100`.
#[serde_as]
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// Number of items to skip (default: 0)
    #[param(default = 0, minimum = 0)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub skip: Option<i64>,

    /// Maximum number of items to return (default: 10, max: 100)
    #[param(default = 10, minimum = 1, maximum = 100)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub limit: Option<i64>,
}

impl Pagination {
    #[inline]
    pub fn skip(&self) -> i64 {
        self.skip.unwrap_or(0).max(0)
    }

    #[inline]
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    #[inline]
    pub fn params(&self) -> (i64, i64) {
        (self.skip(), self.limit())
    }
}

/// A page of results with the total count before pagination
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total_count: i64, skip: i64, limit: i64) -> Self {
        Self {
            items,
            total_count,
            skip,
            limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let p = Pagination::default();
        assert_eq!(p.params(), (0, DEFAULT_LIMIT));
    }

    #[test]
    fn test_limit_clamping() {
        for (requested, expected) in [(0, 1), (-5, 1), (1000, MAX_LIMIT), (50, 50)] {
            let p = Pagination {
                skip: None,
                limit: Some(requested),
            };
            assert_eq!(p.limit(), expected, "limit={requested}");
        }
    }

    #[test]
    fn test_negative_skip_is_zero() {
        let p = Pagination {
            skip: Some(-10),
            limit: None,
        };
        assert_eq!(p.skip(), 0);
    }

    #[test]
    fn test_parses_from_query_strings() {
        let uri = "/users?skip=20&limit=5".parse().unwrap();
        let axum::extract::Query(p) = axum::extract::Query::<Pagination>::try_from_uri(&uri).unwrap();
        assert_eq!(p.params(), (20, 5));
    }
}
