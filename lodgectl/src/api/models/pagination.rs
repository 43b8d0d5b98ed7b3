//! `skip`/`limit` paging shared by the list endpoints.

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use utoipa::{IntoParams, ToSchema};

/// Page size when the client does not ask for one.
pub const DEFAULT_LIMIT: i64 = 10;

/// Largest page a client can ask for.
pub const MAX_LIMIT: i64 = 100;

/// Offset paging parameters.
///
/// Values arrive as strings when flattened into a larger query struct, hence `DisplayFromStr`.
/// Out-of-range values are clamped rather than rejected: a negative `skip` reads as 0 and `limit`
/// is kept within `1..=100`.
#[serde_as]
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct Pagination {
    /// Rows to skip (default: 0)
    #[param(default = 0, minimum = 0)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub skip: Option<i64>,

    /// Page size (default: 10, max: 100)
    #[param(default = 10, minimum = 1, maximum = 100)]
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub limit: Option<i64>,
}

impl Pagination {
    pub fn skip(&self) -> i64 {
        self.skip.map_or(0, |skip| skip.max(0))
    }

    pub fn limit(&self) -> i64 {
        self.limit.map_or(DEFAULT_LIMIT, |limit| limit.clamp(1, MAX_LIMIT))
    }

    /// `(skip, limit)` after clamping
    pub fn params(&self) -> (i64, i64) {
        (self.skip(), self.limit())
    }
}

/// One page of a list together with the size of the whole filtered list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T: ToSchema> {
    pub data: Vec<T>,
    /// Rows matching the filters, ignoring paging
    pub total_count: i64,
    pub skip: i64,
    pub limit: i64,
}

impl<T: ToSchema> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total_count: i64, skip: i64, limit: i64) -> Self {
        Self {
            data,
            total_count,
            skip,
            limit,
        }
    }
}
