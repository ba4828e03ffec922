//! API Routes
//!
//! Route handlers organized by functionality.

pub mod collections;
pub mod health;
pub mod search;
pub mod stream;
pub mod views;

use crate::api::error::{ApiError, ApiResult};

/// Longest trailing window a request may ask for
pub const MAX_QUERY_HOURS: i64 = 24 * 30;

/// Validate a `hours` query parameter
pub(crate) fn check_hours(hours: i64) -> ApiResult<i64> {
    if !(1..=MAX_QUERY_HOURS).contains(&hours) {
        return Err(ApiError::Validation(format!(
            "hours must be between 1 and {}",
            MAX_QUERY_HOURS
        )));
    }
    Ok(hours)
}
