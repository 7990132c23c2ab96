//! Shared query parameter types for API handlers.

use empathy_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIMIT, MAX_LIMIT};
use serde::Deserialize;

use crate::error::{AppError, AppResult};

/// Generic pagination parameters (`?limit=&offset=`).
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationParams {
    /// Clamped `(limit, offset)`.
    pub fn resolve(&self) -> (i64, i64) {
        (
            clamp_limit(self.limit, DEFAULT_LIMIT, MAX_LIMIT),
            clamp_offset(self.offset),
        )
    }
}

/// Parse an optional RFC 3339 timestamp query value.
pub fn parse_timestamp_param(
    name: &str,
    value: Option<&str>,
) -> AppResult<Option<chrono::DateTime<chrono::Utc>>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v
            .parse::<chrono::DateTime<chrono::Utc>>()
            .map(Some)
            .map_err(|_| {
                AppError::BadRequest(format!(
                    "Invalid '{name}' date: expected RFC 3339, e.g. 2026-01-31T00:00:00Z"
                ))
            }),
        None => Ok(None),
    }
}
