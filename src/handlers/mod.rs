// handlers/mod.rs - two security tiers
//
// Public (no auth): token acquisition, verification, job applications
// Protected (bearer JWT): users, companies, jobs
pub mod protected;
pub mod public;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Deserialize a request body into its typed form; unknown keys are dropped.
pub(crate) fn parse_body<T: DeserializeOwned>(payload: Value) -> Result<T, ApiError> {
    serde_json::from_value(payload).map_err(|e| ApiError::invalid_json(format!("Invalid request body: {}", e)))
}

/// Row id from a path segment.
pub(crate) fn parse_id(raw: &str) -> Result<i32, ApiError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| ApiError::bad_request(format!("Invalid id '{}'", raw)))
}

/// A present, non-blank string field.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
