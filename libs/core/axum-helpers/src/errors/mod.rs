pub mod handlers;
pub mod responses;

use serde::Serialize;
use utoipa::ToSchema;

/// Detail-style error body.
///
/// Every non-validation error this API returns carries a single
/// human-readable `detail` field:
///
/// ```json
/// {"detail": "Not found."}
/// ```
///
/// Validation failures use a different shape (a field → reasons map) and
/// are rendered by the domain error type directly.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    /// Human-readable error message
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
