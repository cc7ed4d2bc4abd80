//! Reusable OpenAPI response types for consistent API documentation.

use super::ErrorDetail;
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToResponse;

#[derive(ToResponse)]
#[response(
    description = "Resource not found",
    content_type = "application/json",
    example = json!({"detail": "Not found."})
)]
pub struct NotFoundResponse(pub ErrorDetail);

#[derive(ToResponse)]
#[response(
    description = "Bad Request - Validation Error",
    content_type = "application/json",
    example = json!({
        "name": ["This field may not be blank."],
        "email": ["Enter a valid email address."]
    })
)]
pub struct ValidationErrorResponse(pub serde_json::Value);

#[derive(ToResponse)]
#[response(
    description = "Internal Server Error",
    content_type = "application/json",
    example = json!({"detail": "Internal server error."})
)]
pub struct InternalServerErrorResponse(pub ErrorDetail);
