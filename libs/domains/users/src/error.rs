use std::collections::BTreeMap;
use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_helpers::ErrorDetail;
use serde::Serialize;
use thiserror::Error;

use crate::validation::MSG_DUPLICATE_EMAIL;

/// Map of field name to every reason it failed validation.
///
/// Serialized as-is, so a 400 body reads
/// `{"name": ["This field may not be blank."]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, reason: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, reason);
        errors
    }

    pub fn add(&mut self, field: &str, reason: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(reason.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, reasons) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, reasons.join(" "))?;
            first = false;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("Invalid page number")]
    InvalidPage,

    #[error("Invalid input: {0}")]
    Validation(FieldErrors),

    #[error("User with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        match self {
            UserError::NotFound(id) => {
                tracing::debug!(user_id = id, "User not found");
                (StatusCode::NOT_FOUND, Json(ErrorDetail::new("Not found."))).into_response()
            }
            UserError::InvalidPage => (
                StatusCode::NOT_FOUND,
                Json(ErrorDetail::new("Invalid page.")),
            )
                .into_response(),
            UserError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            }
            // Storage-level unique violations surface exactly like the
            // application-level duplicate check.
            UserError::DuplicateEmail(email) => {
                tracing::debug!(email = %email, "Duplicate email rejected");
                (
                    StatusCode::BAD_REQUEST,
                    Json(FieldErrors::single("email", MSG_DUPLICATE_EMAIL)),
                )
                    .into_response()
            }
            UserError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorDetail::new("Internal server error.")),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_renders_detail() {
        let response = UserError::NotFound(42).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["detail"], "Not found.");
    }

    #[tokio::test]
    async fn test_validation_renders_field_map() {
        let mut errors = FieldErrors::new();
        errors.add("name", "This field may not be blank.");

        let response = UserError::Validation(errors).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let value = body_json(response).await;
        assert_eq!(value, serde_json::json!({"name": ["This field may not be blank."]}));
    }

    #[tokio::test]
    async fn test_duplicate_email_renders_as_validation_error() {
        let response = UserError::DuplicateEmail("x@y.com".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let value = body_json(response).await;
        assert_eq!(value["email"][0], MSG_DUPLICATE_EMAIL);
    }

    #[tokio::test]
    async fn test_internal_error_does_not_leak_detail() {
        let response =
            UserError::Internal("connection refused at 10.0.0.3:5432".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let value = body_json(response).await;
        assert_eq!(value["detail"], "Internal server error.");
    }

    #[test]
    fn test_field_errors_accumulate_reasons() {
        let mut errors = FieldErrors::new();
        errors.add("email", "Enter a valid email address.");
        errors.add("email", "Ensure this field has no more than 254 characters.");

        let value = serde_json::to_value(&errors).unwrap();
        assert_eq!(value["email"].as_array().unwrap().len(), 2);
    }
}
