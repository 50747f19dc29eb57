use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::manager::chat_manager::{self, MAX_MESSAGE_CHARS};
use crate::manager::login_manager;

/// Per-field validation messages, shaped like `{"field": ["message", ...]}`.
#[derive(Serialize, Debug, Default)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug)]
pub enum ApiError {
    Unauthenticated,
    InvalidCredentials,
    Validation(FieldErrors),
    Internal(String),
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<login_manager::Error> for ApiError {
    fn from(err: login_manager::Error) -> Self {
        match err {
            login_manager::Error::UsernameTaken => ApiError::Validation(FieldErrors::single(
                "username",
                "A member with this username already exists.",
            )),
            login_manager::Error::WeakPassword => ApiError::Validation(FieldErrors::single(
                "password",
                "Password must be at least 8 characters long.",
            )),
            login_manager::Error::InvalidCredentials => ApiError::InvalidCredentials,
            login_manager::Error::Hash(e) => ApiError::Internal(e.to_string()),
            login_manager::Error::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<chat_manager::Error> for ApiError {
    fn from(err: chat_manager::Error) -> Self {
        match err {
            chat_manager::Error::Blank => {
                ApiError::Validation(FieldErrors::single("text", "This field may not be blank."))
            }
            chat_manager::Error::TooLong => ApiError::Validation(FieldErrors::single(
                "text",
                format!("Ensure this field has no more than {MAX_MESSAGE_CHARS} characters."),
            )),
            chat_manager::Error::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"detail": "Authentication credentials were not provided."})),
            )
                .into_response(),
            ApiError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                Json(json!({"detail": "Invalid username or password."})),
            )
                .into_response(),
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            }
            ApiError::Internal(message) => {
                // Logged server-side, never echoed to the client.
                tracing::error!(error = %message, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"detail": "Internal server error."})),
                )
                    .into_response()
            }
        }
    }
}
