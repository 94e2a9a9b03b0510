use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::models::workflow::WorkflowError;

pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("You must be logged in to do that.")]
    Unauthorized,
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0} not found.")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("R2D2 Pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Password hashing error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Blocking task failed: {0}")]
    Blocking(#[from] actix_web::error::BlockingError),
    #[error("Session error: {0}")]
    Session(String),
    #[error("Upload error: {0}")]
    Upload(String),
}

impl AppError {
    pub fn forbidden(message: &str) -> Self {
        AppError::Forbidden(message.to_string())
    }

    pub fn validation(message: &str) -> Self {
        AppError::Validation(message.to_string())
    }

    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Maps SQLite UNIQUE violations to a user-facing conflict and leaves
/// every other error as an internal database failure.
pub fn conflict_on_unique(err: rusqlite::Error, message: &str) -> AppError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(err),
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::Workflow(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Upload(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Bcrypt(_)
            | AppError::SerdeJson(_)
            | AppError::Io(_)
            | AppError::Blocking(_)
            | AppError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = if self.is_internal() {
            log::error!("Request failed: {}", self);
            GENERIC_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        };
        HttpResponse::build(self.status_code()).json(json!({ "success": false, "error": message }))
    }
}
