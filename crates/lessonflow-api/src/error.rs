//! Error responses shared by all handlers

use axum::{http::StatusCode, Json};
use lessonflow_publisher::PublishError;
use sea_orm::{DbErr, SqlErr};
use tracing::error;

use crate::models::ErrorResponse;

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<T, ApiError>;

pub fn api_error(status: StatusCode, message: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: Some(code.to_string()),
        }),
    )
}

pub fn db_error(e: DbErr) -> ApiError {
    error!("Database error: {}", e);
    api_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Database error: {}", e),
        "DB_ERROR",
    )
}

pub fn not_found(what: &str) -> ApiError {
    api_error(
        StatusCode::NOT_FOUND,
        format!("{} not found", what),
        "NOT_FOUND",
    )
}

pub fn validation_error(message: impl Into<String>) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, message, "VALIDATION_ERROR")
}

pub fn conflict(message: impl Into<String>) -> ApiError {
    api_error(StatusCode::CONFLICT, message, "CONFLICT")
}

pub fn forbidden(message: impl Into<String>) -> ApiError {
    api_error(StatusCode::FORBIDDEN, message, "FORBIDDEN")
}

/// Map a write error, turning unique-constraint races into 409
pub fn write_error(e: DbErr, conflict_message: &str) -> ApiError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => conflict(conflict_message),
        _ => db_error(e),
    }
}

pub fn publish_error(e: PublishError) -> ApiError {
    match e {
        PublishError::Database(e) => db_error(e),
        PublishError::LessonNotFound(_) => not_found("Lesson"),
        PublishError::TermNotFound(_) => not_found("Term"),
        PublishError::InvalidLesson { reason, .. } => validation_error(reason),
    }
}
