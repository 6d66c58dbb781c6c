//! Error types for the Bibliotheek server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error codes returned in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchData = 4,
    BadValue = 5,
    Duplicate = 6,
    BookAlreadyLoaned = 7,
    LoanAlreadyReturned = 8,
    HasOpenLoans = 9,
    Forbidden = 10,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// The book already has an open loan (`ux_loans_book_open`)
    #[error("Book already loaned: {0}")]
    BookAlreadyLoaned(String),

    #[error("Loan already returned: {0}")]
    LoanAlreadyReturned(String),

    #[error("Open loans remain: {0}")]
    HasOpenLoans(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),
}

impl AppError {
    /// HTTP status and error code for this error
    pub fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized),
            AppError::Authorization(_) => (StatusCode::FORBIDDEN, ErrorCode::Forbidden),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchData),
            AppError::Validation(_) | AppError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue)
            }
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DbFailure),
            AppError::Conflict(_) => (StatusCode::CONFLICT, ErrorCode::Duplicate),
            AppError::BookAlreadyLoaned(_) => (StatusCode::CONFLICT, ErrorCode::BookAlreadyLoaned),
            AppError::LoanAlreadyReturned(_) => {
                (StatusCode::CONFLICT, ErrorCode::LoanAlreadyReturned)
            }
            AppError::HasOpenLoans(_) => (StatusCode::CONFLICT, ErrorCode::HasOpenLoans),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
            AppError::BusinessRule(_) => (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::Failure),
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                "Database error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::Authentication(msg)
            | AppError::Authorization(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::BookAlreadyLoaned(msg)
            | AppError::LoanAlreadyReturned(msg)
            | AppError::HasOpenLoans(msg)
            | AppError::BadRequest(msg)
            | AppError::BusinessRule(msg) => msg,
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => format!("{}: {}", field, msg),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect();
        messages.sort();
        AppError::Validation(messages.join(", "))
    }
}

/// True when `err` is a unique violation raised by the named constraint or index
pub fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    let Some(db_err) = err.as_database_error() else {
        return false;
    };

    db_err.is_unique_violation() && db_err.constraint() == Some(constraint)
}

/// True when `err` is a foreign key violation raised by the named constraint
pub fn is_foreign_key_violation(err: &sqlx::Error, constraint: &str) -> bool {
    let Some(db_err) = err.as_database_error() else {
        return false;
    };

    db_err.is_foreign_key_violation() && db_err.constraint() == Some(constraint)
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(email(message = "Invalid email format"))]
        email: String,
    }

    #[test]
    fn open_loan_conflicts_map_to_409() {
        let (status, code) = AppError::BookAlreadyLoaned("book 3".into()).status_and_code();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, ErrorCode::BookAlreadyLoaned);

        let (status, _) = AppError::LoanAlreadyReturned("loan 1".into()).status_and_code();
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn auth_errors_map_to_401_and_403() {
        assert_eq!(
            AppError::Authentication("x".into()).status_and_code().0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Authorization("x".into()).status_and_code().0,
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn every_error_carries_a_nonzero_code() {
        let errors = [
            AppError::Authentication("x".into()),
            AppError::Authorization("x".into()),
            AppError::NotFound("x".into()),
            AppError::Validation("x".into()),
            AppError::Database(sqlx::Error::RowNotFound),
            AppError::Conflict("x".into()),
            AppError::BookAlreadyLoaned("x".into()),
            AppError::LoanAlreadyReturned("x".into()),
            AppError::HasOpenLoans("x".into()),
            AppError::BadRequest("x".into()),
            AppError::Internal("x".into()),
            AppError::BusinessRule("x".into()),
        ];
        for err in &errors {
            assert_ne!(err.status_and_code().1 as u32, 0, "{:?}", err);
        }
    }

    #[test]
    fn database_errors_are_hidden_from_clients() {
        let response = AppError::Database(sqlx::Error::RowNotFound).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn non_database_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound, "ux_loans_book_open"));
        assert!(!is_foreign_key_violation(&sqlx::Error::PoolTimedOut, "books_category_id_fkey"));
    }

    #[test]
    fn validation_errors_name_the_field() {
        let err: AppError = Sample {
            email: "not-an-email".into(),
        }
        .validate()
        .unwrap_err()
        .into();

        match err {
            AppError::Validation(msg) => assert_eq!(msg, "email: Invalid email format"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
