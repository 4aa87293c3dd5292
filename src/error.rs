/// Unified error handling for the credential service.
///
/// Domain-specific error kinds are kept in closed enums; `AppError` is the
/// single type handlers return, and the `ResponseError` impl at the bottom
/// is the only place error kinds are mapped to HTTP status codes.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// Validation errors for input data
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(&'static str),
    TooShort(&'static str, usize),
    TooLong(&'static str, usize),
    InvalidFormat(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
        }
    }
}

impl StdError for ValidationError {}

/// Business failures of the credential subsystem.
///
/// Every operation in the magic-link, token and invitation services fails
/// with one of these kinds; nothing else reaches clients as a 4xx.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Signup for an email that already has a user record
    EmailAlreadyExists,
    /// Signup while the verified-email marker is still live
    EmailAlreadyVerified,
    /// A code or throttle gate is still live for this email
    TooManyRequests,
    /// Code mismatch, malformed/expired/used token, or sign-in for an
    /// unknown user
    InvalidToken,
    /// No refresh session stored for this user
    RefreshTokenNotFound,
    /// Stored refresh hash does not match; the session has been revoked
    InvalidRefreshToken,
    /// Authenticated identity does not match the invite's target email
    AccessDenied,
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialError::EmailAlreadyExists => write!(f, "Email is already registered"),
            CredentialError::EmailAlreadyVerified => write!(f, "Email is already verified"),
            CredentialError::TooManyRequests => {
                write!(f, "Too many requests, wait before requesting a new code")
            }
            CredentialError::InvalidToken => write!(f, "Invalid token"),
            CredentialError::RefreshTokenNotFound => write!(f, "Refresh token not found"),
            CredentialError::InvalidRefreshToken => write!(f, "Invalid refresh token"),
            CredentialError::AccessDenied => write!(f, "Access denied"),
        }
    }
}

impl StdError for CredentialError {}

/// Database operation errors
#[derive(Debug)]
pub enum DatabaseError {
    NotFound(String),
    QueryExecution(String),
    ConnectionPool(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DatabaseError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Email delivery errors
#[derive(Debug, Clone)]
pub enum EmailError {
    SendFailed(String),
    ServiceUnavailable(String),
}

impl fmt::Display for EmailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmailError::SendFailed(msg) => write!(f, "Failed to send email: {}", msg),
            EmailError::ServiceUnavailable(msg) => {
                write!(f, "Email service unavailable: {}", msg)
            }
        }
    }
}

impl StdError for EmailError {}

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Credential(CredentialError),
    /// Key-value store connectivity failure; never a business error
    Store(String),
    Database(DatabaseError),
    Email(EmailError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Credential(e) => write!(f, "{}", e),
            AppError::Store(msg) => write!(f, "Store error: {}", msg),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Email(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        AppError::Credential(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        AppError::Email(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let error_msg = err.to_string();

        if error_msg.contains("no rows") {
            AppError::Database(DatabaseError::NotFound("Record not found".to_string()))
        } else if error_msg.contains("pool") || error_msg.contains("connect") {
            AppError::Database(DatabaseError::ConnectionPool(error_msg))
        } else {
            AppError::Database(DatabaseError::QueryExecution(error_msg))
        }
    }
}

impl AppError {
    /// True when this error is one of the explicit business kinds whose
    /// message may be shown to clients verbatim.
    pub fn is_business(&self) -> bool {
        matches!(self, AppError::Validation(_) | AppError::Credential(_))
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for client-side handling
    pub code: String,
    /// HTTP status code
    pub status: u16,
    /// Timestamp when error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn status_and_code(error: &AppError) -> (StatusCode, &'static str) {
    match error {
        AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        AppError::Credential(e) => match e {
            CredentialError::EmailAlreadyExists => (StatusCode::BAD_REQUEST, "EMAIL_ALREADY_EXISTS"),
            CredentialError::EmailAlreadyVerified => {
                (StatusCode::UNPROCESSABLE_ENTITY, "EMAIL_ALREADY_VERIFIED")
            }
            CredentialError::TooManyRequests => {
                (StatusCode::TOO_MANY_REQUESTS, "TOO_MANY_REQUESTS")
            }
            CredentialError::InvalidToken => (StatusCode::UNAUTHORIZED, "INVALID_TOKEN"),
            CredentialError::RefreshTokenNotFound => {
                (StatusCode::UNAUTHORIZED, "REFRESH_TOKEN_NOT_FOUND")
            }
            CredentialError::InvalidRefreshToken => {
                (StatusCode::UNAUTHORIZED, "INVALID_REFRESH_TOKEN")
            }
            CredentialError::AccessDenied => (StatusCode::FORBIDDEN, "ACCESS_DENIED"),
        },
        AppError::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE"),
        AppError::Database(DatabaseError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        AppError::Database(DatabaseError::ConnectionPool(_)) => {
            (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
        }
        AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
        AppError::Email(_) => (StatusCode::SERVICE_UNAVAILABLE, "EMAIL_SERVICE_ERROR"),
        AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

fn log_error(error: &AppError, request_id: &str) {
    match error {
        AppError::Validation(e) => {
            tracing::warn!(request_id = request_id, error = %e, "Validation error");
        }
        AppError::Credential(e) => {
            tracing::warn!(request_id = request_id, error = %e, "Credential error");
        }
        AppError::Store(msg) => {
            tracing::error!(request_id = request_id, error = %msg, "Key-value store error");
        }
        AppError::Database(e) => {
            tracing::error!(request_id = request_id, error = %e, "Database error");
        }
        AppError::Email(e) => {
            tracing::error!(request_id = request_id, error = %e, "Email service error");
        }
        AppError::Internal(msg) => {
            tracing::error!(request_id = request_id, error = %msg, "Internal error");
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        log_error(self, &request_id);

        let (status, code) = status_and_code(self);
        // Business kinds keep their message; everything else is opaque so
        // connectivity details never leak to clients.
        let message = if self.is_business() {
            self.to_string()
        } else {
            match status {
                StatusCode::NOT_FOUND => "Not found".to_string(),
                StatusCode::SERVICE_UNAVAILABLE => "Service temporarily unavailable".to_string(),
                _ => "Internal server error".to_string(),
            }
        };

        let body = ErrorResponse::new(request_id, message, code.to_string(), status.as_u16());
        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        status_and_code(self).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_errors_map_to_expected_statuses() {
        let cases = [
            (CredentialError::EmailAlreadyExists, StatusCode::BAD_REQUEST),
            (
                CredentialError::EmailAlreadyVerified,
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (CredentialError::TooManyRequests, StatusCode::TOO_MANY_REQUESTS),
            (CredentialError::InvalidToken, StatusCode::UNAUTHORIZED),
            (CredentialError::RefreshTokenNotFound, StatusCode::UNAUTHORIZED),
            (CredentialError::InvalidRefreshToken, StatusCode::UNAUTHORIZED),
            (CredentialError::AccessDenied, StatusCode::FORBIDDEN),
        ];

        for (kind, expected) in cases {
            assert_eq!(AppError::Credential(kind).status_code(), expected);
        }
    }

    #[test]
    fn store_errors_are_opaque_to_clients() {
        let err = AppError::Store("connection refused at 10.0.0.5:6379".to_string());
        assert!(!err.is_business());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn business_errors_keep_their_message() {
        let err = AppError::Credential(CredentialError::TooManyRequests);
        assert!(err.is_business());
        assert!(err.to_string().contains("Too many requests"));
    }
}
