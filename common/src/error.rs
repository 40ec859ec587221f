use actix_web::{HttpResponse, http::StatusCode};
use serde::Serialize;
use thiserror::Error;

pub type Res<T> = std::result::Result<T, AppError>;

/// A single offending input field, reported inline by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    // === CONVERSION ERRORS ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    // === DOMAIN ERRORS ===
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("An account with this email already exists")]
    DuplicateEmail,

    #[error("User with this email does not exist")]
    UserNotFound,

    #[error("Email address has not been verified")]
    EmailNotVerified,

    #[error("Account is inactive")]
    AccountInactive,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Code not found")]
    CodeNotFound,

    #[error("Code has expired")]
    CodeExpired,

    #[error("Code has already been used")]
    CodeAlreadyUsed,

    #[error("Code does not belong to this email")]
    EmailMismatch,

    #[error("Profile completion failed: {0}")]
    ProfileCompletion(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // === BOUNDARY ERRORS ===
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code returned next to the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_)
            | AppError::Jwt(_)
            | AppError::Reqwest(_)
            | AppError::Internal(_) => "UNKNOWN_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::DuplicateEmail => "DUPLICATE_EMAIL",
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::EmailNotVerified => "EMAIL_NOT_VERIFIED",
            AppError::AccountInactive => "ACCOUNT_INACTIVE",
            AppError::InvalidPassword => "INVALID_PASSWORD",
            AppError::CodeNotFound => "CODE_NOT_FOUND",
            AppError::CodeExpired => "CODE_EXPIRED",
            AppError::CodeAlreadyUsed => "CODE_ALREADY_USED",
            AppError::EmailMismatch => "EMAIL_MISMATCH",
            AppError::ProfileCompletion(_) => "PROFILE_COMPLETION_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_)
            | AppError::Jwt(_)
            | AppError::Reqwest(_)
            | AppError::Configuration(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_)
            | AppError::CodeNotFound
            | AppError::CodeExpired
            | AppError::CodeAlreadyUsed
            | AppError::EmailMismatch => StatusCode::BAD_REQUEST,
            AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::EmailNotVerified | AppError::AccountInactive => StatusCode::FORBIDDEN,
            AppError::InvalidPassword | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::ProfileCompletion(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// True for failures whose detail must stay server-side.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::Jwt(_)
                | AppError::Reqwest(_)
                | AppError::Configuration(_)
                | AppError::Internal(_)
        )
    }

    pub fn to_http_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status());

        if self.is_internal() {
            log::error!("{} [{}]", self, self.code());
            return builder.json(serde_json::json!({
                "error": "Internal server error",
                "code": self.code(),
            }));
        }

        match self {
            AppError::Validation(fields) => builder.json(serde_json::json!({
                "error": self.to_string(),
                "code": self.code(),
                "fields": fields,
            })),
            AppError::ProfileCompletion(detail) => {
                log::error!("Profile completion error: {}", detail);
                builder.json(serde_json::json!({
                    "error": "Could not complete the profile, please try again later",
                    "code": self.code(),
                }))
            }
            _ => builder.json(serde_json::json!({
                "error": self.to_string(),
                "code": self.code(),
            })),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        self.to_http_response()
    }
}
