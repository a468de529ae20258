use floorline_core::{Error, ErrorKind};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum AuthError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Too many login attempts, try again later")]
    RateLimited,

    #[error("Invalid or expired verification code")]
    InvalidTwoFactorCode,

    #[error("Invalid or expired session")]
    InvalidSession,

    #[error("Account is deactivated")]
    AccountDisabled,

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Database(e) => Error::Database(e),
            AuthError::InvalidCredentials
            | AuthError::InvalidTwoFactorCode
            | AuthError::InvalidSession => Error::Unauthenticated(err.to_string()),
            AuthError::RateLimited => Error::RateLimited(err.to_string()),
            AuthError::AccountDisabled | AuthError::Forbidden(_) => {
                Error::Forbidden(err.to_string())
            }
            AuthError::Hashing(e) => Error::Internal(e),
        }
    }
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Database(_) => ErrorKind::Database,
            Self::InvalidCredentials | Self::InvalidTwoFactorCode | Self::InvalidSession => {
                ErrorKind::Unauthenticated
            }
            Self::RateLimited => ErrorKind::RateLimited,
            Self::AccountDisabled | Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Hashing(_) => ErrorKind::Internal,
        }
    }
}
