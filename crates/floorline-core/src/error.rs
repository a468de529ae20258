use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Platform-wide error type. Domain crates define their own richer enums and
/// convert into this at the service boundary; the HTTP layer maps `kind()` to
/// a status code.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid ID format: {0}")]
    InvalidIdFormat(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("External service error: {0}")]
    External(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error category carried to the HTTP adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    RateLimited,
    ExternalService,
    Database,
    Internal,
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Unauthenticated => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::RateLimited => 429,
            Self::ExternalService => 502,
            Self::Database | Self::Internal => 500,
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidIdFormat(_) | Self::Validation(_) => ErrorKind::Validation,
            Self::Database(_) => ErrorKind::Database,
            Self::Serialization(_) | Self::Internal(_) => ErrorKind::Internal,
            Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::RateLimited(_) => ErrorKind::RateLimited,
            Self::External(_) => ErrorKind::ExternalService,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_maps_to_status() {
        assert_eq!(Error::NotFound("order".into()).kind().status_code(), 404);
        assert_eq!(Error::Conflict("job".into()).kind().status_code(), 409);
        assert_eq!(Error::RateLimited("login".into()).kind().status_code(), 429);
        assert_eq!(Error::External("rater".into()).kind().status_code(), 502);
    }
}
