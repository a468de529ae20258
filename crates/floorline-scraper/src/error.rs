use floorline_core::{Error, ErrorKind};
use thiserror::Error as ThisError;
use uuid::Uuid;

#[derive(Debug, ThisError)]
pub enum ScraperError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("A scrape job is already running for this source")]
    AlreadyRunning { existing_job_id: Uuid },

    #[error("Vendor source not found: {0}")]
    SourceNotFound(Uuid),

    #[error("Scrape job not found: {0}")]
    JobNotFound(Uuid),

    #[error("No scraper registered for key {0}")]
    UnknownScraperKey(String),

    #[error("Invalid cron expression {0}")]
    InvalidCron(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ScraperResult<T> = Result<T, ScraperError>;

impl From<ScraperError> for Error {
    fn from(err: ScraperError) -> Self {
        match err {
            ScraperError::Database(e) => Error::Database(e),
            ScraperError::AlreadyRunning { .. } => Error::Conflict(err.to_string()),
            ScraperError::SourceNotFound(_) | ScraperError::JobNotFound(_) => {
                Error::NotFound(err.to_string())
            }
            ScraperError::UnknownScraperKey(_)
            | ScraperError::InvalidCron(_)
            | ScraperError::Validation(_) => Error::Validation(err.to_string()),
        }
    }
}

impl ScraperError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Database(_) => ErrorKind::Database,
            Self::AlreadyRunning { .. } => ErrorKind::Conflict,
            Self::SourceNotFound(_) | Self::JobNotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Validation,
        }
    }
}
