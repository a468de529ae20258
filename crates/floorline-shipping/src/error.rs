use floorline_core::{Error, ErrorKind};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ShippingError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Parcel rater error: {0}")]
    ParcelRater(String),

    #[error("LTL rater error: {0}")]
    LtlRater(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ShippingResult<T> = Result<T, ShippingError>;

impl From<ShippingError> for Error {
    fn from(err: ShippingError) -> Self {
        match err {
            ShippingError::Database(e) => Error::Database(e),
            ShippingError::ParcelRater(_) | ShippingError::LtlRater(_) => {
                Error::External(err.to_string())
            }
            ShippingError::Validation(m) => Error::Validation(m),
        }
    }
}

impl ShippingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Database(_) => ErrorKind::Database,
            Self::ParcelRater(_) | Self::LtlRater(_) => ErrorKind::ExternalService,
            Self::Validation(_) => ErrorKind::Validation,
        }
    }
}
