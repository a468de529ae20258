use thiserror::Error;

#[derive(Debug, Error)]
pub enum EdiError {
    #[error("SFTP error: {0}")]
    Sftp(String),

    #[error("Malformed EDI document: {0}")]
    Malformed(String),
}

impl From<ssh2::Error> for EdiError {
    fn from(err: ssh2::Error) -> Self {
        Self::Sftp(err.to_string())
    }
}

impl From<std::io::Error> for EdiError {
    fn from(err: std::io::Error) -> Self {
        Self::Sftp(err.to_string())
    }
}

pub type EdiResult<T> = Result<T, EdiError>;
