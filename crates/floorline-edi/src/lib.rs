pub mod ack;
pub mod control;
pub mod error;
pub mod sftp;
pub mod x850;

pub use ack::{parse_855, Ack855};
pub use control::InterchangeCounter;
pub use error::{EdiError, EdiResult};
pub use sftp::{EdiTransport, SftpConfig, SftpTransport};
pub use x850::{file_name_850, generate_850, Po850, Po850Line};
