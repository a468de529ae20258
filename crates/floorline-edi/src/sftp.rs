//! Blocking SFTP transport for vendor EDI inboxes. Callers on an async
//! runtime wrap these in `spawn_blocking`.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::Path;

use serde::Deserialize;

use crate::error::{EdiError, EdiResult};

#[derive(Clone, Debug, Deserialize)]
pub struct SftpConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    /// where we PUT 850s
    pub outbox_dir: String,
    /// where the vendor leaves 855/856/810s
    pub inbox_dir: String,
}

fn default_port() -> u16 {
    22
}

pub trait EdiTransport: Send + Sync {
    fn upload(&self, file_name: &str, contents: &str) -> EdiResult<()>;
    fn list_inbox(&self) -> EdiResult<Vec<String>>;
    fn download(&self, file_name: &str) -> EdiResult<String>;
    fn remove(&self, file_name: &str) -> EdiResult<()>;
}

pub struct SftpTransport {
    config: SftpConfig,
}

impl SftpTransport {
    pub fn new(config: SftpConfig) -> Self {
        Self { config }
    }

    fn session(&self) -> EdiResult<ssh2::Session> {
        let stream = TcpStream::connect((self.config.host.as_str(), self.config.port))?;
        let mut session = ssh2::Session::new()?;
        session.set_tcp_stream(stream);
        session.handshake()?;
        session.userauth_password(&self.config.username, &self.config.password)?;
        if !session.authenticated() {
            return Err(EdiError::Sftp("authentication failed".into()));
        }
        Ok(session)
    }
}

impl EdiTransport for SftpTransport {
    fn upload(&self, file_name: &str, contents: &str) -> EdiResult<()> {
        let session = self.session()?;
        let sftp = session.sftp()?;
        let path = format!("{}/{}", self.config.outbox_dir, file_name);
        let mut file = sftp.create(Path::new(&path))?;
        file.write_all(contents.as_bytes())?;
        tracing::info!(path, bytes = contents.len(), "EDI document uploaded");
        Ok(())
    }

    fn list_inbox(&self) -> EdiResult<Vec<String>> {
        let session = self.session()?;
        let sftp = session.sftp()?;
        let entries = sftp.readdir(Path::new(&self.config.inbox_dir))?;
        Ok(entries
            .into_iter()
            .filter_map(|(path, stat)| {
                if stat.is_file() {
                    path.file_name().map(|n| n.to_string_lossy().into_owned())
                } else {
                    None
                }
            })
            .collect())
    }

    fn download(&self, file_name: &str) -> EdiResult<String> {
        let session = self.session()?;
        let sftp = session.sftp()?;
        let path = format!("{}/{}", self.config.inbox_dir, file_name);
        let mut file = sftp.open(Path::new(&path))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Ok(contents)
    }

    fn remove(&self, file_name: &str) -> EdiResult<()> {
        let session = self.session()?;
        let sftp = session.sftp()?;
        let path = format!("{}/{}", self.config.inbox_dir, file_name);
        sftp.unlink(Path::new(&path))?;
        Ok(())
    }
}
