//! Remote file-transfer session abstraction.
//!
//! The publisher drives a [`RemoteSession`] obtained from a
//! [`RemoteConnector`]; production code uses `suppaftp`, tests substitute a
//! recording session.

use crate::config::FtpCredentials;
use log::debug;
use std::io::Read;
use suppaftp::FtpStream;
use suppaftp::types::FileType;

/// An open, logged-in session on the transfer endpoint.
pub trait RemoteSession {
    /// Change the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Operation`] when the server refuses.
    fn change_dir(&mut self, path: &str) -> Result<(), RemoteError>;

    /// Create a directory relative to the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Operation`] when the server refuses, including
    /// when the directory already exists.
    fn make_dir(&mut self, path: &str) -> Result<(), RemoteError>;

    /// Store `contents` at `path` in binary mode, returning the bytes sent.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Operation`] when the transfer fails.
    fn put_file(&mut self, path: &str, contents: &mut dyn Read) -> Result<u64, RemoteError>;

    /// Close the session.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Operation`] when the server does not
    /// acknowledge the logout.
    fn quit(&mut self) -> Result<(), RemoteError>;
}

/// Opens sessions on the transfer endpoint.
#[cfg_attr(test, mockall::automock)]
pub trait RemoteConnector {
    /// Connect and log in with `credentials`.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Connect`] when the server is unreachable and
    /// [`RemoteError::Login`] when the credentials are refused.
    fn connect(
        &self,
        credentials: &FtpCredentials,
    ) -> Result<Box<dyn RemoteSession>, RemoteError>;
}

/// Errors reported by the transfer endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    /// The server could not be reached.
    #[error("could not connect to {address}: {reason}")]
    Connect {
        /// The `host:port` that was dialled.
        address: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The server rejected the login.
    #[error("login as {user} failed: {reason}")]
    Login {
        /// The user name presented.
        user: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// A command on an open session failed.
    #[error("{operation} {path} failed: {reason}")]
    Operation {
        /// The command that failed, e.g. `mkdir`.
        operation: &'static str,
        /// The remote path involved.
        path: String,
        /// A human-readable description of the failure.
        reason: String,
    },
}

impl RemoteError {
    fn operation(operation: &'static str, path: &str, err: &suppaftp::FtpError) -> Self {
        Self::Operation {
            operation,
            path: path.to_owned(),
            reason: err.to_string(),
        }
    }
}

/// Connector for plain FTP servers.
#[derive(Clone, Copy, Debug, Default)]
pub struct FtpConnector;

impl RemoteConnector for FtpConnector {
    fn connect(
        &self,
        credentials: &FtpCredentials,
    ) -> Result<Box<dyn RemoteSession>, RemoteError> {
        let address = credentials.address();
        debug!("Connecting to {address}");
        let mut stream =
            FtpStream::connect(address.as_str()).map_err(|err| RemoteError::Connect {
                address: address.clone(),
                reason: err.to_string(),
            })?;
        stream
            .login(credentials.user.as_str(), credentials.password.expose())
            .map_err(|err| RemoteError::Login {
                user: credentials.user.clone(),
                reason: err.to_string(),
            })?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(|err| RemoteError::operation("type", "binary", &err))?;
        Ok(Box::new(FtpSession { stream }))
    }
}

/// A logged-in `suppaftp` session.
pub struct FtpSession {
    stream: FtpStream,
}

impl RemoteSession for FtpSession {
    fn change_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        self.stream
            .cwd(path)
            .map_err(|err| RemoteError::operation("cwd", path, &err))
    }

    fn make_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        self.stream
            .mkdir(path)
            .map_err(|err| RemoteError::operation("mkdir", path, &err))
    }

    fn put_file(&mut self, path: &str, mut contents: &mut dyn Read) -> Result<u64, RemoteError> {
        self.stream
            .put_file(path, &mut contents)
            .map_err(|err| RemoteError::operation("stor", path, &err))
    }

    fn quit(&mut self) -> Result<(), RemoteError> {
        self.stream
            .quit()
            .map_err(|err| RemoteError::operation("quit", "", &err))
    }
}
