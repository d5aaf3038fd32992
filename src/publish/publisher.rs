//! Mirror an extracted tree onto the transfer endpoint.

use super::plan::{PlanError, UploadStep, plan_upload};
use super::remote::{RemoteConnector, RemoteError, RemoteSession};
use crate::config::{FileFailurePolicy, FtpCredentials};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::Path;

/// Outcome of a completed upload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    /// Files stored remotely.
    pub files_uploaded: usize,
    /// Bytes sent across all files.
    pub bytes_uploaded: u64,
    /// Directories created remotely.
    pub directories_created: usize,
    /// Directory creations the server refused, usually because the
    /// directory already existed.
    pub directory_warnings: Vec<String>,
}

/// Errors arising while publishing.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Connecting, logging in, or preparing the destination root failed.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The local tree could not be turned into an upload plan.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// A local file could not be opened for upload.
    #[error("could not open {path} for upload: {source}")]
    ReadLocal {
        /// The local path.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A file transfer failed and the policy is to stop.
    #[error("upload of {path} failed: {source}")]
    FileTransfer {
        /// The remote path being written.
        path: String,
        /// The server's error.
        source: RemoteError,
    },

    /// Some files failed while the policy was to keep going.
    #[error(
        "{} files failed to upload ({uploaded} succeeded): {}",
        .failed.len(),
        .failed.join(", ")
    )]
    PartialUpload {
        /// Remote paths that were not stored.
        failed: Vec<String>,
        /// Files that were stored.
        uploaded: usize,
    },
}

/// Uploads a local tree through a [`RemoteConnector`].
pub struct Publisher<'a> {
    connector: &'a dyn RemoteConnector,
    policy: FileFailurePolicy,
}

impl<'a> Publisher<'a> {
    /// Create a publisher that applies `policy` to file failures.
    #[must_use]
    pub const fn new(connector: &'a dyn RemoteConnector, policy: FileFailurePolicy) -> Self {
        Self { connector, policy }
    }

    /// Mirror `local_root` under `remote_root`.
    ///
    /// The session is closed before returning, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError::Remote`] when the session cannot be opened or
    /// the destination root cannot be entered, [`PublishError::FileTransfer`]
    /// on the first failed file under [`FileFailurePolicy::Abort`], and
    /// [`PublishError::PartialUpload`] after all files have been attempted
    /// under [`FileFailurePolicy::Continue`].
    pub fn publish(
        &self,
        credentials: &FtpCredentials,
        local_root: &Path,
        remote_root: &str,
    ) -> Result<PublishReport, PublishError> {
        let steps = plan_upload(local_root)?;
        let mut session = self.connector.connect(credentials)?;
        info!("Connected to {}; publishing into {remote_root}", credentials.host);

        let result = enter_remote_root(session.as_mut(), remote_root)
            .map_err(PublishError::from)
            .and_then(|()| self.run_steps(session.as_mut(), &steps));

        if let Err(err) = session.quit() {
            warn!("Closing the transfer session failed: {err}");
        }
        result
    }

    fn run_steps(
        &self,
        session: &mut dyn RemoteSession,
        steps: &[UploadStep],
    ) -> Result<PublishReport, PublishError> {
        let mut report = PublishReport::default();
        let mut failed = Vec::new();

        for step in steps {
            match step {
                UploadStep::MakeDir { remote } => match session.make_dir(remote) {
                    Ok(()) => {
                        debug!("Created directory {remote}");
                        report.directories_created += 1;
                    }
                    Err(err) => {
                        warn!("Directory {remote} not created: {err}");
                        report.directory_warnings.push(remote.clone());
                    }
                },
                UploadStep::PutFile { local, remote } => {
                    match upload_file(session, local, remote) {
                        Ok(bytes) => {
                            debug!("Uploaded {remote} ({bytes} bytes)");
                            report.files_uploaded += 1;
                            report.bytes_uploaded += bytes;
                        }
                        Err(err) if self.policy == FileFailurePolicy::Continue => {
                            warn!("{err}; continuing");
                            failed.push(remote.clone());
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }

        if failed.is_empty() {
            info!(
                "Uploaded {} files ({} bytes)",
                report.files_uploaded, report.bytes_uploaded
            );
            Ok(report)
        } else {
            Err(PublishError::PartialUpload {
                failed,
                uploaded: report.files_uploaded,
            })
        }
    }
}

fn upload_file(
    session: &mut dyn RemoteSession,
    local: &Path,
    remote: &str,
) -> Result<u64, PublishError> {
    let mut file = std::fs::File::open(local).map_err(|source| PublishError::ReadLocal {
        path: local.display().to_string(),
        source,
    })?;
    session
        .put_file(remote, &mut file)
        .map_err(|source| PublishError::FileTransfer {
            path: remote.to_owned(),
            source,
        })
}

/// Change into `remote_root`, creating missing segments one at a time.
fn enter_remote_root(
    session: &mut dyn RemoteSession,
    remote_root: &str,
) -> Result<(), RemoteError> {
    if remote_root.is_empty() || session.change_dir(remote_root).is_ok() {
        return Ok(());
    }
    debug!("{remote_root} does not exist; creating it");
    if remote_root.starts_with('/') {
        session.change_dir("/")?;
    }
    for segment in remote_root.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if session.change_dir(segment).is_ok() {
            continue;
        }
        session.make_dir(segment)?;
        session.change_dir(segment)?;
    }
    Ok(())
}
