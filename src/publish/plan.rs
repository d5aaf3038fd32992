//! Upload ordering.
//!
//! The local tree is walked sorted by file name with parents ahead of their
//! children, so every remote directory is requested before anything inside
//! it is stored. Remote names must be valid UTF-8; a local name that is
//! not fails the plan instead of being rewritten.

use log::debug;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Errors raised while planning an upload.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The local tree could not be walked.
    #[error("could not read local tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// A local entry cannot be named on the server unchanged.
    #[error("local entry {path} has a name that is not valid UTF-8")]
    NonUtf8Name {
        /// The local path, lossily rendered.
        path: String,
    },
}

/// One remote operation derived from the local tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadStep {
    /// Create `remote` relative to the destination root.
    MakeDir {
        /// Forward-slash path relative to the destination root.
        remote: String,
    },
    /// Store the local file at `remote` relative to the destination root.
    PutFile {
        /// The file on disk.
        local: PathBuf,
        /// Forward-slash path relative to the destination root.
        remote: String,
    },
}

impl UploadStep {
    /// The remote path this step targets.
    #[must_use]
    pub fn remote(&self) -> &str {
        match self {
            Self::MakeDir { remote } | Self::PutFile { remote, .. } => remote,
        }
    }
}

/// Render `relative` with forward slashes, dropping `.` components.
///
/// Returns `None` when a segment is not valid UTF-8.
///
/// # Examples
///
/// ```
/// use release_relay::publish::plan::remote_path;
/// use std::path::Path;
///
/// assert_eq!(
///     remote_path(Path::new("assets/img/logo.svg")).as_deref(),
///     Some("assets/img/logo.svg")
/// );
/// ```
#[must_use]
pub fn remote_path(relative: &Path) -> Option<String> {
    let segments = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_str()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()?;
    Some(segments.join("/"))
}

/// List the operations needed to mirror `root` remotely.
///
/// Entries that are neither directories nor regular files are skipped.
///
/// # Errors
///
/// Returns [`PlanError::Walk`] when a directory cannot be read and
/// [`PlanError::NonUtf8Name`] when an entry name is not valid UTF-8.
pub fn plan_upload(root: &Path) -> Result<Vec<UploadStep>, PlanError> {
    let mut steps = Vec::new();
    for walked in walkdir::WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = walked?;
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let remote = remote_path(relative).ok_or_else(|| PlanError::NonUtf8Name {
            path: entry.path().display().to_string(),
        })?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            steps.push(UploadStep::MakeDir { remote });
        } else if file_type.is_file() {
            steps.push(UploadStep::PutFile {
                local: entry.into_path(),
                remote,
            });
        } else {
            debug!("Skipping non-regular entry {}", entry.path().display());
        }
    }
    Ok(steps)
}
