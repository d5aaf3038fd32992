//! Archive extraction for downloaded release artifacts.
//!
//! Unpacks `.tar.gz` archives into a target directory. Entry paths are
//! validated before anything touches the filesystem: absolute paths and `..`
//! components are refused, as are link and device entries.

use flate2::read::GzDecoder;
use log::debug;
use std::path::{Component, Path, PathBuf};
use tar::EntryType;

/// Trait for extracting release archives, enabling test mocking.
///
/// # Examples
///
/// ```
/// use release_relay::transfer::extraction::TarGzExtractor;
///
/// let extractor = TarGzExtractor;
/// // Use extractor.extract(archive_path, dest_dir) in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract the archive at `archive_path` into `dest_dir`, creating the
    /// directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::PathTraversal`] if any entry attempts to
    /// escape the destination directory.
    /// Returns [`ExtractionError::UnsupportedEntry`] for link, device, and
    /// other non-file entries.
    /// Returns [`ExtractionError::Corrupt`] if the archive cannot be decoded.
    /// Returns [`ExtractionError::Io`] on filesystem failures.
    fn extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> Result<ExtractionSummary, ExtractionError>;
}

/// What an extraction produced, as paths relative to the destination.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Regular files written, in archive order.
    pub files: Vec<PathBuf>,
    /// Directories created from explicit directory entries.
    pub directories: Vec<PathBuf>,
}

impl ExtractionSummary {
    /// Total number of entries materialised.
    #[must_use]
    pub fn entries(&self) -> usize {
        self.files.len() + self.directories.len()
    }
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error writing the extracted tree.
    #[error("extraction I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A path in the archive attempts to traverse outside the destination.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path from the archive entry.
        path: String,
    },

    /// The archive holds an entry type that is never extracted.
    #[error("unsupported {kind} entry: {path}")]
    UnsupportedEntry {
        /// The entry path.
        path: String,
        /// The entry type as reported by the archive.
        kind: String,
    },

    /// The archive could not be decoded.
    #[error("corrupt archive: {reason}")]
    Corrupt {
        /// A human-readable description of the failure.
        reason: String,
    },
}

/// Default extractor using the `tar` and `flate2` crates.
pub struct TarGzExtractor;

/// How a single archive entry is handled.
enum EntryAction {
    File,
    Directory,
    Skip,
    Reject,
}

const fn classify(kind: EntryType) -> EntryAction {
    match kind {
        EntryType::Regular | EntryType::Continuous => EntryAction::File,
        EntryType::Directory => EntryAction::Directory,
        EntryType::XGlobalHeader
        | EntryType::XHeader
        | EntryType::GNULongName
        | EntryType::GNULongLink => EntryAction::Skip,
        _ => EntryAction::Reject,
    }
}

fn corrupt(err: &std::io::Error) -> ExtractionError {
    ExtractionError::Corrupt {
        reason: err.to_string(),
    }
}

impl ArchiveExtractor for TarGzExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> Result<ExtractionSummary, ExtractionError> {
        let file = std::fs::File::open(archive_path)?;
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        std::fs::create_dir_all(dest_dir)?;
        let mut summary = ExtractionSummary::default();

        for entry_result in archive.entries().map_err(|err| corrupt(&err))? {
            let mut entry = entry_result.map_err(|err| corrupt(&err))?;
            let kind = entry.header().entry_type();
            let raw_path = entry.path().map_err(|err| corrupt(&err))?.into_owned();

            let action = classify(kind);
            if matches!(action, EntryAction::Skip) {
                debug!("Skipping {kind:?} header {}", raw_path.display());
                continue;
            }

            let relative = validate_entry_path(&raw_path)?;
            if matches!(action, EntryAction::Reject) {
                return Err(ExtractionError::UnsupportedEntry {
                    path: raw_path.display().to_string(),
                    kind: format!("{kind:?}"),
                });
            }

            let dest_path = dest_dir.join(&relative);
            if matches!(action, EntryAction::Directory) {
                std::fs::create_dir_all(&dest_path)?;
                if !relative.as_os_str().is_empty() {
                    summary.directories.push(relative);
                }
                continue;
            }

            if relative.as_os_str().is_empty() {
                return Err(ExtractionError::Corrupt {
                    reason: format!("file entry has no name: {}", raw_path.display()),
                });
            }
            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            entry.unpack(&dest_path)?;
            debug!("Extracted {}", relative.display());
            summary.files.push(relative);
        }

        Ok(summary)
    }
}

/// Validate that a tar entry path stays inside the destination directory and
/// return it with `.` components removed.
fn validate_entry_path(path: &Path) -> Result<PathBuf, ExtractionError> {
    let traversal = || ExtractionError::PathTraversal {
        path: path.display().to_string(),
    };
    if path.is_absolute() {
        return Err(traversal());
    }
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(traversal());
            }
        }
    }
    Ok(relative)
}
