//! Error types for the relay.
//!
//! Each stage owns its error enum; [`RelayError`] aggregates them so the
//! pipeline can propagate with `?`, and [`ErrorKind`] classifies a failure
//! for callers that only care about its broad category, such as the trigger
//! endpoint choosing a status code.

use crate::config::ConfigError;
use crate::publish::PublishError;
use crate::release::RepoIdError;
use crate::release::locator::LocateError;
use crate::transfer::artifact::ArtifactNameError;
use crate::transfer::download::DownloadError;
use crate::transfer::extraction::ExtractionError;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while relaying a release.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The trigger secret was absent or wrong.
    #[error("API key is invalid or missing")]
    Unauthorized,

    /// A trigger request was incomplete.
    #[error("invalid request: {reason}")]
    Validation {
        /// Description of what is missing or malformed.
        reason: String,
    },

    /// The repository identifier is malformed.
    #[error(transparent)]
    InvalidRepo(#[from] RepoIdError),

    /// The latest release could not be fetched.
    #[error("release lookup failed: {0}")]
    Locate(#[from] LocateError),

    /// The release carries no asset matching the archive pattern.
    #[error("release {tag} has no asset matching release-*.tar.gz")]
    NoMatchingAsset {
        /// Tag of the release that was searched.
        tag: String,
    },

    /// The selected asset has no download locator.
    #[error("asset {asset} has no download URL")]
    MissingLocator {
        /// Name of the selected asset.
        asset: String,
    },

    /// The asset name cannot be mapped onto local paths.
    #[error(transparent)]
    ArtifactName(#[from] ArtifactNameError),

    /// The asset download failed.
    #[error("download failed: {0}")]
    Download(#[from] DownloadError),

    /// The archive could not be extracted.
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// The upload failed.
    #[error("upload failed: {0}")]
    Publish(#[from] PublishError),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Broad failure categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or malformed configuration.
    Configuration,
    /// Trigger secret rejected.
    Authorization,
    /// Trigger request incomplete or malformed.
    Validation,
    /// The release holds nothing usable.
    Data,
    /// A network request did not complete.
    Transport,
    /// A remote API answered with an error or an unreadable body.
    Api,
    /// Local filesystem failure.
    Filesystem,
    /// The archive is corrupt or unsafe.
    Extraction,
    /// The transfer endpoint refused an operation.
    Remote,
}

impl RelayError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Configuration,
            Self::Unauthorized => ErrorKind::Authorization,
            Self::Validation { .. } | Self::InvalidRepo(_) => ErrorKind::Validation,
            Self::NoMatchingAsset { .. } | Self::MissingLocator { .. } | Self::ArtifactName(_) => {
                ErrorKind::Data
            }
            Self::Locate(LocateError::Transport { .. })
            | Self::Download(DownloadError::HttpError { .. } | DownloadError::Interrupted { .. }) => {
                ErrorKind::Transport
            }
            Self::Locate(LocateError::Api { .. } | LocateError::Decode { .. })
            | Self::Download(DownloadError::Status { .. }) => ErrorKind::Api,
            Self::Download(DownloadError::Io(_))
            | Self::Extraction(ExtractionError::Io(_))
            | Self::Publish(PublishError::Plan(_) | PublishError::ReadLocal { .. })
            | Self::Io(_) => ErrorKind::Filesystem,
            Self::Extraction(_) => ErrorKind::Extraction,
            Self::Publish(_) => ErrorKind::Remote,
        }
    }
}

/// Result type alias using [`RelayError`].
pub type Result<T> = std::result::Result<T, RelayError>;
