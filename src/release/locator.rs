//! Release lookup abstraction.
//!
//! The pipeline asks a [`ReleaseSource`] for the latest release exactly once
//! per run and threads the result through the remaining stages. The HTTP
//! implementation lives in [`crate::hosting`].

use super::{Release, RepoId};

/// Trait for fetching the most recent published release of a repository.
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseSource {
    /// Fetch the latest release metadata for `repo`.
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::Transport`] when the API cannot be reached,
    /// [`LocateError::Api`] for non-success statuses, and
    /// [`LocateError::Decode`] when the body is not a release.
    fn latest_release(&self, repo: &RepoId) -> Result<Release, LocateError>;
}

/// Errors arising from release lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
    /// The request never produced an HTTP response.
    #[error("request to {url} failed: {reason}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The API answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Api {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The response body was not valid release metadata.
    #[error("could not decode release metadata from {url}: {reason}")]
    Decode {
        /// The URL that was requested.
        url: String,
        /// The decoder's description of the problem.
        reason: String,
    },
}
