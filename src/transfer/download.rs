//! Asset download.
//!
//! Provides a trait-based abstraction over the download transport so that
//! the pipeline can be exercised without network access, plus the chunked
//! streaming helper shared by every implementation.

use crate::config::Provider;
use crate::release::Asset;
use log::{debug, warn};
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

/// Size of each read from the response body.
pub const CHUNK_SIZE: usize = 8 * 1024;

/// `Accept` value asking the API for the raw asset bytes.
pub const BINARY_ACCEPT: &str = "application/octet-stream";

/// Where to fetch an asset from and how.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadRequest {
    /// The locator to request.
    pub url: String,
    /// Request an authenticated binary response
    /// (`Accept: application/octet-stream`).
    pub binary: bool,
}

/// Choose the locator for `asset` on `provider`.
///
/// GitHub's API locator serves private assets when authenticated, so it is
/// preferred; the browser locator is the fallback and the only option on
/// Gitea. Returns `None` when the asset carries no usable locator.
#[must_use]
pub fn request_for_asset(provider: &Provider, asset: &Asset) -> Option<DownloadRequest> {
    let api = match provider {
        Provider::GitHub => asset.api_url.as_ref(),
        Provider::Gitea { .. } => None,
    };
    api.map(|url| DownloadRequest {
        url: url.clone(),
        binary: true,
    })
    .or_else(|| {
        asset.browser_download_url.as_ref().map(|url| DownloadRequest {
            url: url.clone(),
            binary: false,
        })
    })
}

/// Trait for downloading an asset to a local file.
#[cfg_attr(test, mockall::automock)]
pub trait AssetDownloader {
    /// Stream the asset named by `request` into `dest`, returning the number
    /// of bytes written.
    ///
    /// A partially written `dest` is left in place on failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the body is interrupted, or the
    /// file cannot be written.
    fn download(&self, request: &DownloadRequest, dest: &Path) -> Result<u64, DownloadError>;
}

/// Errors arising from asset downloads.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// The request never produced an HTTP response.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The server answered with a non-success status.
    #[error("download of {url} returned HTTP {status}")]
    Status {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The body stopped before it was fully read.
    #[error("download interrupted after {written} bytes: {reason}")]
    Interrupted {
        /// Bytes already written to disk.
        written: u64,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

/// Cumulative progress against a declared content length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DownloadProgress {
    total: Option<u64>,
    written: u64,
    last_reported: Option<u64>,
}

impl DownloadProgress {
    /// Start tracking a body of `total` bytes, when known.
    #[must_use]
    pub const fn new(total: Option<u64>) -> Self {
        Self {
            total,
            written: 0,
            last_reported: None,
        }
    }

    /// Bytes written so far.
    #[must_use]
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Whole percent complete, or `None` when the total is unknown or zero.
    #[must_use]
    pub fn percent(&self) -> Option<u64> {
        let total = self.total.filter(|total| *total > 0)?;
        Some(self.written.saturating_mul(100).checked_div(total)?.min(100))
    }

    /// Record `bytes` more, returning the new percentage each time a further
    /// ten percent has been crossed.
    pub fn advance(&mut self, bytes: u64) -> Option<u64> {
        self.written = self.written.saturating_add(bytes);
        let percent = self.percent()?;
        let decile = percent.checked_div(10)?;
        if self.last_reported.is_some_and(|last| last >= decile) {
            return None;
        }
        self.last_reported = Some(decile);
        Some(percent)
    }
}

/// Create the download directory if it does not exist.
///
/// # Errors
///
/// Returns [`DownloadError::Io`] when the directory cannot be created.
pub fn prepare_download_dir(dir: &Path) -> Result<(), DownloadError> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}

/// Copy `reader` into a new file at `dest` in [`CHUNK_SIZE`] pieces.
///
/// Read failures are reported as [`DownloadError::Interrupted`] and write
/// failures as [`DownloadError::Io`]; in both cases the partial file stays
/// on disk.
///
/// # Errors
///
/// See above.
pub fn stream_to_file<R>(
    reader: &mut R,
    total: Option<u64>,
    dest: &Path,
) -> Result<u64, DownloadError>
where
    R: Read + ?Sized,
{
    let mut file = File::create(dest)?;
    let mut buffer = vec![0_u8; CHUNK_SIZE];
    let mut progress = DownloadProgress::new(total);

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                return Err(DownloadError::Interrupted {
                    written: progress.written(),
                    reason: err.to_string(),
                });
            }
        };
        let chunk = buffer.get(..read).unwrap_or_default();
        file.write_all(chunk)?;
        if let Some(percent) = progress.advance(chunk.len() as u64) {
            debug!("Progress: {percent}% of {}", dest.display());
        }
    }
    file.flush()?;

    if let Some(expected) = total
        && expected != progress.written()
    {
        warn!(
            "Declared length {expected} differs from {} bytes written to {}",
            progress.written(),
            dest.display()
        );
    }

    Ok(progress.written())
}
