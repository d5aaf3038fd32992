//! Download and extraction of the selected release archive.
//!
//! - [`artifact`] - deterministic local paths derived from the asset name.
//! - [`download`] - the `AssetDownloader` seam and chunked streaming to disk.
//! - [`extraction`] - gzip tar extraction with path traversal protection.

pub mod artifact;
pub mod download;
pub mod extraction;
