//! Local artifact layout.
//!
//! The downloaded archive and its extraction directory sit side by side in
//! the working directory, both named after the asset:
//! `downloads/release-1.2.tar.gz` unpacks into `downloads/release-1.2/`.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Error raised when an asset name cannot be used as a local file name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("asset name \"{name}\" cannot be used as a local file name: {reason}")]
pub struct ArtifactNameError {
    /// The rejected asset name.
    pub name: String,
    /// Description of the violated rule.
    pub reason: &'static str,
}

/// Paths of the downloaded archive and its extraction directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalArtifact {
    archive_path: Utf8PathBuf,
    extract_dir: Utf8PathBuf,
}

impl LocalArtifact {
    /// Derive the artifact paths for `asset_name` under `download_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactNameError`] when the name contains a path separator,
    /// is a relative path segment, or lacks the `.tar.gz` suffix.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use release_relay::transfer::artifact::LocalArtifact;
    ///
    /// let artifact = LocalArtifact::for_asset(Utf8Path::new("downloads"), "release-1.2.tar.gz")?;
    /// assert_eq!(artifact.archive_path(), "downloads/release-1.2.tar.gz");
    /// assert_eq!(artifact.extract_dir(), "downloads/release-1.2");
    /// # Ok::<(), release_relay::transfer::artifact::ArtifactNameError>(())
    /// ```
    pub fn for_asset(download_dir: &Utf8Path, asset_name: &str) -> Result<Self, ArtifactNameError> {
        let reject = |reason| ArtifactNameError {
            name: asset_name.to_owned(),
            reason,
        };
        if asset_name.contains(['/', '\\']) {
            return Err(reject("contains a path separator"));
        }
        let stem = asset_name
            .strip_suffix(ARCHIVE_SUFFIX)
            .ok_or_else(|| reject("missing .tar.gz suffix"))?;
        if stem.is_empty() || stem == "." || stem == ".." {
            return Err(reject("stem is not a usable directory name"));
        }
        Ok(Self {
            archive_path: download_dir.join(asset_name),
            extract_dir: download_dir.join(stem),
        })
    }

    /// The downloaded archive.
    #[must_use]
    pub fn archive_path(&self) -> &Utf8Path {
        &self.archive_path
    }

    /// The extraction directory.
    #[must_use]
    pub fn extract_dir(&self) -> &Utf8Path {
        &self.extract_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::separator("dist/release-1.tar.gz")]
    #[case::backslash("dist\\release-1.tar.gz")]
    #[case::no_suffix("release-1.zip")]
    #[case::parent_stem("...tar.gz")]
    #[case::bare_suffix(".tar.gz")]
    fn rejects_unusable_names(#[case] name: &str) {
        assert!(LocalArtifact::for_asset(Utf8Path::new("downloads"), name).is_err());
    }

    #[test]
    fn strips_only_the_trailing_suffix() {
        let artifact =
            LocalArtifact::for_asset(Utf8Path::new("/srv/relay"), "release-a.tar.gz.tar.gz")
                .expect("valid name");
        assert_eq!(artifact.extract_dir(), "/srv/relay/release-a.tar.gz");
    }
}
