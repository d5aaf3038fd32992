//! Release metadata and repository identity.
//!
//! - [`locator`] - the `ReleaseSource` seam and its error type.
//! - [`selector`] - picking the release archive out of a release's assets.

pub mod locator;
pub mod selector;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a repository identifier is not `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid repository identifier \"{value}\": {reason}")]
pub struct RepoIdError {
    /// The rejected input.
    pub value: String,
    /// Description of the violated rule.
    pub reason: &'static str,
}

/// A repository identifier in `owner/name` form.
///
/// # Examples
///
/// ```
/// use release_relay::release::RepoId;
///
/// let repo: RepoId = "octo-org/widgets".parse()?;
/// assert_eq!(repo.owner(), "octo-org");
/// assert_eq!(repo.name(), "widgets");
/// assert_eq!(repo.to_string(), "octo-org/widgets");
/// # Ok::<(), release_relay::release::RepoIdError>(())
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RepoId {
    owner: String,
    name: String,
}

impl RepoId {
    /// The owning user or organisation.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// The repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for RepoId {
    type Err = RepoIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let reject = |reason| RepoIdError {
            value: value.to_owned(),
            reason,
        };
        let trimmed = value.trim();
        let (owner, name) = trimmed
            .split_once('/')
            .ok_or_else(|| reject("expected owner/name"))?;
        for part in [owner, name] {
            if part.is_empty() {
                return Err(reject("owner and name must both be non-empty"));
            }
            if part == "." || part == ".." {
                return Err(reject("owner and name must not be relative path segments"));
            }
            if !part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            {
                return Err(reject(
                    "only ASCII letters, digits, '-', '_' and '.' are allowed",
                ));
            }
        }
        Ok(Self {
            owner: owner.to_owned(),
            name: name.to_owned(),
        })
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A published release as returned by the hosting API.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Release {
    /// The release tag.
    pub tag_name: String,
    /// The display name; some releases leave it unset.
    #[serde(default)]
    pub name: Option<String>,
    /// Downloadable files, in API listing order.
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Release {
    /// The display name, falling back to the tag when unset or blank.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.tag_name)
    }
}

/// One downloadable file attached to a release.
///
/// GitHub reports both an authenticated API locator (`url`) and a direct
/// browser locator; Gitea reports only the latter.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Asset {
    /// The file name.
    pub name: String,
    /// Size in bytes as reported by the API.
    #[serde(default)]
    pub size: u64,
    /// Authenticated API locator, served as a binary stream.
    #[serde(default, rename = "url")]
    pub api_url: Option<String>,
    /// Direct download locator.
    #[serde(default)]
    pub browser_download_url: Option<String>,
    /// Upload timestamp.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::missing_slash("widgets")]
    #[case::empty_owner("/widgets")]
    #[case::empty_name("octo-org/")]
    #[case::nested("octo-org/widgets/extra")]
    #[case::parent_segment("../widgets")]
    #[case::whitespace("octo org/widgets")]
    fn rejects_malformed_identifiers(#[case] value: &str) {
        assert!(value.parse::<RepoId>().is_err(), "{value} should be rejected");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let repo: RepoId = "  octo-org/widgets.rs \n".parse().expect("valid repo");
        assert_eq!(repo.to_string(), "octo-org/widgets.rs");
    }

    #[test]
    fn decodes_github_release_payload() {
        let json = r#"{
            "tag_name": "v1.4.0",
            "name": "Widgets 1.4",
            "assets": [{
                "url": "https://api.github.com/repos/octo-org/widgets/releases/assets/1",
                "browser_download_url": "https://github.com/octo-org/widgets/releases/download/v1.4.0/release-1.4.0.tar.gz",
                "name": "release-1.4.0.tar.gz",
                "size": 2048,
                "created_at": "2025-03-01T12:00:00Z",
                "download_count": 7
            }]
        }"#;
        let release: Release = serde_json::from_str(json).expect("decode");
        assert_eq!(release.display_name(), "Widgets 1.4");
        let asset = release.assets.first().expect("one asset");
        assert_eq!(asset.size, 2048);
        assert!(asset.api_url.as_deref().is_some_and(|u| u.ends_with("/assets/1")));
        assert!(asset.created_at.is_some());
    }

    #[test]
    fn decodes_gitea_release_payload_without_api_locator() {
        let json = r#"{
            "id": 3,
            "tag_name": "v0.9.0",
            "name": "",
            "assets": [{
                "id": 11,
                "name": "release-0.9.0.tar.gz",
                "size": 512,
                "uuid": "2a6f",
                "browser_download_url": "https://git.example.com/attachments/2a6f"
            }]
        }"#;
        let release: Release = serde_json::from_str(json).expect("decode");
        assert_eq!(release.display_name(), "v0.9.0");
        let asset = release.assets.first().expect("one asset");
        assert!(asset.api_url.is_none());
        assert!(asset.created_at.is_none());
    }

    #[test]
    fn missing_assets_decode_as_empty() {
        let release: Release =
            serde_json::from_str(r#"{"tag_name": "v1", "name": null}"#).expect("decode");
        assert!(release.assets.is_empty());
    }
}
