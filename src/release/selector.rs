//! Release archive selection.
//!
//! A release archive is an asset whose whole name matches
//! `^release-.*\.tar\.gz$`, compared case-sensitively. When several assets
//! match, the configured [`AssetSelection`] decides which one is used.

use super::{Asset, Release};
use crate::config::AssetSelection;

/// The asset name pattern, for messages.
pub const RELEASE_ARCHIVE_PATTERN: &str = "release-*.tar.gz";

const PREFIX: &str = "release-";
const SUFFIX: &str = ".tar.gz";

/// Return true when `name` is a release archive name.
///
/// Equivalent to an anchored match of `^release-.*\.tar\.gz$`: the middle
/// part may be empty but may not contain a line break.
///
/// # Examples
///
/// ```
/// use release_relay::release::selector::is_release_archive;
///
/// assert!(is_release_archive("release-1.2.0.tar.gz"));
/// assert!(!is_release_archive("Release-1.2.0.tar.gz"));
/// assert!(!is_release_archive("release-1.2.0.tar.gz.sig"));
/// ```
#[must_use]
pub fn is_release_archive(name: &str) -> bool {
    name.strip_prefix(PREFIX)
        .and_then(|rest| rest.strip_suffix(SUFFIX))
        .is_some_and(|middle| !middle.contains('\n'))
}

/// Pick the release archive from `release` according to `policy`.
///
/// Returns `None` when no asset matches.
#[must_use]
pub fn select_asset(release: &Release, policy: AssetSelection) -> Option<&Asset> {
    let mut candidates = release
        .assets
        .iter()
        .filter(|asset| is_release_archive(&asset.name));
    match policy {
        AssetSelection::FirstListed => candidates.next(),
        AssetSelection::NewestCreated => candidates.fold(None, |best: Option<&Asset>, asset| {
            match best {
                Some(current) if asset.created_at <= current.created_at => Some(current),
                _ => Some(asset),
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    fn asset(name: &str) -> Asset {
        Asset {
            name: name.to_owned(),
            size: 1,
            api_url: None,
            browser_download_url: Some(format!("https://example.test/{name}")),
            created_at: None,
        }
    }

    fn asset_created(name: &str, day: u32) -> Asset {
        Asset {
            created_at: Utc.with_ymd_and_hms(2025, 1, day, 0, 0, 0).single(),
            ..asset(name)
        }
    }

    fn release_with(assets: Vec<Asset>) -> Release {
        Release {
            tag_name: "v1.0.0".to_owned(),
            name: None,
            assets,
        }
    }

    #[rstest]
    #[case::plain("release-1.0.0.tar.gz", true)]
    #[case::empty_middle("release-.tar.gz", true)]
    #[case::nested_dots("release-web.2025.01.tar.gz", true)]
    #[case::uppercase("RELEASE-1.0.0.tar.gz", false)]
    #[case::missing_dash("release1.0.0.tar.gz", false)]
    #[case::zip("release-1.0.0.zip", false)]
    #[case::trailing("release-1.0.0.tar.gz.asc", false)]
    #[case::leading("my-release-1.0.0.tar.gz", false)]
    #[case::tgz("release-1.0.0.tgz", false)]
    #[case::newline("release-1\n.tar.gz", false)]
    fn matches_anchored_pattern(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_release_archive(name), expected, "{name:?}");
    }

    #[test]
    fn first_listed_returns_first_match() {
        let release = release_with(vec![
            asset("checksums.txt"),
            asset("release-a.tar.gz"),
            asset("release-b.tar.gz"),
        ]);
        let selected = select_asset(&release, AssetSelection::FirstListed).expect("match");
        assert_eq!(selected.name, "release-a.tar.gz");
    }

    #[rstest]
    #[case::first_listed(AssetSelection::FirstListed)]
    #[case::newest_created(AssetSelection::NewestCreated)]
    fn no_match_returns_none(#[case] policy: AssetSelection) {
        let release = release_with(vec![asset("source.zip"), asset("notes.md")]);
        assert!(select_asset(&release, policy).is_none());
        assert!(select_asset(&release_with(Vec::new()), policy).is_none());
    }

    #[test]
    fn newest_created_prefers_latest_timestamp() {
        let release = release_with(vec![
            asset_created("release-old.tar.gz", 1),
            asset_created("release-new.tar.gz", 9),
            asset_created("release-mid.tar.gz", 5),
            asset_created("other.tar.gz", 20),
        ]);
        let selected = select_asset(&release, AssetSelection::NewestCreated).expect("match");
        assert_eq!(selected.name, "release-new.tar.gz");
    }

    #[test]
    fn newest_created_ranks_missing_timestamps_lowest_and_keeps_listing_order_on_ties() {
        let release = release_with(vec![
            asset("release-untimed.tar.gz"),
            asset_created("release-first.tar.gz", 3),
            asset_created("release-second.tar.gz", 3),
        ]);
        let selected = select_asset(&release, AssetSelection::NewestCreated).expect("match");
        assert_eq!(selected.name, "release-first.tar.gz");
    }
}
