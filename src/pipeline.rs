//! The relay pipeline: locate → select → download → extract → publish →
//! clean up.
//!
//! Every stage runs once, in order, and the first failure ends the run. The
//! release is fetched a single time and its selected asset drives every
//! later stage. Local copies are removed only after a successful upload; on
//! any failure they stay on disk for inspection.

use serde::Serialize;

use crate::config::{RelayConfig, Secret};
use crate::error::{RelayError, Result};
use crate::hosting::HostingClient;
use crate::publish::cleanup::remove_local_copies;
use crate::publish::remote::{FtpConnector, RemoteConnector};
use crate::publish::{PublishReport, Publisher};
use crate::release::RepoId;
use crate::release::locator::ReleaseSource;
use crate::release::selector::select_asset;
use crate::transfer::artifact::LocalArtifact;
use crate::transfer::download::{AssetDownloader, prepare_download_dir, request_for_asset};
use crate::transfer::extraction::{ArchiveExtractor, TarGzExtractor};
use log::info;

/// One requested relay run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferJob {
    /// Repository whose latest release is relayed.
    pub repo: RepoId,
    /// Destination root on the transfer endpoint.
    pub remote_path: String,
    /// Hosting credential used instead of the configured one.
    pub token_override: Option<Secret>,
}

/// Summary of a successful run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Repository relayed, as `owner/name`.
    pub repo: String,
    /// Tag of the release that was relayed.
    pub tag: String,
    /// Display name of the release.
    pub release_name: String,
    /// Name of the asset that was relayed.
    pub asset: String,
    /// Bytes written to the local archive.
    pub bytes_downloaded: u64,
    /// Files unpacked from the archive.
    pub files_extracted: usize,
    /// Upload statistics.
    pub publish: PublishReport,
    /// Local copies that could not be removed afterwards.
    pub cleanup_warnings: Vec<String>,
}

/// The collaborators a run talks to.
#[derive(Clone, Copy)]
pub struct Stages<'a> {
    /// Source of release metadata.
    pub releases: &'a dyn ReleaseSource,
    /// Asset download transport.
    pub downloader: &'a dyn AssetDownloader,
    /// Archive reader.
    pub extractor: &'a dyn ArchiveExtractor,
    /// Transfer endpoint.
    pub connector: &'a dyn RemoteConnector,
}

/// Run `job` against the configured hosting provider and FTP server.
///
/// # Errors
///
/// Returns the first stage failure; see [`run_job_with`].
pub fn run_job(config: &RelayConfig, job: &TransferJob) -> Result<RunReport> {
    let token = job
        .token_override
        .clone()
        .or_else(|| config.token().cloned());
    let client = HostingClient::new(config.provider().clone(), token);
    let stages = Stages {
        releases: &client,
        downloader: &client,
        extractor: &TarGzExtractor,
        connector: &FtpConnector,
    };
    run_job_with(config, job, stages)
}

/// Testable inner function with injected stages.
///
/// [`run_job`] delegates here with the production implementations.
///
/// # Errors
///
/// Returns [`RelayError::Config`] when FTP credentials are incomplete, before
/// any network call. Otherwise returns the error of the first stage that
/// fails: [`RelayError::Locate`], [`RelayError::NoMatchingAsset`],
/// [`RelayError::MissingLocator`], [`RelayError::ArtifactName`],
/// [`RelayError::Download`], [`RelayError::Extraction`], or
/// [`RelayError::Publish`].
pub fn run_job_with(
    config: &RelayConfig,
    job: &TransferJob,
    stages: Stages<'_>,
) -> Result<RunReport> {
    let credentials = config.ftp().credentials()?;

    let release = stages.releases.latest_release(&job.repo)?;
    info!(
        "Latest release of {}: {} ({})",
        job.repo,
        release.tag_name,
        release.display_name()
    );

    let asset = select_asset(&release, config.asset_selection()).ok_or_else(|| {
        RelayError::NoMatchingAsset {
            tag: release.tag_name.clone(),
        }
    })?;
    info!("Selected {} ({} bytes)", asset.name, asset.size);
    let request =
        request_for_asset(config.provider(), asset).ok_or_else(|| RelayError::MissingLocator {
            asset: asset.name.clone(),
        })?;
    let artifact = LocalArtifact::for_asset(config.download_dir(), &asset.name)?;

    prepare_download_dir(config.download_dir().as_std_path())?;
    let bytes_downloaded = stages
        .downloader
        .download(&request, artifact.archive_path().as_std_path())?;
    info!("Downloaded {} ({bytes_downloaded} bytes)", artifact.archive_path());

    let extracted = stages.extractor.extract(
        artifact.archive_path().as_std_path(),
        artifact.extract_dir().as_std_path(),
    )?;
    info!(
        "Extracted {} files into {}",
        extracted.files.len(),
        artifact.extract_dir()
    );

    let publish = Publisher::new(stages.connector, config.file_failure_policy()).publish(
        &credentials,
        artifact.extract_dir().as_std_path(),
        &job.remote_path,
    )?;

    let cleanup_warnings = remove_local_copies(&artifact);

    Ok(RunReport {
        repo: job.repo.to_string(),
        tag: release.tag_name.clone(),
        release_name: release.display_name().to_owned(),
        asset: asset.name.clone(),
        bytes_downloaded,
        files_extracted: extracted.files.len(),
        publish,
        cleanup_warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FtpSettings, Secret};
    use crate::publish::remote::MockRemoteConnector;
    use crate::release::locator::{LocateError, MockReleaseSource};
    use crate::release::{Asset, Release};
    use crate::transfer::download::{DownloadError, MockAssetDownloader};
    use crate::transfer::extraction::MockArchiveExtractor;
    use camino::Utf8PathBuf;

    fn config(download_dir: &std::path::Path) -> RelayConfig {
        RelayConfig::from_lookup(|_| None)
            .expect("default config")
            .with_download_dir(
                Utf8PathBuf::from_path_buf(download_dir.to_path_buf()).expect("utf-8 dir"),
            )
            .with_ftp(FtpSettings::new(
                Some("ftp.example.com".to_owned()),
                Some("deploy".to_owned()),
                Some(Secret::new("pw")),
            ))
    }

    fn job() -> TransferJob {
        TransferJob {
            repo: "octo-org/widgets".parse().expect("repo"),
            remote_path: "site".to_owned(),
            token_override: None,
        }
    }

    fn release(assets: Vec<Asset>) -> Release {
        Release {
            tag_name: "v1.0.0".to_owned(),
            name: None,
            assets,
        }
    }

    fn archive_asset() -> Asset {
        Asset {
            name: "release-1.0.0.tar.gz".to_owned(),
            size: 4,
            api_url: Some("https://api.test/assets/1".to_owned()),
            browser_download_url: None,
            created_at: None,
        }
    }

    #[test]
    fn missing_ftp_credentials_fail_before_any_lookup() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = config(dir.path()).with_ftp(FtpSettings::default());
        let mut releases = MockReleaseSource::new();
        releases.expect_latest_release().never();
        let downloader = MockAssetDownloader::new();
        let extractor = MockArchiveExtractor::new();
        let connector = MockRemoteConnector::new();

        let err = run_job_with(
            &config,
            &job(),
            Stages {
                releases: &releases,
                downloader: &downloader,
                extractor: &extractor,
                connector: &connector,
            },
        )
        .expect_err("should fail");

        assert!(matches!(err, RelayError::Config(_)));
    }

    #[test]
    fn release_without_assets_never_downloads() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = config(dir.path());
        let mut releases = MockReleaseSource::new();
        releases
            .expect_latest_release()
            .times(1)
            .returning(|_| Ok(release(Vec::new())));
        let mut downloader = MockAssetDownloader::new();
        downloader.expect_download().never();
        let extractor = MockArchiveExtractor::new();
        let connector = MockRemoteConnector::new();

        let err = run_job_with(
            &config,
            &job(),
            Stages {
                releases: &releases,
                downloader: &downloader,
                extractor: &extractor,
                connector: &connector,
            },
        )
        .expect_err("should fail");

        assert!(matches!(err, RelayError::NoMatchingAsset { ref tag } if tag == "v1.0.0"));
    }

    #[test]
    fn lookup_failure_is_propagated() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = config(dir.path());
        let mut releases = MockReleaseSource::new();
        releases.expect_latest_release().returning(|_| {
            Err(LocateError::Api {
                url: "https://api.test".to_owned(),
                status: 404,
            })
        });
        let downloader = MockAssetDownloader::new();
        let extractor = MockArchiveExtractor::new();
        let connector = MockRemoteConnector::new();

        let err = run_job_with(
            &config,
            &job(),
            Stages {
                releases: &releases,
                downloader: &downloader,
                extractor: &extractor,
                connector: &connector,
            },
        )
        .expect_err("should fail");

        assert!(matches!(
            err,
            RelayError::Locate(LocateError::Api { status: 404, .. })
        ));
    }

    #[test]
    fn interrupted_download_skips_extraction_and_upload() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = config(dir.path());
        let mut releases = MockReleaseSource::new();
        releases
            .expect_latest_release()
            .returning(|_| Ok(release(vec![archive_asset()])));
        let mut downloader = MockAssetDownloader::new();
        downloader.expect_download().times(1).returning(|_, _| {
            Err(DownloadError::Interrupted {
                written: 2,
                reason: "connection reset".to_owned(),
            })
        });
        let mut extractor = MockArchiveExtractor::new();
        extractor.expect_extract().never();
        let mut connector = MockRemoteConnector::new();
        connector.expect_connect().never();

        let err = run_job_with(
            &config,
            &job(),
            Stages {
                releases: &releases,
                downloader: &downloader,
                extractor: &extractor,
                connector: &connector,
            },
        )
        .expect_err("should fail");

        assert!(matches!(
            err,
            RelayError::Download(DownloadError::Interrupted { .. })
        ));
    }

    #[test]
    fn authenticated_locator_is_requested_as_binary() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = config(dir.path());
        let mut releases = MockReleaseSource::new();
        releases
            .expect_latest_release()
            .returning(|_| Ok(release(vec![archive_asset()])));
        let mut downloader = MockAssetDownloader::new();
        downloader
            .expect_download()
            .withf(|request, dest| {
                request.binary
                    && request.url == "https://api.test/assets/1"
                    && dest.ends_with("release-1.0.0.tar.gz")
            })
            .returning(|_, _| {
                Err(DownloadError::Status {
                    url: "https://api.test/assets/1".to_owned(),
                    status: 403,
                })
            });
        let extractor = MockArchiveExtractor::new();
        let connector = MockRemoteConnector::new();

        let err = run_job_with(
            &config,
            &job(),
            Stages {
                releases: &releases,
                downloader: &downloader,
                extractor: &extractor,
                connector: &connector,
            },
        )
        .expect_err("should fail");

        assert!(matches!(err, RelayError::Download(DownloadError::Status { status: 403, .. })));
        assert!(dir.path().is_dir(), "download directory is created");
    }
}
