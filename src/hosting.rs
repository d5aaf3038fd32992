//! HTTP client for the release-hosting APIs.
//!
//! [`HostingClient`] implements both [`ReleaseSource`] and
//! [`AssetDownloader`] over a shared `ureq` agent. Request construction is
//! kept in pure helpers so the URL and header rules are testable without a
//! server.

use crate::config::{Provider, Secret};
use crate::release::locator::{LocateError, ReleaseSource};
use crate::release::{Release, RepoId};
use crate::transfer::download::{
    AssetDownloader, BINARY_ACCEPT, DownloadError, DownloadRequest, stream_to_file,
};
use log::{debug, info};
use std::path::Path;
use std::sync::OnceLock;

/// Base URL of the public GitHub API.
pub const GITHUB_API_BASE: &str = "https://api.github.com";

const GITHUB_JSON_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const GITEA_JSON_ACCEPT: &str = "application/json";
const USER_AGENT: &str = concat!("release-relay/", env!("CARGO_PKG_VERSION"));

/// Release API client for one provider and optional credential.
#[derive(Clone, Debug)]
pub struct HostingClient {
    provider: Provider,
    token: Option<Secret>,
}

impl HostingClient {
    /// Create a client for `provider`, authenticating with `token` when set.
    #[must_use]
    pub const fn new(provider: Provider, token: Option<Secret>) -> Self {
        Self { provider, token }
    }

    /// The endpoint returning the latest release of `repo`.
    ///
    /// # Examples
    ///
    /// ```
    /// use release_relay::config::Provider;
    /// use release_relay::hosting::HostingClient;
    ///
    /// let client = HostingClient::new(Provider::GitHub, None);
    /// let repo = "octo-org/widgets".parse()?;
    /// assert_eq!(
    ///     client.latest_release_url(&repo),
    ///     "https://api.github.com/repos/octo-org/widgets/releases/latest"
    /// );
    /// # Ok::<(), release_relay::release::RepoIdError>(())
    /// ```
    #[must_use]
    pub fn latest_release_url(&self, repo: &RepoId) -> String {
        match &self.provider {
            Provider::GitHub => format!("{GITHUB_API_BASE}/repos/{repo}/releases/latest"),
            Provider::Gitea { base_url } => {
                format!("{base_url}/api/v1/repos/{repo}/releases/latest")
            }
        }
    }

    /// Headers for a metadata request, or for a binary asset download when
    /// `binary` is set.
    #[must_use]
    pub fn request_headers(&self, binary: bool) -> Vec<(&'static str, String)> {
        let accept = match (&self.provider, binary) {
            (_, true) => BINARY_ACCEPT,
            (Provider::GitHub, false) => GITHUB_JSON_ACCEPT,
            (Provider::Gitea { .. }, false) => GITEA_JSON_ACCEPT,
        };
        let mut headers = vec![
            ("User-Agent", USER_AGENT.to_owned()),
            ("Accept", accept.to_owned()),
        ];
        if matches!(self.provider, Provider::GitHub) {
            headers.push(("X-GitHub-Api-Version", GITHUB_API_VERSION.to_owned()));
        }
        if let Some(token) = &self.token {
            let value = match self.provider {
                Provider::GitHub => format!("Bearer {}", token.expose()),
                Provider::Gitea { .. } => format!("token {}", token.expose()),
            };
            headers.push(("Authorization", value));
        }
        headers
    }

    fn get(
        &self,
        url: &str,
        binary: bool,
    ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        let mut request = http_agent().get(url);
        for (name, value) in self.request_headers(binary) {
            request = request.header(name, value);
        }
        request.call()
    }
}

impl ReleaseSource for HostingClient {
    fn latest_release(&self, repo: &RepoId) -> Result<Release, LocateError> {
        let url = self.latest_release_url(repo);
        info!("Fetching latest {} release of {repo}", self.provider.name());
        let response = self
            .get(&url, false)
            .map_err(|err| map_locate_error(&url, &err))?;
        let body = response
            .into_body()
            .read_to_string()
            .map_err(|err| LocateError::Transport {
                url: url.clone(),
                reason: err.to_string(),
            })?;
        decode_release(&url, &body)
    }
}

impl AssetDownloader for HostingClient {
    fn download(&self, request: &DownloadRequest, dest: &Path) -> Result<u64, DownloadError> {
        debug!("Requesting {} (binary: {})", request.url, request.binary);
        let response = self
            .get(&request.url, request.binary)
            .map_err(|err| map_download_error(&request.url, &err))?;
        let mut body = response.into_body();
        let total = body.content_length();
        stream_to_file(&mut body.as_reader(), total, dest)
    }
}

/// Parse a release document returned by `url`.
fn decode_release(url: &str, body: &str) -> Result<Release, LocateError> {
    serde_json::from_str(body).map_err(|err| LocateError::Decode {
        url: url.to_owned(),
        reason: err.to_string(),
    })
}

/// Shared `ureq` agent; timeouts are the library defaults.
fn http_agent() -> &'static ureq::Agent {
    static AGENT: OnceLock<ureq::Agent> = OnceLock::new();
    AGENT.get_or_init(ureq::Agent::new_with_defaults)
}

/// Map a ureq error to a [`LocateError`].
fn map_locate_error(url: &str, err: &ureq::Error) -> LocateError {
    match err {
        ureq::Error::StatusCode(status) => LocateError::Api {
            url: url.to_owned(),
            status: *status,
        },
        other => LocateError::Transport {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

/// Map a ureq error to a [`DownloadError`].
fn map_download_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(status) => DownloadError::Status {
            url: url.to_owned(),
            status: *status,
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
