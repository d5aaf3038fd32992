//! Process-wide configuration for the relay.
//!
//! `RelayConfig` is assembled once at start-up and handed to the pipeline
//! and the trigger server by reference. Values come from an injectable key
//! lookup so that tests can describe an environment without touching the
//! process state; [`RelayConfig::from_env`] wires the lookup to
//! `std::env::var`. Blank values are treated as absent, which keeps templated
//! `.env` files such as `FTP_HOST=` from producing half-configured state.

use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;
use thiserror::Error;

/// Environment key holding the shared trigger secret.
pub const API_KEY_VAR: &str = "APIKEY";
/// Environment key selecting the release-hosting provider.
pub const PROVIDER_VAR: &str = "RELAY_PROVIDER";
/// Environment key holding the GitHub token.
pub const GITHUB_TOKEN_VAR: &str = "GITHUB_TOKEN";
/// Environment key holding the Gitea token.
pub const GITEA_TOKEN_VAR: &str = "GITEA_TOKEN";
/// Environment key holding the Gitea base URL.
pub const GITEA_URL_VAR: &str = "GITEA_URL";
/// Environment key holding the FTP host, optionally with a port.
pub const FTP_HOST_VAR: &str = "FTP_HOST";
/// Environment key holding the FTP user name.
pub const FTP_USER_VAR: &str = "FTP_USER";
/// Environment key holding the FTP password.
pub const FTP_PASSWORD_VAR: &str = "FTP_PASSWORD";
/// Environment key overriding the local working directory.
pub const DOWNLOAD_DIR_VAR: &str = "RELAY_DOWNLOAD_DIR";
/// Environment key selecting the duplicate-asset policy.
pub const ASSET_SELECTION_VAR: &str = "RELAY_ASSET_SELECTION";
/// Environment key selecting the per-file upload failure policy.
pub const FILE_FAILURE_VAR: &str = "RELAY_ON_FILE_ERROR";
/// Environment key overriding the trigger server bind address.
pub const BIND_VAR: &str = "RELAY_BIND";

/// Default local working directory.
pub const DEFAULT_DOWNLOAD_DIR: &str = "./downloads";
/// Default trigger server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5000";
/// Port used when `FTP_HOST` does not carry one.
pub const DEFAULT_FTP_PORT: u16 = 21;

/// Errors raised while assembling or consulting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required key has no value.
    #[error("missing required configuration value {key}")]
    MissingValue {
        /// The environment key that was expected.
        key: &'static str,
    },

    /// A key holds a value outside its accepted set.
    #[error("invalid value \"{value}\" for {key}; expected {expected}")]
    InvalidValue {
        /// The environment key that was read.
        key: &'static str,
        /// The rejected value.
        value: String,
        /// Human-readable description of accepted values.
        expected: &'static str,
    },

    /// One or more FTP credentials are not configured.
    #[error("FTP credentials are missing: {}", .missing.join(", "))]
    MissingFtpCredentials {
        /// The keys that had no value.
        missing: Vec<&'static str>,
    },
}

/// A credential whose value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a credential value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw credential.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Compare against a candidate without short-circuiting on the first
    /// differing byte.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        let expected = self.0.as_bytes();
        let actual = candidate.as_bytes();
        let mut diff = expected.len() ^ actual.len();
        for (index, byte) in expected.iter().enumerate() {
            let other = actual.get(index).copied().unwrap_or(0);
            diff |= usize::from(byte ^ other);
        }
        diff == 0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// The release-hosting platform queried for releases.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    /// The public GitHub API at a fixed base URL.
    GitHub,
    /// A self-hosted Gitea instance.
    Gitea {
        /// Base URL of the instance, e.g. `https://git.example.com`.
        base_url: String,
    },
}

impl Provider {
    /// Short lowercase name used in logs and configuration.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::Gitea { .. } => "gitea",
        }
    }

    /// The environment key carrying this provider's token.
    #[must_use]
    pub const fn token_var(&self) -> &'static str {
        match self {
            Self::GitHub => GITHUB_TOKEN_VAR,
            Self::Gitea { .. } => GITEA_TOKEN_VAR,
        }
    }
}

/// Policy for choosing between several assets that match the release
/// archive pattern.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AssetSelection {
    /// Take the first match in the order the API lists assets.
    #[default]
    FirstListed,
    /// Take the match with the latest creation timestamp. Assets without a
    /// timestamp rank lowest; ties keep listing order.
    NewestCreated,
}

impl FromStr for AssetSelection {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::FirstListed),
            "newest" => Ok(Self::NewestCreated),
            _ => Err(ConfigError::InvalidValue {
                key: ASSET_SELECTION_VAR,
                value: value.to_owned(),
                expected: "\"first\" or \"newest\"",
            }),
        }
    }
}

/// Policy for file-level failures while uploading the extracted tree.
///
/// Directory-creation failures are always tolerated; this only governs
/// file transfers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FileFailurePolicy {
    /// Fail the publish stage on the first file that cannot be transferred.
    #[default]
    Abort,
    /// Attempt every file, collect the failures, and report a partial upload.
    Continue,
}

impl FromStr for FileFailurePolicy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "continue" => Ok(Self::Continue),
            _ => Err(ConfigError::InvalidValue {
                key: FILE_FAILURE_VAR,
                value: value.to_owned(),
                expected: "\"abort\" or \"continue\"",
            }),
        }
    }
}

/// Complete FTP login details.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FtpCredentials {
    /// Host name or IP literal, optionally suffixed with `:port`. IPv6
    /// literals take a port only in bracketed form (`[::1]:2121`).
    pub host: String,
    /// Login user.
    pub user: String,
    /// Login password.
    pub password: Secret,
}

impl FtpCredentials {
    /// The `host:port` address to connect to, adding the default FTP port
    /// when the host does not name one.
    #[must_use]
    pub fn address(&self) -> String {
        let host = self.host.as_str();
        if host.starts_with('[') {
            return if host.ends_with(']') {
                format!("{host}:{DEFAULT_FTP_PORT}")
            } else {
                host.to_owned()
            };
        }
        if host.parse::<Ipv6Addr>().is_ok() {
            return format!("[{host}]:{DEFAULT_FTP_PORT}");
        }
        let has_port = host
            .rsplit_once(':')
            .is_some_and(|(_, port)| port.parse::<u16>().is_ok());
        if has_port {
            host.to_owned()
        } else {
            format!("{host}:{DEFAULT_FTP_PORT}")
        }
    }
}

/// FTP settings as read from the environment, possibly incomplete.
///
/// Completeness is checked when the credentials are needed so that a relay
/// without FTP settings can still start and report the problem per run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FtpSettings {
    host: Option<String>,
    user: Option<String>,
    password: Option<Secret>,
}

impl FtpSettings {
    /// Build settings from optional parts.
    #[must_use]
    pub const fn new(host: Option<String>, user: Option<String>, password: Option<Secret>) -> Self {
        Self {
            host,
            user,
            password,
        }
    }

    /// Return complete credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFtpCredentials`] naming every absent key.
    pub fn credentials(&self) -> Result<FtpCredentials, ConfigError> {
        match (&self.host, &self.user, &self.password) {
            (Some(host), Some(user), Some(password)) => Ok(FtpCredentials {
                host: host.clone(),
                user: user.clone(),
                password: password.clone(),
            }),
            _ => {
                let missing = [
                    (FTP_HOST_VAR, self.host.is_none()),
                    (FTP_USER_VAR, self.user.is_none()),
                    (FTP_PASSWORD_VAR, self.password.is_none()),
                ]
                .into_iter()
                .filter_map(|(key, absent)| absent.then_some(key))
                .collect();
                Err(ConfigError::MissingFtpCredentials { missing })
            }
        }
    }
}

/// Immutable relay configuration.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    api_key: Option<Secret>,
    provider: Provider,
    token: Option<Secret>,
    ftp: FtpSettings,
    download_dir: Utf8PathBuf,
    asset_selection: AssetSelection,
    file_failure_policy: FileFailurePolicy,
    bind_address: String,
}

impl RelayConfig {
    /// Build configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a value is malformed or a provider
    /// requirement is unmet.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a value is malformed or a provider
    /// requirement is unmet.
    ///
    /// # Examples
    ///
    /// ```
    /// use release_relay::config::{Provider, RelayConfig};
    ///
    /// let config = RelayConfig::from_lookup(|key| match key {
    ///     "RELAY_PROVIDER" => Some("gitea".to_owned()),
    ///     "GITEA_URL" => Some("https://git.example.com".to_owned()),
    ///     _ => None,
    /// })?;
    /// assert_eq!(
    ///     config.provider(),
    ///     &Provider::Gitea { base_url: "https://git.example.com".to_owned() }
    /// );
    /// # Ok::<(), release_relay::config::ConfigError>(())
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let provider = read(PROVIDER_VAR).map_or(Ok(Provider::GitHub), |name| {
            parse_provider(&name, read(GITEA_URL_VAR))
        })?;
        let token = read(provider.token_var()).map(Secret::new);

        let asset_selection = read(ASSET_SELECTION_VAR)
            .map(|value| value.parse::<AssetSelection>())
            .transpose()?
            .unwrap_or_default();
        let file_failure_policy = read(FILE_FAILURE_VAR)
            .map(|value| value.parse::<FileFailurePolicy>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            api_key: read(API_KEY_VAR).map(Secret::new),
            provider,
            token,
            ftp: FtpSettings::new(
                read(FTP_HOST_VAR),
                read(FTP_USER_VAR),
                read(FTP_PASSWORD_VAR).map(Secret::new),
            ),
            download_dir: read(DOWNLOAD_DIR_VAR)
                .map_or_else(|| Utf8PathBuf::from(DEFAULT_DOWNLOAD_DIR), Utf8PathBuf::from),
            asset_selection,
            file_failure_policy,
            bind_address: read(BIND_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_owned()),
        })
    }

    /// Replace the local working directory.
    #[must_use]
    pub fn with_download_dir(mut self, download_dir: Utf8PathBuf) -> Self {
        self.download_dir = download_dir;
        self
    }

    /// Replace the trigger server bind address.
    #[must_use]
    pub fn with_bind_address(mut self, bind_address: String) -> Self {
        self.bind_address = bind_address;
        self
    }

    /// Replace the FTP settings.
    #[must_use]
    pub fn with_ftp(mut self, ftp: FtpSettings) -> Self {
        self.ftp = ftp;
        self
    }

    /// Replace the duplicate-asset policy.
    #[must_use]
    pub const fn with_asset_selection(mut self, asset_selection: AssetSelection) -> Self {
        self.asset_selection = asset_selection;
        self
    }

    /// Replace the file failure policy.
    #[must_use]
    pub const fn with_file_failure_policy(mut self, policy: FileFailurePolicy) -> Self {
        self.file_failure_policy = policy;
        self
    }

    /// Replace the shared trigger secret.
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<Secret>) -> Self {
        self.api_key = api_key;
        self
    }

    /// The shared trigger secret, if configured.
    #[must_use]
    pub const fn api_key(&self) -> Option<&Secret> {
        self.api_key.as_ref()
    }

    /// The release-hosting provider.
    #[must_use]
    pub const fn provider(&self) -> &Provider {
        &self.provider
    }

    /// The hosting credential, if configured.
    #[must_use]
    pub const fn token(&self) -> Option<&Secret> {
        self.token.as_ref()
    }

    /// The FTP settings.
    #[must_use]
    pub const fn ftp(&self) -> &FtpSettings {
        &self.ftp
    }

    /// The local working directory.
    #[must_use]
    pub fn download_dir(&self) -> &Utf8Path {
        &self.download_dir
    }

    /// The duplicate-asset policy.
    #[must_use]
    pub const fn asset_selection(&self) -> AssetSelection {
        self.asset_selection
    }

    /// The file failure policy.
    #[must_use]
    pub const fn file_failure_policy(&self) -> FileFailurePolicy {
        self.file_failure_policy
    }

    /// The trigger server bind address.
    #[must_use]
    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }
}

fn parse_provider(name: &str, gitea_url: Option<String>) -> Result<Provider, ConfigError> {
    match name.trim().to_ascii_lowercase().as_str() {
        "github" => Ok(Provider::GitHub),
        "gitea" => {
            let base_url = gitea_url.ok_or(ConfigError::MissingValue { key: GITEA_URL_VAR })?;
            Ok(Provider::Gitea {
                base_url: base_url.trim().trim_end_matches('/').to_owned(),
            })
        }
        _ => Err(ConfigError::InvalidValue {
            key: PROVIDER_VAR,
            value: name.to_owned(),
            expected: "\"github\" or \"gitea\"",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = RelayConfig::from_lookup(lookup_from(&[])).expect("config");
        assert_eq!(config.provider(), &Provider::GitHub);
        assert!(config.api_key().is_none());
        assert!(config.token().is_none());
        assert_eq!(config.download_dir(), Utf8Path::new(DEFAULT_DOWNLOAD_DIR));
        assert_eq!(config.asset_selection(), AssetSelection::FirstListed);
        assert_eq!(config.file_failure_policy(), FileFailurePolicy::Abort);
        assert_eq!(config.bind_address(), DEFAULT_BIND_ADDRESS);
    }

    #[test]
    fn gitea_requires_base_url() {
        let err = RelayConfig::from_lookup(lookup_from(&[(PROVIDER_VAR, "gitea")]))
            .expect_err("missing GITEA_URL should fail");
        assert_eq!(err, ConfigError::MissingValue { key: GITEA_URL_VAR });
    }

    #[test]
    fn gitea_reads_its_own_token_and_trims_base_url() {
        let config = RelayConfig::from_lookup(lookup_from(&[
            (PROVIDER_VAR, "Gitea"),
            (GITEA_URL_VAR, "https://git.example.com/"),
            (GITEA_TOKEN_VAR, "gitea-secret"),
            (GITHUB_TOKEN_VAR, "github-secret"),
        ]))
        .expect("config");
        assert_eq!(
            config.provider(),
            &Provider::Gitea {
                base_url: "https://git.example.com".to_owned()
            }
        );
        assert_eq!(config.token().map(Secret::expose), Some("gitea-secret"));
    }

    #[rstest]
    #[case::provider(PROVIDER_VAR, "bitbucket")]
    #[case::selection(ASSET_SELECTION_VAR, "largest")]
    #[case::failure_policy(FILE_FAILURE_VAR, "ignore")]
    fn invalid_values_are_rejected(#[case] key: &'static str, #[case] value: &str) {
        let err = RelayConfig::from_lookup(lookup_from(&[(key, value)]))
            .expect_err("invalid value should fail");
        assert!(matches!(err, ConfigError::InvalidValue { key: k, .. } if k == key));
    }

    #[test]
    fn blank_values_are_treated_as_absent() {
        let config = RelayConfig::from_lookup(lookup_from(&[
            (API_KEY_VAR, "   "),
            (FTP_HOST_VAR, ""),
            (BIND_VAR, ""),
        ]))
        .expect("config");
        assert!(config.api_key().is_none());
        assert_eq!(config.bind_address(), DEFAULT_BIND_ADDRESS);
        assert_eq!(
            config.ftp().credentials(),
            Err(ConfigError::MissingFtpCredentials {
                missing: vec![FTP_HOST_VAR, FTP_USER_VAR, FTP_PASSWORD_VAR],
            })
        );
    }

    #[test]
    fn ftp_credentials_report_only_missing_keys() {
        let settings = FtpSettings::new(Some("ftp.example.com".to_owned()), None, None);
        let err = settings.credentials().expect_err("incomplete credentials");
        let message = err.to_string();
        assert!(message.contains(FTP_USER_VAR));
        assert!(message.contains(FTP_PASSWORD_VAR));
        assert!(!message.contains(FTP_HOST_VAR));
    }

    #[rstest]
    #[case::bare_host("ftp.example.com", "ftp.example.com:21")]
    #[case::explicit_port("ftp.example.com:2121", "ftp.example.com:2121")]
    #[case::ipv4_literal("192.0.2.10", "192.0.2.10:21")]
    #[case::ipv6_loopback("::1", "[::1]:21")]
    #[case::ipv6_link_local("fe80::1", "[fe80::1]:21")]
    #[case::bracketed_ipv6("[::1]", "[::1]:21")]
    #[case::bracketed_ipv6_with_port("[::1]:2121", "[::1]:2121")]
    fn ftp_address_adds_default_port(#[case] host: &str, #[case] expected: &str) {
        let credentials = FtpCredentials {
            host: host.to_owned(),
            user: "deploy".to_owned(),
            password: Secret::new("pw"),
        };
        assert_eq!(credentials.address(), expected);
    }

    #[test]
    fn secret_debug_is_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{secret:?}"), "Secret(***)");
        assert!(!format!("{:?}", Some(secret)).contains("hunter2"));
    }

    #[rstest]
    #[case::equal("abc123", true)]
    #[case::prefix("abc12", false)]
    #[case::longer("abc1234", false)]
    #[case::different("abd123", false)]
    #[case::empty("", false)]
    fn secret_matches_only_exact_value(#[case] candidate: &str, #[case] expected: bool) {
        assert_eq!(Secret::new("abc123").matches(candidate), expected);
    }

    #[test]
    fn from_env_reads_process_environment() {
        temp_env::with_vars(
            [
                (API_KEY_VAR, Some("shared")),
                (PROVIDER_VAR, None),
                (GITHUB_TOKEN_VAR, Some("gh-token")),
                (DOWNLOAD_DIR_VAR, Some("/tmp/relay-downloads")),
                (ASSET_SELECTION_VAR, Some("newest")),
                (FILE_FAILURE_VAR, Some("continue")),
            ],
            || {
                let config = RelayConfig::from_env().expect("config");
                assert!(config.api_key().is_some_and(|key| key.matches("shared")));
                assert_eq!(config.token().map(Secret::expose), Some("gh-token"));
                assert_eq!(config.download_dir(), Utf8Path::new("/tmp/relay-downloads"));
                assert_eq!(config.asset_selection(), AssetSelection::NewestCreated);
                assert_eq!(config.file_failure_policy(), FileFailurePolicy::Continue);
            },
        );
    }
}
