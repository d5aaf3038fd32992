//! Trigger request handling.
//!
//! [`handle_trigger`] turns a decoded request into a status code and JSON
//! body without knowing about the HTTP server, so the authorization and
//! validation rules can be exercised directly. The secret is checked before
//! anything else; a rejected request never reaches the pipeline.

use serde::{Deserialize, Serialize};

use crate::config::{RelayConfig, Secret};
use crate::error::{ErrorKind, RelayError, Result};
use crate::pipeline::{RunReport, TransferJob};
use log::{error, info, warn};

/// HTTP 200.
pub const STATUS_OK: u16 = 200;
/// HTTP 400.
pub const STATUS_BAD_REQUEST: u16 = 400;
/// HTTP 403.
pub const STATUS_FORBIDDEN: u16 = 403;
/// HTTP 500.
pub const STATUS_INTERNAL_ERROR: u16 = 500;

const SUCCESS_MESSAGE: &str = "Download, extraction, and upload completed successfully";
const FAILURE_MESSAGE: &str = "Operation failed";

/// JSON body of `POST /download-extract-upload`.
#[derive(Clone, Default, Deserialize)]
pub struct TriggerRequest {
    /// Shared secret.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Repository in `owner/name` form.
    #[serde(default)]
    pub repo_name: Option<String>,
    /// Destination root on the transfer endpoint.
    #[serde(default)]
    pub remote_path: Option<String>,
    /// Hosting credential overriding the configured one.
    #[serde(default, alias = "github_token")]
    pub token: Option<String>,
}

impl std::fmt::Debug for TriggerRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerRequest")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("repo_name", &self.repo_name)
            .field("remote_path", &self.remote_path)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl TriggerRequest {
    /// Turn the request into a job, rejecting blank or malformed fields.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Validation`] when `repo_name` or `remote_path` is
    /// missing or blank, and [`RelayError::InvalidRepo`] when `repo_name` is
    /// not `owner/name`.
    pub fn to_job(&self) -> Result<TransferJob> {
        let present = |field: &Option<String>| {
            field
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_owned)
        };
        let (Some(repo_name), Some(remote_path)) =
            (present(&self.repo_name), present(&self.remote_path))
        else {
            return Err(RelayError::Validation {
                reason: "repo_name and remote_path are required".to_owned(),
            });
        };
        Ok(TransferJob {
            repo: repo_name.parse()?,
            remote_path,
            token_override: present(&self.token).map(Secret::new),
        })
    }
}

/// JSON body of a trigger response.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TriggerBody {
    /// Success message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failure headline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Failure category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    /// Diagnostic detail of a failed run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Summary of a successful run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunReport>,
}

/// A status code and body ready to send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggerResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: TriggerBody,
}

impl TriggerResponse {
    fn rejection(status: u16, err: &RelayError) -> Self {
        Self {
            status,
            body: TriggerBody {
                error: Some(err.to_string()),
                kind: Some(err.kind()),
                ..TriggerBody::default()
            },
        }
    }

    fn failure(err: &RelayError) -> Self {
        Self {
            status: STATUS_INTERNAL_ERROR,
            body: TriggerBody {
                error: Some(FAILURE_MESSAGE.to_owned()),
                kind: Some(err.kind()),
                detail: Some(err.to_string()),
                ..TriggerBody::default()
            },
        }
    }

    fn success(report: RunReport) -> Self {
        Self {
            status: STATUS_OK,
            body: TriggerBody {
                message: Some(SUCCESS_MESSAGE.to_owned()),
                summary: Some(report),
                ..TriggerBody::default()
            },
        }
    }
}

/// Check the presented secret against the configured one.
///
/// A relay without a configured secret rejects every request.
///
/// # Errors
///
/// Returns [`RelayError::Unauthorized`] when the key is missing or wrong.
pub fn authorize(config: &RelayConfig, presented: Option<&str>) -> Result<()> {
    match (config.api_key(), presented) {
        (Some(expected), Some(candidate)) if expected.matches(candidate) => Ok(()),
        _ => Err(RelayError::Unauthorized),
    }
}

/// Authorize, validate, and run one trigger request.
///
/// `run` is invoked at most once, and only for an authorized and valid
/// request.
#[must_use]
pub fn handle_trigger<F>(config: &RelayConfig, request: &TriggerRequest, run: F) -> TriggerResponse
where
    F: FnOnce(&TransferJob) -> Result<RunReport>,
{
    if let Err(err) = authorize(config, request.api_key.as_deref()) {
        warn!("Rejected trigger: {err}");
        return TriggerResponse::rejection(STATUS_FORBIDDEN, &err);
    }
    let job = match request.to_job() {
        Ok(job) => job,
        Err(err) => {
            warn!("Rejected trigger: {err}");
            return TriggerResponse::rejection(STATUS_BAD_REQUEST, &err);
        }
    };

    info!("Relaying {} to {}", job.repo, job.remote_path);
    match run(&job) {
        Ok(report) => TriggerResponse::success(report),
        Err(err) => {
            error!("Relay of {} failed: {err}", job.repo);
            TriggerResponse::failure(&err)
        }
    }
}
