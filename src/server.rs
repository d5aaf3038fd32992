//! HTTP trigger server.
//!
//! Exposes `POST /download-extract-upload` through `axum`. The pipeline is
//! blocking, so each accepted request runs on tokio's blocking pool behind a
//! process-wide lock: two runs never share the download directory at the
//! same time. Authorization and validation happen before the lock is taken.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use log::{error, info};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::{API_KEY_VAR, ConfigError, RelayConfig};
use crate::error::{RelayError, Result};
use crate::pipeline::{RunReport, TransferJob, run_job};
use crate::trigger::{
    STATUS_BAD_REQUEST, STATUS_INTERNAL_ERROR, TriggerBody, TriggerRequest, TriggerResponse,
    handle_trigger,
};

/// Path of the trigger route.
pub const TRIGGER_ROUTE: &str = "/download-extract-upload";

/// Executes one relay run.
pub type Runner = Arc<dyn Fn(&RelayConfig, &TransferJob) -> Result<RunReport> + Send + Sync>;

/// State shared by every request.
#[derive(Clone)]
pub struct AppState {
    config: Arc<RelayConfig>,
    runner: Runner,
    run_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Serve `config` using `runner` for authorized requests.
    #[must_use]
    pub fn new(config: RelayConfig, runner: Runner) -> Self {
        Self {
            config: Arc::new(config),
            runner,
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Handle `request` synchronously, serialising pipeline runs.
    #[must_use]
    pub fn respond(&self, request: &TriggerRequest) -> TriggerResponse {
        handle_trigger(&self.config, request, |job| {
            let _running = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);
            (self.runner)(&self.config, job)
        })
    }
}

/// Build the trigger router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(TRIGGER_ROUTE, post(trigger))
        .with_state(state)
}

async fn trigger(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TriggerRequest>, JsonRejection>,
) -> (StatusCode, Json<TriggerBody>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let err = RelayError::Validation {
                reason: rejection.body_text(),
            };
            return into_http(TriggerResponse {
                status: STATUS_BAD_REQUEST,
                body: TriggerBody {
                    error: Some(err.to_string()),
                    kind: Some(err.kind()),
                    ..TriggerBody::default()
                },
            });
        }
    };

    match tokio::task::spawn_blocking(move || state.respond(&request)).await {
        Ok(response) => into_http(response),
        Err(join_error) => {
            error!("Relay task did not complete: {join_error}");
            into_http(TriggerResponse {
                status: STATUS_INTERNAL_ERROR,
                body: TriggerBody {
                    error: Some("Operation failed".to_owned()),
                    detail: Some(join_error.to_string()),
                    ..TriggerBody::default()
                },
            })
        }
    }
}

fn into_http(response: TriggerResponse) -> (StatusCode, Json<TriggerBody>) {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response.body))
}

/// Serve the trigger endpoint on the configured bind address until the
/// process is stopped.
///
/// # Errors
///
/// Returns [`RelayError::Config`] when no trigger secret is configured and
/// [`RelayError::Io`] when the runtime cannot start or the address cannot be
/// bound.
pub fn serve(config: RelayConfig) -> Result<()> {
    if config.api_key().is_none() {
        return Err(ConfigError::MissingValue { key: API_KEY_VAR }.into());
    }
    let bind_address = config.bind_address().to_owned();
    let app = router(AppState::new(config, Arc::new(run_job)));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&bind_address).await?;
        info!("Listening on http://{}{TRIGGER_ROUTE}", listener.local_addr()?);
        axum::serve(listener, app).await?;
        Ok::<(), RelayError>(())
    })
}
