//! Publisher stage: mirror the extracted tree over FTP, then clean up.
//!
//! - [`remote`] - the session seam and the `suppaftp` implementation.
//! - [`plan`] - deterministic upload ordering.
//! - [`publisher`] - drives a session through the plan under a failure policy.
//! - [`cleanup`] - removes local copies once the upload succeeded.

pub mod cleanup;
pub mod plan;
pub mod publisher;
pub mod remote;

pub use publisher::{PublishError, PublishReport, Publisher};
