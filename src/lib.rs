//! release-relay library.
//!
//! Fetches the latest tagged release of a repository from GitHub or a
//! self-hosted Gitea, downloads its `release-*.tar.gz` asset, unpacks it, and
//! mirrors the unpacked tree onto an FTP server. The `release-relay` binary
//! drives it from the command line or from an HTTP trigger.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Immutable configuration read from the environment
//! - [`error`] - Aggregated error type and failure categories
//! - [`hosting`] - Release API client for GitHub and Gitea
//! - [`output`] - CLI output formatting
//! - [`pipeline`] - Stage orchestration for one relay run
//! - [`publish`] - FTP upload and local cleanup
//! - [`release`] - Release metadata, lookup seam, and asset selection
//! - [`server`] - HTTP trigger server
//! - [`transfer`] - Asset download and archive extraction
//! - [`trigger`] - Transport-independent trigger request handling

pub mod cli;
pub mod config;
pub mod error;
pub mod hosting;
pub mod output;
pub mod pipeline;
pub mod publish;
pub mod release;
pub mod server;
pub mod transfer;
pub mod trigger;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
