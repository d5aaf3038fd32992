//! Removal of local copies after a successful upload.

use crate::transfer::artifact::LocalArtifact;
use log::{info, warn};
use std::io::ErrorKind;

/// Delete the downloaded archive and the extraction directory.
///
/// Failures never abort the run; each one is logged and returned as a
/// message so it can be recorded in the run report. Paths that are already
/// gone count as removed.
#[must_use]
pub fn remove_local_copies(artifact: &LocalArtifact) -> Vec<String> {
    let mut warnings = Vec::new();

    let archive = artifact.archive_path();
    match std::fs::remove_file(archive) {
        Ok(()) => info!("Removed {archive}"),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warnings.push(format!("could not remove {archive}: {err}")),
    }

    let extract_dir = artifact.extract_dir();
    match std::fs::remove_dir_all(extract_dir) {
        Ok(()) => info!("Removed {extract_dir}"),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warnings.push(format!("could not remove {extract_dir}: {err}")),
    }

    for warning in &warnings {
        warn!("{warning}");
    }
    warnings
}
