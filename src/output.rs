//! Output formatting for the relay CLI.

use crate::pipeline::RunReport;
use std::io::Write;

/// Write `message` and a newline to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}

/// One-line summary of a successful run.
///
/// # Example
///
/// ```
/// use release_relay::output::success_message;
/// use release_relay::pipeline::RunReport;
/// use release_relay::publish::PublishReport;
///
/// let report = RunReport {
///     repo: "octo-org/site".to_owned(),
///     tag: "v3.1.0".to_owned(),
///     release_name: "v3.1.0".to_owned(),
///     asset: "release-3.1.0.tar.gz".to_owned(),
///     bytes_downloaded: 1024,
///     files_extracted: 12,
///     publish: PublishReport { files_uploaded: 12, ..PublishReport::default() },
///     cleanup_warnings: Vec::new(),
/// };
/// assert_eq!(
///     success_message(&report, "public_html"),
///     "Relayed octo-org/site v3.1.0 (release-3.1.0.tar.gz): 12 files uploaded to public_html"
/// );
/// ```
#[must_use]
pub fn success_message(report: &RunReport, remote_path: &str) -> String {
    let plural = if report.publish.files_uploaded == 1 {
        "file"
    } else {
        "files"
    };
    format!(
        "Relayed {} {} ({}): {} {plural} uploaded to {remote_path}",
        report.repo, report.tag, report.asset, report.publish.files_uploaded
    )
}

/// Lines describing anything that went wrong without failing the run.
#[must_use]
pub fn warning_lines(report: &RunReport) -> Vec<String> {
    let directories = report
        .publish
        .directory_warnings
        .iter()
        .map(|dir| format!("warning: remote directory {dir} was not created"));
    let cleanup = report
        .cleanup_warnings
        .iter()
        .map(|warning| format!("warning: {warning}"));
    directories.chain(cleanup).collect()
}
