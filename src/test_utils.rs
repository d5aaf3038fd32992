//! Recording stubs for the pipeline stage traits.
//!
//! Available to unit tests and, through the `test-support` feature, to the
//! integration tests under `tests/`.

use crate::config::FtpCredentials;
use crate::publish::remote::{RemoteConnector, RemoteError, RemoteSession};
use crate::release::locator::{LocateError, ReleaseSource};
use crate::release::{Asset, Release, RepoId};
use crate::transfer::download::{AssetDownloader, DownloadError, DownloadRequest};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build a gzip tar archive in memory.
///
/// Entries whose name ends in `/` become directories; the rest are regular
/// files holding the given bytes.
///
/// # Errors
///
/// Returns an I/O error if an entry cannot be appended.
pub fn tar_gz(entries: &[(&str, &[u8])]) -> std::io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, data) in entries {
        let (path, entry_type, mode, contents) = name.strip_suffix('/').map_or(
            (*name, tar::EntryType::Regular, 0o644, *data),
            |dir| (dir, tar::EntryType::Directory, 0o755, b"".as_slice()),
        );
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(entry_type);
        header.set_mode(mode);
        header.set_size(contents.len() as u64);
        builder.append_data(&mut header, path, contents)?;
    }
    builder.into_inner()?.finish()
}

/// A release with one asset per name, each carrying an API locator.
#[must_use]
pub fn release_with_assets(tag: &str, names: &[&str]) -> Release {
    Release {
        tag_name: tag.to_owned(),
        name: None,
        assets: names
            .iter()
            .enumerate()
            .map(|(index, name)| Asset {
                name: (*name).to_owned(),
                size: 0,
                api_url: Some(format!("https://api.test/assets/{index}")),
                browser_download_url: Some(format!("https://dl.test/{tag}/{name}")),
                created_at: None,
            })
            .collect(),
    }
}

/// Release source answering every lookup with the same result.
#[derive(Debug)]
pub struct StubReleaseSource {
    result: Result<Release, LocateError>,
    calls: AtomicUsize,
}

impl StubReleaseSource {
    /// Answer with `release`.
    #[must_use]
    pub const fn returning(release: Release) -> Self {
        Self {
            result: Ok(release),
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer with `error`.
    #[must_use]
    pub const fn failing(error: LocateError) -> Self {
        Self {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of lookups made.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReleaseSource for StubReleaseSource {
    fn latest_release(&self, _repo: &RepoId) -> Result<Release, LocateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Downloader writing canned bytes, optionally failing part-way.
#[derive(Debug)]
pub struct StubDownloader {
    body: Vec<u8>,
    fail_after: Option<usize>,
    requests: Mutex<Vec<DownloadRequest>>,
}

impl StubDownloader {
    /// Serve `body` in full.
    #[must_use]
    pub const fn serving(body: Vec<u8>) -> Self {
        Self {
            body,
            fail_after: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Write the first `written` bytes of `body`, then report an interrupted
    /// transfer.
    #[must_use]
    pub const fn interrupted_after(body: Vec<u8>, written: usize) -> Self {
        Self {
            body,
            fail_after: Some(written),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<DownloadRequest> {
        lock(&self.requests).clone()
    }
}

impl AssetDownloader for StubDownloader {
    fn download(&self, request: &DownloadRequest, dest: &Path) -> Result<u64, DownloadError> {
        lock(&self.requests).push(request.clone());
        let mut file = std::fs::File::create(dest)?;
        let Some(limit) = self.fail_after else {
            file.write_all(&self.body)?;
            return Ok(self.body.len() as u64);
        };
        let partial = self.body.get(..limit).unwrap_or(&self.body);
        file.write_all(partial)?;
        Err(DownloadError::Interrupted {
            written: partial.len() as u64,
            reason: "connection reset by peer".to_owned(),
        })
    }
}

/// One call made on a [`RecordingConnector`] session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionCall {
    /// `change_dir(path)`.
    ChangeDir(String),
    /// `make_dir(path)`.
    MakeDir(String),
    /// `put_file(path)` with the bytes that were sent.
    PutFile(String, Vec<u8>),
    /// `quit()`.
    Quit,
}

#[derive(Debug, Default)]
struct ServerState {
    calls: Vec<SessionCall>,
    missing_dirs: HashSet<String>,
    connections: usize,
}

/// Connector whose sessions record every call.
///
/// Directory changes succeed unless the path was registered with
/// [`RecordingConnector::with_missing_dirs`] and has not been created since.
#[derive(Clone, Debug, Default)]
pub struct RecordingConnector {
    state: Arc<Mutex<ServerState>>,
    failing_mkdir: HashSet<String>,
    failing_put: HashSet<String>,
    refuse: bool,
}

impl RecordingConnector {
    /// Treat `dirs` as absent until they are created.
    #[must_use]
    pub fn with_missing_dirs<'a>(self, dirs: impl IntoIterator<Item = &'a str>) -> Self {
        lock(&self.state)
            .missing_dirs
            .extend(dirs.into_iter().map(str::to_owned));
        self
    }

    /// Refuse to create `dir`.
    #[must_use]
    pub fn with_failing_mkdir(mut self, dir: &str) -> Self {
        self.failing_mkdir.insert(dir.to_owned());
        self
    }

    /// Fail the transfer of `path`.
    #[must_use]
    pub fn with_failing_put(mut self, path: &str) -> Self {
        self.failing_put.insert(path.to_owned());
        self
    }

    /// Refuse every connection.
    #[must_use]
    pub const fn refusing_connections(mut self) -> Self {
        self.refuse = true;
        self
    }

    /// Calls made across all sessions, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<SessionCall> {
        lock(&self.state).calls.clone()
    }

    /// Number of sessions opened.
    #[must_use]
    pub fn connections(&self) -> usize {
        lock(&self.state).connections
    }
}

impl RemoteConnector for RecordingConnector {
    fn connect(
        &self,
        credentials: &FtpCredentials,
    ) -> Result<Box<dyn RemoteSession>, RemoteError> {
        if self.refuse {
            return Err(RemoteError::Connect {
                address: credentials.address(),
                reason: "connection refused".to_owned(),
            });
        }
        lock(&self.state).connections += 1;
        Ok(Box::new(RecordingSession {
            connector: self.clone(),
        }))
    }
}

struct RecordingSession {
    connector: RecordingConnector,
}

impl RecordingSession {
    fn refuse(operation: &'static str, path: &str) -> RemoteError {
        RemoteError::Operation {
            operation,
            path: path.to_owned(),
            reason: "550 Requested action not taken".to_owned(),
        }
    }
}

impl RemoteSession for RecordingSession {
    fn change_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        let mut state = lock(&self.connector.state);
        state.calls.push(SessionCall::ChangeDir(path.to_owned()));
        if state.missing_dirs.contains(path) {
            return Err(Self::refuse("cwd", path));
        }
        Ok(())
    }

    fn make_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        let mut state = lock(&self.connector.state);
        state.calls.push(SessionCall::MakeDir(path.to_owned()));
        if self.connector.failing_mkdir.contains(path) {
            return Err(Self::refuse("mkdir", path));
        }
        state.missing_dirs.remove(path);
        Ok(())
    }

    fn put_file(&mut self, path: &str, contents: &mut dyn Read) -> Result<u64, RemoteError> {
        let mut bytes = Vec::new();
        contents.read_to_end(&mut bytes).map_err(|err| RemoteError::Operation {
            operation: "stor",
            path: path.to_owned(),
            reason: err.to_string(),
        })?;
        let sent = bytes.len() as u64;
        lock(&self.connector.state)
            .calls
            .push(SessionCall::PutFile(path.to_owned(), bytes));
        if self.connector.failing_put.contains(path) {
            return Err(Self::refuse("stor", path));
        }
        Ok(sent)
    }

    fn quit(&mut self) -> Result<(), RemoteError> {
        lock(&self.connector.state).calls.push(SessionCall::Quit);
        Ok(())
    }
}
