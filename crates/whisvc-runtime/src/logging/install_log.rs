//! Append-only install log with a primary and a secondary sink.
//!
//! The primary file lives in the temp directory and is created before
//! anything else happens, so it is always writable. The secondary file lives
//! inside the install directory and is attached once that directory exists.
//! Every tracing record goes to both; only primary failures are retried.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::Local;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;
use tracing_subscriber::fmt::MakeWriter;

/// Retries after the first failed primary write.
const PRIMARY_RETRIES: u32 = 3;

/// Linear backoff step between retries.
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

#[derive(Debug, Error)]
pub enum LogError {
    #[error("Failed to create log file {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where this run's logs are, for summaries and failure reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLocations {
    pub primary: PathBuf,
    pub secondary: Option<PathBuf>,
    /// Records that could not be mirrored to the secondary log.
    pub secondary_failures: u64,
}

struct Sink {
    path: PathBuf,
    file: File,
}

impl Sink {
    fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    fn reopen(&mut self) -> io::Result<()> {
        self.file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        Ok(())
    }
}

struct Inner {
    flow: String,
    primary_path: PathBuf,
    primary: Mutex<Sink>,
    secondary: Mutex<Option<Sink>>,
    secondary_failures: AtomicU64,
}

/// Handle to this run's log files. Cheap to clone.
#[derive(Clone)]
pub struct InstallLog {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for InstallLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallLog")
            .field("flow", &self.inner.flow)
            .field("primary", &self.inner.primary_path)
            .finish_non_exhaustive()
    }
}

impl InstallLog {
    /// Create the primary log in the system temp directory.
    pub fn create(flow: &str) -> Result<Self, LogError> {
        Self::create_in(&std::env::temp_dir(), flow)
    }

    /// Create the primary log in `dir`, named uniquely for this run.
    pub fn create_in(dir: &Path, flow: &str) -> Result<Self, LogError> {
        let path = dir.join(primary_file_name(flow));
        let sink = fs::create_dir_all(dir)
            .and_then(|()| Sink::open(&path))
            .map_err(|source| LogError::Create {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            inner: Arc::new(Inner {
                flow: flow.to_string(),
                primary_path: path,
                primary: Mutex::new(sink),
                secondary: Mutex::new(None),
                secondary_failures: AtomicU64::new(0),
            }),
        })
    }

    pub fn flow(&self) -> &str {
        &self.inner.flow
    }

    /// Mirror all further records to `<logs_dir>/<flow>.log`.
    ///
    /// Best-effort: a failure is logged and the run continues with the
    /// primary log only. Returns whether the secondary is attached.
    pub fn attach_secondary(&self, logs_dir: &Path) -> bool {
        let path = logs_dir.join(format!("{}.log", self.inner.flow));
        match fs::create_dir_all(logs_dir).and_then(|()| Sink::open(&path)) {
            Ok(sink) => {
                if let Ok(mut slot) = self.inner.secondary.lock() {
                    *slot = Some(sink);
                }
                true
            }
            Err(e) => {
                self.inner.secondary_failures.fetch_add(1, Ordering::Relaxed);
                warn!(path = %path.display(), error = %e, "Secondary install log unavailable");
                false
            }
        }
    }

    /// Stop mirroring, e.g. before the install directory is deleted.
    pub fn detach_secondary(&self) {
        if let Ok(mut slot) = self.inner.secondary.lock() {
            *slot = None;
        }
    }

    pub fn locations(&self) -> LogLocations {
        let secondary = self
            .inner
            .secondary
            .lock()
            .ok()
            .and_then(|slot| slot.as_ref().map(|s| s.path.clone()));
        LogLocations {
            primary: self.inner.primary_path.clone(),
            secondary,
            secondary_failures: self.inner.secondary_failures.load(Ordering::Relaxed),
        }
    }

    /// Append one complete record to both sinks.
    pub fn append(&self, record: &[u8]) -> io::Result<()> {
        let primary = append_with_retry(PRIMARY_RETRIES, RETRY_BACKOFF, |attempt| {
            let mut sink = self
                .inner
                .primary
                .lock()
                .map_err(|_| io::Error::other("primary log lock poisoned"))?;
            if attempt > 0 {
                sink.reopen()?;
            }
            sink.file.write_all(record)
        });

        if let Ok(mut slot) = self.inner.secondary.lock()
            && let Some(sink) = slot.as_mut()
            && sink.file.write_all(record).is_err()
        {
            self.inner.secondary_failures.fetch_add(1, Ordering::Relaxed);
        }

        primary
    }
}

/// Run `op` once, then up to `retries` more times with linear backoff.
///
/// `op` receives the zero-based attempt number.
pub fn append_with_retry<F>(retries: u32, backoff: Duration, mut op: F) -> io::Result<()>
where
    F: FnMut(u32) -> io::Result<()>,
{
    let mut attempt = 0;
    loop {
        match op(attempt) {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= retries => return Err(e),
            Err(_) => {
                attempt += 1;
                thread::sleep(backoff * attempt);
            }
        }
    }
}

fn primary_file_name(flow: &str) -> String {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("whisvc-{flow}-{stamp}-{}.log", &id[..8])
}

/// Buffers one tracing record and appends it as a unit on drop.
pub struct InstallLogWriter {
    log: InstallLog,
    buffer: Vec<u8>,
}

impl Write for InstallLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let record = std::mem::take(&mut self.buffer);
        self.log.append(&record)
    }
}

impl Drop for InstallLogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for InstallLog {
    type Writer = InstallLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        InstallLogWriter {
            log: self.clone(),
            buffer: Vec::new(),
        }
    }
}
