use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use common::{Error, LogEntry, Result};

/// Append-only JSON-lines log of growth and break events.
///
/// Each entry is one line written with a single append-mode write, so a
/// reader never observes a half-written record. `prune` rewrites the file
/// through a temporary sibling and a rename. Within the process, appends and
/// prunes are serialized so an append cannot land between prune's read and
/// its rename.
pub struct EventLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the log file if it does not exist yet.
    pub async fn ensure_exists(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.fault("create", e))?;
        Ok(())
    }

    /// Append one entry.
    ///
    /// Entries that fail the persistence filter (a `growth` event shorter
    /// than five days) are discarded and `Ok(false)` is returned.
    pub async fn append(&self, entry: &LogEntry) -> Result<bool> {
        if !entry.is_loggable() {
            debug!(symbol = %entry.symbol, growth_days = entry.growth_days, "Entry below log threshold, skipped");
            return Ok(false);
        }

        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.fault("open", e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.fault("write", e))?;
        file.flush().await.map_err(|e| self.fault("flush", e))?;

        info!(
            symbol = %entry.symbol,
            growth_days = entry.growth_days,
            event = %entry.event,
            "Event logged"
        );
        Ok(true)
    }

    /// Drop every entry older than `now - retention`, keeping survivors in
    /// their original order. Malformed lines are dropped too.
    ///
    /// Returns the number of lines removed. A missing log is not an error.
    pub async fn prune(&self, now: NaiveDateTime, retention: Duration) -> Result<usize> {
        let cutoff = now - retention;

        let _guard = self.lock.lock().await;
        let content = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(self.fault("read", e)),
        };

        let mut kept = String::with_capacity(content.len());
        let mut removed = 0usize;
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEntry>(line) {
                Ok(entry) if entry.time > cutoff => {
                    kept.push_str(line);
                    kept.push('\n');
                }
                Ok(_) => removed += 1,
                Err(e) => {
                    warn!(error = %e, "Dropping malformed event log line");
                    removed += 1;
                }
            }
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, kept.as_bytes())
            .await
            .map_err(|e| self.fault("write temp", e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.fault("replace", e))?;

        info!(removed, cutoff = %cutoff, "Event log pruned");
        Ok(removed)
    }

    /// All well-formed entries in write order. Malformed lines are skipped.
    pub async fn entries(&self) -> Result<Vec<LogEntry>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.fault("read", e)),
        };
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str::<LogEntry>(line).ok())
            .collect())
    }

    /// The last `limit` well-formed entries, oldest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        let mut entries = self.entries().await?;
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.split_off(skip))
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn fault(&self, op: &str, e: std::io::Error) -> Error {
        Error::Persistence(format!("{op} {}: {e}", self.path.display()))
    }
}
