//! Append-only session log.
//!
//! The log is opened once per process run and shared by every cohort, so
//! a reconnect never reopens, truncates or rewrites it. Each entry is
//! stamped with the local time at which it is written:
//!
//! ```text
//! [07.01.23 09:05] Vasya: hi there
//! ```

use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, info};

use minechat_core::{format_entry, ChatLine};

use crate::error::{ClientError, Result};

/// Append handle to the session log.
pub struct HistoryLog {
    path: PathBuf,
    file: File,
}

impl HistoryLog {
    /// Opens (creating if needed) the log in append mode.
    ///
    /// Missing parent directories are created.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        info!(path = %path.display(), "History log opened");
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one timestamped entry and flushes it.
    pub async fn append(&mut self, text: &str) -> Result<()> {
        let entry = format_entry(text, &Local::now());
        self.file.write_all(entry.as_bytes()).await?;
        self.file.flush().await?;
        Ok(())
    }

    /// Drains the persistence queue forever, one entry at a time.
    ///
    /// Only returns on a write failure or when the queue is closed.
    pub async fn persist_from(&mut self, rx: &mut mpsc::UnboundedReceiver<ChatLine>) -> Result<()> {
        while let Some(line) = rx.recv().await {
            self.append(line.text()).await?;
        }
        Err(ClientError::ChannelClosed {
            queue: "persistence",
        })
    }

    /// Writes whatever is already queued without waiting for more.
    ///
    /// Returns the number of entries written.
    pub async fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<ChatLine>) -> Result<usize> {
        let mut written = 0;
        while let Ok(line) = rx.try_recv() {
            self.append(line.text()).await?;
            written += 1;
        }
        if written > 0 {
            debug!(written, "Flushed queued history entries");
        }
        Ok(written)
    }
}

/// Reads the existing log for replay, one entry per line.
///
/// Trailing whitespace is stripped and blank lines skipped. A missing file
/// yields an empty history; invalid UTF-8 is replaced rather than rejected.
pub async fn load_history(path: &Path) -> Result<Vec<String>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    Ok(String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
