//! Command log.
//!
//! Every successfully executed command is appended to a plain text log:
//!
//! ```text
//! [2024-05-01 12:30:00] 127.0.0.1:16260: status
//! hostname: my server
//!
//! ```
//!
//! This is the operator's audit trail, separate from the `tracing`
//! diagnostics written to stderr.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Log file used when neither `--log` nor the profile names one.
pub const DEFAULT_LOG_NAME: &str = "rcon-default.log";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Append-only record of executed commands.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Append one record. `target: None` selects the sink's default location.
    async fn add_log(
        &self,
        target: Option<&Path>,
        address: &str,
        command: &str,
        result: &str,
    ) -> io::Result<()>;
}

/// Writes records to files on disk.
#[derive(Debug, Clone)]
pub struct FileLogSink {
    default_target: PathBuf,
}

impl FileLogSink {
    pub fn new(default_target: impl Into<PathBuf>) -> Self {
        Self {
            default_target: default_target.into(),
        }
    }
}

impl Default for FileLogSink {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_NAME)
    }
}

fn format_record(address: &str, command: &str, result: &str) -> String {
    format!(
        "[{}] {}: {}\n{}\n\n",
        Local::now().format(TIMESTAMP_FORMAT),
        address,
        command,
        result
    )
}

#[async_trait]
impl LogSink for FileLogSink {
    async fn add_log(
        &self,
        target: Option<&Path>,
        address: &str,
        command: &str,
        result: &str,
    ) -> io::Result<()> {
        let path = target.unwrap_or(self.default_target.as_path());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(format_record(address, command, result).as_bytes())
            .await?;
        file.flush().await?;

        debug!("Appended command log record to {:?}", path);
        Ok(())
    }
}
