/**
 * Per-run diagnostic log of every message crossing the bridge.
 */
use chrono::{DateTime, Local};
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, warn};

use crate::error::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Connector,
    ServerToClient,
    /// A server event that was dropped instead of forwarded.
    ServerDropped,
    ClientToServer,
}

impl Direction {
    pub fn as_display(&self) -> &'static str {
        match self {
            Direction::Connector => "Connector",
            Direction::ServerToClient => "Server->Client",
            Direction::ServerDropped => "Server->X",
            Direction::ClientToServer => "Client->Server",
        }
    }
}

/// Handle to the traffic log. Cloning shares the same file.
#[derive(Clone, Default)]
pub struct TrafficLog {
    file: Option<Arc<LogFile>>,
}

struct LogFile {
    path: PathBuf,
    writer: Mutex<tokio::fs::File>,
    write_failed: AtomicBool,
}

impl TrafficLog {
    /// A log that only emits `tracing` events.
    pub fn disabled() -> Self {
        Self { file: None }
    }

    /// Create a new timestamped log file inside `dir`.
    pub async fn create(dir: &Path) -> Result<Self, BridgeError> {
        let path = dir.join(log_file_name(Local::now()));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| BridgeError::TrafficLog {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            file: Some(Arc::new(LogFile {
                path,
                writer: Mutex::new(file),
                write_failed: AtomicBool::new(false),
            })),
        })
    }

    /// Location of the log file, `None` when logging is disabled.
    pub fn path(&self) -> Option<&Path> {
        self.file.as_deref().map(|f| f.path.as_path())
    }

    pub async fn log(&self, direction: Direction, message: &str) {
        debug!(direction = direction.as_display(), "{}", message);

        let Some(file) = &self.file else {
            return;
        };

        let entry = format_entry(&Local::now().to_rfc3339(), direction, message);
        let mut writer = file.writer.lock().await;
        let result = async {
            writer.write_all(entry.as_bytes()).await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = result {
            // Report the first failure only; the log is best effort.
            if !file.write_failed.swap(true, Ordering::Relaxed) {
                warn!("Failed to write traffic log {:?}: {}", file.path, e);
            }
        }
    }
}

pub fn log_file_name(now: DateTime<Local>) -> String {
    format!("mcp-sse-bridge-{}.log", now.format("%Y-%m-%d--%H-%M-%S"))
}

/// Render one entry: a timestamped direction header followed by the body,
/// every body line indented by four spaces.
pub fn format_entry(timestamp: &str, direction: Direction, message: &str) -> String {
    let mut entry = format!("{} [{}]\n", timestamp, direction.as_display());
    for line in pretty_body(message).split('\n') {
        entry.push_str("    ");
        entry.push_str(line);
        entry.push('\n');
    }
    entry
}

/// Pretty-print `message` when it is JSON, otherwise return it unchanged.
pub fn pretty_body(message: &str) -> String {
    serde_json::from_str::<serde_json::Value>(message)
        .and_then(|value| serde_json::to_string_pretty(&value))
        .unwrap_or_else(|_| message.to_string())
}
