//! Controller mapping database refresh
//!
//! A mapping database is plain text in the community `gamecontrollerdb` layout:
//! one controller per line, a 32 character hex GUID, a name and a list of
//! `field:binding` pairs. The updater reads the configured source on request and
//! hands the text to the frame loop, which installs it into the active backend.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Counts well formed mapping lines
pub fn count_mappings(text: &str) -> usize {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| {
            let guid = line.split(',').next().unwrap_or_default();
            guid.len() == 32
                && guid.chars().all(|c| c.is_ascii_hexdigit())
                && line.matches(',').count() >= 2
        })
        .count()
}

// Mapping database settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingDbSettings {
    pub enabled: bool,
    pub source: PathBuf,
}

impl Default for MappingDbSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            source: PathBuf::from("gamecontrollerdb.txt"),
        }
    }
}

/// A freshly fetched mapping database
#[derive(Clone, Debug)]
pub struct MappingDbUpdate {
    pub mappings: String,
    pub entries: usize,
    pub source: PathBuf,
    pub fetched_at: DateTime<Local>,
}

#[derive(Debug, thiserror::Error)]
pub enum MappingDbError {
    #[error("Failed to read mapping database: {0}")]
    ReadError(String),

    #[error("Mapping database contains no usable entries: {0}")]
    EmptyDatabase(String),

    #[error("Mapping updater is not running: {0}")]
    ChannelError(String),
}

/// Fetches the mapping database once
pub async fn fetch(source: &Path) -> Result<MappingDbUpdate, MappingDbError> {
    let mappings = tokio::fs::read_to_string(source)
        .await
        .map_err(|e| MappingDbError::ReadError(format!("{}: {}", source.display(), e)))?;
    let entries = count_mappings(&mappings);
    if entries == 0 {
        return Err(MappingDbError::EmptyDatabase(source.display().to_string()));
    }
    Ok(MappingDbUpdate {
        mappings,
        entries,
        source: source.to_path_buf(),
        fetched_at: Local::now(),
    })
}

/// Background task answering refresh requests
pub struct MappingDbUpdater {
    request_sender: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl MappingDbUpdater {
    /// Spawns the updater, the first fetch happens immediately
    pub fn spawn(
        source: PathBuf,
        update_sender: mpsc::Sender<MappingDbUpdate>,
        cancel: CancellationToken,
    ) -> Self {
        info!("Spawning mapping database updater for {}", source.display());
        let (request_sender, mut request_receiver) = mpsc::channel::<()>(4);

        let task = tokio::spawn(async move {
            let mut pending = true;
            loop {
                if pending {
                    pending = false;
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        result = fetch(&source) => match result {
                            Ok(update) => {
                                info!(
                                    "Fetched {} controller mappings from {}",
                                    update.entries,
                                    update.source.display()
                                );
                                if update_sender.send(update).await.is_err() {
                                    debug!("Mapping update receiver dropped, stopping updater");
                                    break;
                                }
                            }
                            Err(e) => warn!("Mapping database refresh failed: {}", e),
                        }
                    }
                }

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    request = request_receiver.recv() => match request {
                        Some(()) => pending = true,
                        None => break,
                    }
                }
            }
            info!("Mapping database updater stopped");
        });

        Self {
            request_sender,
            task,
        }
    }

    /// Asks the updater for another fetch
    pub fn request_refresh(&self) -> Result<(), MappingDbError> {
        self.request_sender.try_send(()).map_err(|e| {
            error!("Failed to request mapping refresh: {}", e);
            MappingDbError::ChannelError(e.to_string())
        })
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
