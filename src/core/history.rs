//! Dispatch history
//!
//! One [`HistoryRecord`] is appended per completed dispatch. Records carry the
//! owning `(plugin_id, service_id)` pair so the UI can later ask the
//! [`CapabilityRouter`](crate::plugin::router::CapabilityRouter) how to render
//! them; they never hold a reference to the provider itself.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::errors::{ErrorKind, StorageError, StorageResult};
use crate::plugin::capabilities::{Capability, CapabilityRequest, DictionaryEntry};
use crate::plugin::dispatch::{InvocationResult, Payload};

/// Persisted form of a dispatch result
///
/// Audio payloads are not stored; only their size is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoredResult {
    Text { text: String },
    Dictionary { entry: DictionaryEntry },
    Audio { bytes: usize },
    Failure { kind: ErrorKind, reason: String },
}

impl From<&InvocationResult> for StoredResult {
    fn from(result: &InvocationResult) -> Self {
        match result {
            InvocationResult::Success(Payload::Text(text)) => StoredResult::Text { text: text.clone() },
            InvocationResult::Success(Payload::Dictionary(entry)) => StoredResult::Dictionary {
                entry: entry.clone(),
            },
            InvocationResult::Success(Payload::Audio(audio)) => StoredResult::Audio {
                bytes: audio.len(),
            },
            InvocationResult::Failure(failure) => StoredResult::Failure {
                kind: failure.kind,
                reason: failure.reason.clone(),
            },
        }
    }
}

impl StoredResult {
    pub fn is_success(&self) -> bool {
        !matches!(self, StoredResult::Failure { .. })
    }
}

/// Immutable log entry of one completed dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub plugin_id: String,
    pub service_id: String,
    pub capability: Capability,
    pub request: CapabilityRequest,
    pub result: StoredResult,
    #[serde(with = "time::serde::timestamp")]
    pub timestamp: OffsetDateTime,
}

impl HistoryRecord {
    pub fn new(
        plugin_id: impl Into<String>,
        service_id: impl Into<String>,
        capability: Capability,
        request: CapabilityRequest,
        result: &InvocationResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            plugin_id: plugin_id.into(),
            service_id: service_id.into(),
            capability,
            request,
            result: StoredResult::from(result),
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// Append-only sink for history records
#[async_trait]
pub trait HistorySink: Send + Sync {
    async fn append(&self, record: HistoryRecord) -> StorageResult<()>;
}

/// Sink that keeps records in memory
#[derive(Debug, Default)]
pub struct MemoryHistory {
    records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<HistoryRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl HistorySink for MemoryHistory {
    async fn append(&self, record: HistoryRecord) -> StorageResult<()> {
        self.records.lock().push(record);
        Ok(())
    }
}

/// Sink writing one JSON object per line
pub struct JsonlHistory {
    path: PathBuf,
    file: tokio::sync::Mutex<tokio::fs::File>,
}

impl JsonlHistory {
    /// Open (or create) the history file in append mode
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Io {
                    path: parent.display().to_string(),
                    source,
                })?;
        }

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| StorageError::Io {
                path: path.display().to_string(),
                source,
            })?;

        Ok(Self {
            path,
            file: tokio::sync::Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record back; malformed lines are skipped with a warning
    pub async fn read_all(&self) -> StorageResult<Vec<HistoryRecord>> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| StorageError::Io {
                path: self.path.display().to_string(),
                source,
            })?;

        Ok(contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed history line");
                    None
                }
            })
            .collect())
    }
}

#[async_trait]
impl HistorySink for JsonlHistory {
    async fn append(&self, record: HistoryRecord) -> StorageResult<()> {
        let mut line = serde_json::to_vec(&record).map_err(|source| StorageError::Encode {
            key: record.id.to_string(),
            source,
        })?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line)
            .await
            .map_err(|source| StorageError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        file.flush().await.map_err(|source| StorageError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }
}
