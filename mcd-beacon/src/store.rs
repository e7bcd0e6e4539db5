//! Report storage backends

use crate::error::{Result, StoreError};
use crate::report::{FieldValue, NewReport, RecordId, ReportRecord};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Record persistence used by the report handler and the admin view.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Create a record and return its id.
    async fn insert_report(&self, report: NewReport) -> Result<RecordId>;

    /// Attach one metadata value to an existing record.
    async fn update_meta(&self, id: RecordId, key: &str, value: FieldValue) -> Result<()>;

    async fn get_report(&self, id: RecordId) -> Result<Option<ReportRecord>>;

    /// Up to `limit` records, newest first.
    async fn list_reports(&self, limit: usize) -> Result<Vec<ReportRecord>>;

    async fn count(&self) -> Result<usize>;
}

/// Records keyed by id, plus the next id to hand out.
#[derive(Debug, Default)]
struct Ledger {
    last_id: u64,
    records: BTreeMap<u64, ReportRecord>,
}

impl Ledger {
    fn insert(&mut self, report: NewReport) -> ReportRecord {
        self.last_id += 1;
        let record = ReportRecord::from_new(RecordId(self.last_id), report, Utc::now());
        self.records.insert(self.last_id, record.clone());
        record
    }

    fn restore(&mut self, record: ReportRecord) {
        self.last_id = self.last_id.max(record.id.0);
        self.records.insert(record.id.0, record);
    }

    fn set_meta(&mut self, id: RecordId, key: &str, value: FieldValue) -> Result<()> {
        let record = self
            .records
            .get_mut(&id.0)
            .ok_or(StoreError::NotFound(id))?;
        record.meta.insert(key.to_string(), value);
        Ok(())
    }

    fn newest(&self, limit: usize) -> Vec<ReportRecord> {
        self.records.values().rev().take(limit).cloned().collect()
    }
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    ledger: Arc<Mutex<Ledger>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record, oldest first.
    pub async fn records(&self) -> Vec<ReportRecord> {
        self.ledger.lock().await.records.values().cloned().collect()
    }

    pub async fn clear(&self) {
        self.ledger.lock().await.records.clear();
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn insert_report(&self, report: NewReport) -> Result<RecordId> {
        Ok(self.ledger.lock().await.insert(report).id)
    }

    async fn update_meta(&self, id: RecordId, key: &str, value: FieldValue) -> Result<()> {
        self.ledger.lock().await.set_meta(id, key, value)
    }

    async fn get_report(&self, id: RecordId) -> Result<Option<ReportRecord>> {
        Ok(self.ledger.lock().await.records.get(&id.0).cloned())
    }

    async fn list_reports(&self, limit: usize) -> Result<Vec<ReportRecord>> {
        Ok(self.ledger.lock().await.newest(limit))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.ledger.lock().await.records.len())
    }
}

/// One line of the file store's journal.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum JournalEntry {
    Insert {
        record: ReportRecord,
    },
    Meta {
        id: RecordId,
        key: String,
        value: FieldValue,
    },
}

/// File-backed store
///
/// Appends one JSON object per line and replays the file on open, so the
/// in-memory view survives restarts.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    ledger: Mutex<Ledger>,
}

impl FileStore {
    /// Open the journal at `path`, replaying it if it exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let ledger = Self::replay(&path).await?;

        Ok(Self {
            path,
            ledger: Mutex::new(ledger),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn replay(path: &Path) -> Result<Ledger> {
        let mut ledger = Ledger::default();

        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(ledger),
            Err(err) => return Err(err.into()),
        };

        for (index, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let entry: JournalEntry =
                serde_json::from_str(line).map_err(|err| StoreError::Corrupt {
                    line: index + 1,
                    reason: err.to_string(),
                })?;

            match entry {
                JournalEntry::Insert { record } => ledger.restore(record),
                JournalEntry::Meta { id, key, value } => {
                    ledger
                        .set_meta(id, &key, value)
                        .map_err(|err| StoreError::Corrupt {
                            line: index + 1,
                            reason: err.to_string(),
                        })?
                }
            }
        }

        Ok(ledger)
    }

    async fn append(&self, entry: &JournalEntry) -> Result<()> {
        let json = serde_json::to_string(entry)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(json.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;

        Ok(())
    }
}

#[async_trait]
impl ReportStore for FileStore {
    async fn insert_report(&self, report: NewReport) -> Result<RecordId> {
        let mut ledger = self.ledger.lock().await;
        let record = ledger.insert(report);
        let id = record.id;

        if let Err(err) = self.append(&JournalEntry::Insert { record }).await {
            ledger.records.remove(&id.0);
            ledger.last_id -= 1;
            return Err(err);
        }

        Ok(id)
    }

    async fn update_meta(&self, id: RecordId, key: &str, value: FieldValue) -> Result<()> {
        let mut ledger = self.ledger.lock().await;
        if !ledger.records.contains_key(&id.0) {
            return Err(StoreError::NotFound(id));
        }

        self.append(&JournalEntry::Meta {
            id,
            key: key.to_string(),
            value: value.clone(),
        })
        .await?;

        ledger.set_meta(id, key, value)
    }

    async fn get_report(&self, id: RecordId) -> Result<Option<ReportRecord>> {
        Ok(self.ledger.lock().await.records.get(&id.0).cloned())
    }

    async fn list_reports(&self, limit: usize) -> Result<Vec<ReportRecord>> {
        Ok(self.ledger.lock().await.newest(limit))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.ledger.lock().await.records.len())
    }
}
