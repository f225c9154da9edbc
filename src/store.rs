use crate::error::{LinkError, LinkResult};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub const DEFAULT_MAX_CLICK_HISTORY: usize = 100;

/// A single successful redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClickEvent {
    pub timestamp: i64,
    pub referrer: String,
}

impl ClickEvent {
    pub fn new(timestamp: i64, referrer: Option<&str>) -> Self {
        let referrer = referrer
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or("Direct");

        Self {
            timestamp,
            referrer: referrer.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    pub code: String,
    pub original_url: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub visits: u64,
    pub clicks: Vec<ClickEvent>,
}

impl LinkRecord {
    pub fn new(code: String, original_url: String, created_at: i64, expires_at: i64) -> Self {
        Self {
            code,
            original_url,
            created_at,
            expires_at,
            visits: 0,
            clicks: Vec::new(),
        }
    }

    /// A record is still live at the exact millisecond it expires.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now > self.expires_at
    }
}

/// Outcome of a visit, decided under a single write lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visit {
    Missing,
    /// The record had expired and has been removed.
    Expired(LinkRecord),
    /// The visit was counted; carries the updated record.
    Followed(LinkRecord),
}

pub trait LinkStore: Send + Sync {
    /// Inserts `record` unless its code is held by a live record at `now`.
    /// An expired holder is overwritten.
    fn put(&self, record: LinkRecord, now: i64) -> LinkResult<()>;

    /// Returns the record regardless of expiry.
    fn get(&self, code: &str) -> LinkResult<Option<LinkRecord>>;

    fn delete(&self, code: &str) -> LinkResult<bool>;

    /// Snapshot of every stored record, expired ones included, in no particular order.
    fn list(&self) -> LinkResult<Vec<LinkRecord>>;

    /// Looks up `code` and either evicts it (expired) or counts the visit.
    fn visit(&self, code: &str, now: i64, click: ClickEvent) -> LinkResult<Visit>;

    /// Removes every record expired at `now`.
    fn sweep_expired(&self, now: i64) -> LinkResult<usize>;

    fn len(&self) -> LinkResult<usize>;

    fn is_empty(&self) -> LinkResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// In-memory link store guarded by a single lock.
#[derive(Clone)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<String, LinkRecord>>>,
    max_click_history: usize,
}

impl MemoryStore {
    pub fn new(max_click_history: usize) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            max_click_history,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CLICK_HISTORY)
    }
}

fn poisoned(op: &str) -> LinkError {
    LinkError::Internal(format!("Failed to acquire {} lock on link store", op))
}

impl LinkStore for MemoryStore {
    fn put(&self, record: LinkRecord, now: i64) -> LinkResult<()> {
        let mut records = self.records.write().map_err(|_| poisoned("write"))?;

        if let Some(existing) = records.get(&record.code) {
            if !existing.is_expired_at(now) {
                return Err(LinkError::CodeConflict(record.code));
            }
            tracing::debug!(code = %record.code, "Overwriting expired link");
        }

        records.insert(record.code.clone(), record);
        Ok(())
    }

    fn get(&self, code: &str) -> LinkResult<Option<LinkRecord>> {
        let records = self.records.read().map_err(|_| poisoned("read"))?;
        Ok(records.get(code).cloned())
    }

    fn delete(&self, code: &str) -> LinkResult<bool> {
        let mut records = self.records.write().map_err(|_| poisoned("write"))?;
        Ok(records.remove(code).is_some())
    }

    fn list(&self) -> LinkResult<Vec<LinkRecord>> {
        let records = self.records.read().map_err(|_| poisoned("read"))?;
        Ok(records.values().cloned().collect())
    }

    fn visit(&self, code: &str, now: i64, click: ClickEvent) -> LinkResult<Visit> {
        let mut records = self.records.write().map_err(|_| poisoned("write"))?;

        let Some(record) = records.get_mut(code) else {
            return Ok(Visit::Missing);
        };

        if record.is_expired_at(now) {
            return Ok(records
                .remove(code)
                .map(Visit::Expired)
                .unwrap_or(Visit::Missing));
        }

        record.visits += 1;
        if self.max_click_history > 0 {
            if record.clicks.len() >= self.max_click_history {
                let overflow = record.clicks.len() + 1 - self.max_click_history;
                record.clicks.drain(..overflow);
            }
            record.clicks.push(click);
        }

        Ok(Visit::Followed(record.clone()))
    }

    fn sweep_expired(&self, now: i64) -> LinkResult<usize> {
        let mut records = self.records.write().map_err(|_| poisoned("write"))?;

        let initial_count = records.len();
        records.retain(|_, record| !record.is_expired_at(now));

        Ok(initial_count - records.len())
    }

    fn len(&self) -> LinkResult<usize> {
        let records = self.records.read().map_err(|_| poisoned("read"))?;
        Ok(records.len())
    }
}
