use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::types::{FeedSource, NewRecord, ReaderRecord, StorageError};
use super::{FeedRegistry, ReaderTable};

/// In-process registry and reader table.
///
/// Mirrors the query semantics of the Notion backend (exact-match lookups,
/// archived rows hidden) and can be told to fail specific operations, which
/// makes it the substitute backend for exercising the sync workflow.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sources: Mutex<Vec<FeedSource>>,
    records: Mutex<Vec<ReaderRecord>>,
    next_id: AtomicUsize,
    insert_calls: AtomicUsize,
    fail_registry: AtomicBool,
    fail_lookups: AtomicBool,
    fail_inserts: AtomicBool,
    fail_archive_ids: Mutex<HashSet<String>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicked test thread must not wedge the others.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sources(sources: Vec<FeedSource>) -> Self {
        let store = Self::new();
        *lock(&store.sources) = sources;
        store
    }

    /// Seed a row directly, bypassing `insert` bookkeeping. Returns its id.
    pub fn seed(
        &self,
        title: &str,
        url: &str,
        created_at: DateTime<Utc>,
        read: bool,
    ) -> String {
        let id = self.allocate_id();
        lock(&self.records).push(ReaderRecord {
            id: id.clone(),
            title: title.to_string(),
            url: url.to_string(),
            created_at,
            source: "Unknown".to_string(),
            read,
            archived: false,
        });
        id
    }

    /// Snapshot of every row, archived ones included.
    pub fn records(&self) -> Vec<ReaderRecord> {
        lock(&self.records).clone()
    }

    pub fn record(&self, id: &str) -> Option<ReaderRecord> {
        lock(&self.records).iter().find(|r| r.id == id).cloned()
    }

    /// Number of `insert` calls, successful or not.
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::Relaxed)
    }

    pub fn fail_registry(&self, fail: bool) {
        self.fail_registry.store(fail, Ordering::Relaxed);
    }

    /// Make `contains` and `stale_unread` fail.
    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::Relaxed);
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::Relaxed);
    }

    pub fn fail_archive_of(&self, id: &str) {
        lock(&self.fail_archive_ids).insert(id.to_string());
    }

    fn allocate_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        format!("page-{n}")
    }
}

#[async_trait]
impl FeedRegistry for MemoryStore {
    async fn list_sources(&self) -> Result<Vec<FeedSource>, StorageError> {
        if self.fail_registry.load(Ordering::Relaxed) {
            return Err(StorageError::Unavailable("registry offline".into()));
        }
        Ok(lock(&self.sources).clone())
    }
}

#[async_trait]
impl ReaderTable for MemoryStore {
    async fn contains(&self, title: &str, url: &str) -> Result<bool, StorageError> {
        if self.fail_lookups.load(Ordering::Relaxed) {
            return Err(StorageError::Unavailable("lookup failed".into()));
        }
        Ok(lock(&self.records)
            .iter()
            .any(|r| !r.archived && (r.title == title || r.url == url)))
    }

    async fn insert(&self, record: &NewRecord) -> Result<String, StorageError> {
        self.insert_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_inserts.load(Ordering::Relaxed) {
            return Err(StorageError::Unavailable("insert failed".into()));
        }
        let id = self.allocate_id();
        lock(&self.records).push(ReaderRecord {
            id: id.clone(),
            title: record.title.clone(),
            url: record.url.clone(),
            created_at: record.created_at,
            source: record.source.clone(),
            read: false,
            archived: false,
        });
        Ok(id)
    }

    async fn stale_unread(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ReaderRecord>, StorageError> {
        if self.fail_lookups.load(Ordering::Relaxed) {
            return Err(StorageError::Unavailable("query failed".into()));
        }
        Ok(lock(&self.records)
            .iter()
            .filter(|r| !r.archived && !r.read && r.created_at <= cutoff)
            .cloned()
            .collect())
    }

    async fn archive(&self, id: &str) -> Result<(), StorageError> {
        if lock(&self.fail_archive_ids).contains(id) {
            return Err(StorageError::Unavailable(format!("archive of {id} failed")));
        }
        let mut records = lock(&self.records);
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.archived = true;
                Ok(())
            }
            None => Err(StorageError::Unavailable(format!("no such page {id}"))),
        }
    }
}
