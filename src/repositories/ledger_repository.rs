use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{GroupId, LedgerEntry, NewEntry};
use crate::observability::get_metrics;
use crate::services::validator::EntryValidator;

/// Position of a group's ledger: how many entries it holds and which was last.
/// Two equal heads describe the same entry sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerHead {
    pub entry_count: usize,
    pub last_entry_id: Option<Uuid>,
}

impl LedgerHead {
    pub fn of(entries: &[LedgerEntry]) -> Self {
        Self {
            entry_count: entries.len(),
            last_entry_id: entries.last().map(|e| e.entry_id),
        }
    }
}

/// Append-only storage of ledger entries, one sequence per group.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Validates and appends a single entry, assigning its id and timestamp.
    async fn append(&self, draft: NewEntry) -> Result<LedgerEntry>;

    /// Appends all drafts or none of them. Each draft is validated against
    /// the history plus the drafts before it.
    async fn append_all(&self, drafts: Vec<NewEntry>) -> Result<Vec<LedgerEntry>>;

    /// The group's entries in append order.
    async fn snapshot(&self, group_id: &GroupId) -> Result<Vec<LedgerEntry>>;

    async fn head(&self, group_id: &GroupId) -> Result<LedgerHead>;
}

#[derive(Debug, Default)]
struct GroupLog {
    entries: Vec<LedgerEntry>,
}

impl GroupLog {
    /// Strictly after the previous entry, even if the wall clock went backwards.
    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.entries.last() {
            Some(last) if now <= last.created_at => last.created_at + Duration::microseconds(1),
            _ => now,
        }
    }
}

/// Counters for entries that made it into, or were turned away from, a store.
#[derive(Debug, Default)]
pub struct StoreStats {
    pub appended: AtomicU64,
    pub rejected: AtomicU64,
}

impl StoreStats {
    pub fn get_appended(&self) -> u64 {
        self.appended.load(Ordering::Relaxed)
    }

    pub fn get_rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

/// In-process entry store. A single write lock covers validation, id
/// assignment and the push, so readers only see complete prefixes.
#[derive(Debug, Default)]
pub struct InMemoryEntryStore {
    validator: EntryValidator,
    groups: RwLock<HashMap<GroupId, GroupLog>>,
    stats: StoreStats,
}

impl InMemoryEntryStore {
    pub fn new(validator: EntryValidator) -> Self {
        Self {
            validator,
            groups: RwLock::new(HashMap::new()),
            stats: StoreStats::default(),
        }
    }

    pub async fn group_count(&self) -> usize {
        self.groups.read().await.len()
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Runs `f` on the group's log. A log that is still empty afterwards is
    /// not kept, so rejected drafts never register a group.
    fn within_group<T>(
        groups: &mut HashMap<GroupId, GroupLog>,
        group_id: &GroupId,
        f: impl FnOnce(&mut GroupLog) -> Result<T>,
    ) -> Result<T> {
        let log = groups.entry(group_id.clone()).or_default();
        let result = f(log);
        if log.entries.is_empty() {
            groups.remove(group_id);
        }
        result
    }

    /// Validates `draft` and pushes it onto `log`. Nothing is reported as
    /// appended here; the caller does that once its write is final.
    fn accept(&self, log: &mut GroupLog, draft: NewEntry) -> Result<LedgerEntry> {
        if let Err(e) = self.validator.validate(&draft, &log.entries) {
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            get_metrics().record_entry_rejected(draft.kind.as_str(), e.kind());
            tracing::warn!(
                group_id = %draft.group_id,
                kind = %draft.kind,
                source_account_id = %draft.source_account_id,
                dest_account_id = %draft.dest_account_id,
                amount = %draft.amount,
                error = %e,
                "Entry rejected"
            );
            return Err(e);
        }

        let entry = draft.into_entry(Uuid::new_v4(), log.next_timestamp());
        log.entries.push(entry.clone());
        Ok(entry)
    }

    fn record_appended(&self, entries: &[LedgerEntry]) {
        for entry in entries {
            self.stats.appended.fetch_add(1, Ordering::Relaxed);
            get_metrics().record_entry_appended(entry.kind.as_str());
            tracing::debug!(
                group_id = %entry.group_id,
                entry_id = %entry.entry_id,
                kind = %entry.kind,
                amount = %entry.amount,
                "Entry appended"
            );
        }
    }
}

#[async_trait]
impl EntryStore for InMemoryEntryStore {
    async fn append(&self, draft: NewEntry) -> Result<LedgerEntry> {
        let group_id = draft.group_id.clone();
        let mut groups = self.groups.write().await;
        let entry = Self::within_group(&mut groups, &group_id, |log| self.accept(log, draft))?;

        self.record_appended(std::slice::from_ref(&entry));
        Ok(entry)
    }

    async fn append_all(&self, drafts: Vec<NewEntry>) -> Result<Vec<LedgerEntry>> {
        let Some(group_id) = drafts.first().map(|d| d.group_id.clone()) else {
            return Ok(Vec::new());
        };
        if drafts.iter().any(|d| d.group_id != group_id) {
            return Err(AppError::Internal(anyhow::anyhow!(
                "batch append spans more than one group"
            )));
        }

        let mut groups = self.groups.write().await;
        let appended = Self::within_group(&mut groups, &group_id, |log| {
            let rollback_to = log.entries.len();
            let mut appended = Vec::with_capacity(drafts.len());
            for draft in drafts {
                match self.accept(log, draft) {
                    Ok(entry) => appended.push(entry),
                    Err(e) => {
                        log.entries.truncate(rollback_to);
                        return Err(e);
                    }
                }
            }
            Ok(appended)
        })?;

        self.record_appended(&appended);
        Ok(appended)
    }

    async fn snapshot(&self, group_id: &GroupId) -> Result<Vec<LedgerEntry>> {
        let groups = self.groups.read().await;
        Ok(groups
            .get(group_id)
            .map(|log| log.entries.clone())
            .unwrap_or_default())
    }

    async fn head(&self, group_id: &GroupId) -> Result<LedgerHead> {
        let groups = self.groups.read().await;
        Ok(groups
            .get(group_id)
            .map(|log| LedgerHead::of(&log.entries))
            .unwrap_or_default())
    }
}
