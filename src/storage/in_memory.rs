//! In-memory storage implementation for placement entries.
//!
//! Stores all entries in memory behind a read-write lock. Suitable for tests
//! and single-process deployments; entries are lost on restart.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::allocator::AllocatedWindow;
use crate::entry::{AnyEntry, Entry, EntryId, EntryState, Scheduled};
use crate::error::{Result, SpotlightError};

use super::Storage;

/// In-memory implementation of the Storage trait.
///
/// Optionally broadcasts every stored state or window change, which the
/// manager exposes as a subscription surface.
#[derive(Clone)]
pub struct InMemoryStorage {
    entries: Arc<RwLock<HashMap<EntryId, AnyEntry>>>,
    status_tx: Option<broadcast::Sender<AnyEntry>>,
}

impl InMemoryStorage {
    /// Create a new in-memory storage without update broadcasting.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            status_tx: None,
        }
    }

    /// Create a storage that publishes every entry change to `status_tx`.
    pub fn with_status_updates(status_tx: broadcast::Sender<AnyEntry>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            status_tx: Some(status_tx),
        }
    }

    fn notify(&self, entry: &AnyEntry) {
        if let Some(tx) = &self.status_tx {
            // Send errors just mean nobody is listening.
            let _ = tx.send(entry.clone());
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for InMemoryStorage {
    async fn insert(&self, entry: Entry<Scheduled>) -> Result<()> {
        let stored = {
            let mut entries = self.entries.write();

            if entries.contains_key(&entry.data.id) {
                return Err(SpotlightError::DuplicateEntry(entry.data.id.clone()));
            }

            let stored = AnyEntry::from(entry);
            entries.insert(stored.id().clone(), stored.clone());
            stored
        };

        self.notify(&stored);
        Ok(())
    }

    async fn persist<T: EntryState + Clone>(&self, entry: &Entry<T>) -> Result<()>
    where
        AnyEntry: From<Entry<T>>,
    {
        let stored = {
            let mut entries = self.entries.write();

            let existing = entries
                .get_mut(&entry.data.id)
                .ok_or_else(|| SpotlightError::EntryNotFound(entry.data.id.clone()))?;

            // Don't overwrite terminal states (idempotency protection)
            if existing.is_terminal() {
                return Err(SpotlightError::InvalidState(
                    entry.data.id.clone(),
                    existing.state_name().to_string(),
                    "scheduled".to_string(),
                ));
            }

            *existing = AnyEntry::from(entry.clone());
            existing.clone()
        };

        self.notify(&stored);
        Ok(())
    }

    async fn list_scheduled(&self) -> Result<Vec<Entry<Scheduled>>> {
        let entries = self.entries.read();

        Ok(entries
            .values()
            .filter_map(|e| e.as_scheduled().cloned())
            .collect())
    }

    async fn get_entries(&self, ids: Vec<EntryId>) -> Result<Vec<Result<AnyEntry>>> {
        let entries = self.entries.read();

        Ok(ids
            .into_iter()
            .map(|id| {
                entries
                    .get(&id)
                    .cloned()
                    .ok_or(SpotlightError::EntryNotFound(id))
            })
            .collect())
    }

    async fn apply_windows(&self, windows: &[AllocatedWindow]) -> Result<()> {
        let updated = {
            let mut entries = self.entries.write();

            // Validate the whole batch before touching anything, so a failed
            // recompute never leaves a half-written schedule behind.
            for w in windows {
                match entries.get(&w.entry_id) {
                    Some(existing) if existing.is_scheduled() => {}
                    Some(existing) => {
                        return Err(SpotlightError::InvalidState(
                            w.entry_id.clone(),
                            existing.state_name().to_string(),
                            "scheduled".to_string(),
                        ));
                    }
                    None => return Err(SpotlightError::EntryNotFound(w.entry_id.clone())),
                }
            }

            let mut updated = Vec::with_capacity(windows.len());
            for w in windows {
                if let Some(AnyEntry::Scheduled(entry)) = entries.get_mut(&w.entry_id) {
                    entry.state.window = Some(w.window);
                    updated.push(AnyEntry::Scheduled(entry.clone()));
                }
            }
            updated
        };

        for entry in &updated {
            self.notify(entry);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use crate::allocator::{allocate_queue_windows, QueueOptions};
    use crate::entry::{EntryData, SlotWindow};

    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn sample_entry(id: &str) -> Entry<Scheduled> {
        Entry {
            state: Scheduled { window: None },
            data: EntryData {
                id: EntryId::from(id),
                event_key: "paris-plages".to_string(),
                requested_start_at: ts("2026-07-01T09:00:00Z"),
                duration_hours: 24,
                created_by: "test".to_string(),
                created_at: ts("2026-06-01T00:00:00Z"),
            },
        }
    }

    #[tokio::test]
    async fn insert_and_list_scheduled() {
        let storage = InMemoryStorage::new();
        storage.insert(sample_entry("p1")).await.unwrap();

        let scheduled = storage.list_scheduled().await.unwrap();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].data.id, EntryId::from("p1"));
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_id() {
        let storage = InMemoryStorage::new();
        storage.insert(sample_entry("p1")).await.unwrap();

        let err = storage.insert(sample_entry("p1")).await.unwrap_err();
        assert!(matches!(err, SpotlightError::DuplicateEntry(_)));
    }

    #[tokio::test]
    async fn cancel_removes_entry_from_active_set() {
        let storage = InMemoryStorage::new();
        let entry = sample_entry("p1");
        storage.insert(entry.clone()).await.unwrap();

        entry.cancel(&storage).await.unwrap();

        assert!(storage.list_scheduled().await.unwrap().is_empty());

        let got = storage.get_entries(vec![EntryId::from("p1")]).await.unwrap();
        assert!(matches!(got[0].as_ref().unwrap(), AnyEntry::Cancelled(_)));
    }

    #[tokio::test]
    async fn terminal_entries_cannot_be_overwritten() {
        let storage = InMemoryStorage::new();
        let entry = sample_entry("p1");
        storage.insert(entry.clone()).await.unwrap();

        entry.clone().cancel(&storage).await.unwrap();

        let err = entry.complete(&storage).await.unwrap_err();
        assert!(matches!(err, SpotlightError::InvalidState(_, _, _)));
    }

    #[tokio::test]
    async fn apply_windows_populates_scheduled_entries() {
        let storage = InMemoryStorage::new();
        storage.insert(sample_entry("p1")).await.unwrap();
        storage.insert(sample_entry("p2")).await.unwrap();

        let active = storage.list_scheduled().await.unwrap();
        let windows = allocate_queue_windows(&active, &QueueOptions::new(1).unwrap());
        storage.apply_windows(&windows).await.unwrap();

        let scheduled = storage.list_scheduled().await.unwrap();
        assert!(scheduled.iter().all(|e| e.state.window.is_some()));
    }

    #[tokio::test]
    async fn apply_windows_is_all_or_nothing() {
        let storage = InMemoryStorage::new();
        storage.insert(sample_entry("p1")).await.unwrap();

        let window = SlotWindow {
            starts_at: ts("2026-07-01T09:00:00Z"),
            ends_at: ts("2026-07-02T09:00:00Z"),
        };
        let windows = vec![
            AllocatedWindow {
                entry_id: EntryId::from("p1"),
                window,
            },
            AllocatedWindow {
                entry_id: EntryId::from("missing"),
                window,
            },
        ];

        let err = storage.apply_windows(&windows).await.unwrap_err();
        assert!(matches!(err, SpotlightError::EntryNotFound(_)));

        // The valid half of the batch must not have been written either.
        let scheduled = storage.list_scheduled().await.unwrap();
        assert!(scheduled[0].state.window.is_none());
    }

    #[tokio::test]
    async fn get_entries_reports_missing_ids_individually() {
        let storage = InMemoryStorage::new();
        storage.insert(sample_entry("p1")).await.unwrap();

        let got = storage
            .get_entries(vec![EntryId::from("p1"), EntryId::from("nope")])
            .await
            .unwrap();

        assert!(got[0].is_ok());
        assert!(matches!(
            got[1].as_ref().unwrap_err(),
            SpotlightError::EntryNotFound(_)
        ));
    }

    #[tokio::test]
    async fn changes_are_broadcast_to_subscribers() {
        let (tx, mut rx) = broadcast::channel(16);
        let storage = InMemoryStorage::with_status_updates(tx);

        storage.insert(sample_entry("p1")).await.unwrap();

        let update = rx.recv().await.unwrap();
        assert_eq!(update.id(), &EntryId::from("p1"));
        assert!(update.is_scheduled());
    }
}
