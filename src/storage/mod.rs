use std::future::Future;

use crate::allocator::AllocatedWindow;
use crate::entry::{AnyEntry, Entry, EntryId, EntryState, Scheduled};
use crate::error::Result;

pub mod in_memory;

#[cfg(feature = "postgres")]
pub mod postgres;

/// Storage trait for persisting and querying placement entries.
///
/// The type system ensures valid state transitions, so implementations don't
/// need to validate them; they do protect terminal states from being
/// overwritten, which keeps transitions idempotent under races.
pub trait Storage: Send + Sync {
    /// Insert a newly submitted entry.
    ///
    /// # Errors
    /// - `DuplicateEntry` if an entry with the same id already exists
    fn insert(&self, entry: Entry<Scheduled>) -> impl Future<Output = Result<()>> + Send;

    /// Update an existing entry's state in storage.
    ///
    /// # Errors
    /// - `EntryNotFound` if the entry doesn't exist
    /// - `InvalidState` if the stored entry is already terminal
    fn persist<T: EntryState + Clone>(
        &self,
        entry: &Entry<T>,
    ) -> impl Future<Output = Result<()>> + Send
    where
        AnyEntry: From<Entry<T>>;

    /// Snapshot of all scheduled entries, windows included.
    ///
    /// This is what the recompute path feeds to the allocator; it must be
    /// read freshly inside the recompute critical section, never cached.
    fn list_scheduled(&self) -> impl Future<Output = Result<Vec<Entry<Scheduled>>>> + Send;

    /// Get entries by id, in whatever state they currently are.
    ///
    /// # Returns
    /// One `Result` per requested id; missing ids yield `EntryNotFound`
    /// for that position only.
    fn get_entries(
        &self,
        ids: Vec<EntryId>,
    ) -> impl Future<Output = Result<Vec<Result<AnyEntry>>>> + Send;

    /// Write allocator output back to the scheduled entries.
    ///
    /// All-or-nothing: if any referenced entry is missing or no longer
    /// scheduled, nothing is written and the recompute attempt as a whole
    /// must be treated as failed.
    fn apply_windows(
        &self,
        windows: &[AllocatedWindow],
    ) -> impl Future<Output = Result<()>> + Send;
}
