use crate::error::Result;
use crate::storage::Storage;

use super::types::{Cancelled, Completed, Entry, Scheduled};

impl Entry<Scheduled> {
    /// Cancel this placement and persist the transition.
    ///
    /// The entry leaves the active set; the caller is expected to recompute
    /// the queue afterwards so later entries can move forward.
    pub async fn cancel<S: Storage>(self, storage: &S) -> Result<Entry<Cancelled>> {
        let entry = Entry {
            data: self.data,
            state: Cancelled {
                cancelled_at: chrono::Utc::now(),
            },
        };
        storage.persist(&entry).await?;
        Ok(entry)
    }

    /// Mark this placement as having run its full window.
    ///
    /// Called by the sweeper once `ends_at` has passed; valid on any
    /// scheduled entry regardless of whether a window was ever assigned.
    pub async fn complete<S: Storage>(self, storage: &S) -> Result<Entry<Completed>> {
        let entry = Entry {
            data: self.data,
            state: Completed {
                completed_at: chrono::Utc::now(),
            },
        };
        storage.persist(&entry).await?;
        Ok(entry)
    }
}
