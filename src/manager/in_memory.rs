//! In-memory implementation of ScheduleManager.
//!
//! Combines in-memory storage with the sweeper to provide a complete
//! scheduling system suitable for testing and single-process deployments.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::allocator::{allocate_queue_windows, QueueOptions};
use crate::entry::{AnyEntry, Entry, EntryId, PlacementRequest, Scheduled};
use crate::error::{Result, SpotlightError};
use crate::storage::{in_memory::InMemoryStorage, Storage};
use crate::sweeper::{Sweeper, SweeperConfig};

use super::ScheduleManager;

/// In-memory implementation of the ScheduleManager trait.
pub struct InMemoryScheduleManager {
    storage: Arc<InMemoryStorage>,
    options: QueueOptions,
    sweeper_config: SweeperConfig,
    /// Serializes every recompute+write; the sweeper shares this lock.
    recompute_lock: Arc<Mutex<()>>,
    status_tx: broadcast::Sender<AnyEntry>,
    shutdown: CancellationToken,
}

impl InMemoryScheduleManager {
    /// Create a new in-memory schedule manager with the given capacity.
    pub fn new(options: QueueOptions) -> Self {
        Self::with_sweeper_config(options, SweeperConfig::default())
    }

    /// Create a manager with a custom sweep cadence.
    pub fn with_sweeper_config(options: QueueOptions, sweeper_config: SweeperConfig) -> Self {
        // Each entry sees a handful of updates over its life (insert, window
        // assignments, terminal transition); size for bursty recomputes.
        let (status_tx, _) = broadcast::channel(1024);

        Self {
            storage: Arc::new(InMemoryStorage::with_status_updates(status_tx.clone())),
            options,
            sweeper_config,
            recompute_lock: Arc::new(Mutex::new(())),
            status_tx,
            shutdown: CancellationToken::new(),
        }
    }

    /// Stop the background sweeper, if running.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Recompute every active window from a fresh snapshot.
    ///
    /// Must never run from a cached entry list: the lock is taken first,
    /// then the active set is re-read, allocated, and written back in one
    /// critical section.
    async fn recompute(&self) -> Result<()> {
        let _guard = self.recompute_lock.lock().await;

        let active = self.storage.list_scheduled().await?;
        let windows = allocate_queue_windows(&active, &self.options);
        self.storage.apply_windows(&windows).await
    }
}

impl Drop for InMemoryScheduleManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl ScheduleManager for InMemoryScheduleManager {
    #[tracing::instrument(skip(self, requests), fields(count = requests.len()))]
    async fn submit_placements(
        &self,
        requests: Vec<PlacementRequest>,
    ) -> Result<Vec<Result<EntryId>>> {
        let now = Utc::now();
        let mut results = Vec::with_capacity(requests.len());
        let mut accepted = 0usize;

        for request in requests {
            let result = match request.into_entry(now) {
                Ok(entry) => {
                    let id = entry.data.id.clone();
                    match self.storage.insert(entry).await {
                        Ok(()) => {
                            accepted += 1;
                            Ok(id)
                        }
                        Err(e) => Err(e),
                    }
                }
                Err(e) => Err(e),
            };
            results.push(result);
        }

        if accepted > 0 {
            self.recompute().await?;
        }

        tracing::info!(accepted, total = results.len(), "Placement submission complete");
        Ok(results)
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn cancel_placements(&self, ids: Vec<EntryId>) -> Result<Vec<Result<()>>> {
        let mut results = Vec::with_capacity(ids.len());
        let mut cancelled = 0usize;

        for id in ids {
            let mut got = self.storage.get_entries(vec![id.clone()]).await?;
            let result = match got.remove(0) {
                Ok(AnyEntry::Scheduled(entry)) => {
                    entry.cancel(&*self.storage).await?;
                    cancelled += 1;
                    Ok(())
                }
                Ok(terminal) => Err(SpotlightError::InvalidState(
                    id,
                    terminal.state_name().to_string(),
                    "scheduled".to_string(),
                )),
                Err(e) => Err(e),
            };
            results.push(result);
        }

        if cancelled > 0 {
            self.recompute().await?;
        }

        tracing::info!(cancelled, total = results.len(), "Placement cancellation complete");
        Ok(results)
    }

    async fn get_entries(&self, ids: Vec<EntryId>) -> Result<Vec<Result<AnyEntry>>> {
        self.storage.get_entries(ids).await
    }

    async fn current_schedule(&self) -> Result<Vec<Entry<Scheduled>>> {
        self.storage.list_scheduled().await
    }

    fn subscribe(&self) -> broadcast::Receiver<AnyEntry> {
        self.status_tx.subscribe()
    }

    fn run(&self) -> Result<JoinHandle<Result<()>>> {
        tracing::info!(
            max_concurrent = self.options.max_concurrent.get(),
            "Starting placement sweeper"
        );

        let sweeper = Sweeper::new(
            self.storage.clone(),
            self.options,
            self.sweeper_config.clone(),
            self.recompute_lock.clone(),
            self.shutdown.child_token(),
        );

        Ok(tokio::spawn(sweeper.run()))
    }
}
