//! Background task that retires placements whose window has elapsed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::allocator::{allocate_queue_windows, QueueOptions};
use crate::error::Result;
use crate::storage::Storage;

/// Configuration for the sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// How often to scan the active set for elapsed windows.
    pub sweep_interval: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Sweeper that completes elapsed placements and recomputes the queue.
///
/// Each pass transitions every scheduled entry whose `ends_at` has passed to
/// `Completed`, then recomputes windows for what remains. Completion shrinks
/// the active set the same way a cancellation does, so queued entries can
/// only move earlier, never later.
pub struct Sweeper<S: Storage> {
    storage: Arc<S>,
    options: QueueOptions,
    config: SweeperConfig,
    recompute_lock: Arc<Mutex<()>>,
    shutdown: CancellationToken,
}

impl<S: Storage + 'static> Sweeper<S> {
    /// Create a new sweeper.
    ///
    /// `recompute_lock` must be the same lock the manager holds during its
    /// own recomputes, so sweep-and-recompute never races a submit or cancel.
    pub fn new(
        storage: Arc<S>,
        options: QueueOptions,
        config: SweeperConfig,
        recompute_lock: Arc<Mutex<()>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            storage,
            options,
            config,
            recompute_lock,
            shutdown,
        }
    }

    /// Run sweep passes until the cancellation token fires.
    pub async fn run(self) -> Result<()> {
        let mut ticker = tokio::time::interval(self.config.sweep_interval);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Sweeper shutting down");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(error) = self.sweep_once().await {
                        tracing::warn!(%error, "Sweep pass failed");
                    }
                }
            }
        }
    }

    /// Run a single sweep pass. Returns how many placements were completed.
    pub async fn sweep_once(&self) -> Result<usize> {
        // Hold the recompute lock across the whole pass: the snapshot we
        // complete from must be the snapshot we reallocate from.
        let _guard = self.recompute_lock.lock().await;

        let now = Utc::now();
        let active = self.storage.list_scheduled().await?;

        let mut remaining = Vec::with_capacity(active.len());
        let mut completed = 0usize;

        for entry in active {
            match entry.state.window {
                Some(window) if window.ends_at <= now => {
                    let id = entry.data.id.clone();
                    entry.complete(&*self.storage).await?;
                    tracing::debug!(entry_id = %id, "Placement window elapsed");
                    completed += 1;
                }
                _ => remaining.push(entry),
            }
        }

        if completed > 0 {
            let windows = allocate_queue_windows(&remaining, &self.options);
            self.storage.apply_windows(&windows).await?;
            tracing::info!(completed, remaining = remaining.len(), "Sweep pass complete");
        }

        Ok(completed)
    }
}
