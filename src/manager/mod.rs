//! Main trait for the placement scheduling system.
//!
//! This module defines the `ScheduleManager` trait, which provides the
//! interface for submitting, cancelling, and querying featured placements.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::entry::{AnyEntry, Entry, EntryId, PlacementRequest, Scheduled};
use crate::error::Result;

pub mod in_memory;

/// Main trait for the placement scheduling system.
///
/// Implementations own the recompute discipline: every mutation of the
/// active set (submit, cancel, sweep-completion) re-reads the full set of
/// scheduled entries and reallocates every window from scratch before
/// writing anything back, serialized under a single writer lock. Global
/// consistency over local optimality.
#[async_trait]
pub trait ScheduleManager: Send + Sync {
    /// Submit placement requests for scheduling.
    ///
    /// Each request is validated (duration range, timestamp parse) and
    /// inserted independently; one bad request doesn't reject the batch.
    /// Windows are recomputed once after the batch.
    ///
    /// Returns the assigned entry id per accepted request.
    async fn submit_placements(
        &self,
        requests: Vec<PlacementRequest>,
    ) -> Result<Vec<Result<EntryId>>>;

    /// Cancel one or more scheduled placements.
    ///
    /// Placements that already completed or were cancelled cannot be
    /// cancelled again. Windows are recomputed after the batch so queued
    /// placements move forward into the freed capacity.
    ///
    /// Returns a result per id indicating whether cancellation succeeded.
    async fn cancel_placements(&self, ids: Vec<EntryId>) -> Result<Vec<Result<()>>>;

    /// Get the current state of one or more placements.
    async fn get_entries(&self, ids: Vec<EntryId>) -> Result<Vec<Result<AnyEntry>>>;

    /// Snapshot of the active schedule, effective windows included.
    async fn current_schedule(&self) -> Result<Vec<Entry<Scheduled>>>;

    /// Subscribe to placement state and window changes.
    fn subscribe(&self) -> broadcast::Receiver<AnyEntry>;

    /// Spawn the background sweeper.
    ///
    /// The sweeper retires placements whose window has elapsed and keeps
    /// the queue recomputed. Runs until the manager is shut down.
    fn run(&self) -> Result<JoinHandle<Result<()>>>;
}
