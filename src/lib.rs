//! Scheduling system for featured event placements.
//!
//! This crate assigns bounded-concurrency display windows to promotional
//! placements:
//! - Accepts placement requests with a desired start and duration
//! - Allocates non-overlapping effective windows over a fixed number of
//!   concurrent slots, deterministically
//! - Manages the entry lifecycle with type-safe state transitions
//! - Recomputes the whole queue from scratch on every change to the active
//!   set, serialized under a single writer lock
//! - Retires elapsed placements via a background sweeper
//!
//! # Example
//! ```ignore
//! use spotlight::{InMemoryScheduleManager, PlacementRequest, QueueOptions, ScheduleManager};
//!
//! let manager = InMemoryScheduleManager::new(QueueOptions::new(3).unwrap());
//!
//! // Start the sweeper
//! let handle = manager.run()?;
//!
//! // Submit placements
//! let ids = manager.submit_placements(vec![request]).await?;
//!
//! // Inspect the schedule
//! let schedule = manager.current_schedule().await?;
//! ```

pub mod allocator;
pub mod entry;
pub mod error;
pub mod manager;
pub mod storage;
pub mod sweeper;

// Re-export commonly used types
pub use allocator::{allocate_queue_windows, AllocatedWindow, QueueOptions};
pub use entry::*;
pub use error::{Result, SpotlightError};
pub use manager::in_memory::InMemoryScheduleManager;
pub use manager::ScheduleManager;
pub use storage::in_memory::InMemoryStorage;
pub use storage::Storage;
pub use sweeper::{Sweeper, SweeperConfig};
