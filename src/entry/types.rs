//! Core types for featured placement scheduling.
//!
//! This module defines the placement entry lifecycle using the typestate
//! pattern. An entry is `Scheduled` while it counts against the concurrency
//! bound, and moves to `Cancelled` or `Completed` when it leaves the queue.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SpotlightError};

/// Minimum accepted placement duration, in hours.
pub const MIN_DURATION_HOURS: u32 = 1;

/// Maximum accepted placement duration, in hours (one week).
pub const MAX_DURATION_HOURS: u32 = 168;

/// Unique identifier for a placement entry.
///
/// Ids are opaque strings assigned by the caller before submission and stable
/// across window recomputation. Lexicographic order is the final tie-break
/// key during allocation, so `EntryId` is totally ordered.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        EntryId(s.to_string())
    }
}

impl From<String> for EntryId {
    fn from(s: String) -> Self {
        EntryId(s)
    }
}

/// Marker trait for valid entry states.
///
/// This trait enables the typestate pattern, ensuring that operations
/// are only performed on entries in valid states.
pub trait EntryState: Send + Sync {}

/// A placement entry in the featured queue.
///
/// Uses the typestate pattern to ensure type-safe state transitions.
/// The generic parameter `T` represents the current state of the entry.
#[derive(Debug, Clone)]
pub struct Entry<T: EntryState> {
    /// The current state of the entry.
    pub state: T,
    /// The caller-supplied scheduling input and provenance.
    pub data: EntryData,
}

/// Caller-supplied data for a placement entry.
///
/// Everything here is read-only input to the allocator; the assigned window
/// lives on the `Scheduled` state, never here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryData {
    /// The id with which the entry was submitted.
    pub id: EntryId,

    /// Reference to the promoted event. Opaque to the scheduler.
    pub event_key: String,

    /// Earliest instant the requester wants visibility to begin.
    /// Immutable once set; the allocator never starts a window before it.
    pub requested_start_at: DateTime<Utc>,

    /// Length of the visibility window once it starts, in whole hours.
    /// Validated to `MIN_DURATION_HOURS..=MAX_DURATION_HOURS` at intake.
    pub duration_hours: u32,

    /// Who submitted the placement. Audit metadata only.
    pub created_by: String,

    /// Submission time. Used as the second allocation tie-break key.
    pub created_at: DateTime<Utc>,
}

impl EntryData {
    /// The requested duration as a wall-clock interval.
    ///
    /// Hour addition is not calendar-aware: a window spanning a DST
    /// transition keeps its exact wall-clock length.
    pub fn duration(&self) -> Duration {
        Duration::hours(i64::from(self.duration_hours))
    }
}

/// A half-open display interval `[starts_at, ends_at)` assigned by the
/// allocator. `ends_at` is always `starts_at` plus the entry's duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotWindow {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl SlotWindow {
    /// Whether the given instant falls inside this window.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.starts_at <= instant && instant < self.ends_at
    }
}

// ============================================================================
// Entry States
// ============================================================================

/// Entry is active and counts against the concurrency bound.
///
/// `window` is `None` until the first allocation pass after submission.
#[derive(Debug, Clone)]
pub struct Scheduled {
    pub window: Option<SlotWindow>,
}

impl EntryState for Scheduled {}

/// Entry was cancelled by the caller before or during its window.
#[derive(Debug, Clone)]
pub struct Cancelled {
    pub cancelled_at: DateTime<Utc>,
}

impl EntryState for Cancelled {}

/// Entry ran its full window and left the queue.
#[derive(Debug, Clone)]
pub struct Completed {
    pub completed_at: DateTime<Utc>,
}

impl EntryState for Completed {}

// ============================================================================
// Unified Entry Representation
// ============================================================================

/// Enum that can hold an entry in any state.
///
/// This is used for storage and status queries where entries are handled
/// uniformly regardless of their current state.
#[derive(Debug, Clone)]
pub enum AnyEntry {
    Scheduled(Entry<Scheduled>),
    Cancelled(Entry<Cancelled>),
    Completed(Entry<Completed>),
}

impl AnyEntry {
    /// Get the entry id regardless of state.
    pub fn id(&self) -> &EntryId {
        match self {
            AnyEntry::Scheduled(e) => &e.data.id,
            AnyEntry::Cancelled(e) => &e.data.id,
            AnyEntry::Completed(e) => &e.data.id,
        }
    }

    /// Check if this entry is in the Scheduled state.
    pub fn is_scheduled(&self) -> bool {
        matches!(self, AnyEntry::Scheduled(_))
    }

    /// Check if this entry is in a terminal state (Cancelled or Completed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, AnyEntry::Cancelled(_) | AnyEntry::Completed(_))
    }

    /// Try to extract as a Scheduled entry.
    pub fn as_scheduled(&self) -> Option<&Entry<Scheduled>> {
        match self {
            AnyEntry::Scheduled(e) => Some(e),
            _ => None,
        }
    }

    /// Try to take as a Scheduled entry, consuming self.
    pub fn into_scheduled(self) -> Option<Entry<Scheduled>> {
        match self {
            AnyEntry::Scheduled(e) => Some(e),
            _ => None,
        }
    }

    /// Human-readable name of the current state.
    pub fn state_name(&self) -> &'static str {
        match self {
            AnyEntry::Scheduled(_) => "scheduled",
            AnyEntry::Cancelled(_) => "cancelled",
            AnyEntry::Completed(_) => "completed",
        }
    }
}

impl From<Entry<Scheduled>> for AnyEntry {
    fn from(e: Entry<Scheduled>) -> Self {
        AnyEntry::Scheduled(e)
    }
}

impl From<Entry<Cancelled>> for AnyEntry {
    fn from(e: Entry<Cancelled>) -> Self {
        AnyEntry::Cancelled(e)
    }
}

impl From<Entry<Completed>> for AnyEntry {
    fn from(e: Entry<Completed>) -> Self {
        AnyEntry::Completed(e)
    }
}

// ============================================================================
// Intake
// ============================================================================

/// Intake payload for a placement request, as received from the surrounding
/// system (payment flow, admin grant).
///
/// Timestamps arrive as ISO-8601 strings and are parsed here; a malformed
/// `requested_start_at` propagates the parse error rather than being
/// silently coerced, since a bad window would otherwise double-book a slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementRequest {
    pub id: String,
    pub event_key: String,
    pub requested_start_at: String,
    pub duration_hours: u32,
    pub created_by: String,
}

impl PlacementRequest {
    /// Validate and convert into a freshly scheduled entry.
    ///
    /// `now` becomes the entry's `created_at` and is supplied by the caller
    /// so that batch submissions share a single submission timestamp.
    ///
    /// # Errors
    /// - `InvalidDuration` if `duration_hours` is outside `1..=168`
    /// - `Timestamp` if `requested_start_at` is not valid ISO-8601
    pub fn into_entry(self, now: DateTime<Utc>) -> Result<Entry<Scheduled>> {
        if !(MIN_DURATION_HOURS..=MAX_DURATION_HOURS).contains(&self.duration_hours) {
            return Err(SpotlightError::InvalidDuration(self.duration_hours));
        }

        let requested_start_at =
            DateTime::parse_from_rfc3339(&self.requested_start_at)?.with_timezone(&Utc);

        Ok(Entry {
            state: Scheduled { window: None },
            data: EntryData {
                id: EntryId(self.id),
                event_key: self.event_key,
                requested_start_at,
                duration_hours: self.duration_hours,
                created_by: self.created_by,
                created_at: now,
            },
        })
    }
}
