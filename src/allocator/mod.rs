//! Featured queue allocator.
//!
//! Assigns every scheduled entry a display window such that at most
//! `max_concurrent` windows overlap at any instant. This is list scheduling
//! on a fixed number of machines: entries are processed in a deterministic
//! order and each one takes the slot that frees up soonest, starting no
//! earlier than its own requested start.
//!
//! The processing order is `requested_start_at`, then `created_at`, then id
//! (lexicographic). Earlier requests claim slots first; the remaining keys
//! exist only to make the outcome independent of input array order. The
//! allocator does not re-order by duration or attempt bin-packing, trading
//! optimality for predictability.

use std::num::NonZeroUsize;

use chrono::{DateTime, Utc};

use crate::entry::{Entry, EntryId, Scheduled, SlotWindow};

/// Capacity constraint for the featured queue.
///
/// `max_concurrent` is the number of promotional lanes; it is non-zero by
/// construction, so an invalid capacity can never reach the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOptions {
    pub max_concurrent: NonZeroUsize,
}

impl QueueOptions {
    /// Build options for the given capacity. Returns `None` for zero.
    pub fn new(max_concurrent: usize) -> Option<Self> {
        NonZeroUsize::new(max_concurrent).map(|max_concurrent| Self { max_concurrent })
    }
}

/// One allocator output: the window assigned to an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedWindow {
    pub entry_id: EntryId,
    pub window: SlotWindow,
}

/// Compute display windows for the active placement set.
///
/// Pure and idempotent: no I/O, inputs are not mutated, and identical input
/// sets produce identical windows regardless of slice order. Every input
/// entry appears exactly once in the output, in no particular order.
///
/// Callers pass the complete active set each time; the queue is always
/// recomputed from scratch rather than patched incrementally, so a single
/// call is globally consistent by construction.
pub fn allocate_queue_windows(
    entries: &[Entry<Scheduled>],
    options: &QueueOptions,
) -> Vec<AllocatedWindow> {
    let mut order: Vec<&Entry<Scheduled>> = entries.iter().collect();
    order.sort_by(|a, b| {
        a.data
            .requested_start_at
            .cmp(&b.data.requested_start_at)
            .then_with(|| a.data.created_at.cmp(&b.data.created_at))
            .then_with(|| a.data.id.cmp(&b.data.id))
    });

    // One free-at timestamp per lane, all free from the beginning of time.
    let mut slots: Vec<DateTime<Utc>> =
        vec![DateTime::<Utc>::MIN_UTC; options.max_concurrent.get()];

    let mut windows = Vec::with_capacity(entries.len());

    for entry in order {
        // Earliest-free slot; strict comparison keeps the lowest index on
        // ties so slot bookkeeping stays reproducible.
        let mut slot_idx = 0;
        for (idx, free_at) in slots.iter().enumerate().skip(1) {
            if *free_at < slots[slot_idx] {
                slot_idx = idx;
            }
        }

        let starts_at = entry.data.requested_start_at.max(slots[slot_idx]);
        let ends_at = starts_at + entry.data.duration();
        slots[slot_idx] = ends_at;

        windows.push(AllocatedWindow {
            entry_id: entry.data.id.clone(),
            window: SlotWindow { starts_at, ends_at },
        });
    }

    windows
}
