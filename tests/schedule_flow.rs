//! End-to-end flow through the in-memory schedule manager: overflow queueing,
//! cancellation pulling queued placements forward, and determinism of the
//! published schedule.

use chrono::DateTime;
use chrono::Utc;
use spotlight::{
    EntryId, InMemoryScheduleManager, PlacementRequest, QueueOptions, ScheduleManager,
};

fn ts(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn request(id: &str, requested_start_at: &str, duration_hours: u32) -> PlacementRequest {
    PlacementRequest {
        id: id.to_string(),
        event_key: format!("event-{id}"),
        requested_start_at: requested_start_at.to_string(),
        duration_hours,
        created_by: "partners@example.com".to_string(),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("spotlight=debug")
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn overflow_queues_and_cancellation_frees_capacity() {
    init_tracing();

    let manager = InMemoryScheduleManager::new(QueueOptions::new(3).unwrap());

    let results = manager
        .submit_placements(vec![
            request("a", "2026-06-20T10:00:00.000Z", 48),
            request("b", "2026-06-20T10:00:00.000Z", 48),
            request("c", "2026-06-20T10:00:00.000Z", 48),
            request("d", "2026-06-20T10:00:00.000Z", 48),
        ])
        .await
        .unwrap();
    assert!(results.iter().all(|r| r.is_ok()));

    // Three lanes fill at the requested start; the fourth placement queues
    // behind the earliest-finishing one.
    let schedule = manager.current_schedule().await.unwrap();
    let window_of = |id: &str| {
        schedule
            .iter()
            .find(|e| e.data.id == EntryId::from(id))
            .unwrap()
            .state
            .window
            .unwrap()
    };

    for id in ["a", "b", "c"] {
        assert_eq!(window_of(id).starts_at, ts("2026-06-20T10:00:00Z"));
    }
    assert_eq!(window_of("d").starts_at, ts("2026-06-22T10:00:00Z"));
    assert_eq!(window_of("d").ends_at, ts("2026-06-24T10:00:00Z"));

    // Cancelling one of the first batch frees a lane, and the recompute
    // pulls the queued placement up to its requested start.
    let cancelled = manager
        .cancel_placements(vec![EntryId::from("b")])
        .await
        .unwrap();
    assert!(cancelled[0].is_ok());

    let schedule = manager.current_schedule().await.unwrap();
    assert_eq!(schedule.len(), 3);
    let d = schedule
        .iter()
        .find(|e| e.data.id == EntryId::from("d"))
        .unwrap()
        .state
        .window
        .unwrap();
    assert_eq!(d.starts_at, ts("2026-06-20T10:00:00Z"));
    assert_eq!(d.ends_at, ts("2026-06-22T10:00:00Z"));
}

#[tokio::test]
async fn published_schedule_is_stable_across_recomputes() {
    init_tracing();

    let manager = InMemoryScheduleManager::new(QueueOptions::new(2).unwrap());

    manager
        .submit_placements(vec![
            request("a", "2026-06-20T10:00:00.000Z", 48),
            request("b", "2026-06-20T10:00:00.000Z", 24),
            request("c", "2026-06-21T00:00:00.000Z", 12),
        ])
        .await
        .unwrap();

    let first = manager.current_schedule().await.unwrap();

    // A submission that fails validation leaves the schedule untouched.
    let results = manager
        .submit_placements(vec![request("bad", "not-a-date", 24)])
        .await
        .unwrap();
    assert!(results[0].is_err());

    let second = manager.current_schedule().await.unwrap();
    for entry in &first {
        let again = second
            .iter()
            .find(|e| e.data.id == entry.data.id)
            .unwrap();
        assert_eq!(again.state.window, entry.state.window);
    }
}

#[tokio::test]
async fn sweeper_task_starts_and_shuts_down_cleanly() {
    init_tracing();

    let manager = InMemoryScheduleManager::new(QueueOptions::new(1).unwrap());
    let handle = manager.run().unwrap();

    manager
        .submit_placements(vec![request("a", "2026-06-20T10:00:00.000Z", 24)])
        .await
        .unwrap();

    manager.shutdown();
    let outcome = handle.await.unwrap();
    assert!(outcome.is_ok());
}
