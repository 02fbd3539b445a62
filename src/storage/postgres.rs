//! PostgreSQL storage implementation for placement entries.
//!
//! Production backend with:
//! - Terminal-state protection enforced in the UPDATE predicates
//! - Transactional window write-back (a failed recompute writes nothing)
//! - Connection pooling via sqlx
//!
//! Queries are runtime-checked rather than macro-checked so the crate builds
//! without a live database.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::allocator::AllocatedWindow;
use crate::entry::{
    AnyEntry, Cancelled, Completed, Entry, EntryData, EntryId, EntryState, Scheduled, SlotWindow,
};
use crate::error::{Result, SpotlightError};

use super::Storage;

/// PostgreSQL storage backend.
#[derive(Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    /// Create a new PostgresStorage instance with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;
        Ok(())
    }
}

fn row_to_any(row: &PgRow) -> Result<AnyEntry> {
    let data = EntryData {
        id: EntryId(row.try_get("id")?),
        event_key: row.try_get("event_key")?,
        requested_start_at: row.try_get("requested_start_at")?,
        duration_hours: row.try_get::<i32, _>("duration_hours")? as u32,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
    };

    let status: String = row.try_get("status")?;
    match status.as_str() {
        "scheduled" => {
            let starts_at: Option<DateTime<Utc>> = row.try_get("effective_start_at")?;
            let ends_at: Option<DateTime<Utc>> = row.try_get("effective_end_at")?;
            let window = match (starts_at, ends_at) {
                (Some(starts_at), Some(ends_at)) => Some(SlotWindow { starts_at, ends_at }),
                _ => None,
            };
            Ok(AnyEntry::Scheduled(Entry {
                state: Scheduled { window },
                data,
            }))
        }
        "cancelled" => Ok(AnyEntry::Cancelled(Entry {
            state: Cancelled {
                cancelled_at: row.try_get("cancelled_at")?,
            },
            data,
        })),
        "completed" => Ok(AnyEntry::Completed(Entry {
            state: Completed {
                completed_at: row.try_get("completed_at")?,
            },
            data,
        })),
        other => Err(SpotlightError::Internal(format!(
            "unknown placement status: {other}"
        ))),
    }
}

const SELECT_COLUMNS: &str = "id, event_key, requested_start_at, duration_hours, created_by, \
     created_at, status, effective_start_at, effective_end_at, cancelled_at, completed_at";

impl Storage for PostgresStorage {
    async fn insert(&self, entry: Entry<Scheduled>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO placements (
                id, event_key, requested_start_at, duration_hours,
                created_by, created_at, updated_at, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $6, 'scheduled')
            "#,
        )
        .bind(entry.data.id.0.as_str())
        .bind(entry.data.event_key.as_str())
        .bind(entry.data.requested_start_at)
        .bind(entry.data.duration_hours as i32)
        .bind(entry.data.created_by.as_str())
        .bind(entry.data.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
                SpotlightError::DuplicateEntry(entry.data.id.clone())
            } else {
                SpotlightError::Database(e)
            }
        })?;

        Ok(())
    }

    async fn persist<T: EntryState + Clone>(&self, entry: &Entry<T>) -> Result<()>
    where
        AnyEntry: From<Entry<T>>,
    {
        let any = AnyEntry::from(entry.clone());

        let (status, window, cancelled_at, completed_at) = match &any {
            AnyEntry::Scheduled(e) => ("scheduled", e.state.window, None, None),
            AnyEntry::Cancelled(e) => ("cancelled", None, Some(e.state.cancelled_at), None),
            AnyEntry::Completed(e) => ("completed", None, None, Some(e.state.completed_at)),
        };

        // The status predicate doubles as terminal-state protection.
        let result = sqlx::query(
            r#"
            UPDATE placements SET
                status = $2,
                effective_start_at = $3,
                effective_end_at = $4,
                cancelled_at = $5,
                completed_at = $6,
                updated_at = now()
            WHERE id = $1 AND status = 'scheduled'
            "#,
        )
        .bind(entry.data.id.0.as_str())
        .bind(status)
        .bind(window.map(|w| w.starts_at))
        .bind(window.map(|w| w.ends_at))
        .bind(cancelled_at)
        .bind(completed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let row = sqlx::query("SELECT status FROM placements WHERE id = $1")
                .bind(entry.data.id.0.as_str())
                .fetch_optional(&self.pool)
                .await?;

            return match row {
                Some(row) => Err(SpotlightError::InvalidState(
                    entry.data.id.clone(),
                    row.try_get("status")?,
                    "scheduled".to_string(),
                )),
                None => Err(SpotlightError::EntryNotFound(entry.data.id.clone())),
            };
        }

        Ok(())
    }

    async fn list_scheduled(&self) -> Result<Vec<Entry<Scheduled>>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM placements WHERE status = 'scheduled'"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                row_to_any(row)?
                    .into_scheduled()
                    .ok_or_else(|| SpotlightError::Internal("status filter mismatch".into()))
            })
            .collect()
    }

    async fn get_entries(&self, ids: Vec<EntryId>) -> Result<Vec<Result<AnyEntry>>> {
        let mut results = Vec::with_capacity(ids.len());

        for id in ids {
            let row = sqlx::query(&format!(
                "SELECT {SELECT_COLUMNS} FROM placements WHERE id = $1"
            ))
            .bind(id.0.as_str())
            .fetch_optional(&self.pool)
            .await?;

            results.push(match row {
                Some(row) => row_to_any(&row),
                None => Err(SpotlightError::EntryNotFound(id)),
            });
        }

        Ok(results)
    }

    async fn apply_windows(&self, windows: &[AllocatedWindow]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for w in windows {
            let result = sqlx::query(
                r#"
                UPDATE placements SET
                    effective_start_at = $2,
                    effective_end_at = $3,
                    updated_at = now()
                WHERE id = $1 AND status = 'scheduled'
                "#,
            )
            .bind(w.entry_id.0.as_str())
            .bind(w.window.starts_at)
            .bind(w.window.ends_at)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Err(SpotlightError::EntryNotFound(w.entry_id.clone()));
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
