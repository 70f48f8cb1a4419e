//! PostgreSQL implementation of the event store.
//!
//! Each attendance mutation runs in its own transaction and locks the
//! event's row with `SELECT ... FOR UPDATE`, so writers on one event
//! serialize at the database while writers on different events proceed
//! in parallel.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::{AttendanceStore, EventCatalog};
use crate::config::GatewayConfig;
use crate::domain::{
    AttendanceMutation, AttendeeSet, EventDetails, EventFilter, EventId, EventPatch, EventRecord,
    UserId,
};
use crate::error::GatewayError;

/// Column list shared by every record query, in [`EventRow`] order.
const RECORD_COLUMNS: &str = "id, name, description, date, location, category, image_url, \
                              created_by, attendees, created_at";

type EventRow = (
    String,
    String,
    String,
    DateTime<Utc>,
    String,
    String,
    Option<String>,
    String,
    Vec<String>,
    DateTime<Utc>,
);

/// PostgreSQL-backed event store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the database settings in `config` and applies
    /// pending migrations.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if the database is
    /// unreachable or a migration fails.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        tracing::info!("postgres event store ready");
        Ok(Self::new(pool))
    }

    /// Locks the event row, applies `apply` to its attendee set and writes
    /// the result back if anything changed.
    async fn mutate<F>(
        &self,
        event_id: EventId,
        apply: F,
    ) -> Result<AttendanceMutation, GatewayError>
    where
        F: FnOnce(&mut AttendeeSet) -> bool + Send,
    {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, (Vec<String>, i64)>(
            "SELECT attendees, revision FROM events WHERE id = $1 FOR UPDATE",
        )
        .bind(event_id.to_string())
        .fetch_optional(&mut *tx)
        .await?;

        let Some((stored, revision)) = row else {
            return Err(GatewayError::EventNotFound(event_id));
        };

        let mut attendees = parse_attendees(&stored)?;
        let changed = apply(&mut attendees);

        let revision = if changed {
            let ids: Vec<String> = attendees.iter().map(ToString::to_string).collect();
            sqlx::query_scalar::<_, i64>(
                "UPDATE events SET attendees = $2, revision = revision + 1 \
                 WHERE id = $1 RETURNING revision",
            )
            .bind(event_id.to_string())
            .bind(&ids)
            .fetch_one(&mut *tx)
            .await?
        } else {
            revision
        };

        tx.commit().await?;

        Ok(AttendanceMutation {
            event_id,
            attendees,
            changed,
            revision: u64::try_from(revision).unwrap_or_default(),
        })
    }
}

#[async_trait]
impl AttendanceStore for PostgresEventStore {
    async fn attendees(&self, event_id: EventId) -> Result<AttendeeSet, GatewayError> {
        let stored = sqlx::query_scalar::<_, Vec<String>>(
            "SELECT attendees FROM events WHERE id = $1",
        )
        .bind(event_id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GatewayError::EventNotFound(event_id))?;

        parse_attendees(&stored)
    }

    async fn add_attendee(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<AttendanceMutation, GatewayError> {
        self.mutate(event_id, |attendees| attendees.insert(user_id))
            .await
    }

    async fn remove_attendee(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<AttendanceMutation, GatewayError> {
        self.mutate(event_id, |attendees| attendees.remove(user_id))
            .await
    }
}

#[async_trait]
impl EventCatalog for PostgresEventStore {
    async fn insert(&self, record: EventRecord) -> Result<EventRecord, GatewayError> {
        let ids: Vec<String> = record.attendees.iter().map(ToString::to_string).collect();
        let inserted = sqlx::query(
            "INSERT INTO events (id, name, description, date, location, category, image_url, \
             created_by, attendees, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) ON CONFLICT (id) DO NOTHING",
        )
        .bind(record.id.to_string())
        .bind(&record.details.name)
        .bind(&record.details.description)
        .bind(record.details.date)
        .bind(&record.details.location)
        .bind(&record.details.category)
        .bind(&record.details.image_url)
        .bind(record.created_by.to_string())
        .bind(&ids)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(GatewayError::InvalidRequest(format!(
                "event {} already exists",
                record.id
            )));
        }
        Ok(record)
    }

    async fn fetch(&self, event_id: EventId) -> Result<EventRecord, GatewayError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(event_id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GatewayError::EventNotFound(event_id))?;

        record_from_row(row)
    }

    async fn list(&self, filter: &EventFilter) -> Result<Vec<EventRecord>, GatewayError> {
        let rows = if let Some(category) = &filter.category {
            sqlx::query_as::<_, EventRow>(&format!(
                "SELECT {RECORD_COLUMNS} FROM events WHERE category = $1 ORDER BY created_at ASC"
            ))
            .bind(category)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, EventRow>(&format!(
                "SELECT {RECORD_COLUMNS} FROM events ORDER BY created_at ASC"
            ))
            .fetch_all(&self.pool)
            .await
        }?;

        rows.into_iter().map(record_from_row).collect()
    }

    async fn update(
        &self,
        event_id: EventId,
        patch: EventPatch,
    ) -> Result<EventRecord, GatewayError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "UPDATE events SET \
               name = COALESCE($2, name), \
               description = COALESCE($3, description), \
               date = COALESCE($4, date), \
               location = COALESCE($5, location), \
               category = COALESCE($6, category), \
               image_url = COALESCE($7, image_url) \
             WHERE id = $1 RETURNING {RECORD_COLUMNS}"
        ))
        .bind(event_id.to_string())
        .bind(patch.name)
        .bind(patch.description)
        .bind(patch.date)
        .bind(patch.location)
        .bind(patch.category)
        .bind(patch.image_url)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GatewayError::EventNotFound(event_id))?;

        record_from_row(row)
    }

    async fn delete(&self, event_id: EventId) -> Result<EventRecord, GatewayError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "DELETE FROM events WHERE id = $1 RETURNING {RECORD_COLUMNS}"
        ))
        .bind(event_id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or(GatewayError::EventNotFound(event_id))?;

        record_from_row(row)
    }
}

fn parse_column<T: FromStr>(column: &str, raw: &str) -> Result<T, GatewayError> {
    raw.parse()
        .map_err(|_| GatewayError::PersistenceError(format!("corrupt {column} value {raw:?}")))
}

fn parse_attendees(stored: &[String]) -> Result<AttendeeSet, GatewayError> {
    stored
        .iter()
        .map(|raw| parse_column::<UserId>("attendees", raw))
        .collect()
}

fn record_from_row(row: EventRow) -> Result<EventRecord, GatewayError> {
    let (
        id,
        name,
        description,
        date,
        location,
        category,
        image_url,
        created_by,
        attendees,
        created_at,
    ) = row;

    Ok(EventRecord {
        id: parse_column("id", &id)?,
        details: EventDetails {
            name,
            description,
            date,
            location,
            category,
            image_url,
        },
        created_by: parse_column("created_by", &created_by)?,
        attendees: parse_attendees(&attendees)?,
        created_at,
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parse_attendees_rejects_corrupt_ids() {
        let stored = vec!["65f1a2b3c4d5e6f708192a3b".to_string(), "bogus".to_string()];
        let result = parse_attendees(&stored);
        assert!(matches!(result, Err(GatewayError::PersistenceError(_))));
    }

    #[test]
    fn record_from_row_maps_columns() {
        let owner = UserId::generate();
        let attendee = UserId::generate();
        let id = EventId::generate();
        let now = Utc::now();
        let row: EventRow = (
            id.to_string(),
            "Launch".to_string(),
            "Product launch".to_string(),
            now,
            "HQ".to_string(),
            "business".to_string(),
            None,
            owner.to_string(),
            vec![attendee.to_string(), attendee.to_string()],
            now,
        );

        let Ok(record) = record_from_row(row) else {
            panic!("row rejected");
        };
        assert_eq!(record.id, id);
        assert_eq!(record.created_by, owner);
        assert_eq!(record.attendees.len(), 1);
        assert_eq!(record.details.category, "business");
    }
}
