use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::Connection;

use super::{AvailabilityStore, BookingStore, StoreError};
use crate::db::queries;
use crate::models::{AvailabilityRecord, Booking, Freelancer};

/// SQLite-backed stores. Queries run on the blocking pool, so callers can
/// put a timeout around them.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    async fn run<T, F>(&self, query: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| StoreError::Unavailable("database lock poisoned".to_string()))?;
            query(&conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("database task failed: {e}")))?
    }
}

fn unavailable(e: anyhow::Error) -> StoreError {
    StoreError::Unavailable(format!("{e:#}"))
}

#[async_trait]
impl AvailabilityStore for SqliteStore {
    async fn get_freelancer(&self, id: &str) -> Result<Option<Freelancer>, StoreError> {
        let id = id.to_string();
        self.run(move |conn| queries::get_freelancer(conn, &id).map_err(unavailable))
            .await
    }

    async fn list_rules(
        &self,
        freelancer_id: &str,
        category_id: Option<&str>,
    ) -> Result<Vec<AvailabilityRecord>, StoreError> {
        let freelancer_id = freelancer_id.to_string();
        let category_id = category_id.map(str::to_string);
        self.run(move |conn| {
            queries::get_rules_for_freelancer(conn, &freelancer_id, category_id.as_deref())
                .map_err(unavailable)
        })
        .await
    }
}

#[async_trait]
impl BookingStore for SqliteStore {
    async fn list_blocking_bookings(
        &self,
        freelancer_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Booking>, StoreError> {
        let freelancer_id = freelancer_id.to_string();
        let records = self
            .run(move |conn| {
                queries::get_blocking_bookings_in_range(conn, &freelancer_id, &from, &to)
                    .map_err(unavailable)
            })
            .await?;

        records
            .into_iter()
            .map(|r| Booking::try_from(r).map_err(StoreError::Malformed))
            .collect()
    }

    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        let booking = booking.clone();
        self.run(move |conn| {
            let inserted = if booking.blocks_time() {
                queries::create_booking_if_free(conn, &booking).map_err(unavailable)?
            } else {
                queries::create_booking(conn, &booking).map_err(unavailable)?;
                true
            };
            if inserted {
                Ok(())
            } else {
                Err(StoreError::Conflict(format!(
                    "{} to {} overlaps an existing booking",
                    booking.start_time, booking.end_time
                )))
            }
        })
        .await
    }
}
