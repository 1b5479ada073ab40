pub mod rest;
pub mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::models::{AvailabilityRecord, Booking, Freelancer};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("conflicting booking: {0}")]
    Conflict(String),
}

/// Profiles and availability rules, owned by profile management.
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    async fn get_freelancer(&self, id: &str) -> Result<Option<Freelancer>, StoreError>;

    /// Rules of `freelancer_id`; with a category, that category's rules plus
    /// the uncategorised ones. Records come back unvalidated.
    async fn list_rules(
        &self,
        freelancer_id: &str,
        category_id: Option<&str>,
    ) -> Result<Vec<AvailabilityRecord>, StoreError>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Pending and confirmed bookings of `freelancer_id` intersecting `[from, to)`.
    /// Implementations may return a superset.
    async fn list_blocking_bookings(
        &self,
        freelancer_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Booking>, StoreError>;

    /// Stores that can check overlap atomically reject a clash with
    /// `StoreError::Conflict`.
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError>;
}
