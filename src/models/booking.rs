use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::availability::parse_wall_clock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub freelancer_id: String,
    pub client_id: Option<String>,
    pub category_id: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    /// Pending and confirmed bookings hold their time; everything else frees it.
    pub fn blocks_time(&self) -> bool {
        self.status.blocks_time()
    }

    /// Half-open overlap of `[start_time, end_time)` with `[start, end)`.
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        start < self.end_time && self.start_time < end
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    Disputed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Disputed => "disputed",
        }
    }

    /// Unknown statuses read as `Pending` so they keep blocking their slot.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "confirmed" => BookingStatus::Confirmed,
            "completed" => BookingStatus::Completed,
            "cancelled" | "canceled" => BookingStatus::Cancelled,
            "disputed" => BookingStatus::Disputed,
            _ => BookingStatus::Pending,
        }
    }

    pub fn blocks_time(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

/// A booking row as the stores return it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: String,
    pub freelancer_id: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl TryFrom<BookingRecord> for Booking {
    type Error = String;

    fn try_from(record: BookingRecord) -> Result<Self, Self::Error> {
        let start_time = parse_wall_clock(&record.start_time)
            .ok_or_else(|| format!("booking {}: bad start_time {:?}", record.id, record.start_time))?;
        let end_time = parse_wall_clock(&record.end_time)
            .ok_or_else(|| format!("booking {}: bad end_time {:?}", record.id, record.end_time))?;
        if end_time <= start_time {
            return Err(format!("booking {}: ends before it starts", record.id));
        }

        let now = Utc::now().naive_utc();
        let created_at = record
            .created_at
            .as_deref()
            .and_then(parse_wall_clock)
            .unwrap_or(now);
        let updated_at = record
            .updated_at
            .as_deref()
            .and_then(parse_wall_clock)
            .unwrap_or(created_at);

        Ok(Booking {
            id: record.id,
            freelancer_id: record.freelancer_id,
            client_id: record.client_id,
            category_id: record.category_id,
            start_time,
            end_time,
            status: BookingStatus::parse(record.status.as_deref().unwrap_or("pending")),
            notes: record.notes,
            created_at,
            updated_at,
        })
    }
}

impl From<&Booking> for BookingRecord {
    fn from(booking: &Booking) -> Self {
        BookingRecord {
            id: booking.id.clone(),
            freelancer_id: booking.freelancer_id.clone(),
            client_id: booking.client_id.clone(),
            category_id: booking.category_id.clone(),
            start_time: booking.start_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            end_time: booking.end_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            status: Some(booking.status.as_str().to_string()),
            notes: booking.notes.clone(),
            created_at: Some(booking.created_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            updated_at: Some(booking.updated_at.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}
