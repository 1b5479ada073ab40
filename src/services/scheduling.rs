use chrono::Utc;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{Booking, BookingStatus};
use crate::services::availability::{parse_date, parse_time, validate_id, AvailabilityService};

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub freelancer_id: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    pub date: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Create a pending booking for a slot the freelancer currently offers.
///
/// The day is resolved again at request time, under the freelancer's intake
/// lock, so a slot taken since the client loaded the form is rejected instead
/// of double-booked.
pub async fn request_booking(
    service: &AvailabilityService,
    request: BookingRequest,
) -> Result<Booking, AppError> {
    let date = parse_date(&request.date, "date")?;
    let start = parse_time(&request.start, "start")?;
    let end = parse_time(&request.end, "end")?;
    if let Some(client_id) = request.client_id.as_deref() {
        validate_id(client_id, "client_id")?;
    }

    let _intake = service.lock_intake(&request.freelancer_id).await?;

    let category_id = request.category_id.as_deref();
    let end_options = service
        .end_time_options(&request.freelancer_id, category_id, date, start)
        .await?;

    if !end_options.contains(&end) {
        return Err(AppError::SlotUnavailable(format!(
            "{}-{} on {date} is not bookable",
            start.format("%H:%M"),
            end.format("%H:%M")
        )));
    }

    let now = Utc::now().naive_utc();
    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        freelancer_id: request.freelancer_id,
        client_id: request.client_id,
        category_id: request.category_id,
        start_time: date.and_time(start),
        end_time: date.and_time(end),
        status: BookingStatus::Pending,
        notes: request.notes.filter(|n| !n.trim().is_empty()),
        created_at: now,
        updated_at: now,
    };

    service.insert_booking(&booking).await?;

    tracing::info!(
        booking_id = %booking.id,
        freelancer_id = %booking.freelancer_id,
        start = %booking.start_time,
        end = %booking.end_time,
        "booking requested"
    );

    Ok(booking)
}
