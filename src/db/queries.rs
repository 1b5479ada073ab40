use chrono::{NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{AvailabilityRecord, Booking, BookingRecord, BookingStatus, Freelancer};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── Freelancers ──

pub fn get_freelancer(conn: &Connection, id: &str) -> anyhow::Result<Option<Freelancer>> {
    let result = conn.query_row(
        "SELECT id, display_name FROM freelancers WHERE id = ?1",
        params![id],
        |row| {
            Ok(Freelancer {
                id: row.get(0)?,
                display_name: row.get(1)?,
            })
        },
    );

    match result {
        Ok(freelancer) => Ok(Some(freelancer)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn save_freelancer(conn: &Connection, freelancer: &Freelancer) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO freelancers (id, display_name) VALUES (?1, ?2)
         ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name",
        params![freelancer.id, freelancer.display_name],
    )?;
    Ok(())
}

// ── Availability rules ──

pub fn create_rule(conn: &Connection, rule: &AvailabilityRecord) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO availability_rules (id, freelancer_id, category_id, start_time, end_time, is_recurring, recurrence_pattern, recurrence_end_date, certainty_level)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            rule.id,
            rule.freelancer_id,
            rule.category_id,
            rule.start_time,
            rule.end_time,
            rule.is_recurring.unwrap_or(false) as i32,
            rule.recurrence_pattern,
            rule.recurrence_end_date,
            rule.certainty_level.as_deref().unwrap_or("guaranteed"),
        ],
    )?;
    Ok(())
}

/// Rules for a freelancer. With a category, only that category's rules and
/// the uncategorised ones are returned.
pub fn get_rules_for_freelancer(
    conn: &Connection,
    freelancer_id: &str,
    category_id: Option<&str>,
) -> anyhow::Result<Vec<AvailabilityRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, freelancer_id, category_id, start_time, end_time, is_recurring, recurrence_pattern, recurrence_end_date, certainty_level
         FROM availability_rules
         WHERE freelancer_id = ?1 AND (?2 IS NULL OR category_id IS NULL OR category_id = ?2)
         ORDER BY start_time ASC, id ASC",
    )?;

    let rows = stmt.query_map(params![freelancer_id, category_id], |row| {
        Ok(AvailabilityRecord {
            id: row.get(0)?,
            freelancer_id: row.get(1)?,
            category_id: row.get(2)?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            is_recurring: Some(row.get::<_, i64>(5)? != 0),
            recurrence_pattern: row.get(6)?,
            recurrence_end_date: row.get(7)?,
            certainty_level: row.get(8)?,
        })
    })?;

    let mut rules = vec![];
    for row in rows {
        rules.push(row?);
    }
    Ok(rules)
}

// ── Bookings ──

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO bookings (id, freelancer_id, client_id, category_id, start_time, end_time, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            booking.id,
            booking.freelancer_id,
            booking.client_id,
            booking.category_id,
            booking.start_time.format(TS_FORMAT).to_string(),
            booking.end_time.format(TS_FORMAT).to_string(),
            booking.status.as_str(),
            booking.notes,
            booking.created_at.format(TS_FORMAT).to_string(),
            booking.updated_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

/// Insert `booking` unless a pending or confirmed booking of the same
/// freelancer overlaps it. Returns whether the row was written.
pub fn create_booking_if_free(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let inserted = conn.execute(
        "INSERT INTO bookings (id, freelancer_id, client_id, category_id, start_time, end_time, status, notes, created_at, updated_at)
         SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10
         WHERE NOT EXISTS (
             SELECT 1 FROM bookings
             WHERE freelancer_id = ?2 AND start_time < ?6 AND end_time > ?5
               AND status IN ('pending', 'confirmed')
         )",
        params![
            booking.id,
            booking.freelancer_id,
            booking.client_id,
            booking.category_id,
            booking.start_time.format(TS_FORMAT).to_string(),
            booking.end_time.format(TS_FORMAT).to_string(),
            booking.status.as_str(),
            booking.notes,
            booking.created_at.format(TS_FORMAT).to_string(),
            booking.updated_at.format(TS_FORMAT).to_string(),
        ],
    )?;
    Ok(inserted == 1)
}

/// Pending and confirmed bookings of a freelancer intersecting `[start, end)`.
pub fn get_blocking_bookings_in_range(
    conn: &Connection,
    freelancer_id: &str,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
) -> anyhow::Result<Vec<BookingRecord>> {
    let start_str = start.format(TS_FORMAT).to_string();
    let end_str = end.format(TS_FORMAT).to_string();

    let mut stmt = conn.prepare(
        "SELECT id, freelancer_id, client_id, category_id, start_time, end_time, status, notes, created_at, updated_at
         FROM bookings
         WHERE freelancer_id = ?1 AND start_time < ?3 AND end_time > ?2
           AND status IN ('pending', 'confirmed')
         ORDER BY start_time ASC",
    )?;

    let rows = stmt.query_map(params![freelancer_id, start_str, end_str], parse_booking_row)?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<BookingRecord>> {
    let result = conn.query_row(
        "SELECT id, freelancer_id, client_id, category_id, start_time, end_time, status, notes, created_at, updated_at
         FROM bookings WHERE id = ?1",
        params![id],
        parse_booking_row,
    );

    match result {
        Ok(booking) => Ok(Some(booking)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let now = Utc::now().naive_utc().format(TS_FORMAT).to_string();
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now, id],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> rusqlite::Result<BookingRecord> {
    Ok(BookingRecord {
        id: row.get(0)?,
        freelancer_id: row.get(1)?,
        client_id: row.get(2)?,
        category_id: row.get(3)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        status: row.get(6)?,
        notes: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
