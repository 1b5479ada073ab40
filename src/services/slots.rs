use chrono::{Duration, NaiveDate, NaiveTime, Timelike};

use crate::models::Booking;

/// Shortest bookable slot. Start times are only offered if this much time
/// fits before the window closes, and end times are offered in these steps.
pub const MIN_SLOT_MINUTES: i64 = 60;

pub const DEFAULT_GRANULARITY_MINUTES: u32 = 60;

/// Start times from `window_start`, stepping by `granularity_minutes`, while a
/// minimum slot still fits before `window_end`.
pub fn generate_start_times(
    window_start: NaiveTime,
    window_end: NaiveTime,
    granularity_minutes: u32,
) -> Vec<NaiveTime> {
    let step = i64::from(granularity_minutes.max(1)) * 60;
    let min_slot = MIN_SLOT_MINUTES * 60;
    let end = seconds(window_end);

    let mut times = vec![];
    let mut t = seconds(window_start);
    while t + min_slot <= end {
        if let Some(time) = from_seconds(t) {
            times.push(time);
        }
        t += step;
    }
    times
}

/// Drop start times whose minimum slot collides with a pending or confirmed
/// booking, or no longer fits before `window_end`.
pub fn exclude_conflicts(
    date: NaiveDate,
    start_times: &[NaiveTime],
    window_end: NaiveTime,
    bookings: &[Booking],
) -> Vec<NaiveTime> {
    let window_end = date.and_time(window_end);
    start_times
        .iter()
        .copied()
        .filter(|t| {
            let slot_start = date.and_time(*t);
            let slot_end = slot_start + Duration::minutes(MIN_SLOT_MINUTES);
            slot_end <= window_end
                && !bookings
                    .iter()
                    .any(|b| b.blocks_time() && b.overlaps(slot_start, slot_end))
        })
        .collect()
}

/// End times the booking form offers for `start`: whole slots up to
/// `window_end`, cut off before the first one that would run into a booking.
pub fn end_time_options(
    date: NaiveDate,
    start: NaiveTime,
    window_end: NaiveTime,
    bookings: &[Booking],
) -> Vec<NaiveTime> {
    let slot_start = date.and_time(start);
    let window_end = date.and_time(window_end);

    (1..)
        .map(|n| slot_start + Duration::minutes(MIN_SLOT_MINUTES * n))
        .take_while(|end| *end <= window_end)
        .take_while(|end| {
            !bookings
                .iter()
                .any(|b| b.blocks_time() && b.overlaps(slot_start, *end))
        })
        .map(|end| end.time())
        .collect()
}

fn seconds(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight())
}

fn from_seconds(secs: i64) -> Option<NaiveTime> {
    u32::try_from(secs)
        .ok()
        .and_then(|s| NaiveTime::from_num_seconds_from_midnight_opt(s, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingRecord, BookingStatus};

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn monday() -> NaiveDate {
        // 2025-06-16 is a Monday
        NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()
    }

    fn booking(start: &str, end: &str, status: BookingStatus) -> Booking {
        Booking::try_from(BookingRecord {
            id: format!("b-{start}"),
            freelancer_id: "fl".to_string(),
            start_time: format!("2025-06-16 {start}"),
            end_time: format!("2025-06-16 {end}"),
            status: Some(status.as_str().to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    fn times(list: &[&str]) -> Vec<NaiveTime> {
        list.iter().map(|s| t(s)).collect()
    }

    #[test]
    fn test_one_hour_window_yields_one_start() {
        assert_eq!(generate_start_times(t("09:00"), t("10:00"), 60), times(&["09:00"]));
    }

    #[test]
    fn test_short_window_yields_nothing() {
        assert!(generate_start_times(t("09:00"), t("09:59"), 60).is_empty());
        assert!(generate_start_times(t("09:00"), t("09:30"), 15).is_empty());
    }

    #[test]
    fn test_full_day_window() {
        let starts = generate_start_times(t("09:00"), t("17:00"), 60);
        assert_eq!(starts.len(), 8);
        assert_eq!(starts.first(), Some(&t("09:00")));
        assert_eq!(starts.last(), Some(&t("16:00")));
    }

    #[test]
    fn test_sub_hour_granularity() {
        assert_eq!(
            generate_start_times(t("09:00"), t("10:30"), 30),
            times(&["09:00", "09:30"])
        );
    }

    #[test]
    fn test_off_hour_window_start() {
        assert_eq!(
            generate_start_times(t("09:30"), t("12:00"), 60),
            times(&["09:30", "10:30"])
        );
    }

    #[test]
    fn test_confirmed_booking_excludes_only_its_hour() {
        let starts = generate_start_times(t("09:00"), t("17:00"), 60);
        let bookings = vec![booking("11:00", "12:00", BookingStatus::Confirmed)];
        let left = exclude_conflicts(monday(), &starts, t("17:00"), &bookings);
        assert!(!left.contains(&t("11:00")));
        assert!(left.contains(&t("10:00")));
        assert!(left.contains(&t("12:00")));
        assert_eq!(left.len(), 7);
    }

    #[test]
    fn test_pending_booking_blocks_partial_overlap() {
        let starts = generate_start_times(t("09:00"), t("17:00"), 30);
        let bookings = vec![booking("11:15", "11:45", BookingStatus::Pending)];
        let left = exclude_conflicts(monday(), &starts, t("17:00"), &bookings);
        assert!(left.contains(&t("10:00")));
        assert!(!left.contains(&t("10:30")));
        assert!(!left.contains(&t("11:00")));
        assert!(!left.contains(&t("11:30")));
        assert!(left.contains(&t("12:00")));
    }

    #[test]
    fn test_cancelled_and_completed_do_not_block() {
        let starts = generate_start_times(t("09:00"), t("17:00"), 60);
        let bookings = vec![
            booking("11:00", "12:00", BookingStatus::Cancelled),
            booking("13:00", "14:00", BookingStatus::Completed),
            booking("15:00", "16:00", BookingStatus::Disputed),
        ];
        let left = exclude_conflicts(monday(), &starts, t("17:00"), &bookings);
        assert_eq!(left, starts);
    }

    #[test]
    fn test_booking_on_other_day_ignored() {
        let starts = generate_start_times(t("09:00"), t("12:00"), 60);
        let other_day = Booking::try_from(BookingRecord {
            id: "b".to_string(),
            freelancer_id: "fl".to_string(),
            start_time: "2025-06-17 09:00".to_string(),
            end_time: "2025-06-17 12:00".to_string(),
            status: Some("confirmed".to_string()),
            ..Default::default()
        })
        .unwrap();
        let left = exclude_conflicts(monday(), &starts, t("12:00"), &[other_day]);
        assert_eq!(left, starts);
    }

    #[test]
    fn test_end_time_options_stop_at_booking() {
        let bookings = vec![booking("13:00", "14:00", BookingStatus::Confirmed)];
        assert_eq!(
            end_time_options(monday(), t("10:00"), t("17:00"), &bookings),
            times(&["11:00", "12:00", "13:00"])
        );
        assert_eq!(
            end_time_options(monday(), t("14:00"), t("17:00"), &bookings),
            times(&["15:00", "16:00", "17:00"])
        );
    }

    #[test]
    fn test_end_time_options_respect_window() {
        assert_eq!(
            end_time_options(monday(), t("15:30"), t("17:00"), &[]),
            times(&["16:30"])
        );
        assert!(end_time_options(monday(), t("16:30"), t("17:00"), &[]).is_empty());
    }
}
