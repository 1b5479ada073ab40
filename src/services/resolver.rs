use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};

use crate::models::{
    AvailabilityBlock, AvailabilityRule, Booking, DayResolution, DaySummary, ResolvedDay,
};
use crate::services::certainty::merge_day;
use crate::services::recurrence::{applies_on, occurrences_between};
use crate::services::slots::{exclude_conflicts, generate_start_times, DEFAULT_GRANULARITY_MINUTES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    pub granularity_minutes: u32,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            granularity_minutes: DEFAULT_GRANULARITY_MINUTES,
        }
    }
}

/// Resolve the bookable blocks of one date from a freelancer's rules and
/// bookings. Rules and bookings are expected to be scoped to that freelancer
/// already; bookings outside `date` are harmless.
pub fn resolve_day(
    rules: &[AvailabilityRule],
    bookings: &[Booking],
    date: NaiveDate,
    options: &ResolveOptions,
) -> DayResolution {
    let applicable: Vec<&AvailabilityRule> = rules.iter().filter(|r| applies_on(r, date)).collect();

    let Some(merged) = merge_day(&applicable) else {
        return DayResolution::NoAvailability { date };
    };

    let mut windows: BTreeMap<(NaiveTime, NaiveTime), Vec<&AvailabilityRule>> = BTreeMap::new();
    for rule in &merged.rules {
        windows
            .entry((rule.window_start(), rule.window_end()))
            .or_default()
            .push(*rule);
    }

    let blocks = windows
        .into_iter()
        .filter_map(|((start, end), group)| build_block(date, start, end, &group, bookings, options))
        .collect();

    DayResolution::Resolved(ResolvedDay {
        date_key: date,
        headline_certainty: merged.headline,
        blocks,
    })
}

fn build_block(
    date: NaiveDate,
    window_start: NaiveTime,
    window_end: NaiveTime,
    group: &[&AvailabilityRule],
    bookings: &[Booking],
    options: &ResolveOptions,
) -> Option<AvailabilityBlock> {
    let merged = merge_day(group)?;
    // the strongest rule of an identical window describes the block
    let lead = merged.rules.iter().find(|r| r.certainty == merged.headline)?;

    let available_start_times = if merged.headline.is_bookable() {
        let candidates = generate_start_times(window_start, window_end, options.granularity_minutes);
        exclude_conflicts(date, &candidates, window_end, bookings)
    } else {
        vec![]
    };

    Some(AvailabilityBlock {
        window_start,
        window_end,
        certainty_level: merged.headline,
        available_start_times,
        is_recurring: lead.is_recurring(),
        recurrence_pattern: lead.recurrence_pattern(),
        rule_ids: merged.rules.iter().map(|r| r.id.clone()).collect(),
    })
}

/// First date in `from + 1 ..= from + horizon_days` with at least one bookable
/// start time. The search stops early at the end of the calendar.
pub fn find_next_available(
    rules: &[AvailabilityRule],
    bookings: &[Booking],
    from: NaiveDate,
    horizon_days: u32,
    options: &ResolveOptions,
) -> Option<NaiveDate> {
    from.iter_days()
        .skip(1)
        .take(horizon_days as usize)
        .find(|date| {
            let bookable = resolve_day(rules, bookings, *date, options).has_bookable_start();
            tracing::debug!(%date, bookable, "forward search step");
            bookable
        })
}

/// Headline certainty for every date in `[from, to]` that has any rule.
pub fn mark_calendar(rules: &[AvailabilityRule], from: NaiveDate, to: NaiveDate) -> Vec<DaySummary> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&AvailabilityRule>> = BTreeMap::new();
    for rule in rules {
        for date in occurrences_between(rule, from, to) {
            by_date.entry(date).or_default().push(rule);
        }
    }

    by_date
        .into_iter()
        .filter_map(|(date, applicable)| {
            merge_day(&applicable).map(|merged| DaySummary {
                date,
                headline_certainty: merged.headline,
                rule_count: merged.rules.len(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BookingRecord, BookingStatus, CertaintyLevel, Recurrence, RecurrencePattern,
    };
    use chrono::{Datelike, NaiveDateTime};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn rule(
        id: &str,
        date: &str,
        start: &str,
        end: &str,
        recurrence: Recurrence,
        certainty: CertaintyLevel,
    ) -> AvailabilityRule {
        AvailabilityRule {
            id: id.to_string(),
            freelancer_id: "fl".to_string(),
            category_id: None,
            start_time: dt(&format!("{date} {start}")),
            end_time: dt(&format!("{date} {end}")),
            recurrence,
            certainty,
        }
    }

    fn weekly() -> Recurrence {
        Recurrence::Repeating {
            pattern: RecurrencePattern::Weekly,
            until: None,
        }
    }

    fn monday_rule() -> AvailabilityRule {
        // 2025-06-16 is a Monday
        rule("mon", "2025-06-16", "09:00", "17:00", weekly(), CertaintyLevel::Guaranteed)
    }

    fn booking(start: &str, end: &str, status: BookingStatus) -> Booking {
        Booking::try_from(BookingRecord {
            id: format!("b-{start}"),
            freelancer_id: "fl".to_string(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            status: Some(status.as_str().to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    fn hourly(from: u32, to: u32) -> Vec<NaiveTime> {
        (from..to)
            .map(|h| NaiveTime::from_hms_opt(h, 0, 0).unwrap())
            .collect()
    }

    #[test]
    fn test_weekly_monday_scenario() {
        let rules = vec![monday_rule()];
        let options = ResolveOptions::default();

        let res = resolve_day(&rules, &[], d("2025-06-23"), &options);
        let day = res.resolved().expect("monday resolves");
        assert_eq!(day.headline_certainty, CertaintyLevel::Guaranteed);
        assert_eq!(day.blocks.len(), 1);
        assert_eq!(day.blocks[0].certainty_level, CertaintyLevel::Guaranteed);
        assert_eq!(day.blocks[0].available_start_times, hourly(9, 17));
        assert!(day.blocks[0].is_recurring);
        assert_eq!(day.blocks[0].recurrence_pattern, Some(RecurrencePattern::Weekly));

        let tuesday = d("2025-06-24");
        assert_eq!(
            resolve_day(&rules, &[], tuesday, &options),
            DayResolution::NoAvailability { date: tuesday }
        );
        assert_eq!(
            find_next_available(&rules, &[], tuesday, 7, &options),
            Some(d("2025-06-30"))
        );
    }

    #[test]
    fn test_confirmed_booking_removes_one_start() {
        let rules = vec![monday_rule()];
        let bookings = vec![booking("2025-06-23 13:00", "2025-06-23 14:00", BookingStatus::Confirmed)];

        let res = resolve_day(&rules, &bookings, d("2025-06-23"), &ResolveOptions::default());
        let starts = &res.resolved().unwrap().blocks[0].available_start_times;
        assert_eq!(starts.len(), 7);
        assert!(!starts.contains(&t("13:00")));
        assert!(starts.contains(&t("12:00")));
        assert!(starts.contains(&t("14:00")));
    }

    #[test]
    fn test_cancelled_booking_keeps_start() {
        let rules = vec![monday_rule()];
        let bookings = vec![booking("2025-06-23 11:00", "2025-06-23 12:00", BookingStatus::Cancelled)];
        let res = resolve_day(&rules, &bookings, d("2025-06-23"), &ResolveOptions::default());
        assert!(res.resolved().unwrap().blocks[0]
            .available_start_times
            .contains(&t("11:00")));
    }

    #[test]
    fn test_blocks_per_window_keep_own_certainty() {
        let rules = vec![
            rule("am", "2025-06-16", "09:00", "12:00", weekly(), CertaintyLevel::Guaranteed),
            rule("pm", "2025-06-16", "13:00", "17:00", weekly(), CertaintyLevel::Tentative),
        ];
        let res = resolve_day(&rules, &[], d("2025-06-16"), &ResolveOptions::default());
        let day = res.resolved().unwrap();
        assert_eq!(day.headline_certainty, CertaintyLevel::Guaranteed);
        assert_eq!(day.blocks.len(), 2);
        assert_eq!(day.blocks[0].window_start, t("09:00"));
        assert_eq!(day.blocks[0].certainty_level, CertaintyLevel::Guaranteed);
        assert_eq!(day.blocks[1].window_start, t("13:00"));
        assert_eq!(day.blocks[1].certainty_level, CertaintyLevel::Tentative);
        assert_eq!(day.blocks[1].available_start_times, hourly(13, 17));
    }

    #[test]
    fn test_identical_window_merges_into_one_block() {
        let rules = vec![
            rule("weekly", "2025-06-16", "09:00", "12:00", weekly(), CertaintyLevel::Tentative),
            rule("once", "2025-06-23", "09:00", "12:00", Recurrence::Once, CertaintyLevel::Guaranteed),
        ];
        let res = resolve_day(&rules, &[], d("2025-06-23"), &ResolveOptions::default());
        let day = res.resolved().unwrap();
        assert_eq!(day.blocks.len(), 1);
        let block = &day.blocks[0];
        assert_eq!(block.certainty_level, CertaintyLevel::Guaranteed);
        assert!(!block.is_recurring);
        assert_eq!(block.rule_ids, vec!["weekly".to_string(), "once".to_string()]);
    }

    #[test]
    fn test_unavailable_window_is_shown_but_empty() {
        let rules = vec![rule(
            "off",
            "2025-06-16",
            "09:00",
            "17:00",
            Recurrence::Once,
            CertaintyLevel::Unavailable,
        )];
        let res = resolve_day(&rules, &[], d("2025-06-16"), &ResolveOptions::default());
        let day = res.resolved().unwrap();
        assert_eq!(day.headline_certainty, CertaintyLevel::Unavailable);
        assert_eq!(day.blocks.len(), 1);
        assert!(day.blocks[0].available_start_times.is_empty());
        assert!(!res.has_bookable_start());
    }

    #[test]
    fn test_fully_booked_day_falls_through_to_next() {
        let rules = vec![
            rule("once", "2025-06-17", "09:00", "10:00", Recurrence::Once, CertaintyLevel::Guaranteed),
            monday_rule(),
        ];
        let bookings = vec![booking("2025-06-17 09:00", "2025-06-17 10:00", BookingStatus::Pending)];
        let options = ResolveOptions::default();

        let res = resolve_day(&rules, &bookings, d("2025-06-17"), &options);
        assert!(res.resolved().is_some());
        assert!(!res.has_bookable_start());

        assert_eq!(
            find_next_available(&rules, &bookings, d("2025-06-16"), 7, &options),
            Some(d("2025-06-23"))
        );
    }

    #[test]
    fn test_forward_search_is_bounded() {
        let rules = vec![rule(
            "far",
            "2025-07-30",
            "09:00",
            "17:00",
            Recurrence::Once,
            CertaintyLevel::Guaranteed,
        )];
        let options = ResolveOptions::default();
        assert_eq!(find_next_available(&rules, &[], d("2025-06-16"), 7, &options), None);
        assert_eq!(find_next_available(&[], &[], d("2025-06-16"), 7, &options), None);
    }

    #[test]
    fn test_forward_search_skips_from_date() {
        let rules = vec![monday_rule()];
        assert_eq!(
            find_next_available(&rules, &[], d("2025-06-16"), 7, &ResolveOptions::default()),
            Some(d("2025-06-23"))
        );
        assert_eq!(
            find_next_available(&rules, &[], d("2025-06-16"), 6, &ResolveOptions::default()),
            None
        );
    }

    #[test]
    fn test_forward_search_stops_at_end_of_calendar() {
        let rules = vec![monday_rule()];
        let options = ResolveOptions::default();
        assert_eq!(find_next_available(&rules, &[], NaiveDate::MAX, 7, &options), None);

        let near_end = NaiveDate::MAX - chrono::Duration::days(10);
        let found = find_next_available(&rules, &[], near_end, 31, &options).unwrap();
        assert!(found > near_end && found <= NaiveDate::MAX);
        assert_eq!(found.weekday(), chrono::Weekday::Mon);
    }

    #[test]
    fn test_mark_calendar() {
        let rules = vec![
            monday_rule(),
            rule("tue", "2025-06-17", "09:00", "12:00", Recurrence::Once, CertaintyLevel::Tentative),
            rule("mon-off", "2025-06-23", "18:00", "20:00", Recurrence::Once, CertaintyLevel::Unavailable),
        ];
        let marks = mark_calendar(&rules, d("2025-06-15"), d("2025-06-30"));
        let dates: Vec<NaiveDate> = marks.iter().map(|m| m.date).collect();
        assert_eq!(
            dates,
            vec![d("2025-06-16"), d("2025-06-17"), d("2025-06-23"), d("2025-06-30")]
        );
        assert_eq!(marks[1].headline_certainty, CertaintyLevel::Tentative);
        assert_eq!(marks[2].headline_certainty, CertaintyLevel::Guaranteed);
        assert_eq!(marks[2].rule_count, 2);
    }
}
