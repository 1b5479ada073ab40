use chrono::{Datelike, NaiveDate};

use crate::models::{AvailabilityRule, Recurrence, RecurrencePattern};

/// Whether `rule` places a window on `date`.
///
/// Monthly rules anchored on a day the target month lacks (29th-31st) land on
/// that month's last day instead.
pub fn applies_on(rule: &AvailabilityRule, date: NaiveDate) -> bool {
    let anchor = rule.anchor_date();

    let (pattern, until) = match rule.recurrence {
        Recurrence::Once => return date == anchor,
        Recurrence::Repeating { pattern, until } => (pattern, until),
    };

    if date < anchor {
        return false;
    }
    if until.is_some_and(|last| date > last) {
        return false;
    }

    match pattern {
        RecurrencePattern::Weekly => date.weekday() == anchor.weekday(),
        RecurrencePattern::Biweekly => {
            date.weekday() == anchor.weekday() && ((date - anchor).num_days() / 7) % 2 == 0
        }
        RecurrencePattern::Monthly => {
            date.day() == clamped_day(anchor.day(), date.year(), date.month())
        }
    }
}

/// Dates in `[from, to]` on which `rule` applies, in ascending order.
pub fn occurrences_between(rule: &AvailabilityRule, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    from.iter_days()
        .take_while(|d| *d <= to)
        .filter(|d| applies_on(rule, *d))
        .collect()
}

fn clamped_day(anchor_day: u32, year: i32, month: u32) -> u32 {
    anchor_day.min(days_in_month(year, month))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}
