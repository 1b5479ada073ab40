use chrono::{NaiveDate, NaiveTime};
use serde::{Serialize, Serializer};

use super::availability::{CertaintyLevel, RecurrencePattern};

/// One distinct time window on a resolved date.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AvailabilityBlock {
    #[serde(serialize_with = "hhmm")]
    pub window_start: NaiveTime,
    #[serde(serialize_with = "hhmm")]
    pub window_end: NaiveTime,
    pub certainty_level: CertaintyLevel,
    #[serde(serialize_with = "hhmm_list")]
    pub available_start_times: Vec<NaiveTime>,
    pub is_recurring: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence_pattern: Option<RecurrencePattern>,
    pub rule_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResolvedDay {
    pub date_key: NaiveDate,
    pub headline_certainty: CertaintyLevel,
    pub blocks: Vec<AvailabilityBlock>,
}

impl ResolvedDay {
    pub fn has_bookable_start(&self) -> bool {
        self.blocks
            .iter()
            .any(|b| !b.available_start_times.is_empty())
    }
}

/// Outcome of resolving one date. `NoAvailability` means no rule applies at
/// all; a `Resolved` day can still have nothing bookable left in it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DayResolution {
    Resolved(ResolvedDay),
    NoAvailability { date: NaiveDate },
}

impl DayResolution {
    pub fn has_bookable_start(&self) -> bool {
        match self {
            DayResolution::Resolved(day) => day.has_bookable_start(),
            DayResolution::NoAvailability { .. } => false,
        }
    }

    pub fn resolved(&self) -> Option<&ResolvedDay> {
        match self {
            DayResolution::Resolved(day) => Some(day),
            DayResolution::NoAvailability { .. } => None,
        }
    }
}

/// Calendar dot for one date.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub headline_certainty: CertaintyLevel,
    pub rule_count: usize,
}

pub fn hhmm<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&time.format("%H:%M"))
}

#[allow(clippy::ptr_arg)]
pub fn hhmm_list<S: Serializer>(times: &Vec<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(times.iter().map(|t| t.format("%H:%M").to_string()))
}
