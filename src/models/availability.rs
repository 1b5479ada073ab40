use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// How sure a freelancer is that a window will hold.
///
/// Variants are declared in ascending precedence so the derived `Ord`
/// gives `Guaranteed > Tentative > Unavailable`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CertaintyLevel {
    Unavailable,
    Tentative,
    Guaranteed,
}

impl CertaintyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertaintyLevel::Unavailable => "unavailable",
            CertaintyLevel::Tentative => "tentative",
            CertaintyLevel::Guaranteed => "guaranteed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "guaranteed" => Some(CertaintyLevel::Guaranteed),
            "tentative" => Some(CertaintyLevel::Tentative),
            "unavailable" => Some(CertaintyLevel::Unavailable),
            _ => None,
        }
    }

    pub fn is_bookable(&self) -> bool {
        !matches!(self, CertaintyLevel::Unavailable)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    Weekly,
    Biweekly,
    Monthly,
}

impl RecurrencePattern {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Some(RecurrencePattern::Weekly),
            "biweekly" => Some(RecurrencePattern::Biweekly),
            "monthly" => Some(RecurrencePattern::Monthly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recurrence {
    Once,
    Repeating {
        pattern: RecurrencePattern,
        /// Last date (inclusive) on which the rule still applies.
        until: Option<NaiveDate>,
    },
}

/// A validated availability rule. Built from an [`AvailabilityRecord`] at the
/// store boundary; everything past that point can rely on its invariants:
/// `end_time > start_time` and both on the same calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityRule {
    pub id: String,
    pub freelancer_id: String,
    pub category_id: Option<String>,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub recurrence: Recurrence,
    pub certainty: CertaintyLevel,
}

impl AvailabilityRule {
    pub fn anchor_date(&self) -> NaiveDate {
        self.start_time.date()
    }

    pub fn window_start(&self) -> NaiveTime {
        self.start_time.time()
    }

    pub fn window_end(&self) -> NaiveTime {
        self.end_time.time()
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self.recurrence, Recurrence::Repeating { .. })
    }

    pub fn recurrence_pattern(&self) -> Option<RecurrencePattern> {
        match self.recurrence {
            Recurrence::Once => None,
            Recurrence::Repeating { pattern, .. } => Some(pattern),
        }
    }

    pub fn applies_to_category(&self, category_id: Option<&str>) -> bool {
        match (category_id, self.category_id.as_deref()) {
            (None, _) | (_, None) => true,
            (Some(wanted), Some(own)) => wanted == own,
        }
    }
}

/// A rule as the stores hand it over: loosely typed, every field a string.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub id: String,
    pub freelancer_id: String,
    #[serde(default)]
    pub category_id: Option<String>,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub is_recurring: Option<bool>,
    #[serde(default)]
    pub recurrence_pattern: Option<String>,
    #[serde(default)]
    pub recurrence_end_date: Option<String>,
    #[serde(default)]
    pub certainty_level: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RuleError {
    #[error("invalid datetime in {field}: {value:?}")]
    InvalidDatetime { field: &'static str, value: String },

    #[error("window must end after it starts")]
    EmptyWindow,

    #[error("window must start and end on the same day")]
    SpansDays,

    #[error("recurring rule has no recurrence pattern")]
    MissingPattern,

    #[error("unknown recurrence pattern: {0}")]
    UnknownPattern(String),

    #[error("unknown certainty level: {0}")]
    UnknownCertainty(String),
}

impl TryFrom<AvailabilityRecord> for AvailabilityRule {
    type Error = RuleError;

    fn try_from(record: AvailabilityRecord) -> Result<Self, Self::Error> {
        let start_time =
            parse_wall_clock(&record.start_time).ok_or_else(|| RuleError::InvalidDatetime {
                field: "start_time",
                value: record.start_time.clone(),
            })?;
        let end_time =
            parse_wall_clock(&record.end_time).ok_or_else(|| RuleError::InvalidDatetime {
                field: "end_time",
                value: record.end_time.clone(),
            })?;

        if start_time.date() != end_time.date() {
            return Err(RuleError::SpansDays);
        }
        if end_time <= start_time {
            return Err(RuleError::EmptyWindow);
        }

        // A one-time rule may still carry a stale pattern from the edit form; it is ignored.
        let recurrence = if record.is_recurring.unwrap_or(false) {
            let raw = record
                .recurrence_pattern
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .ok_or(RuleError::MissingPattern)?;
            let pattern = RecurrencePattern::parse(raw)
                .ok_or_else(|| RuleError::UnknownPattern(raw.to_string()))?;
            let until = match record
                .recurrence_end_date
                .as_deref()
                .filter(|d| !d.trim().is_empty())
            {
                Some(raw) => Some(parse_calendar_date(raw).ok_or_else(|| {
                    RuleError::InvalidDatetime {
                        field: "recurrence_end_date",
                        value: raw.to_string(),
                    }
                })?),
                None => None,
            };
            Recurrence::Repeating { pattern, until }
        } else {
            Recurrence::Once
        };

        let certainty = match record.certainty_level.as_deref() {
            None => CertaintyLevel::Guaranteed,
            Some(raw) => CertaintyLevel::parse(raw)
                .ok_or_else(|| RuleError::UnknownCertainty(raw.to_string()))?,
        };

        Ok(AvailabilityRule {
            id: record.id,
            freelancer_id: record.freelancer_id,
            category_id: record.category_id.filter(|c| !c.is_empty()),
            start_time,
            end_time,
            recurrence,
            certainty,
        })
    }
}

/// Parse a stored timestamp as a wall-clock datetime. Offsets are dropped, not
/// converted: the digits as written are the local time the freelancer entered.
pub fn parse_wall_clock(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Parse a `YYYY-MM-DD` date, tolerating a trailing time component.
pub fn parse_calendar_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_wall_clock(s).map(|dt| dt.date()))
}
