use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};
use tokio::sync::OwnedMutexGuard;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::{
    AvailabilityRecord, AvailabilityRule, Booking, DayResolution, DaySummary, Freelancer,
};
use crate::services::resolver::{self, ResolveOptions};
use crate::services::slots;
use crate::services::store::{AvailabilityStore, BookingStore, StoreError};

pub const MAX_SEARCH_HORIZON_DAYS: u32 = 31;
const MAX_ID_LEN: usize = 64;
const MAX_YEAR: i32 = 9999;

/// Resolves availability for one freelancer at a time against the stores.
/// Holds no per-request state; one instance serves all requests.
pub struct AvailabilityService {
    profiles: Arc<dyn AvailabilityStore>,
    bookings: Arc<dyn BookingStore>,
    options: ResolveOptions,
    timeout: Duration,
    search_horizon_days: u32,
    calendar_horizon_days: u32,
    intake_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl AvailabilityService {
    pub fn new(
        profiles: Arc<dyn AvailabilityStore>,
        bookings: Arc<dyn BookingStore>,
        config: &AppConfig,
    ) -> Self {
        Self {
            profiles,
            bookings,
            options: ResolveOptions {
                granularity_minutes: config.slot_granularity_minutes,
            },
            timeout: Duration::from_secs(config.store_timeout_secs),
            search_horizon_days: config.search_horizon_days.min(MAX_SEARCH_HORIZON_DAYS),
            calendar_horizon_days: config.calendar_horizon_days,
            intake_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Exclusive intake access to one freelancer's calendar. Held from the
    /// availability check through the insert so two requests cannot both
    /// claim the same slot.
    pub async fn lock_intake(&self, freelancer_id: &str) -> Result<OwnedMutexGuard<()>, AppError> {
        validate_id(freelancer_id, "freelancer_id")?;
        let lock = {
            let mut locks = self
                .intake_locks
                .lock()
                .map_err(|_| AppError::StoreUnavailable("intake lock poisoned".to_string()))?;
            locks.entry(freelancer_id.to_string()).or_default().clone()
        };
        Ok(lock.lock_owned().await)
    }

    pub async fn resolve_day(
        &self,
        freelancer_id: &str,
        category_id: Option<&str>,
        date: NaiveDate,
    ) -> Result<DayResolution, AppError> {
        let (resolution, _) = self.load_day(freelancer_id, category_id, date).await?;
        Ok(resolution)
    }

    pub async fn find_next_available(
        &self,
        freelancer_id: &str,
        category_id: Option<&str>,
        from: NaiveDate,
        horizon_days: Option<u32>,
    ) -> Result<NaiveDate, AppError> {
        validate_scope(freelancer_id, category_id)?;
        let horizon_days = horizon_days.unwrap_or(self.search_horizon_days);
        if horizon_days == 0 || horizon_days > MAX_SEARCH_HORIZON_DAYS {
            return Err(AppError::InvalidInput(format!(
                "horizon_days must be between 1 and {MAX_SEARCH_HORIZON_DAYS}"
            )));
        }

        let range_end = from
            .checked_add_days(Days::new(u64::from(horizon_days) + 1))
            .ok_or_else(|| {
                AppError::InvalidInput(format!("cannot search {horizon_days} days past {from}"))
            })?;
        let range_start = day_start(from.succ_opt().unwrap_or(from));
        let range_end = day_start(range_end);

        let (_, rules, bookings) = tokio::try_join!(
            self.require_freelancer(freelancer_id),
            self.load_rules(freelancer_id, category_id),
            self.load_bookings(freelancer_id, range_start, range_end),
        )?;

        match resolver::find_next_available(&rules, &bookings, from, horizon_days, &self.options) {
            Some(date) => {
                tracing::info!(freelancer_id, %from, %date, "found next available date");
                Ok(date)
            }
            None => {
                tracing::info!(freelancer_id, %from, horizon_days, "forward search exhausted");
                Err(AppError::HorizonExhausted { from, horizon_days })
            }
        }
    }

    pub async fn mark_calendar(
        &self,
        freelancer_id: &str,
        category_id: Option<&str>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DaySummary>, AppError> {
        validate_scope(freelancer_id, category_id)?;
        if to < from {
            return Err(AppError::InvalidInput("`to` must not be before `from`".to_string()));
        }
        let span = (to - from).num_days() + 1;
        if span > i64::from(self.calendar_horizon_days) {
            return Err(AppError::InvalidInput(format!(
                "calendar range may span at most {} days",
                self.calendar_horizon_days
            )));
        }

        let (_, rules) = tokio::try_join!(
            self.require_freelancer(freelancer_id),
            self.load_rules(freelancer_id, category_id),
        )?;

        Ok(resolver::mark_calendar(&rules, from, to))
    }

    /// End times offered for a start time on `date`. The start must be one the
    /// resolved day actually offers.
    pub async fn end_time_options(
        &self,
        freelancer_id: &str,
        category_id: Option<&str>,
        date: NaiveDate,
        start: NaiveTime,
    ) -> Result<Vec<NaiveTime>, AppError> {
        let (resolution, bookings) = self.load_day(freelancer_id, category_id, date).await?;

        let window_end = resolution
            .resolved()
            .into_iter()
            .flat_map(|day| day.blocks.iter())
            .filter(|block| block.available_start_times.contains(&start))
            .map(|block| block.window_end)
            .max()
            .ok_or_else(|| {
                AppError::SlotUnavailable(format!(
                    "{} is not an available start time on {date}",
                    start.format("%H:%M")
                ))
            })?;

        Ok(slots::end_time_options(date, start, window_end, &bookings))
    }

    pub async fn insert_booking(&self, booking: &Booking) -> Result<(), AppError> {
        self.fetch("booking insert", self.bookings.insert_booking(booking))
            .await
    }

    async fn load_day(
        &self,
        freelancer_id: &str,
        category_id: Option<&str>,
        date: NaiveDate,
    ) -> Result<(DayResolution, Vec<Booking>), AppError> {
        validate_scope(freelancer_id, category_id)?;

        let from = day_start(date);
        let to = day_start(date.succ_opt().unwrap_or(date));

        let (_, rules, bookings) = tokio::try_join!(
            self.require_freelancer(freelancer_id),
            self.load_rules(freelancer_id, category_id),
            self.load_bookings(freelancer_id, from, to),
        )?;

        let resolution = resolver::resolve_day(&rules, &bookings, date, &self.options);
        tracing::info!(
            freelancer_id,
            category_id,
            %date,
            rules = rules.len(),
            bookings = bookings.len(),
            blocks = resolution.resolved().map(|d| d.blocks.len()).unwrap_or(0),
            headline = resolution.resolved().map(|d| d.headline_certainty.as_str()),
            "resolved day"
        );
        Ok((resolution, bookings))
    }

    async fn require_freelancer(&self, freelancer_id: &str) -> Result<Freelancer, AppError> {
        self.fetch("profile", self.profiles.get_freelancer(freelancer_id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("freelancer {freelancer_id}")))
    }

    async fn load_rules(
        &self,
        freelancer_id: &str,
        category_id: Option<&str>,
    ) -> Result<Vec<AvailabilityRule>, AppError> {
        let records = self
            .fetch("rules", self.profiles.list_rules(freelancer_id, category_id))
            .await?;
        Ok(into_rules(records, freelancer_id, category_id))
    }

    async fn load_bookings(
        &self,
        freelancer_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<Booking>, AppError> {
        let mut bookings = self
            .fetch(
                "bookings",
                self.bookings.list_blocking_bookings(freelancer_id, from, to),
            )
            .await?;
        // bookings block across every category of the freelancer
        bookings.retain(|b| b.freelancer_id == freelancer_id && b.blocks_time());
        Ok(bookings)
    }

    async fn fetch<T, F>(&self, what: &str, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(|e| {
                tracing::warn!(error = %e, what, "store request failed");
                AppError::from(e)
            }),
            Err(_) => {
                tracing::warn!(what, timeout_secs = self.timeout.as_secs(), "store request timed out");
                Err(AppError::StoreUnavailable(format!(
                    "{what} request timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

/// Map store records into validated rules, dropping the malformed ones.
fn into_rules(
    records: Vec<AvailabilityRecord>,
    freelancer_id: &str,
    category_id: Option<&str>,
) -> Vec<AvailabilityRule> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record.id.clone();
            match AvailabilityRule::try_from(record) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::warn!(rule_id = %id, error = %e, "skipping malformed availability rule");
                    None
                }
            }
        })
        .filter(|rule| rule.freelancer_id == freelancer_id && rule.applies_to_category(category_id))
        .collect()
}

fn day_start(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn validate_id(value: &str, field: &str) -> Result<(), AppError> {
    let valid = !value.is_empty()
        && value.len() <= MAX_ID_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!("malformed {field}: {value:?}")))
    }
}

fn validate_scope(freelancer_id: &str, category_id: Option<&str>) -> Result<(), AppError> {
    validate_id(freelancer_id, "freelancer_id")?;
    if let Some(category) = category_id {
        validate_id(category, "category_id")?;
    }
    Ok(())
}

/// Parse a calendar date given as `YYYY-MM-DD`, years 1 through 9999.
pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .ok()
        .filter(|date| (1..=MAX_YEAR).contains(&date.year()))
        .ok_or_else(|| {
            AppError::InvalidInput(format!("malformed {field}: {value:?}, expected YYYY-MM-DD"))
        })
}

/// Parse a time of day given as `HH:MM`.
pub fn parse_time(value: &str, field: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| AppError::InvalidInput(format!("malformed {field}: {value:?}, expected HH:MM")))
}
