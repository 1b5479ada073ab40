use std::env;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Rest,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Sqlite => "sqlite",
            StoreBackend::Rest => "rest",
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub store_backend: StoreBackend,
    pub rest_url: String,
    pub rest_api_key: String,
    pub store_timeout_secs: u64,
    pub slot_granularity_minutes: u32,
    pub search_horizon_days: u32,
    pub calendar_horizon_days: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "availability.db".to_string(),
            store_backend: StoreBackend::Sqlite,
            rest_url: String::new(),
            rest_api_key: String::new(),
            store_timeout_secs: 10,
            slot_granularity_minutes: 60,
            search_horizon_days: 7,
            calendar_horizon_days: 92,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: positive("PORT").unwrap_or(defaults.port),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            store_backend: match env::var("STORE_BACKEND").as_deref() {
                Ok("rest") => StoreBackend::Rest,
                _ => StoreBackend::Sqlite,
            },
            rest_url: env::var("REST_URL").unwrap_or_default(),
            rest_api_key: env::var("REST_API_KEY").unwrap_or_default(),
            store_timeout_secs: positive("STORE_TIMEOUT_SECS").unwrap_or(defaults.store_timeout_secs),
            slot_granularity_minutes: positive("SLOT_GRANULARITY_MINUTES")
                .unwrap_or(defaults.slot_granularity_minutes),
            search_horizon_days: positive("SEARCH_HORIZON_DAYS")
                .unwrap_or(defaults.search_horizon_days),
            calendar_horizon_days: positive("CALENDAR_HORIZON_DAYS")
                .unwrap_or(defaults.calendar_horizon_days),
        }
    }
}

fn positive<T>(key: &str) -> Option<T>
where
    T: FromStr + PartialOrd + Default,
{
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .filter(|v| *v > T::default())
}
