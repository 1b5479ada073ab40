use crate::config::AppConfig;
use crate::services::availability::AvailabilityService;

pub struct AppState {
    pub config: AppConfig,
    pub availability: AvailabilityService,
}
