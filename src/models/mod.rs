pub mod availability;
pub mod booking;
pub mod freelancer;
pub mod resolved;

pub use availability::{
    AvailabilityRecord, AvailabilityRule, CertaintyLevel, Recurrence, RecurrencePattern,
    RuleError,
};
pub use booking::{Booking, BookingRecord, BookingStatus};
pub use freelancer::Freelancer;
pub use resolved::{AvailabilityBlock, DayResolution, DaySummary, ResolvedDay};
