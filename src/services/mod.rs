pub mod availability;
pub mod certainty;
pub mod recurrence;
pub mod resolver;
pub mod scheduling;
pub mod slots;
pub mod store;
