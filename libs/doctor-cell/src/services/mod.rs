pub mod availability;
pub mod interval;
pub mod slots;

pub use availability::AvailabilityService;
pub use slots::SlotGenerator;
