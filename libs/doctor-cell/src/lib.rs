pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{DoctorError, Slot};
pub use services::{AvailabilityService, SlotGenerator};
