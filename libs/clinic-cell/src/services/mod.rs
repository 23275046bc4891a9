pub mod calendar;

pub use calendar::{ClinicCalendarService, weekday_number};
