pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{
    ClinicSettings, ClinicHoliday, ClinicError,
    UpdateClinicSettingsRequest, CreateHolidayRequest,
};
pub use services::calendar::{ClinicCalendarService, weekday_number};
pub use router::clinic_routes;
