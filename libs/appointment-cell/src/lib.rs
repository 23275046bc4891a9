pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{
    Appointment, AppointmentStatus, BookAppointmentRequest, BookingError,
    CallNextRequest, QueueCounterRow, QueueStatusReport, WaitEstimate,
};
pub use services::booking::BookingService;
pub use services::lifecycle::AppointmentLifecycleService;
pub use services::queue::QueueService;
pub use router::appointment_routes;
