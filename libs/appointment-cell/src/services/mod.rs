pub mod booking;
pub mod lifecycle;
pub mod queue;

pub use booking::BookingService;
pub use lifecycle::AppointmentLifecycleService;
pub use queue::QueueService;
