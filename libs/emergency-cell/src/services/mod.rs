pub mod escalation;

pub use escalation::{
    EmergencyEscalationService, LogSink, NotificationSink, NotificationTarget,
};
