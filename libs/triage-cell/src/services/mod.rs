pub mod classifier;
pub mod keywords;
pub mod triage;

pub use classifier::{RemoteClassifier, SymptomClassifier};
pub use keywords::KeywordClassifier;
pub use triage::TriageService;
