pub mod extract;
pub mod rules;

pub use extract::{extract_events, extract_events_from_path, MalwareEvent};
pub use rules::{KeywordClassifier, KeywordRule, MalwareType};
