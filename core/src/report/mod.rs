pub mod correlation;
pub mod markdown;

pub use correlation::{build_context, build_prompt, CorrelationReporter, NO_SIMILAR_INCIDENTS};
pub use markdown::{render_incident_report, StoredIncident};
