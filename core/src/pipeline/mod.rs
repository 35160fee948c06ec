//! The two end-to-end flows, wired from injected clients.

pub mod brute_force;
pub mod malware;
pub mod state;

pub use brute_force::{BruteForceOutcome, BruteForcePipeline};
pub use malware::{MalwareOutcome, MalwarePipeline, NO_MALWARE_EVENTS_MESSAGE};
pub use state::{PipelineStage, StageTracker};
