//! Error-driven schema discovery.
//!
//! A single-threaded orchestrator owns the object graph and a priority
//! queue of discovery jobs. Each job fans out to a runner that fires
//! deliberately malformed probes at the endpoint and feeds structured
//! results back over a channel; the orchestrator folds the results into
//! the graph and schedules the follow-up work they imply.

pub mod job;
pub mod matchers;
pub mod orchestrator;
pub mod result;
pub mod runners;
pub mod state;
pub mod words;

#[cfg(test)]
mod tests;

pub use job::{Job, JobKind, JobQueue};
pub use orchestrator::{Discovery, DiscoveryOutcome};
pub use result::{DiscoveryResult, Location};
pub use state::SharedState;
