//! Asynchronous scoring workers.

mod orchestrator;

pub use orchestrator::{ScoringJob, WorkerOrchestrator};
