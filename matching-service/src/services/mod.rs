//! Services module for matching-service.

pub mod database;
pub mod embeddings;
pub mod engine;
pub mod metrics;
pub mod policy;
pub mod retriever;
pub mod scoring;
pub mod vector_index;

pub use database::Database;
pub use engine::MatchingEngine;
pub use metrics::{get_metrics, init_metrics, record_error, record_reconcile_action};
pub use retriever::CandidateRetriever;
