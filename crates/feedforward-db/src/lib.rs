//! Persistence for evaluation requests and their processing results.
//!
//! The pipeline talks to storage only through [`EvaluationRepository`]. The
//! Postgres implementation is used in deployments; the in-memory one backs
//! tests and database-less development runs.

pub mod evaluation;

pub use evaluation::{EvaluationRepository, InMemoryEvaluationRepository, PgEvaluationRepository};
