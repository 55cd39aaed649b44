pub mod data_deletion;
pub mod evaluations;
pub mod metrics;
pub mod tasks;
