//! Feedforward API Library
//!
//! HTTP surface, intake and processing services, and application setup.

mod api_doc;
pub mod constants;
mod handlers;
pub mod services;
pub mod setup;
mod task_dispatch;
pub mod task_handlers;
mod utils;

pub mod error;
pub mod state;

pub use error::ErrorResponse;
pub use feedforward_worker::{LocalTaskQueue, TaskQueueConfig};
pub use task_handlers::{EvaluationTaskHandler, TaskHandler};
