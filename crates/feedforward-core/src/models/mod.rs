//! Data models for the submission pipeline

mod evaluation_request;
mod file_reference;
mod processing_result;
mod task;

pub use evaluation_request::*;
pub use file_reference::*;
pub use processing_result::*;
pub use task::*;
