//! Feedforward Worker
//!
//! Delivers processing tasks to the task handler, either through an
//! in-process worker pool or by handing them to an external dispatcher over HTTP.

pub mod context;
pub mod dispatcher;
pub mod http;
pub mod queue;

pub use context::TaskHandlerContext;
pub use dispatcher::{DispatchError, TaskDispatcher};
pub use http::HttpTaskDispatcher;
pub use queue::{LocalTaskQueue, TaskQueueConfig, TaskReceiver};
