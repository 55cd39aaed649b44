//! Feedforward Storage Library
//!
//! Object storage for uploaded submission documents behind the `Storage`
//! trait, with a local filesystem backend and an in-memory backend.
//!
//! # Storage key format
//!
//! Every uploaded document is stored under `submissions/{uuid}.{ext}`. The
//! extension comes from the validated file kind, never from the client's
//! filename. Keys must not contain `..` or a leading `/`.

pub mod factory;
pub mod keys;
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use feedforward_core::StorageBackend;
pub use keys::submission_file_key;
pub use local::LocalStorage;
pub use memory::InMemoryStorage;
pub use traits::{Storage, StorageError, StorageResult};
