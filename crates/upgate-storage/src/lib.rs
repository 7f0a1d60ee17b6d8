//! Upgate Storage Library
//!
//! This crate provides the byte-stream storage collaborator used by the
//! admission pipeline: the `Storage` trait and a local filesystem backend.
//!
//! # Storage key format
//!
//! Keys are the generated safe names themselves (flat layout). Keys must not
//! contain `..`, a path separator or a leading `/`; every backend rejects
//! such keys with `StorageError::InvalidKey`.

pub mod factory;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use local::LocalStorage;
pub use traits::{Storage, StorageError, StorageResult, StoredObject, StoredReader};
