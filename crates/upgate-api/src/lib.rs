//! Upgate API Library
//!
//! This crate provides the HTTP handlers, middleware, and application setup
//! around the upload admission pipeline.

mod handlers;
mod middleware;

pub mod error;
pub mod setup;
pub mod state;

pub use error::{HttpAppError, RejectionResponse};
pub use middleware::identity::ClientIdentity;
pub use state::AppState;
