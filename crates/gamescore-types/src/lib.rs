//! GameScore Types - Pure type definitions
//!
//! This crate contains only plain data types shared by the core library and
//! the server, with no async runtime dependencies.

pub mod access;
pub mod api;
pub mod event;
pub mod message;
pub mod score;

pub use access::*;
pub use api::*;
pub use event::*;
pub use message::*;
pub use score::*;

use thiserror::Error;

/// Input validation failure for request payloads
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
