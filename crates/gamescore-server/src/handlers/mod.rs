//! HTTP handlers

pub mod events;
pub mod health;
pub mod public;
pub mod scores;
pub mod stream;

pub use health::health;
