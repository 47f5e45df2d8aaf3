//! Storage layer
//!
//! Events, teams and scores live in an embedded SQLite database.

pub mod db;

pub use db::{Database, EventRecord};
