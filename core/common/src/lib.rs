//! Common types shared across the omnidisk crates.
//!
//! This crate provides the error taxonomy and the `StorageResource` value
//! type that every storage backend produces and consumes.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ResourceKind, StorageResource};
