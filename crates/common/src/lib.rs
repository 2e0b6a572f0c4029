//! Shared types, error definitions, and utilities used across all chatgate crates.

pub mod collaborators;
pub mod error;
pub mod markdown;
pub mod types;

pub use error::{ChatgateError, Error, FromMessage, Result};
