//! Common types and utilities shared across formats.
//!
//! The error type is used everywhere; the binary readers back the BIFF decoder.

// Submodule declarations
#[cfg(feature = "ole")]
pub mod binary;
pub mod error;

// Re-exports for convenience
pub use error::{Error, Result};
