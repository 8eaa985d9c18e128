//! Unified error types for gridfold.
//!
//! One error enum covers the reconstruction core and both decoders, so callers
//! see a consistent API whichever format produced the events.

// Submodule declarations
pub mod conversions;
pub mod types;

// Re-exports
pub use types::{Error, Result};
