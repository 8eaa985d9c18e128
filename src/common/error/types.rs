//! Unified error type for table reconstruction.
//!
//! Session-fatal conditions propagate through [`Result`]. Per-cell problems
//! (bad references, unresolvable shared strings, unparsable numbers) are
//! recovered in place by the session; their variants exist so the recovery
//! path can log a typed error.
use thiserror::Error;

#[cfg(feature = "ole")]
use crate::common::binary::BinaryError;

/// Main error type for gridfold operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Processing was requested before a data source was opened
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// A cell reference with no leading column letters or a non-numeric row part
    #[error("Malformed cell reference: {0:?}")]
    MalformedReference(String),

    /// Shared string index outside the supplied table
    #[error("Shared string index {index} out of range (table holds {len})")]
    SharedStringResolution { index: usize, len: usize },

    /// A numeric cell whose raw text is not a number
    #[error("Cannot parse {0:?} as a number")]
    NumericParse(String),

    /// Column cursor moved backwards within a row
    #[error("Negative column gap: column {current} follows column {previous}")]
    NegativeGap { previous: u32, current: u32 },

    /// An explicit-gap source skipped columns without signalling them
    #[error("Row {row}: expected column {expected}, got {found} without a missing-cell signal")]
    UnsignalledGap { row: u32, expected: u32, found: u32 },

    /// Requested 1-based sheet id does not exist in the source
    #[error("Sheet {0} not found")]
    SheetNotFound(u32),

    /// Malformed binary record
    #[error("Invalid record 0x{record_type:04X}: {message}")]
    InvalidRecord { record_type: u16, message: String },

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// Short or malformed binary read
    #[cfg(feature = "ole")]
    #[error("Binary error: {0}")]
    Binary(#[from] BinaryError),
}

/// Result type for gridfold operations.
pub type Result<T> = std::result::Result<T, Error>;
