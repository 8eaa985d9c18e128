//! Legacy Excel (.xls) workbook stream reader
//!
//! This module decodes the BIFF8 records of a `Workbook` stream and drives
//! an index-driven reconstruction session with them. The decoder signals
//! every skipped column and every row end itself, so the session never has
//! to infer a gap.

/// BIFF record framing and cell records
pub mod records;

/// Shared string table with CONTINUE handling
mod sst;

/// FORMAT and XF tracking
mod formats;

/// Workbook stream reader
mod reader;

pub use formats::FormatTracker;
pub use reader::XlsReader;
pub use records::{CellRecord, FormulaResult, Record, RecordIter, decode_rk, error_text};
pub use sst::SharedStringTable;
