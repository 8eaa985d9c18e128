//! Gridfold - dense tables from event-driven spreadsheet readers
//!
//! Spreadsheet files store cells sparsely: empty cells are simply absent, and
//! streaming readers report only what is there. This library folds such a
//! stream of sheet, row and cell events back into a dense, rectangular
//! table of display strings, with every gap filled by a null cell.
//!
//! # Features
//!
//! - **Reconstruction sessions**: an index-driven variant for decoders that
//!   signal missing cells and row ends, and a reference-driven variant that
//!   infers gaps from letter references such as `AC12`
//! - **Value formatting**: numbers, dates, booleans, errors, formulas and
//!   shared strings rendered the way a spreadsheet would show them
//! - **Row windows and sheet selection**: keep only a range of rows, or a
//!   single sheet, and stop reading once nothing more can be kept
//! - **BIFF8 reader** (`ole` feature): legacy `.xls` workbook streams
//! - **SpreadsheetML reader** (`ooxml` feature): `.xlsx` worksheet parts
//!
//! # Example - Feeding events by hand
//!
//! ```
//! use gridfold::sheet::{CellEvent, ReferenceDrivenSession, SessionConfig, SheetEvent, TypeTag};
//!
//! let config = SessionConfig::new();
//! let mut session = ReferenceDrivenSession::new(&config);
//! session.handle_all([
//!     SheetEvent::SheetBegin { name: Some("Sheet1".to_string()) },
//!     SheetEvent::RowBegin { row: 0 },
//!     SheetEvent::Cell(CellEvent::at_reference(0, "A1", "id", TypeTag::InlineString)),
//!     SheetEvent::Cell(CellEvent::at_reference(0, "C1", "name", TypeTag::InlineString)),
//!     SheetEvent::RowEnd { row: 0 },
//!     SheetEvent::SheetEnd,
//! ])?;
//! let table = session.finish();
//! assert_eq!(table.get(0).map(|row| row.len()), Some(3));
//! assert_eq!(table.cell(0, 1), None);
//! # Ok::<(), gridfold::Error>(())
//! ```
//!
//! # Example - Reading a `.xls` workbook stream
//!
//! ```no_run
//! use gridfold::{SessionConfig, XlsReader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // The `Workbook` stream, already extracted from the compound file
//! let stream = std::fs::read("Workbook.bin")?;
//! let mut reader = XlsReader::new(SessionConfig::new().with_row_count(Some(100)));
//! reader.open(stream)?;
//! let table = reader.process_all_sheets()?;
//! println!("{} rows, {} columns", table.len(), table.width());
//! # Ok(())
//! # }
//! ```

/// Error types and low-level binary readers
pub mod common;

/// Table reconstruction: events, gap filling, formatting and sessions
pub mod sheet;

/// Legacy binary workbooks (BIFF8 `.xls`)
#[cfg(feature = "ole")]
pub mod ole;

/// Office Open XML workbooks (`.xlsx`)
#[cfg(feature = "ooxml")]
pub mod ooxml;

// Re-export commonly used types for convenience
pub use common::{Error, Result};
pub use sheet::{
    CellEvent, IndexDrivenSession, ReferenceDrivenSession, SessionConfig, SheetEvent, Table,
    TypeTag,
};

#[cfg(feature = "ole")]
pub use ole::XlsReader;

#[cfg(feature = "ooxml")]
pub use ooxml::xlsx::{XlsxParts, XlsxReader};
