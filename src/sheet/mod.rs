//! Sparse-to-dense table reconstruction.
//!
//! Spreadsheet decoders report cells sparsely: empty cells are usually
//! absent, and a row may start or end anywhere. This module folds such an
//! event stream into a rectangular [`Table`] of optional strings, placing
//! `None` wherever the source had no value.
//!
//! # Quick Start
//!
//! ```rust
//! use gridfold::sheet::{
//!     CellEvent, ReferenceDrivenSession, SessionConfig, SheetEvent, TypeTag,
//! };
//!
//! let config = SessionConfig::new().with_begin_row(1);
//! let mut session = ReferenceDrivenSession::new(&config);
//! session.handle_all([
//!     SheetEvent::RowBegin { row: 0 },
//!     SheetEvent::Cell(CellEvent::at_reference(0, "A1", "name", TypeTag::InlineString)),
//!     SheetEvent::Cell(CellEvent::at_reference(0, "C1", "1.50", TypeTag::Number)),
//!     SheetEvent::RowEnd { row: 0 },
//! ])?;
//!
//! let table = session.finish();
//! assert_eq!(table.cell(0, 0), Some("name"));
//! assert_eq!(table.cell(0, 1), None);
//! assert_eq!(table.cell(0, 2), Some("1.5"));
//! # Ok::<(), gridfold::Error>(())
//! ```
//!
//! # Architecture
//!
//! - **Addressing**: [`column_to_index`] and friends convert letter references
//! - **Gap filling**: a [`GapStrategy`] decides where each value lands
//! - **Formatting**: [`CellFormatter`] turns raw values into display text
//! - **Windowing**: [`RowWindow`] keeps the requested rows of the chosen sheet
//! - **Session**: [`ReconstructionSession`] drives all of the above

// Submodule declarations
pub mod address;
pub mod config;
pub mod event;
pub mod format;
pub mod gap;
pub mod session;
pub mod table;
pub mod window;


// Re-exports
pub use address::{MAX_COLUMN_INDEX, column_to_index, index_to_column, split_reference};
pub use config::SessionConfig;
pub use event::{
    CellColumn, CellEvent, RawValue, SharedStringSource, SheetEvent, StyleFormat,
    StyleFormatSource, TypeTag,
};
pub use format::{CellFormatter, Formatted};
pub use gap::{
    ExplicitGaps, GapStrategy, LastPlaced, Placement, ReferenceInference, column_number,
    fill_between, fill_between_indices, pad_trailing, pad_trailing_indices,
};
pub use session::{
    Cursor, IndexDrivenSession, ReconstructionSession, ReferenceDrivenSession, SessionState,
};
pub use table::{CellText, RowBuffer, Table};
pub use window::RowWindow;
