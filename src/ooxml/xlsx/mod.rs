//! SpreadsheetML (`.xlsx`) worksheet reading.
//!
//! The parts are parsed with a streaming XML reader; no DOM is built. Shared
//! strings and cell styles are loaded once per workbook, worksheets are
//! streamed row by row.
//!
//! - [`shared_strings`]: `xl/sharedStrings.xml`
//! - [`styles`]: number formats behind `xl/styles.xml` cell styles
//! - [`worksheet`]: worksheet parts as sheet events
//! - [`XlsxReader`]: drives a reference-driven session over the parts

mod reader;
pub mod shared_strings;
pub mod styles;
pub mod worksheet;
mod xml;

pub use reader::{SheetPart, XlsxParts, XlsxReader};
pub use shared_strings::SharedStrings;
pub use styles::Styles;
pub use worksheet::{WorksheetOptions, read_worksheet};
