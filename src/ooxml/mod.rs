//! Office Open XML spreadsheet support.
//!
//! Only the SpreadsheetML parts that carry cell content are read: worksheets,
//! the shared string table and the cell styles. Unzipping the package is the
//! caller's job; see [`xlsx::XlsxParts`].
//!
//! # Example
//!
//! ```rust
//! use gridfold::ooxml::xlsx::{XlsxParts, XlsxReader};
//! use gridfold::sheet::SessionConfig;
//!
//! let strings = r#"<sst><si><t>total</t></si></sst>"#;
//! let sheet = r#"<worksheet><sheetData>
//!     <row r="1"><c r="B1" t="s"><v>0</v></c></row>
//! </sheetData></worksheet>"#;
//!
//! let mut reader = XlsxReader::new(SessionConfig::new());
//! reader.open(XlsxParts::new().with_shared_strings(strings).with_sheet(None, sheet))?;
//! let table = reader.process_all_sheets()?;
//! assert_eq!(table.get(0), Some(&[None, Some("total".to_string())][..]));
//! # Ok::<(), gridfold::Error>(())
//! ```

pub mod xlsx;

pub use xlsx::XlsxReader;
