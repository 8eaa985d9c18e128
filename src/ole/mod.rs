/// Codepage decoding for 8-bit BIFF strings
pub mod codepage;

/// Legacy Excel workbook stream (.xls) reader
///
/// This module replays the BIFF8 `Workbook` stream of an `.xls` file as
/// sheet events. Extracting that stream from the compound file is left to
/// the caller.
pub mod xls;

// Re-export public types for convenient access
pub use codepage::Codepage;
pub use xls::XlsReader;
