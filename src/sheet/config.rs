//! Reconstruction session configuration.

use serde::{Deserialize, Serialize};

/// Configuration for one reconstruction session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// First 1-based document row to keep (0 and 1 both mean the first row)
    pub begin_row: u32,
    /// Number of rows to keep starting at `begin_row`; `None` keeps the rest
    pub row_count: Option<u32>,
    /// 1-based sheet id to keep; `None` keeps every sheet
    pub selected_sheet: Option<u32>,
    /// Pad rows to the header row's width when gaps are inferred from references
    pub pad_to_header: bool,
    /// Interpret serial dates in the 1904 date system
    pub date_1904: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            begin_row: 0,          // From the first row
            row_count: None,       // No upper bound
            selected_sheet: None,  // Every sheet
            pad_to_header: true,   // Header defines the row width
            date_1904: false,      // Windows date system
        }
    }
}

impl SessionConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the first 1-based row to keep
    pub fn with_begin_row(mut self, begin_row: u32) -> Self {
        self.begin_row = begin_row;
        self
    }

    /// Set the number of rows to keep
    pub fn with_row_count(mut self, row_count: Option<u32>) -> Self {
        self.row_count = row_count;
        self
    }

    /// Keep only the sheet with this 1-based id
    pub fn with_selected_sheet(mut self, sheet: Option<u32>) -> Self {
        self.selected_sheet = sheet;
        self
    }

    /// Enable or disable header-width padding
    pub fn with_pad_to_header(mut self, pad: bool) -> Self {
        self.pad_to_header = pad;
        self
    }

    /// Select the 1904 date system
    pub fn with_date_1904(mut self, date_1904: bool) -> Self {
        self.date_1904 = date_1904;
        self
    }

    /// Effective first row, treating 0 as 1.
    pub fn first_row(&self) -> u32 {
        self.begin_row.max(1)
    }

    /// Last 1-based row to keep, derived as `begin_row + row_count - 1`.
    ///
    /// `Some(0)` is returned for a zero row count, which keeps nothing.
    pub fn end_row(&self) -> Option<u32> {
        self.row_count.map(|count| {
            if count == 0 {
                0
            } else {
                self.first_row().saturating_add(count - 1)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_row() {
        assert_eq!(SessionConfig::new().end_row(), None);
        let config = SessionConfig::new().with_begin_row(3).with_row_count(Some(2));
        assert_eq!(config.end_row(), Some(4));
        let config = SessionConfig::new().with_row_count(Some(5));
        assert_eq!(config.end_row(), Some(5));
        let config = SessionConfig::new().with_begin_row(4).with_row_count(Some(0));
        assert_eq!(config.end_row(), Some(0));
    }

    #[test]
    fn test_builder_chain() {
        let config = SessionConfig::new()
            .with_selected_sheet(Some(2))
            .with_pad_to_header(false)
            .with_date_1904(true);
        assert_eq!(config.selected_sheet, Some(2));
        assert!(!config.pad_to_header);
        assert!(config.date_1904);
        assert_eq!(config.begin_row, 0);
    }
}
