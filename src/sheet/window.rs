//! Row window and sheet selection.

use super::config::SessionConfig;

/// Decides whether a row's cells are kept.
///
/// Rows are compared by their 1-based document number; sheets by their
/// 0-based position in the event stream against the 1-based selected id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowWindow {
    begin_row: u32,
    end_row: Option<u32>,
    selected_sheet: Option<u32>,
}

impl RowWindow {
    pub fn new(begin_row: u32, end_row: Option<u32>, selected_sheet: Option<u32>) -> Self {
        Self {
            begin_row: begin_row.max(1),
            end_row,
            selected_sheet,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.begin_row, config.end_row(), config.selected_sheet)
    }

    /// Whether the 0-based `row` is inside `[begin_row, end_row]`.
    pub fn contains_row(&self, row: u32) -> bool {
        let number = u64::from(row) + 1;
        number >= u64::from(self.begin_row)
            && self.end_row.is_none_or(|end| number <= u64::from(end))
    }

    /// Whether the 0-based `sheet_index` is the selected sheet.
    pub fn selects_sheet(&self, sheet_index: u32) -> bool {
        self.selected_sheet
            .is_none_or(|id| id.checked_sub(1) == Some(sheet_index))
    }

    /// Accept a row iff both the row window and sheet selection admit it.
    pub fn accept(&self, row: u32, sheet_index: u32) -> bool {
        self.selects_sheet(sheet_index) && self.contains_row(row)
    }

    pub fn selected_sheet(&self) -> Option<u32> {
        self.selected_sheet
    }

    /// Whether every sheet after the 0-based `sheet_index` is rejected.
    pub fn sheets_exhausted_after(&self, sheet_index: u32) -> bool {
        self.selected_sheet
            .is_some_and(|id| u64::from(sheet_index) + 1 >= u64::from(id))
    }

    /// Whether no 0-based row after `row` can be accepted.
    pub fn exhausted_after(&self, row: u32) -> bool {
        self.end_row
            .is_some_and(|end| u64::from(row) + 1 >= u64::from(end))
    }
}
