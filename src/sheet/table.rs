//! Dense output table and the row buffer it is built from.

use serde::Serialize;

/// One cell of the output: a display string or an empty placeholder.
pub type CellText = Option<String>;

/// Row under construction, indexed by 0-based column slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowBuffer {
    cells: Vec<CellText>,
}

impl RowBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cell: CellText) {
        self.cells.push(cell);
    }

    /// Append `count` empty placeholders.
    pub fn push_gap(&mut self, count: usize) {
        self.cells.resize(self.cells.len() + count, None);
    }

    /// Overwrite an already filled slot; returns `false` if it does not exist.
    pub fn set(&mut self, slot: usize, cell: CellText) -> bool {
        match self.cells.get_mut(slot) {
            Some(existing) => {
                *existing = cell;
                true
            },
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn into_cells(self) -> Vec<CellText> {
        self.cells
    }
}

/// Dense, row-major reconstruction result.
///
/// Rows are appended once, in document order, and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Table {
    rows: Vec<Vec<CellText>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalize a row buffer into the table.
    pub fn push_row(&mut self, row: RowBuffer) {
        self.rows.push(row.into_cells());
    }

    pub fn rows(&self) -> &[Vec<CellText>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&[CellText]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    /// Cell text at `(row, column)`, `None` for placeholders and out-of-range positions.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vec<CellText>> {
        self.rows.iter()
    }

    /// Widest row length.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn into_rows(self) -> Vec<Vec<CellText>> {
        self.rows
    }
}

impl IntoIterator for Table {
    type Item = Vec<CellText>;
    type IntoIter = std::vec::IntoIter<Vec<CellText>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Vec<CellText>;
    type IntoIter = std::slice::Iter<'a, Vec<CellText>>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_buffer_gaps_and_set() {
        let mut row = RowBuffer::new();
        row.push(Some("a".to_string()));
        row.push_gap(2);
        row.push(Some("d".to_string()));
        assert_eq!(row.len(), 4);
        assert!(row.set(1, Some("b".to_string())));
        assert!(!row.set(9, None));
        assert_eq!(
            row.into_cells(),
            vec![Some("a".to_string()), Some("b".to_string()), None, Some("d".to_string())]
        );
    }

    #[test]
    fn test_table_accessors() {
        let mut table = Table::new();
        assert!(table.is_empty());
        let mut row = RowBuffer::new();
        row.push(Some("x".to_string()));
        row.push(None);
        table.push_row(row);
        table.push_row(RowBuffer::new());

        assert_eq!(table.len(), 2);
        assert_eq!(table.width(), 2);
        assert_eq!(table.cell(0, 0), Some("x"));
        assert_eq!(table.cell(0, 1), None);
        assert_eq!(table.get(1), Some(&[][..]));
        assert_eq!((&table).into_iter().count(), 2);
    }
}
