//! The reconstruction state machine.
//!
//! A [`ReconstructionSession`] folds an ordered stream of [`SheetEvent`]s into
//! a dense [`Table`]. It owns the cursor state for one document and is
//! generic over the [`GapStrategy`] the decoder's contract calls for:
//!
//! ```text
//! Idle -> InSheet -> InRow -> (cells) -> row end -> InRow | InSheet -> sheet end -> Idle
//! ```
//!
//! Per-cell problems are logged and recovered in place. Errors returned from
//! [`ReconstructionSession::handle`] mean the event stream and the cursor
//! disagree, and the session should be abandoned.

use crate::common::{Error, Result};
use crate::sheet::config::SessionConfig;
use crate::sheet::event::{
    CellEvent, SharedStringSource, SheetEvent, StyleFormatSource, TypeTag,
};
use crate::sheet::format::{CellFormatter, Formatted};
use crate::sheet::gap::{
    ExplicitGaps, GapStrategy, LastPlaced, Placement, ReferenceInference, column_number,
};
use crate::sheet::table::{CellText, RowBuffer, Table};
use crate::sheet::window::RowWindow;

/// Session driven by decoders that signal missing cells and row ends.
pub type IndexDrivenSession<'a> = ReconstructionSession<'a, ExplicitGaps>;

/// Session driven by decoders that only report present cells.
pub type ReferenceDrivenSession<'a> = ReconstructionSession<'a, ReferenceInference>;

/// Lifecycle position of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    InSheet,
    InRow,
}

/// Raw stream positions, tracked for every row whether kept or not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    /// 0-based index of the current sheet in stream order
    pub current_sheet_index: Option<u32>,
    /// 0-based row of the last row event or cell
    pub last_row_number: Option<u32>,
    /// 1-based column of the last cell in the open row; `None` at row start
    pub last_column_number: Option<u32>,
}

#[derive(Debug)]
struct OpenRow {
    index: u32,
    accepted: bool,
    buffer: RowBuffer,
    last: Option<LastPlaced>,
}

/// Slot waiting for the text result of a formula.
#[derive(Debug, Clone, Copy)]
struct PendingFormula {
    row: u32,
    slot: usize,
}

/// One reconstruction run over one document.
pub struct ReconstructionSession<'a, G: GapStrategy> {
    window: RowWindow,
    formatter: CellFormatter<'a>,
    styles: Option<&'a dyn StyleFormatSource>,
    strategy: G,
    state: SessionState,
    cursor: Cursor,
    open_row: Option<OpenRow>,
    pending_formula: Option<PendingFormula>,
    table: Table,
}

impl<'a, G: GapStrategy> ReconstructionSession<'a, G> {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            window: RowWindow::from_config(config),
            formatter: CellFormatter::new().with_date_1904(config.date_1904),
            styles: None,
            strategy: G::from_config(config),
            state: SessionState::Idle,
            cursor: Cursor::default(),
            open_row: None,
            pending_formula: None,
            table: Table::new(),
        }
    }

    /// Resolve shared string cells through `source`.
    pub fn with_shared_strings(mut self, source: &'a dyn SharedStringSource) -> Self {
        self.formatter = self.formatter.with_shared_strings(source);
        self
    }

    /// Resolve cell style indices through `source`.
    pub fn with_styles(mut self, source: &'a dyn StyleFormatSource) -> Self {
        self.styles = Some(source);
        self
    }

    /// Override the date system, e.g. from the workbook's own flag.
    pub fn with_date_1904(mut self, date_1904: bool) -> Self {
        self.formatter = self.formatter.with_date_1904(date_1904);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Rows finalized so far.
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn strategy(&self) -> &G {
        &self.strategy
    }

    /// Advance the state machine by one event.
    pub fn handle(&mut self, event: SheetEvent) -> Result<()> {
        match event {
            SheetEvent::SheetBegin { name } => {
                self.close_implicitly("a new sheet began");
                let index = self.cursor.current_sheet_index.map_or(0, |i| i + 1);
                self.cursor = Cursor {
                    current_sheet_index: Some(index),
                    ..Cursor::default()
                };
                self.state = SessionState::InSheet;
                log::debug!(
                    "sheet {} ({}) begins, selected: {}",
                    index,
                    name.as_deref().unwrap_or("unnamed"),
                    self.window.selects_sheet(index)
                );
            },
            SheetEvent::SheetEnd => {
                self.close_implicitly("the sheet ended");
                if self.pending_formula.take().is_some() {
                    log::warn!("formula string result never arrived before sheet end");
                }
                self.state = SessionState::Idle;
                log::debug!("sheet {:?} ends", self.cursor.current_sheet_index);
            },
            SheetEvent::RowBegin { row } => {
                self.enter_row(row);
            },
            SheetEvent::Cell(cell) => self.handle_cell(cell)?,
            SheetEvent::MissingCell { row, column } => self.handle_missing(row, column)?,
            SheetEvent::FormulaStringResult(text) => self.handle_formula_string(&text),
            SheetEvent::RowEnd { row } => {
                self.enter_row(row);
                self.close_row();
            },
        }
        Ok(())
    }

    /// Feed a whole event sequence, stopping at the first fatal error.
    pub fn handle_all<I>(&mut self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = SheetEvent>,
    {
        events.into_iter().try_for_each(|event| self.handle(event))
    }

    /// End the session and hand over the table.
    pub fn finish(mut self) -> Table {
        self.close_implicitly("the event stream ended");
        self.table
    }

    /// Make `row` the open row, closing a different open row first.
    fn enter_row(&mut self, row: u32) {
        if self.open_row.as_ref().is_some_and(|open| open.index == row) {
            return;
        }
        self.close_implicitly("a different row started");
        if self.cursor.current_sheet_index.is_none() {
            log::debug!("row {row} arrived before any sheet, assuming sheet 0");
            self.cursor.current_sheet_index = Some(0);
        }
        let sheet = self.cursor.current_sheet_index.unwrap_or_default();
        let accepted = self.window.accept(row, sheet);
        if !accepted {
            log::trace!("row {row} of sheet {sheet} is outside the window");
        }
        self.open_row = Some(OpenRow {
            index: row,
            accepted,
            buffer: RowBuffer::new(),
            last: None,
        });
        self.cursor.last_row_number = Some(row);
        self.cursor.last_column_number = None;
        self.state = SessionState::InRow;
    }

    fn handle_cell(&mut self, cell: CellEvent) -> Result<()> {
        self.enter_row(cell.row);
        if let Some(pending) = self.pending_formula.take() {
            log::warn!(
                "formula string result for row {} slot {} was not delivered",
                pending.row,
                pending.slot
            );
        }

        let column = column_number(&cell.column);
        self.cursor.last_column_number = column.as_ref().ok().copied();
        let Some(open) = self.open_row.as_mut().filter(|open| open.accepted) else {
            return Ok(());
        };

        let column = match column {
            Ok(column) => column,
            Err(err) => {
                log::warn!("{err}; keeping the raw value");
                open.buffer.push(Some(cell.raw.as_text().into_owned()));
                // Occupies the slot it was pushed to.
                let slot = open.buffer.len() - 1;
                open.last = Some(LastPlaced::recovered(
                    u32::try_from(slot + 1).unwrap_or(u32::MAX),
                    slot,
                ));
                return Ok(());
            },
        };

        let (format_index, format_pattern) = resolve_format(&cell, self.styles);
        let formatted = self.formatter.format(
            cell.type_tag,
            &cell.raw,
            format_index,
            format_pattern.as_deref(),
        );
        let (value, awaits_text) = match formatted {
            Formatted::Value(value) => (value, false),
            Formatted::AwaitStringResult => (None, true),
        };

        let placement = self
            .strategy
            .place(cell.row, column, open.last, open.buffer.len())?;
        let slot = place_value(&mut open.buffer, placement, value);
        log::trace!("row {} column {column} -> slot {slot} ({:?})", cell.row, cell.type_tag);
        open.last = Some(LastPlaced::new(column, slot));
        if awaits_text {
            self.pending_formula = Some(PendingFormula {
                row: cell.row,
                slot,
            });
        }
        Ok(())
    }

    fn handle_missing(&mut self, row: u32, column: u32) -> Result<()> {
        self.enter_row(row);
        let column = column
            .checked_add(1)
            .ok_or_else(|| Error::MalformedReference(column.to_string()))?;
        self.cursor.last_column_number = Some(column);
        let Some(open) = self.open_row.as_mut().filter(|open| open.accepted) else {
            return Ok(());
        };
        let placement = self
            .strategy
            .place_missing(row, column, open.last, open.buffer.len())?;
        let slot = place_value(&mut open.buffer, placement, None);
        open.last = Some(LastPlaced::new(column, slot));
        Ok(())
    }

    fn handle_formula_string(&mut self, text: &str) {
        let Some(pending) = self.pending_formula.take() else {
            log::trace!("string record with no pending formula ignored");
            return;
        };
        match self.open_row.as_mut() {
            Some(open) if open.index == pending.row && open.accepted => {
                let trimmed = text.trim();
                let value = (!trimmed.is_empty()).then(|| trimmed.to_string());
                open.buffer.set(pending.slot, value);
            },
            _ => log::warn!(
                "formula string result arrived after row {} closed",
                pending.row
            ),
        }
    }

    fn close_implicitly(&mut self, reason: &str) {
        let Some(index) = self.open_row.as_ref().map(|open| open.index) else {
            return;
        };
        log::warn!("row {index} closed without a row end because {reason}");
        self.close_row();
    }

    fn close_row(&mut self) {
        let Some(mut open) = self.open_row.take() else {
            return;
        };
        if let Some(pending) = self.pending_formula
            && pending.row == open.index
        {
            self.pending_formula = None;
            log::warn!("formula string result for row {} never arrived", open.index);
        }

        if open.accepted {
            let trailing = self.strategy.close_row(open.last, open.buffer.len());
            open.buffer.push_gap(trailing);
            log::trace!("row {} complete with {} cells", open.index, open.buffer.len());
            self.table.push_row(open.buffer);
        } else {
            log::debug!("row {} discarded", open.index);
        }
        self.cursor.last_column_number = None;
        self.state = SessionState::InSheet;
    }
}

/// Format id and pattern for a cell: its own when present, else its style's.
fn resolve_format(
    cell: &CellEvent,
    styles: Option<&dyn StyleFormatSource>,
) -> (Option<u16>, Option<String>) {
    if cell.format_index.is_some() || cell.format_pattern.is_some() {
        return (cell.format_index, cell.format_pattern.clone());
    }
    if matches!(
        cell.type_tag,
        TypeTag::Number | TypeTag::Date | TypeTag::FormulaString
    ) && let (Some(style), Some(styles)) = (cell.style_index, styles)
        && let Some(format) = styles.resolve_style_format(style)
    {
        return (Some(format.index), format.pattern);
    }
    (None, None)
}

fn place_value(buffer: &mut RowBuffer, placement: Placement, value: CellText) -> usize {
    match placement {
        Placement::Append { gap } => {
            buffer.push_gap(gap);
            buffer.push(value);
            buffer.len() - 1
        },
        Placement::Replace(slot) => {
            buffer.set(slot, value);
            slot
        },
    }
}
