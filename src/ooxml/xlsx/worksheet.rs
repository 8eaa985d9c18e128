//! Worksheet part (`xl/worksheets/sheetN.xml`) as a stream of sheet events.
//!
//! Only present cells are reported: SpreadsheetML omits empty cells and the
//! gaps are recovered later from the cell references. Rows become
//! [`SheetEvent::RowBegin`]/[`SheetEvent::RowEnd`] pairs, cells become
//! [`SheetEvent::Cell`] with a letter reference.

use std::ops::ControlFlow;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::common::Result;
use crate::ooxml::xlsx::xml::{attr, push_entity, push_text};
use crate::sheet::{CellEvent, SheetEvent, TypeTag, column_to_index, index_to_column, split_reference};

/// Worksheet reading switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorksheetOptions {
    /// Report formula cells by their formula text instead of the cached value
    pub formula_text: bool,
}

/// Which text node is being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Value,
    Inline,
    Formula,
}

/// A `<c>` element being assembled.
#[derive(Debug, Default)]
struct PendingCell {
    row: u32,
    reference: String,
    cell_type: Option<String>,
    style: Option<u32>,
    value: Option<String>,
    inline: Option<String>,
    formula: Option<String>,
}

impl PendingCell {
    fn buffer(&mut self, capture: Capture) -> &mut String {
        let slot = match capture {
            Capture::Value => &mut self.value,
            Capture::Inline => &mut self.inline,
            Capture::Formula => &mut self.formula,
        };
        slot.get_or_insert_with(String::new)
    }

    fn into_event(self, options: WorksheetOptions) -> CellEvent {
        let PendingCell {
            row,
            reference,
            cell_type,
            style,
            value,
            inline,
            formula,
        } = self;

        if options.formula_text
            && let Some(formula) = formula.filter(|text| !text.trim().is_empty())
        {
            return CellEvent::at_reference(row, reference, formula, TypeTag::Formula);
        }

        let (raw, type_tag) = match cell_type.as_deref() {
            Some("inlineStr") => (inline.unwrap_or_default(), TypeTag::InlineString),
            _ if value.is_none() => (String::new(), TypeTag::Blank),
            Some("b") => (value.unwrap_or_default(), TypeTag::Bool),
            Some("e") => (value.unwrap_or_default(), TypeTag::Error),
            Some("s") => (value.unwrap_or_default(), TypeTag::SharedStringIndex),
            Some("str") => (value.unwrap_or_default(), TypeTag::Formula),
            // ISO 8601 text, shown as stored.
            Some("d") => (value.unwrap_or_default(), TypeTag::InlineString),
            _ => (value.unwrap_or_default(), TypeTag::Number),
        };
        let event = CellEvent::at_reference(row, reference, raw, type_tag);
        match style {
            Some(style) => event.with_style(style),
            None => event,
        }
    }
}

/// Row and column positions for elements that omit their `r` attribute.
#[derive(Debug, Default)]
struct Positions {
    row: Option<u32>,
    last_row: Option<u32>,
    last_column: u32,
}

impl Positions {
    fn begin_row(&mut self, element: &BytesStart<'_>) -> Result<u32> {
        let declared = attr(element, b"r")?
            .and_then(|r| atoi_simd::parse::<u32>(r.trim().as_bytes()).ok())
            .and_then(|number| number.checked_sub(1));
        let row = declared.unwrap_or_else(|| self.last_row.map_or(0, |last| last.saturating_add(1)));
        self.row = Some(row);
        self.last_row = Some(row);
        self.last_column = 0;
        Ok(row)
    }

    fn begin_cell(&mut self, element: &BytesStart<'_>) -> Result<PendingCell> {
        let reference = attr(element, b"r")?;
        let row = match (self.row, reference.as_deref()) {
            (Some(row), _) => row,
            (None, Some(reference)) => split_reference(reference)
                .ok()
                .and_then(|(_, row)| row)
                .and_then(|number| number.checked_sub(1))
                .unwrap_or(0),
            (None, None) => 0,
        };
        let reference = reference.unwrap_or_else(|| {
            format!("{}{}", index_to_column(self.last_column.saturating_add(1)), row + 1)
        });
        self.last_column = column_to_index(&reference).unwrap_or(self.last_column.saturating_add(1));

        Ok(PendingCell {
            row,
            reference,
            cell_type: attr(element, b"t")?,
            style: attr(element, b"s")?.and_then(|s| atoi_simd::parse::<u32>(s.as_bytes()).ok()),
            ..PendingCell::default()
        })
    }

    fn end_row(&mut self) -> Option<u32> {
        self.row.take()
    }
}

/// Stream the worksheet's rows and cells into `emit`.
///
/// Parsing stops early, without error, when `emit` breaks.
pub fn read_worksheet<F>(xml: &str, options: WorksheetOptions, mut emit: F) -> Result<()>
where
    F: FnMut(SheetEvent) -> Result<ControlFlow<()>>,
{
    let mut reader = Reader::from_str(xml);
    let mut positions = Positions::default();
    let mut cell: Option<PendingCell> = None;
    let mut capture: Option<Capture> = None;
    let mut in_inline = false;
    let mut phonetic_depth = 0usize;

    macro_rules! send {
        ($event:expr) => {
            if emit($event)?.is_break() {
                log::debug!("worksheet reading stopped by the consumer");
                return Ok(());
            }
        };
    }

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    let row = positions.begin_row(&e)?;
                    send!(SheetEvent::RowBegin { row });
                },
                b"c" => cell = Some(positions.begin_cell(&e)?),
                b"v" if cell.is_some() => capture = Some(Capture::Value),
                b"f" if cell.is_some() => capture = Some(Capture::Formula),
                b"is" => in_inline = true,
                b"rPh" => phonetic_depth += 1,
                b"t" if in_inline && phonetic_depth == 0 => capture = Some(Capture::Inline),
                _ => {},
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => {
                    let row = positions.begin_row(&e)?;
                    send!(SheetEvent::RowBegin { row });
                    positions.end_row();
                    send!(SheetEvent::RowEnd { row });
                },
                b"c" => {
                    let event = positions.begin_cell(&e)?.into_event(options);
                    send!(SheetEvent::Cell(event));
                },
                _ => {},
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"row" => {
                    if let Some(row) = positions.end_row() {
                        send!(SheetEvent::RowEnd { row });
                    }
                },
                b"c" => {
                    capture = None;
                    if let Some(pending) = cell.take() {
                        send!(SheetEvent::Cell(pending.into_event(options)));
                    }
                },
                b"v" | b"f" | b"t" => capture = None,
                b"is" => in_inline = false,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                _ => {},
            },
            Event::Text(e) => {
                if let (Some(capture), Some(pending)) = (capture, cell.as_mut()) {
                    push_text(pending.buffer(capture), &e);
                }
            },
            Event::CData(e) => {
                if let (Some(capture), Some(pending)) = (capture, cell.as_mut()) {
                    push_text(pending.buffer(capture), &e);
                }
            },
            Event::GeneralRef(e) => {
                if let (Some(capture), Some(pending)) = (capture, cell.as_mut()) {
                    push_entity(pending.buffer(capture), &e)?;
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(())
}
