//! Event-driven reader for BIFF8 workbook streams.
//!
//! The reader walks the `Workbook` stream once: the globals substream fills
//! the shared-string and style lookups, then every worksheet substream is
//! replayed as [`SheetEvent`]s into an [`IndexDrivenSession`]. Gaps are
//! signalled explicitly: the reader emits a missing-cell event for each
//! skipped column and a row-end event once a row's last cell is delivered.

use crate::common::binary::read_u16_le;
use crate::common::{Error, Result};
use crate::ole::codepage::Codepage;
use crate::ole::xls::formats::FormatTracker;
use crate::ole::xls::records::{
    BOF, BOUNDSHEET, BofRecord, BoundSheet, CODEPAGE, CONTINUE, CellRecord, DATEMODE, EOF,
    FORMAT, FormulaResult, Record, RecordIter, SST, SUBSTREAM_GLOBALS, SUBSTREAM_WORKSHEET, XF,
    error_text,
};
use crate::ole::xls::sst::SharedStringTable;
use crate::sheet::{
    CellColumn, CellEvent, IndexDrivenSession, RowWindow, SessionConfig, SheetEvent, Table, TypeTag,
};

/// Workbook-wide state from the globals substream.
#[derive(Debug, Default)]
struct Globals {
    codepage: Codepage,
    date_1904: bool,
    sheets: Vec<BoundSheet>,
    strings: SharedStringTable,
    formats: FormatTracker,
    /// Stream offset just past the globals EOF
    end: usize,
}

impl Globals {
    fn parse(stream: &[u8]) -> Result<Self> {
        let mut globals = Globals::default();
        let mut records = RecordIter::new(stream);

        let first = records.next().transpose()?;
        match first {
            Some(record) if record.record_type == BOF => {
                let bof = BofRecord::parse(record.data)?;
                if bof.substream != SUBSTREAM_GLOBALS {
                    return Err(Error::InvalidRecord {
                        record_type: BOF,
                        message: format!("expected globals substream, found 0x{:04X}", bof.substream),
                    });
                }
                if !bof.is_biff8() {
                    log::warn!("BIFF version 0x{:04X} read as BIFF8", bof.version);
                }
            },
            _ => {
                return Err(Error::InvalidRecord {
                    record_type: BOF,
                    message: "workbook stream does not start with BOF".to_string(),
                });
            },
        }

        while let Some(record) = records.next() {
            let record = record?;
            match record.record_type {
                CODEPAGE => globals.codepage = Codepage::from_id(read_u16_le(record.data, 0)?),
                DATEMODE => globals.date_1904 = read_u16_le(record.data, 0)? == 1,
                BOUNDSHEET => globals
                    .sheets
                    .push(BoundSheet::parse(record.data, &globals.codepage)?),
                FORMAT => globals.formats.record_format(record.data, &globals.codepage)?,
                XF => globals.formats.record_xf(record.data)?,
                SST => {
                    let mut chunks = vec![record.data];
                    while records.peek_type() == Some(CONTINUE) {
                        if let Some(next) = records.next().transpose()? {
                            chunks.push(next.data);
                        }
                    }
                    globals.strings = SharedStringTable::parse(&chunks, &globals.codepage)?;
                },
                EOF => {
                    globals.end = records.position();
                    log::debug!(
                        "globals: {} sheets, {} shared strings, {} styles, 1904: {}",
                        globals.sheets.len(),
                        globals.strings.len(),
                        globals.formats.xf_count(),
                        globals.date_1904
                    );
                    return Ok(globals);
                },
                _ => {},
            }
        }
        Err(Error::InvalidRecord {
            record_type: EOF,
            message: "globals substream has no EOF".to_string(),
        })
    }

    fn worksheet_count(&self) -> usize {
        self.sheets.iter().filter(|sheet| sheet.is_worksheet()).count()
    }

    fn sheet_name_at(&self, offset: usize) -> Option<String> {
        self.sheets
            .iter()
            .find(|sheet| sheet.position as usize == offset)
            .map(|sheet| sheet.name.clone())
    }
}

/// Skip records up to the EOF closing the substream just entered.
fn skip_substream(records: &mut RecordIter<'_>) -> Result<()> {
    let mut depth = 1usize;
    for record in records {
        match record?.record_type {
            BOF => depth += 1,
            EOF => {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            },
            _ => {},
        }
    }
    log::warn!("substream ended without EOF");
    Ok(())
}

/// Feeds one worksheet's cells into a session, synthesising gap events.
struct SheetFeeder<'s, 'a> {
    session: &'s mut IndexDrivenSession<'a>,
    window: RowWindow,
    row: Option<u32>,
    next_column: u32,
}

impl<'s, 'a> SheetFeeder<'s, 'a> {
    fn new(session: &'s mut IndexDrivenSession<'a>, window: RowWindow) -> Self {
        Self {
            session,
            window,
            row: None,
            next_column: 0,
        }
    }

    /// Move to `(row, column)`. Returns false once the window is exhausted.
    fn advance(&mut self, row: u32, column: u32) -> Result<bool> {
        if self.row != Some(row) {
            if let Some(previous) = self.row
                && self.window.exhausted_after(previous)
            {
                return Ok(false);
            }
            self.end_row()?;
            self.row = Some(row);
            self.next_column = 0;
        }
        for missing in self.next_column..column {
            self.session
                .handle(SheetEvent::MissingCell { row, column: missing })?;
        }
        self.next_column = self.next_column.max(column.saturating_add(1));
        Ok(true)
    }

    fn end_row(&mut self) -> Result<()> {
        if let Some(row) = self.row.take() {
            self.session.handle(SheetEvent::RowEnd { row })?;
        }
        Ok(())
    }

    fn emit(&mut self, event: CellEvent) -> Result<bool> {
        let CellColumn::Index(column) = event.column else {
            return Ok(true);
        };
        if !self.advance(event.row, column)? {
            return Ok(false);
        }
        self.session.handle(SheetEvent::Cell(event))?;
        Ok(true)
    }

    /// Replay one cell record. Returns false once the window is exhausted.
    fn record(&mut self, cell: CellRecord) -> Result<bool> {
        match cell {
            CellRecord::StringResult(text) => {
                self.session.handle(SheetEvent::FormulaStringResult(text))?;
                Ok(true)
            },
            CellRecord::MulBlank { row, first_col, xfs } => {
                for (offset, xf) in xfs.into_iter().enumerate() {
                    let column = u32::from(first_col) + offset as u32;
                    let event = CellEvent::at_index(u32::from(row), column, "", TypeTag::Blank)
                        .with_style(u32::from(xf));
                    if !self.emit(event)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            },
            CellRecord::MulRk { row, first_col, values } => {
                for (offset, (xf, value)) in values.into_iter().enumerate() {
                    let column = u32::from(first_col) + offset as u32;
                    let event = CellEvent::at_index(u32::from(row), column, value, TypeTag::Number)
                        .with_style(u32::from(xf));
                    if !self.emit(event)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            },
            other => match cell_event(other) {
                Some(event) => self.emit(event),
                None => Ok(true),
            },
        }
    }
}

/// The event for a single-cell record.
fn cell_event(cell: CellRecord) -> Option<CellEvent> {
    let event = match cell {
        CellRecord::Blank { row, col, xf } => {
            CellEvent::at_index(row.into(), col.into(), "", TypeTag::Blank).with_style(xf.into())
        },
        CellRecord::Number { row, col, xf, value } => {
            CellEvent::at_index(row.into(), col.into(), value, TypeTag::Number)
                .with_style(xf.into())
        },
        CellRecord::Label { row, col, value, .. } => {
            CellEvent::at_index(row.into(), col.into(), value, TypeTag::InlineString)
        },
        CellRecord::LabelSst { row, col, index, .. } => CellEvent::at_index(
            row.into(),
            col.into(),
            f64::from(index),
            TypeTag::SharedStringIndex,
        ),
        CellRecord::Bool { row, col, value } => {
            CellEvent::at_index(row.into(), col.into(), value, TypeTag::Bool)
        },
        CellRecord::Error { row, col, code } => {
            CellEvent::at_index(row.into(), col.into(), error_text(code), TypeTag::Error)
        },
        CellRecord::Formula { row, col, xf, result } => {
            let (row, col) = (u32::from(row), u32::from(col));
            match result {
                FormulaResult::Number(value) => {
                    CellEvent::at_index(row, col, value, TypeTag::FormulaString)
                        .with_style(xf.into())
                },
                FormulaResult::String => {
                    CellEvent::at_index(row, col, f64::NAN, TypeTag::FormulaString)
                },
                FormulaResult::Bool(value) => CellEvent::at_index(row, col, value, TypeTag::Bool),
                FormulaResult::Error(code) => {
                    CellEvent::at_index(row, col, error_text(code), TypeTag::Error)
                },
                FormulaResult::EmptyString => {
                    CellEvent::at_index(row, col, "", TypeTag::InlineString)
                },
            }
        },
        CellRecord::MulBlank { .. } | CellRecord::MulRk { .. } | CellRecord::StringResult(_) => {
            return None;
        },
    };
    Some(event)
}

/// Reader for the `Workbook` stream of a legacy `.xls` file.
///
/// # Examples
///
/// ```no_run
/// use gridfold::ole::xls::XlsReader;
/// use gridfold::sheet::SessionConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let stream = std::fs::read("Workbook.bin")?;
/// let mut reader = XlsReader::new(SessionConfig::new().with_begin_row(2));
/// reader.open(stream)?;
/// for row in &reader.process_one_sheet(1)? {
///     println!("{:?}", row);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct XlsReader {
    config: SessionConfig,
    stream: Option<Vec<u8>>,
}

impl XlsReader {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            stream: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Take the workbook stream; it must begin with a BOF record.
    pub fn open(&mut self, stream: Vec<u8>) -> Result<()> {
        let first = RecordIter::new(&stream).next().transpose()?;
        if first.is_none_or(|record: Record<'_>| record.record_type != BOF) {
            return Err(Error::InvalidRecord {
                record_type: BOF,
                message: "workbook stream does not start with BOF".to_string(),
            });
        }
        self.stream = Some(stream);
        Ok(())
    }

    /// Number of worksheets declared by the workbook.
    pub fn sheet_count(&self) -> Result<usize> {
        Ok(Globals::parse(self.stream()?)?.worksheet_count())
    }

    /// Reconstruct every sheet the configuration selects.
    pub fn process_all_sheets(&self) -> Result<Table> {
        let stream = self.stream()?;
        let globals = Globals::parse(stream)?;
        reconstruct(stream, &globals, &self.config)
    }

    /// Reconstruct only the sheet with 1-based id `id`.
    pub fn process_one_sheet(&self, id: u32) -> Result<Table> {
        let stream = self.stream()?;
        let globals = Globals::parse(stream)?;
        if id == 0 || id as usize > globals.worksheet_count() {
            return Err(Error::SheetNotFound(id));
        }
        let config = self.config.clone().with_selected_sheet(Some(id));
        reconstruct(stream, &globals, &config)
    }

    fn stream(&self) -> Result<&[u8]> {
        self.stream
            .as_deref()
            .ok_or_else(|| Error::Precondition("no workbook stream has been opened".to_string()))
    }
}

fn reconstruct(stream: &[u8], globals: &Globals, config: &SessionConfig) -> Result<Table> {
    let window = RowWindow::from_config(config);
    let mut session = IndexDrivenSession::new(config)
        .with_shared_strings(&globals.strings)
        .with_styles(&globals.formats)
        .with_date_1904(globals.date_1904);
    let mut records = RecordIter::at(stream, globals.end);
    let mut sheet_index = 0u32;

    while let Some(record) = records.next() {
        let record = record?;
        if record.record_type != BOF {
            continue;
        }
        if BofRecord::parse(record.data)?.substream != SUBSTREAM_WORKSHEET {
            log::debug!("skipping non-worksheet substream at {}", record.offset);
            skip_substream(&mut records)?;
            continue;
        }

        session.handle(SheetEvent::SheetBegin {
            name: globals.sheet_name_at(record.offset),
        })?;
        if window.selects_sheet(sheet_index) {
            read_worksheet(&mut records, &globals.codepage, window, &mut session)?;
        } else {
            skip_substream(&mut records)?;
        }
        session.handle(SheetEvent::SheetEnd)?;

        if window.sheets_exhausted_after(sheet_index) {
            break;
        }
        sheet_index += 1;
    }
    Ok(session.finish())
}

fn read_worksheet(
    records: &mut RecordIter<'_>,
    codepage: &Codepage,
    window: RowWindow,
    session: &mut IndexDrivenSession<'_>,
) -> Result<()> {
    let mut feeder = SheetFeeder::new(session, window);
    while let Some(record) = records.next() {
        let record = record?;
        match record.record_type {
            EOF => return feeder.end_row(),
            BOF => skip_substream(records)?,
            _ => {
                if let Some(cell) = CellRecord::parse(&record, codepage)?
                    && !feeder.record(cell)?
                {
                    log::debug!("row window exhausted, skipping the rest of the sheet");
                    feeder.end_row()?;
                    return skip_substream(records);
                }
            },
        }
    }
    log::warn!("worksheet substream ended without EOF");
    feeder.end_row()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::xls::records::{
        BLANK, BOOLERR, FORMULA, LABEL, LABELSST, MULBLANK, NUMBER, RK, STRING,
    };

    fn record(record_type: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = record_type.to_le_bytes().to_vec();
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn bof(substream: u16) -> Vec<u8> {
        let mut payload = vec![0x00, 0x06];
        payload.extend_from_slice(&substream.to_le_bytes());
        payload.extend_from_slice(&[0u8; 12]);
        record(BOF, &payload)
    }

    fn boundsheet(position: u32, sheet_type: u8, name: &str) -> Vec<u8> {
        let mut payload = position.to_le_bytes().to_vec();
        payload.extend_from_slice(&[0, sheet_type, name.len() as u8, 0]);
        payload.extend_from_slice(name.as_bytes());
        record(BOUNDSHEET, &payload)
    }

    fn cell(record_type: u16, row: u16, col: u16, xf: u16, tail: &[u8]) -> Vec<u8> {
        let mut payload = row.to_le_bytes().to_vec();
        payload.extend_from_slice(&col.to_le_bytes());
        payload.extend_from_slice(&xf.to_le_bytes());
        payload.extend_from_slice(tail);
        record(record_type, &payload)
    }

    fn label(row: u16, col: u16, text: &str) -> Vec<u8> {
        let mut tail = (text.len() as u16).to_le_bytes().to_vec();
        tail.push(0);
        tail.extend_from_slice(text.as_bytes());
        cell(LABEL, row, col, 0, &tail)
    }

    fn number(row: u16, col: u16, xf: u16, value: f64) -> Vec<u8> {
        cell(NUMBER, row, col, xf, &value.to_le_bytes())
    }

    fn formula(row: u16, col: u16, xf: u16, cached: [u8; 8]) -> Vec<u8> {
        let mut tail = cached.to_vec();
        tail.extend_from_slice(&[0u8; 6]);
        cell(FORMULA, row, col, xf, &tail)
    }

    fn string_result(text: &str) -> Vec<u8> {
        let mut payload = (text.len() as u16).to_le_bytes().to_vec();
        payload.push(0);
        payload.extend_from_slice(text.as_bytes());
        record(STRING, &payload)
    }

    /// Assemble a workbook stream: globals (with `extra` records) then sheets.
    /// Sheets named with a `#` prefix are written as chart substreams.
    fn workbook(extra: &[Vec<u8>], sheets: &[(&str, Vec<Vec<u8>>)]) -> Vec<u8> {
        let globals_len = |positions: &[u32]| -> Vec<u8> {
            let mut out = bof(SUBSTREAM_GLOBALS);
            extra.iter().for_each(|r| out.extend_from_slice(r));
            for ((name, _), position) in sheets.iter().zip(positions) {
                let (sheet_type, name) = match name.strip_prefix('#') {
                    Some(name) => (2, name),
                    None => (0, *name),
                };
                out.extend(boundsheet(*position, sheet_type, name));
            }
            out.extend(record(EOF, &[]));
            out
        };
        let substreams: Vec<Vec<u8>> = sheets
            .iter()
            .map(|(name, records)| {
                let substream = if name.starts_with('#') { 0x0020 } else { SUBSTREAM_WORKSHEET };
                let mut out = bof(substream);
                records.iter().for_each(|r| out.extend_from_slice(r));
                out.extend(record(EOF, &[]));
                out
            })
            .collect();

        let mut position = globals_len(&vec![0; sheets.len()]).len() as u32;
        let mut positions = Vec::new();
        for substream in &substreams {
            positions.push(position);
            position += substream.len() as u32;
        }
        let mut stream = globals_len(&positions);
        substreams.iter().for_each(|s| stream.extend_from_slice(s));
        stream
    }

    fn sst(strings: &[&str]) -> Vec<u8> {
        let mut payload = (strings.len() as u32).to_le_bytes().to_vec();
        payload.extend_from_slice(&(strings.len() as u32).to_le_bytes());
        for text in strings {
            payload.extend_from_slice(&(text.len() as u16).to_le_bytes());
            payload.push(0);
            payload.extend_from_slice(text.as_bytes());
        }
        record(SST, &payload)
    }

    fn xf(format: u16) -> Vec<u8> {
        let mut payload = vec![0, 0];
        payload.extend_from_slice(&format.to_le_bytes());
        payload.extend_from_slice(&[0u8; 16]);
        record(XF, &payload)
    }

    fn reader(stream: Vec<u8>, config: SessionConfig) -> XlsReader {
        let mut reader = XlsReader::new(config);
        reader.open(stream).unwrap();
        reader
    }

    fn text(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn test_missing_cells_are_synthesised() {
        let stream = workbook(
            &[sst(&["shared"]), xf(0)],
            &[(
                "Data",
                vec![
                    label(0, 0, "a"),
                    number(0, 1, 0, 1.5),
                    cell(LABELSST, 0, 3, 0, &0u32.to_le_bytes()),
                    cell(RK, 2, 1, 0, &((7u32 << 2) | 0x02).to_le_bytes()),
                ],
            )],
        );
        let table = reader(stream, SessionConfig::default()).process_all_sheets().unwrap();
        assert_eq!(
            table.into_rows(),
            vec![
                vec![text("a"), text("1.5"), None, text("shared")],
                vec![None, text("7")],
            ]
        );
    }

    #[test]
    fn test_formula_results() {
        let string_cached = [0, 0, 0, 0, 0, 0, 0xFF, 0xFF];
        let bool_cached = [1, 0, 1, 0, 0, 0, 0xFF, 0xFF];
        let error_cached = [2, 0, 0x07, 0, 0, 0, 0xFF, 0xFF];
        let stream = workbook(
            &[xf(0), xf(14)],
            &[(
                "Calc",
                vec![
                    formula(0, 0, 0, string_cached),
                    string_result(" total "),
                    formula(0, 1, 1, 43831.0f64.to_le_bytes()),
                    formula(0, 2, 0, bool_cached),
                    formula(0, 3, 0, error_cached),
                ],
            )],
        );
        let table = reader(stream, SessionConfig::default()).process_all_sheets().unwrap();
        assert_eq!(
            table.into_rows(),
            vec![vec![
                text("total"),
                text("2020-01-01"),
                text("TRUE"),
                text("\"ERROR:#DIV/0!\""),
            ]]
        );
    }

    #[test]
    fn test_blanks_and_booleans() {
        let stream = workbook(
            &[],
            &[(
                "S",
                vec![
                    cell(BLANK, 0, 0, 0, &[]),
                    record(MULBLANK, &[0, 0, 1, 0, 0, 0, 0, 0, 2, 0]),
                    cell(BOOLERR, 0, 3, 0, &[0, 0]),
                ],
            )],
        );
        let table = reader(stream, SessionConfig::default()).process_all_sheets().unwrap();
        assert_eq!(table.into_rows(), vec![vec![None, None, None, text("FALSE")]]);
    }

    #[test]
    fn test_sheet_selection_skips_charts() {
        let sheets = vec![
            ("One", vec![label(0, 0, "one")]),
            ("#Chart", vec![label(0, 0, "chart")]),
            ("Two", vec![label(0, 0, "two-a"), label(1, 0, "two-b")]),
            ("Three", vec![label(0, 0, "three")]),
        ];
        let stream = workbook(&[], &sheets);
        let reader = reader(stream, SessionConfig::default());
        assert_eq!(reader.sheet_count().unwrap(), 3);
        assert_eq!(
            reader.process_one_sheet(2).unwrap().into_rows(),
            vec![vec![text("two-a")], vec![text("two-b")]]
        );
        assert_eq!(reader.process_all_sheets().unwrap().len(), 4);
        assert_eq!(reader.process_one_sheet(4), Err(Error::SheetNotFound(4)));
        assert_eq!(reader.process_one_sheet(0), Err(Error::SheetNotFound(0)));
    }

    #[test]
    fn test_row_window() {
        let rows: Vec<Vec<u8>> = (0..5).map(|row| label(row, 0, &format!("r{row}"))).collect();
        let stream = workbook(&[], &[("S", rows)]);
        let config = SessionConfig::new().with_begin_row(2).with_row_count(Some(2));
        let table = reader(stream, config).process_all_sheets().unwrap();
        assert_eq!(table.into_rows(), vec![vec![text("r1")], vec![text("r2")]]);
    }

    #[test]
    fn test_datemode_1904() {
        let stream = workbook(
            &[record(DATEMODE, &[1, 0]), xf(14)],
            &[("S", vec![number(0, 0, 0, 0.0)])],
        );
        let table = reader(stream, SessionConfig::default()).process_all_sheets().unwrap();
        assert_eq!(table.cell(0, 0), Some("1904-01-01"));
    }

    #[test]
    fn test_precondition_and_bad_streams() {
        assert!(matches!(
            XlsReader::default().process_all_sheets(),
            Err(Error::Precondition(_))
        ));
        let mut reader = XlsReader::default();
        assert!(reader.open(record(EOF, &[])).is_err());
        assert!(reader.open(Vec::new()).is_err());
    }
}
