//! Reader over the XML parts of a `.xlsx` workbook.
//!
//! Package handling is left to the caller: the reader takes the already
//! extracted part contents. Worksheets are replayed into a
//! [`ReferenceDrivenSession`], which infers gaps from cell references.

use std::ops::ControlFlow;

use crate::common::{Error, Result};
use crate::ooxml::xlsx::shared_strings::SharedStrings;
use crate::ooxml::xlsx::styles::Styles;
use crate::ooxml::xlsx::worksheet::{WorksheetOptions, read_worksheet};
use crate::sheet::{ReferenceDrivenSession, RowWindow, SessionConfig, SheetEvent, Table};

/// One worksheet part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetPart {
    pub name: Option<String>,
    pub xml: String,
}

/// The workbook parts a reconstruction needs, sheets in workbook order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XlsxParts {
    pub shared_strings: Option<String>,
    pub styles: Option<String>,
    pub sheets: Vec<SheetPart>,
}

impl XlsxParts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content of `xl/sharedStrings.xml`.
    pub fn with_shared_strings(mut self, xml: impl Into<String>) -> Self {
        self.shared_strings = Some(xml.into());
        self
    }

    /// Content of `xl/styles.xml`.
    pub fn with_styles(mut self, xml: impl Into<String>) -> Self {
        self.styles = Some(xml.into());
        self
    }

    /// Append a worksheet part.
    pub fn with_sheet(mut self, name: Option<&str>, xml: impl Into<String>) -> Self {
        self.sheets.push(SheetPart {
            name: name.map(str::to_string),
            xml: xml.into(),
        });
        self
    }
}

#[derive(Debug, Clone)]
struct OpenWorkbook {
    strings: SharedStrings,
    styles: Styles,
    sheets: Vec<SheetPart>,
}

/// Reader for SpreadsheetML workbooks.
///
/// # Examples
///
/// ```
/// use gridfold::ooxml::xlsx::{XlsxParts, XlsxReader};
/// use gridfold::sheet::SessionConfig;
///
/// let sheet = r#"<worksheet><sheetData>
///     <row r="1"><c r="A1" t="inlineStr"><is><t>id</t></is></c><c r="C1" t="inlineStr"><is><t>name</t></is></c></row>
///     <row r="2"><c r="A2"><v>7</v></c></row>
/// </sheetData></worksheet>"#;
///
/// let mut reader = XlsxReader::new(SessionConfig::new());
/// reader.open(XlsxParts::new().with_sheet(Some("Sheet1"), sheet))?;
/// let table = reader.process_all_sheets()?;
/// assert_eq!(table.cell(0, 2), Some("name"));
/// assert_eq!(table.cell(1, 0), Some("7"));
/// assert_eq!(table.get(1).map(|row| row.len()), Some(3));
/// # Ok::<(), gridfold::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct XlsxReader {
    config: SessionConfig,
    options: WorksheetOptions,
    workbook: Option<OpenWorkbook>,
}

impl XlsxReader {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            options: WorksheetOptions::default(),
            workbook: None,
        }
    }

    /// Report formula cells by their formula text.
    pub fn with_formula_text(mut self, formula_text: bool) -> Self {
        self.options.formula_text = formula_text;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Parse the lookup parts and keep the worksheets for processing.
    pub fn open(&mut self, parts: XlsxParts) -> Result<()> {
        let strings = match parts.shared_strings.as_deref() {
            Some(xml) => SharedStrings::parse(xml)?,
            None => SharedStrings::new(),
        };
        let styles = match parts.styles.as_deref() {
            Some(xml) => Styles::parse(xml)?,
            None => Styles::new(),
        };
        log::debug!("opened workbook with {} worksheets", parts.sheets.len());
        self.workbook = Some(OpenWorkbook {
            strings,
            styles,
            sheets: parts.sheets,
        });
        Ok(())
    }

    pub fn sheet_count(&self) -> Result<usize> {
        Ok(self.workbook()?.sheets.len())
    }

    /// Reconstruct every sheet the configuration selects.
    pub fn process_all_sheets(&self) -> Result<Table> {
        self.reconstruct(&self.config)
    }

    /// Reconstruct only the sheet with 1-based id `id`.
    pub fn process_one_sheet(&self, id: u32) -> Result<Table> {
        if id == 0 || id as usize > self.workbook()?.sheets.len() {
            return Err(Error::SheetNotFound(id));
        }
        let config = self.config.clone().with_selected_sheet(Some(id));
        self.reconstruct(&config)
    }

    fn workbook(&self) -> Result<&OpenWorkbook> {
        self.workbook
            .as_ref()
            .ok_or_else(|| Error::Precondition("no workbook has been opened".to_string()))
    }

    fn reconstruct(&self, config: &SessionConfig) -> Result<Table> {
        let workbook = self.workbook()?;
        let window = RowWindow::from_config(config);
        let mut session = ReferenceDrivenSession::new(config)
            .with_shared_strings(&workbook.strings)
            .with_styles(&workbook.styles);

        for (index, sheet) in workbook.sheets.iter().enumerate() {
            let index = u32::try_from(index).unwrap_or(u32::MAX);
            session.handle(SheetEvent::SheetBegin {
                name: sheet.name.clone(),
            })?;
            if window.selects_sheet(index) {
                read_worksheet(&sheet.xml, self.options, |event| {
                    let stop = matches!(event, SheetEvent::RowEnd { row } if window.exhausted_after(row));
                    session.handle(event)?;
                    Ok(if stop {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    })
                })?;
            }
            session.handle(SheetEvent::SheetEnd)?;

            if window.sheets_exhausted_after(index) {
                break;
            }
        }
        Ok(session.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRINGS: &str = r#"<sst><si><t>name</t></si><si><t>amount</t></si><si><t>when</t></si><si><t> Ada </t></si></sst>"#;

    const STYLES: &str = r#"<styleSheet>
        <numFmts><numFmt numFmtId="164" formatCode="0.00"/></numFmts>
        <cellXfs><xf numFmtId="0"/><xf numFmtId="14"/><xf numFmtId="164"/></cellXfs>
    </styleSheet>"#;

    const FIRST: &str = r#"<worksheet><sheetData>
        <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="D1" t="s"><v>2</v></c></row>
        <row r="2"><c r="A2" t="s"><v>3</v></c><c r="B2" s="2"><v>12.5</v></c><c r="D2" s="1"><v>43831</v></c></row>
        <row r="3"><c r="B3" t="b"><v>0</v></c></row>
        <row r="5"><c r="A5" t="s"><v>9</v></c></row>
    </sheetData></worksheet>"#;

    const SECOND: &str = r#"<worksheet><sheetData>
        <row r="1"><c r="A1" t="inlineStr"><is><t>other</t></is></c></row>
    </sheetData></worksheet>"#;

    fn reader(config: SessionConfig) -> XlsxReader {
        let mut reader = XlsxReader::new(config);
        reader
            .open(
                XlsxParts::new()
                    .with_shared_strings(STRINGS)
                    .with_styles(STYLES)
                    .with_sheet(Some("Data"), FIRST)
                    .with_sheet(Some("Other"), SECOND),
            )
            .unwrap();
        reader
    }

    fn texts(table: &Table) -> Vec<Vec<Option<&str>>> {
        table
            .iter()
            .map(|row| row.iter().map(|cell| cell.as_deref()).collect())
            .collect()
    }

    #[test]
    fn test_first_sheet_reconstruction() {
        let table = reader(SessionConfig::new()).process_one_sheet(1).unwrap();
        assert_eq!(
            texts(&table),
            vec![
                vec![Some("name"), Some("amount"), None, Some("when")],
                vec![Some("Ada"), Some("12.50"), None, Some("2020-01-01")],
                vec![None, Some("FALSE"), None, None],
                vec![None, None, None, None],
            ]
        );
    }

    #[test]
    fn test_all_sheets_share_header_width() {
        let table = reader(SessionConfig::new()).process_all_sheets().unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(texts(&table)[4], vec![Some("other"), None, None, None]);
    }

    #[test]
    fn test_row_window_stops_early() {
        let table = reader(SessionConfig::new().with_begin_row(2).with_row_count(Some(2)))
            .process_one_sheet(1)
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 0), Some("Ada"));
        assert_eq!(table.cell(1, 1), Some("FALSE"));
    }

    #[test]
    fn test_formula_text_mode() {
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1"><f>SUM(B1:C1)</f><v>3</v></c><c r="B1"><v>1</v></c></row>
        </sheetData></worksheet>"#;
        let mut plain = XlsxReader::new(SessionConfig::new());
        plain.open(XlsxParts::new().with_sheet(None, sheet)).unwrap();
        assert_eq!(plain.process_all_sheets().unwrap().cell(0, 0), Some("3"));

        let mut formulas = XlsxReader::new(SessionConfig::new()).with_formula_text(true);
        formulas.open(XlsxParts::new().with_sheet(None, sheet)).unwrap();
        assert_eq!(
            formulas.process_all_sheets().unwrap().cell(0, 0),
            Some("\"SUM(B1:C1)\"")
        );
    }

    #[test]
    fn test_preconditions_and_unknown_sheet() {
        let unopened = XlsxReader::new(SessionConfig::new());
        assert!(matches!(unopened.process_all_sheets(), Err(Error::Precondition(_))));
        let reader = reader(SessionConfig::new());
        assert_eq!(reader.sheet_count().unwrap(), 2);
        assert!(matches!(reader.process_one_sheet(0), Err(Error::SheetNotFound(0))));
        assert!(matches!(reader.process_one_sheet(3), Err(Error::SheetNotFound(3))));
    }

    #[test]
    fn test_malformed_part_is_rejected() {
        let mut reader = XlsxReader::new(SessionConfig::new());
        let parts = XlsxParts::new().with_shared_strings("<sst><si><t>x</sst>");
        assert!(matches!(reader.open(parts), Err(Error::Xml(_))));
    }
}
