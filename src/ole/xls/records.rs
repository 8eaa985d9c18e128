//! BIFF8 record framing and cell record decoding.
//!
//! A workbook stream is a flat sequence of records, each a 4-byte header
//! (type, payload length) followed by the payload. Worksheet cells are
//! spread over a handful of record types; this module turns them into
//! [`CellRecord`]s and leaves interpretation to the reader.

use crate::common::binary::{
    BinaryError, read_f64_le, read_u8, read_u16_le, read_u32_le, read_utf16le,
};
use crate::common::{Error, Result};
use crate::ole::codepage::Codepage;

pub const BOF: u16 = 0x0809;
pub const EOF: u16 = 0x000A;
pub const BOUNDSHEET: u16 = 0x0085;
pub const SST: u16 = 0x00FC;
pub const CONTINUE: u16 = 0x003C;
pub const CODEPAGE: u16 = 0x0042;
pub const DATEMODE: u16 = 0x0022;
pub const FORMAT: u16 = 0x041E;
pub const XF: u16 = 0x00E0;

pub const BLANK: u16 = 0x0201;
pub const MULBLANK: u16 = 0x00BE;
pub const NUMBER: u16 = 0x0203;
pub const LABEL: u16 = 0x0204;
pub const BOOLERR: u16 = 0x0205;
pub const RK: u16 = 0x027E;
pub const MULRK: u16 = 0x00BD;
pub const LABELSST: u16 = 0x00FD;
pub const FORMULA: u16 = 0x0006;
pub const STRING: u16 = 0x0207;

/// BOF substream types.
pub const SUBSTREAM_GLOBALS: u16 = 0x0005;
pub const SUBSTREAM_WORKSHEET: u16 = 0x0010;

/// BIFF record header (4 bytes: type + length)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub record_type: u16,
    pub data_len: u16,
}

impl RecordHeader {
    pub const SIZE: usize = 4;

    pub fn parse(data: &[u8], offset: usize) -> Result<Self> {
        Ok(Self {
            record_type: read_u16_le(data, offset)?,
            data_len: read_u16_le(data, offset + 2)?,
        })
    }
}

/// A record borrowed from the workbook stream.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub record_type: u16,
    /// Stream offset of the record header
    pub offset: usize,
    pub data: &'a [u8],
}

/// Iterator over the records of a workbook stream.
#[derive(Debug, Clone)]
pub struct RecordIter<'a> {
    stream: &'a [u8],
    position: usize,
}

impl<'a> RecordIter<'a> {
    pub fn new(stream: &'a [u8]) -> Self {
        Self::at(stream, 0)
    }

    /// Start iterating at an absolute stream offset.
    pub fn at(stream: &'a [u8], position: usize) -> Self {
        Self { stream, position }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Type of the next record without consuming it.
    pub fn peek_type(&self) -> Option<u16> {
        read_u16_le(self.stream, self.position).ok()
    }

    fn read_record(&mut self) -> Result<Record<'a>> {
        let header = RecordHeader::parse(self.stream, self.position)?;
        let start = self.position + RecordHeader::SIZE;
        let end = start + usize::from(header.data_len);
        let data = self.stream.get(start..end).ok_or_else(|| Error::InvalidRecord {
            record_type: header.record_type,
            message: format!(
                "payload of {} bytes at offset {} runs past the stream end",
                header.data_len, self.position
            ),
        })?;
        let record = Record {
            record_type: header.record_type,
            offset: self.position,
            data,
        };
        self.position = end;
        Ok(record)
    }
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = Result<Record<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position + RecordHeader::SIZE > self.stream.len() {
            return None;
        }
        let record = self.read_record();
        if record.is_err() {
            // A broken frame makes every later offset meaningless.
            self.position = self.stream.len();
        }
        Some(record)
    }
}

fn too_short(record_type: u16, expected: usize, found: usize) -> Error {
    Error::InvalidRecord {
        record_type,
        message: format!("expected at least {expected} bytes, found {found}"),
    }
}

fn ensure_len(record_type: u16, data: &[u8], expected: usize) -> Result<()> {
    if data.len() < expected {
        return Err(too_short(record_type, expected, data.len()));
    }
    Ok(())
}

/// BOF record: BIFF version and substream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BofRecord {
    pub version: u16,
    pub substream: u16,
}

impl BofRecord {
    pub fn parse(data: &[u8]) -> Result<Self> {
        ensure_len(BOF, data, 4)?;
        Ok(Self {
            version: read_u16_le(data, 0)?,
            substream: read_u16_le(data, 2)?,
        })
    }

    pub fn is_biff8(&self) -> bool {
        self.version == 0x0600
    }
}

/// BOUNDSHEET record: one sheet of the workbook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundSheet {
    /// Stream offset of the sheet's BOF
    pub position: u32,
    /// 0 worksheet, 1 macro sheet, 2 chart, 6 VB module
    pub sheet_type: u8,
    pub name: String,
}

impl BoundSheet {
    pub fn parse(data: &[u8], codepage: &Codepage) -> Result<Self> {
        ensure_len(BOUNDSHEET, data, 8)?;
        let (name, _) = parse_short_string(data, 6, codepage)?;
        Ok(Self {
            position: read_u32_le(data, 0)?,
            sheet_type: read_u8(data, 5)?,
            name,
        })
    }

    pub fn is_worksheet(&self) -> bool {
        self.sheet_type == 0
    }
}

/// Read the characters of an XLUnicodeString body.
///
/// `option` bit 0 selects 16-bit characters; bits 2 and 3 announce phonetic
/// and rich-text trailers, which are skipped.
fn parse_string_body(
    data: &[u8],
    offset: usize,
    char_count: usize,
    codepage: &Codepage,
) -> Result<(String, usize)> {
    let option = read_u8(data, offset)?;
    let mut cursor = offset + 1;
    let runs = if option & 0x08 != 0 {
        let runs = usize::from(read_u16_le(data, cursor)?);
        cursor += 2;
        runs
    } else {
        0
    };
    let phonetic = if option & 0x04 != 0 {
        let len = read_u32_le(data, cursor)? as usize;
        cursor += 4;
        len
    } else {
        0
    };

    let text = if option & 0x01 != 0 {
        let text = read_utf16le(data, cursor, char_count)?;
        cursor += char_count * 2;
        text
    } else {
        let bytes = data
            .get(cursor..cursor + char_count)
            .ok_or(BinaryError::InsufficientData {
                expected: cursor + char_count,
                available: data.len(),
            })?;
        cursor += char_count;
        codepage.decode(bytes)
    };
    cursor += runs * 4 + phonetic;
    Ok((text, cursor - offset))
}

/// XLUnicodeString (16-bit count) at `offset`; returns text and bytes used.
pub fn parse_unicode_string(
    data: &[u8],
    offset: usize,
    codepage: &Codepage,
) -> Result<(String, usize)> {
    let char_count = usize::from(read_u16_le(data, offset)?);
    let (text, used) = parse_string_body(data, offset + 2, char_count, codepage)?;
    Ok((text, used + 2))
}

/// ShortXLUnicodeString (8-bit count) at `offset`.
pub fn parse_short_string(
    data: &[u8],
    offset: usize,
    codepage: &Codepage,
) -> Result<(String, usize)> {
    let char_count = usize::from(read_u8(data, offset)?);
    let (text, used) = parse_string_body(data, offset + 1, char_count, codepage)?;
    Ok((text, used + 1))
}

/// Decode an RK number.
///
/// Bit 0 divides by 100, bit 1 marks a 30-bit signed integer; otherwise the
/// upper 30 bits are the high bits of an IEEE double.
///
/// # Examples
///
/// ```
/// use gridfold::ole::xls::decode_rk;
/// assert_eq!(decode_rk(0x0000_0192), 100.0); // 100 << 2 | int
/// assert_eq!(decode_rk(0x0000_0193), 1.0); // 100 << 2 | int | /100
/// assert_eq!(decode_rk(0x3FF0_0000), 1.0);
/// ```
pub fn decode_rk(rk: u32) -> f64 {
    let value = if rk & 0x02 != 0 {
        f64::from((rk as i32) >> 2)
    } else {
        f64::from_bits(u64::from(rk & 0xFFFF_FFFC) << 32)
    };
    if rk & 0x01 != 0 { value / 100.0 } else { value }
}

/// Text of a BIFF error code.
pub fn error_text(code: u8) -> &'static str {
    match code {
        0x00 => "#NULL!",
        0x07 => "#DIV/0!",
        0x0F => "#VALUE!",
        0x17 => "#REF!",
        0x1D => "#NAME?",
        0x24 => "#NUM!",
        0x2A => "#N/A",
        0x2B => "#GETTING_DATA",
        _ => "#UNKNOWN!",
    }
}

/// Cached result of a FORMULA record.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaResult {
    Number(f64),
    /// Text follows in a STRING record
    String,
    Bool(bool),
    Error(u8),
    EmptyString,
}

impl FormulaResult {
    fn parse(value: &[u8]) -> Result<Self> {
        if read_u16_le(value, 6)? != 0xFFFF {
            return Ok(Self::Number(read_f64_le(value, 0)?));
        }
        match read_u8(value, 0)? {
            0x00 => Ok(Self::String),
            0x01 => Ok(Self::Bool(read_u8(value, 2)? != 0)),
            0x02 => Ok(Self::Error(read_u8(value, 2)?)),
            0x03 => Ok(Self::EmptyString),
            other => Err(Error::InvalidRecord {
                record_type: FORMULA,
                message: format!("unknown cached result type {other}"),
            }),
        }
    }
}

/// One decoded cell-bearing record.
#[derive(Debug, Clone, PartialEq)]
pub enum CellRecord {
    Blank { row: u16, col: u16, xf: u16 },
    MulBlank { row: u16, first_col: u16, xfs: Vec<u16> },
    Number { row: u16, col: u16, xf: u16, value: f64 },
    MulRk { row: u16, first_col: u16, values: Vec<(u16, f64)> },
    Label { row: u16, col: u16, xf: u16, value: String },
    LabelSst { row: u16, col: u16, xf: u16, index: u32 },
    Bool { row: u16, col: u16, value: bool },
    Error { row: u16, col: u16, code: u8 },
    Formula { row: u16, col: u16, xf: u16, result: FormulaResult },
    /// STRING record: text result of the preceding formula
    StringResult(String),
}

impl CellRecord {
    /// Decode `record` if it is one of the cell record types.
    pub fn parse(record: &Record<'_>, codepage: &Codepage) -> Result<Option<Self>> {
        let data = record.data;
        let cell = match record.record_type {
            BLANK => {
                ensure_len(BLANK, data, 6)?;
                let (row, col, xf) = cell_header(data)?;
                Self::Blank { row, col, xf }
            },
            MULBLANK => {
                ensure_len(MULBLANK, data, 6)?;
                let xfs = (4..data.len() - 2)
                    .step_by(2)
                    .map(|offset| read_u16_le(data, offset))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Self::MulBlank {
                    row: read_u16_le(data, 0)?,
                    first_col: read_u16_le(data, 2)?,
                    xfs,
                }
            },
            NUMBER => {
                ensure_len(NUMBER, data, 14)?;
                let (row, col, xf) = cell_header(data)?;
                Self::Number {
                    row,
                    col,
                    xf,
                    value: read_f64_le(data, 6)?,
                }
            },
            RK => {
                ensure_len(RK, data, 10)?;
                let (row, col, xf) = cell_header(data)?;
                Self::Number {
                    row,
                    col,
                    xf,
                    value: decode_rk(read_u32_le(data, 6)?),
                }
            },
            MULRK => {
                ensure_len(MULRK, data, 12)?;
                // rgrkrec: 6-byte (xf, rk) pairs, then the last column
                let values = (4..data.len() - 2)
                    .step_by(6)
                    .take((data.len() - 6) / 6)
                    .map(|offset| -> Result<(u16, f64)> {
                        let xf = read_u16_le(data, offset)?;
                        Ok((xf, decode_rk(read_u32_le(data, offset + 2)?)))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Self::MulRk {
                    row: read_u16_le(data, 0)?,
                    first_col: read_u16_le(data, 2)?,
                    values,
                }
            },
            LABEL => {
                ensure_len(LABEL, data, 9)?;
                let (row, col, xf) = cell_header(data)?;
                let (value, _) = parse_unicode_string(data, 6, codepage)?;
                Self::Label { row, col, xf, value }
            },
            LABELSST => {
                ensure_len(LABELSST, data, 10)?;
                let (row, col, xf) = cell_header(data)?;
                Self::LabelSst {
                    row,
                    col,
                    xf,
                    index: read_u32_le(data, 6)?,
                }
            },
            BOOLERR => {
                ensure_len(BOOLERR, data, 8)?;
                let (row, col, _) = cell_header(data)?;
                let value = read_u8(data, 6)?;
                if read_u8(data, 7)? == 0 {
                    Self::Bool {
                        row,
                        col,
                        value: value != 0,
                    }
                } else {
                    Self::Error { row, col, code: value }
                }
            },
            FORMULA => {
                ensure_len(FORMULA, data, 20)?;
                let (row, col, xf) = cell_header(data)?;
                Self::Formula {
                    row,
                    col,
                    xf,
                    result: FormulaResult::parse(&data[6..14])?,
                }
            },
            STRING => {
                ensure_len(STRING, data, 3)?;
                let (value, _) = parse_unicode_string(data, 0, codepage)?;
                Self::StringResult(value)
            },
            _ => return Ok(None),
        };
        Ok(Some(cell))
    }

    /// Row and first column of the record, if it is positioned.
    pub fn position(&self) -> Option<(u16, u16)> {
        match self {
            Self::Blank { row, col, .. }
            | Self::Number { row, col, .. }
            | Self::Label { row, col, .. }
            | Self::LabelSst { row, col, .. }
            | Self::Bool { row, col, .. }
            | Self::Error { row, col, .. }
            | Self::Formula { row, col, .. } => Some((*row, *col)),
            Self::MulBlank { row, first_col, .. } | Self::MulRk { row, first_col, .. } => {
                Some((*row, *first_col))
            },
            Self::StringResult(_) => None,
        }
    }
}

fn cell_header(data: &[u8]) -> Result<(u16, u16, u16)> {
    Ok((
        read_u16_le(data, 0)?,
        read_u16_le(data, 2)?,
        read_u16_le(data, 4)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_bytes(record_type: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(payload.len() + 4);
        out.extend_from_slice(&record_type.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn parse_one(record_type: u16, payload: &[u8]) -> CellRecord {
        let record = Record {
            record_type,
            offset: 0,
            data: payload,
        };
        CellRecord::parse(&record, &Codepage::default())
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_record_iter_frames() {
        let mut stream = record_bytes(BOF, &[0x00, 0x06, 0x05, 0x00]);
        stream.extend(record_bytes(EOF, &[]));
        let records: Vec<_> = RecordIter::new(&stream).collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record_type, BOF);
        assert_eq!(records[1].offset, 8);
        let bof = BofRecord::parse(records[0].data).unwrap();
        assert!(bof.is_biff8());
        assert_eq!(bof.substream, SUBSTREAM_GLOBALS);
    }

    #[test]
    fn test_truncated_record_is_an_error() {
        let mut stream = record_bytes(NUMBER, &[0u8; 14]);
        stream.truncate(10);
        let mut iter = RecordIter::new(&stream);
        assert!(matches!(iter.next(), Some(Err(Error::InvalidRecord { .. }))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_rk_decoding() {
        assert_eq!(decode_rk((7u32 << 2) | 0x02), 7.0);
        assert_eq!(decode_rk(((-5i32 << 2) as u32) | 0x02), -5.0);
        assert_eq!(decode_rk((1234u32 << 2) | 0x03), 12.34);
        // 2.5 = 0x4004_0000_0000_0000
        assert_eq!(decode_rk(0x4004_0000), 2.5);
        assert_eq!(decode_rk(0x4004_0001), 0.025);
    }

    #[test]
    fn test_formula_results() {
        let mut payload = vec![1, 0, 2, 0, 15, 0];
        payload.extend_from_slice(&42.5f64.to_le_bytes());
        payload.extend_from_slice(&[0u8; 6]);
        assert_eq!(
            parse_one(FORMULA, &payload),
            CellRecord::Formula {
                row: 1,
                col: 2,
                xf: 15,
                result: FormulaResult::Number(42.5)
            }
        );

        payload[6..14].copy_from_slice(&[0x02, 0, 0x07, 0, 0, 0, 0xFF, 0xFF]);
        assert!(matches!(
            parse_one(FORMULA, &payload),
            CellRecord::Formula {
                result: FormulaResult::Error(0x07),
                ..
            }
        ));
        payload[6] = 0x00;
        assert!(matches!(
            parse_one(FORMULA, &payload),
            CellRecord::Formula {
                result: FormulaResult::String,
                ..
            }
        ));
    }

    #[test]
    fn test_label_strings() {
        let mut payload = vec![0, 0, 1, 0, 15, 0, 3, 0, 0];
        payload.extend_from_slice(b"abc");
        assert_eq!(
            parse_one(LABEL, &payload),
            CellRecord::Label {
                row: 0,
                col: 1,
                xf: 15,
                value: "abc".to_string()
            }
        );

        let mut wide = vec![2, 0, 1];
        for unit in "日本".encode_utf16() {
            wide.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(parse_one(STRING, &wide), CellRecord::StringResult("日本".to_string()));
    }

    #[test]
    fn test_multiple_value_records() {
        // Row 3, columns 1..=2
        let mut mulrk = vec![3, 0, 1, 0];
        mulrk.extend_from_slice(&[15, 0]);
        mulrk.extend_from_slice(&((10u32 << 2) | 0x02).to_le_bytes());
        mulrk.extend_from_slice(&[16, 0]);
        mulrk.extend_from_slice(&0x3FF0_0000u32.to_le_bytes());
        mulrk.extend_from_slice(&[2, 0]);
        assert_eq!(
            parse_one(MULRK, &mulrk),
            CellRecord::MulRk {
                row: 3,
                first_col: 1,
                values: vec![(15, 10.0), (16, 1.0)]
            }
        );

        let mulblank = [0, 0, 2, 0, 15, 0, 15, 0, 15, 0, 4, 0];
        assert_eq!(
            parse_one(MULBLANK, &mulblank),
            CellRecord::MulBlank {
                row: 0,
                first_col: 2,
                xfs: vec![15, 15, 15]
            }
        );
    }

    #[test]
    fn test_boolerr_and_boundsheet() {
        assert_eq!(
            parse_one(BOOLERR, &[0, 0, 0, 0, 15, 0, 1, 0]),
            CellRecord::Bool {
                row: 0,
                col: 0,
                value: true
            }
        );
        assert_eq!(
            parse_one(BOOLERR, &[0, 0, 0, 0, 15, 0, 0x2A, 1]),
            CellRecord::Error {
                row: 0,
                col: 0,
                code: 0x2A
            }
        );
        assert_eq!(error_text(0x2A), "#N/A");

        let mut payload = vec![0x10, 0x02, 0, 0, 0, 0, 6, 0];
        payload.extend_from_slice(b"Sheet1");
        let sheet = BoundSheet::parse(&payload, &Codepage::default()).unwrap();
        assert_eq!(sheet.name, "Sheet1");
        assert_eq!(sheet.position, 0x0210);
        assert!(sheet.is_worksheet());
    }

    #[test]
    fn test_unknown_records_pass_through() {
        let record = Record {
            record_type: 0x0208,
            offset: 0,
            data: &[],
        };
        assert_eq!(CellRecord::parse(&record, &Codepage::default()).unwrap(), None);
    }
}
