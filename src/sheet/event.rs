//! Event vocabulary between decoders and the reconstruction session.
//!
//! Decoders push [`SheetEvent`]s in document order. Cell payloads arrive as a
//! [`CellEvent`]: where the cell sits, its undecorated value and the type tag
//! that decides how the value is rendered. Shared strings and cell styles are
//! not carried in events; the session asks the lookup services for them.

use std::borrow::Cow;

/// Raw cell payload as decoded from the source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Text exactly as stored (also used for numbers kept as text in XML)
    Text(String),
    /// Binary IEEE-754 value
    Number(f64),
    /// Boolean flag
    Bool(bool),
}

impl RawValue {
    /// Text view of the payload.
    ///
    /// Numbers render through `General`, booleans as `1`/`0`, matching how
    /// XML sources spell them.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            RawValue::Text(text) => Cow::Borrowed(text),
            RawValue::Number(n) => Cow::Owned(crate::sheet::format::format_general(*n)),
            RawValue::Bool(true) => Cow::Borrowed("1"),
            RawValue::Bool(false) => Cow::Borrowed("0"),
        }
    }

    /// Numeric view of the payload, parsing text when needed.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n),
            RawValue::Bool(b) => Some(f64::from(u8::from(*b))),
            RawValue::Text(text) => fast_float2::parse(text.trim()).ok(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

/// How a cell's raw value must be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Bool,
    /// Error literal such as `#DIV/0!`
    Error,
    /// Formula source text (or a cached text result shown verbatim)
    Formula,
    /// Formula with a cached result; NaN means a string result follows
    FormulaString,
    InlineString,
    /// Index into the shared string table
    SharedStringIndex,
    Number,
    Date,
    Blank,
    Missing,
}

/// Column position of a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellColumn {
    /// 0-based column index (binary sources)
    Index(u32),
    /// Letter reference such as `AC12` (XML sources)
    Reference(String),
}

/// One decoded cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellEvent {
    /// 0-based row within the sheet
    pub row: u32,
    pub column: CellColumn,
    pub raw: RawValue,
    pub type_tag: TypeTag,
    /// Number format id, when the decoder already resolved it
    pub format_index: Option<u16>,
    /// Number format code, when the decoder already resolved it
    pub format_pattern: Option<String>,
    /// Cell style index for the session to resolve through a [`StyleFormatSource`]
    pub style_index: Option<u32>,
}

impl CellEvent {
    /// Create a cell event with no format information.
    pub fn new(row: u32, column: CellColumn, raw: impl Into<RawValue>, type_tag: TypeTag) -> Self {
        Self {
            row,
            column,
            raw: raw.into(),
            type_tag,
            format_index: None,
            format_pattern: None,
            style_index: None,
        }
    }

    /// Cell at a 0-based column index.
    pub fn at_index(row: u32, column: u32, raw: impl Into<RawValue>, type_tag: TypeTag) -> Self {
        Self::new(row, CellColumn::Index(column), raw, type_tag)
    }

    /// Cell at a letter reference.
    pub fn at_reference(
        row: u32,
        reference: impl Into<String>,
        raw: impl Into<RawValue>,
        type_tag: TypeTag,
    ) -> Self {
        Self::new(row, CellColumn::Reference(reference.into()), raw, type_tag)
    }

    /// Set the resolved number format.
    pub fn with_format(mut self, index: u16, pattern: Option<String>) -> Self {
        self.format_index = Some(index);
        self.format_pattern = pattern;
        self
    }

    /// Set the style index to resolve later.
    pub fn with_style(mut self, style_index: u32) -> Self {
        self.style_index = Some(style_index);
        self
    }
}

/// Everything a decoder can tell the session, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetEvent {
    SheetBegin { name: Option<String> },
    RowBegin { row: u32 },
    Cell(CellEvent),
    /// A skipped column, signalled explicitly by the decoder
    MissingCell { row: u32, column: u32 },
    /// Text result of the preceding formula whose cached value was NaN
    FormulaStringResult(String),
    /// Last cell of the row has been delivered
    RowEnd { row: u32 },
    SheetEnd,
}

/// Read-only shared string table.
pub trait SharedStringSource: Sync {
    /// String at `index`, or `None` when the index is out of range.
    fn resolve_shared_string(&self, index: usize) -> Option<&str>;

    /// Number of strings in the table.
    fn shared_string_count(&self) -> usize;
}

impl SharedStringSource for [String] {
    fn resolve_shared_string(&self, index: usize) -> Option<&str> {
        self.get(index).map(String::as_str)
    }

    fn shared_string_count(&self) -> usize {
        self.len()
    }
}

impl SharedStringSource for Vec<String> {
    fn resolve_shared_string(&self, index: usize) -> Option<&str> {
        self.as_slice().resolve_shared_string(index)
    }

    fn shared_string_count(&self) -> usize {
        self.len()
    }
}

/// Number format a cell style resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleFormat {
    pub index: u16,
    /// Custom format code; `None` means the built-in code for `index`
    pub pattern: Option<String>,
}

/// Read-only cell style table.
pub trait StyleFormatSource: Sync {
    fn resolve_style_format(&self, style_index: u32) -> Option<StyleFormat>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_value_views() {
        assert_eq!(RawValue::from(" 12.5 ").as_number(), Some(12.5));
        assert_eq!(RawValue::from("abc").as_number(), None);
        assert_eq!(RawValue::from(true).as_number(), Some(1.0));
        assert_eq!(RawValue::from(3.0).as_text(), "3");
        assert_eq!(RawValue::from(false).as_text(), "0");
    }

    #[test]
    fn test_cell_event_builders() {
        let event = CellEvent::at_reference(0, "B1", "x", TypeTag::InlineString).with_style(3);
        assert_eq!(event.column, CellColumn::Reference("B1".to_string()));
        assert_eq!(event.style_index, Some(3));
        assert_eq!(event.format_index, None);

        let event = CellEvent::at_index(2, 4, 1.0, TypeTag::Number).with_format(14, None);
        assert_eq!(event.format_index, Some(14));
        assert_eq!(event.column, CellColumn::Index(4));
    }

    #[test]
    fn test_vec_shared_strings() {
        let table = vec!["a".to_string(), "b".to_string()];
        assert_eq!(table.resolve_shared_string(1), Some("b"));
        assert_eq!(table.resolve_shared_string(2), None);
        assert_eq!(table.shared_string_count(), 2);
    }
}
