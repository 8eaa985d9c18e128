//! Type-directed cell value formatting.
//!
//! [`CellFormatter`] turns a raw value, its [`TypeTag`] and the number format
//! attached to the cell into the display string stored in the table. Checks
//! run in a fixed order: booleans, errors and formulas come before numeric
//! handling because their raw encodings overlap with numbers.
//!
//! Conventions for empty values:
//! - string cells are trimmed and an empty result becomes `None`
//! - a number whose pattern renders nothing stays `Some("")`
//! - blank and missing cells are `None`

mod builtin;
mod date;
mod number;

pub use builtin::{FIRST_CUSTOM_FORMAT_ID, builtin_format};
pub use date::{SectionKind, SerialDateTime, classify_section, is_date_format, iso_date};
pub use number::{format_general, format_number};

use crate::common::Error;
use crate::sheet::event::{RawValue, SharedStringSource, TypeTag};

/// The pattern that is rendered as an ISO `yyyy-MM-dd` date instead of
/// being interpreted.
pub const ISO_DATE_PATTERN: &str = "m/d/yy";

/// Outcome of formatting one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formatted {
    /// Final display value
    Value(Option<String>),
    /// A formula whose text result arrives with the next string event
    AwaitStringResult,
}

impl Formatted {
    /// Display value, treating a pending formula result as empty.
    pub fn into_value(self) -> Option<String> {
        match self {
            Formatted::Value(value) => value,
            Formatted::AwaitStringResult => None,
        }
    }
}

/// Stateless formatter for cell values.
///
/// # Examples
///
/// ```
/// use gridfold::sheet::format::CellFormatter;
/// use gridfold::sheet::{RawValue, TypeTag};
///
/// let formatter = CellFormatter::new();
/// let value = formatter.format_value(TypeTag::Number, &RawValue::Number(43831.0), Some(14), None);
/// assert_eq!(value.as_deref(), Some("2020-01-01"));
/// ```
#[derive(Clone, Copy, Default)]
pub struct CellFormatter<'a> {
    shared_strings: Option<&'a dyn SharedStringSource>,
    date_1904: bool,
}

impl std::fmt::Debug for CellFormatter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellFormatter")
            .field(
                "shared_strings",
                &self.shared_strings.map(|s| s.shared_string_count()),
            )
            .field("date_1904", &self.date_1904)
            .finish()
    }
}

impl<'a> CellFormatter<'a> {
    /// Formatter with no shared string table and the 1900 date system.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve shared string indices through `source`.
    pub fn with_shared_strings(mut self, source: &'a dyn SharedStringSource) -> Self {
        self.shared_strings = Some(source);
        self
    }

    /// Use the 1904 date system for serial dates.
    pub fn with_date_1904(mut self, date_1904: bool) -> Self {
        self.date_1904 = date_1904;
        self
    }

    pub fn date_1904(&self) -> bool {
        self.date_1904
    }

    /// Format a cell.
    ///
    /// `format_pattern` wins over `format_index`; an index with no pattern
    /// uses the built-in code, and neither means `General`.
    pub fn format(
        &self,
        type_tag: TypeTag,
        raw: &RawValue,
        format_index: Option<u16>,
        format_pattern: Option<&str>,
    ) -> Formatted {
        let pattern = format_pattern
            .or_else(|| format_index.and_then(builtin_format))
            .unwrap_or("General");

        let value = match type_tag {
            TypeTag::Bool => format_bool(raw),
            TypeTag::Error => Some(format!("\"ERROR:{}\"", raw.as_text())),
            TypeTag::Formula => Some(format!("\"{}\"", raw.as_text())),
            TypeTag::FormulaString => {
                if raw.as_number().is_some_and(f64::is_nan) {
                    return Formatted::AwaitStringResult;
                }
                self.format_numeric(raw, pattern)
            },
            TypeTag::InlineString => non_empty_trimmed(&raw.as_text()),
            TypeTag::SharedStringIndex => self.resolve_shared(raw),
            TypeTag::Number => self.format_numeric(raw, pattern),
            TypeTag::Date => self.format_date(raw, format_pattern),
            TypeTag::Blank | TypeTag::Missing => None,
        };
        Formatted::Value(value)
    }

    /// [`format`](Self::format) for callers that do not track formula lookahead.
    pub fn format_value(
        &self,
        type_tag: TypeTag,
        raw: &RawValue,
        format_index: Option<u16>,
        format_pattern: Option<&str>,
    ) -> Option<String> {
        self.format(type_tag, raw, format_index, format_pattern)
            .into_value()
    }

    fn resolve_shared(&self, raw: &RawValue) -> Option<String> {
        let index = match raw {
            RawValue::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as usize),
            RawValue::Text(text) => atoi_simd::parse::<usize>(text.trim().as_bytes()).ok(),
            _ => None,
        };
        let Some(index) = index else {
            log::warn!(
                "{}",
                Error::MalformedReference(format!("shared string index {:?}", raw.as_text()))
            );
            return None;
        };
        let Some(table) = self.shared_strings else {
            log::warn!(
                "{}",
                Error::SharedStringResolution { index, len: 0 }
            );
            return None;
        };
        match table.resolve_shared_string(index) {
            Some(text) => non_empty_trimmed(text),
            None => {
                log::warn!(
                    "{}",
                    Error::SharedStringResolution {
                        index,
                        len: table.shared_string_count(),
                    }
                );
                None
            },
        }
    }

    fn format_numeric(&self, raw: &RawValue, pattern: &str) -> Option<String> {
        let Some(value) = parse_number(raw) else {
            return Some(raw.as_text().into_owned());
        };
        if pattern == ISO_DATE_PATTERN
            && let Some(date) = iso_date(value, self.date_1904)
        {
            return Some(date);
        }
        Some(format_number(value, pattern, self.date_1904).trim().to_string())
    }

    fn format_date(&self, raw: &RawValue, pattern: Option<&str>) -> Option<String> {
        let Some(value) = parse_number(raw) else {
            return Some(raw.as_text().into_owned());
        };
        let rendered = match pattern {
            None | Some(ISO_DATE_PATTERN) => iso_date(value, self.date_1904),
            Some(_) => None,
        }
        .unwrap_or_else(|| format_number(value, pattern.unwrap_or("General"), self.date_1904));
        Some(rendered.chars().filter(|c| !c.is_whitespace()).collect())
    }
}

fn format_bool(raw: &RawValue) -> Option<String> {
    let truthy = match raw {
        RawValue::Bool(b) => *b,
        RawValue::Number(n) => *n != 0.0,
        RawValue::Text(text) => match text.chars().next() {
            Some(first) => first != '0',
            None => return None,
        },
    };
    Some(if truthy { "TRUE" } else { "FALSE" }.to_string())
}

fn non_empty_trimmed(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_number(raw: &RawValue) -> Option<f64> {
    let value = raw.as_number();
    if value.is_none() {
        log::warn!("{}", Error::NumericParse(raw.as_text().into_owned()));
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> Vec<String> {
        vec!["  alpha ".to_string(), "   ".to_string(), "beta".to_string()]
    }

    #[test]
    fn test_bool_formatting() {
        let f = CellFormatter::new();
        assert_eq!(f.format_value(TypeTag::Bool, &"0".into(), None, None).as_deref(), Some("FALSE"));
        assert_eq!(f.format_value(TypeTag::Bool, &"1".into(), None, None).as_deref(), Some("TRUE"));
        assert_eq!(f.format_value(TypeTag::Bool, &"true".into(), None, None).as_deref(), Some("TRUE"));
        assert_eq!(f.format_value(TypeTag::Bool, &false.into(), None, None).as_deref(), Some("FALSE"));
        assert_eq!(f.format_value(TypeTag::Bool, &"".into(), None, None), None);
    }

    #[test]
    fn test_error_and_formula_are_quoted() {
        let f = CellFormatter::new();
        assert_eq!(
            f.format_value(TypeTag::Error, &"#DIV/0!".into(), None, None).as_deref(),
            Some("\"ERROR:#DIV/0!\"")
        );
        assert_eq!(
            f.format_value(TypeTag::Formula, &"SUM(A1:A3)".into(), None, None).as_deref(),
            Some("\"SUM(A1:A3)\"")
        );
    }

    #[test]
    fn test_formula_string_lookahead() {
        let f = CellFormatter::new();
        assert_eq!(
            f.format(TypeTag::FormulaString, &f64::NAN.into(), None, None),
            Formatted::AwaitStringResult
        );
        assert_eq!(
            f.format(TypeTag::FormulaString, &6.0.into(), None, None),
            Formatted::Value(Some("6".to_string()))
        );
    }

    #[test]
    fn test_strings_trim_to_none() {
        let f = CellFormatter::new();
        assert_eq!(f.format_value(TypeTag::InlineString, &"  hi ".into(), None, None).as_deref(), Some("hi"));
        assert_eq!(f.format_value(TypeTag::InlineString, &" ".into(), None, None), None);
    }

    #[test]
    fn test_shared_string_resolution() {
        let table = shared();
        let f = CellFormatter::new().with_shared_strings(&table);
        assert_eq!(f.format_value(TypeTag::SharedStringIndex, &"0".into(), None, None).as_deref(), Some("alpha"));
        assert_eq!(f.format_value(TypeTag::SharedStringIndex, &"1".into(), None, None), None);
        assert_eq!(f.format_value(TypeTag::SharedStringIndex, &2.0.into(), None, None).as_deref(), Some("beta"));
        // Out of range and unparsable indices are recovered as empty cells.
        assert_eq!(f.format_value(TypeTag::SharedStringIndex, &"7".into(), None, None), None);
        assert_eq!(f.format_value(TypeTag::SharedStringIndex, &"x".into(), None, None), None);
        assert_eq!(CellFormatter::new().format_value(TypeTag::SharedStringIndex, &"0".into(), None, None), None);
    }

    #[test]
    fn test_number_formatting() {
        let f = CellFormatter::new();
        assert_eq!(f.format_value(TypeTag::Number, &"42".into(), None, None).as_deref(), Some("42"));
        assert_eq!(f.format_value(TypeTag::Number, &1234.5.into(), Some(4), None).as_deref(), Some("1,234.50"));
        assert_eq!(
            f.format_value(TypeTag::Number, &"0.5".into(), Some(170), Some("0.0%")).as_deref(),
            Some("50.0%")
        );
        // Padding directives leave trailing space that is trimmed away.
        assert_eq!(f.format_value(TypeTag::Number, &12.0.into(), Some(37), None).as_deref(), Some("12"));
        assert_eq!(f.format_value(TypeTag::Number, &0.0.into(), None, Some("0;-0;")).as_deref(), Some(""));
    }

    #[test]
    fn test_number_with_iso_date_pattern() {
        let f = CellFormatter::new();
        assert_eq!(
            f.format_value(TypeTag::Number, &43831.25.into(), None, Some("m/d/yy")).as_deref(),
            Some("2020-01-01")
        );
        assert_eq!(
            f.format_value(TypeTag::Number, &43831.0.into(), Some(15), None).as_deref(),
            Some("1-Jan-20")
        );
        let f1904 = CellFormatter::new().with_date_1904(true);
        assert_eq!(
            f1904.format_value(TypeTag::Number, &0.0.into(), Some(14), None).as_deref(),
            Some("1904-01-01")
        );
    }

    #[test]
    fn test_unparsable_number_passes_through() {
        let f = CellFormatter::new();
        assert_eq!(f.format_value(TypeTag::Number, &"n/a ".into(), Some(2), None).as_deref(), Some("n/a "));
        assert_eq!(f.format_value(TypeTag::Date, &"soon".into(), None, None).as_deref(), Some("soon"));
    }

    #[test]
    fn test_date_strips_whitespace() {
        let f = CellFormatter::new();
        assert_eq!(f.format_value(TypeTag::Date, &43831.0.into(), None, None).as_deref(), Some("2020-01-01"));
        assert_eq!(
            f.format_value(TypeTag::Date, &43831.5.into(), Some(22), Some("m/d/yy h:mm")).as_deref(),
            Some("1/1/2012:00")
        );
        assert_eq!(
            f.format_value(TypeTag::Date, &43831.0.into(), None, Some("d mmm yyyy")).as_deref(),
            Some("1Jan2020")
        );
    }

    #[test]
    fn test_blank_and_missing() {
        let f = CellFormatter::new();
        assert_eq!(f.format(TypeTag::Blank, &"".into(), Some(0), None), Formatted::Value(None));
        assert_eq!(f.format(TypeTag::Missing, &"".into(), None, None), Formatted::Value(None));
    }
}
