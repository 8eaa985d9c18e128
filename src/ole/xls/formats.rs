//! Number formats referenced by cell XF indices.

use std::collections::HashMap;

use crate::common::binary::read_u16_le;
use crate::common::Result;
use crate::ole::codepage::Codepage;
use crate::ole::xls::records::parse_unicode_string;
use crate::sheet::{StyleFormat, StyleFormatSource};

/// Collects FORMAT and XF records from the globals substream.
///
/// XF records are numbered by position; each points at a format id that is
/// either builtin or declared by a FORMAT record.
#[derive(Debug, Clone, Default)]
pub struct FormatTracker {
    custom: HashMap<u16, String>,
    xf_formats: Vec<u16>,
}

impl FormatTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// FORMAT: format id followed by an XLUnicodeString pattern.
    pub fn record_format(&mut self, data: &[u8], codepage: &Codepage) -> Result<()> {
        let id = read_u16_le(data, 0)?;
        let (pattern, _) = parse_unicode_string(data, 2, codepage)?;
        log::trace!("format {id} = {pattern:?}");
        self.custom.insert(id, pattern);
        Ok(())
    }

    /// XF: the format id sits after the font index.
    pub fn record_xf(&mut self, data: &[u8]) -> Result<()> {
        self.xf_formats.push(read_u16_le(data, 2)?);
        Ok(())
    }

    pub fn xf_count(&self) -> usize {
        self.xf_formats.len()
    }

    pub fn format_pattern(&self, id: u16) -> Option<&str> {
        self.custom.get(&id).map(String::as_str)
    }
}

impl StyleFormatSource for FormatTracker {
    fn resolve_style_format(&self, style_index: u32) -> Option<StyleFormat> {
        let index = *self.xf_formats.get(style_index as usize)?;
        Some(StyleFormat {
            index,
            pattern: self.format_pattern(index).map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_and_builtin_formats() {
        let mut tracker = FormatTracker::new();
        let mut format = 164u16.to_le_bytes().to_vec();
        format.extend_from_slice(&[10, 0, 0]);
        format.extend_from_slice(b"yyyy-mm-dd");
        tracker.record_format(&format, &Codepage::default()).unwrap();
        tracker.record_xf(&[0, 0, 14, 0, 0, 0]).unwrap();
        tracker.record_xf(&[0, 0, 164, 0, 0, 0]).unwrap();

        assert_eq!(tracker.xf_count(), 2);
        assert_eq!(
            tracker.resolve_style_format(0),
            Some(StyleFormat {
                index: 14,
                pattern: None
            })
        );
        assert_eq!(
            tracker.resolve_style_format(1).and_then(|f| f.pattern),
            Some("yyyy-mm-dd".to_string())
        );
        assert_eq!(tracker.resolve_style_format(2), None);
    }
}
