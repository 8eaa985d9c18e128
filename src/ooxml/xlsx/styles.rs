//! Styles part (`xl/styles.xml`), reduced to what number formatting needs.
//!
//! A cell's `s` attribute indexes `<cellXfs>`; each `<xf>` names a
//! `numFmtId` that is either builtin or declared under `<numFmts>`.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::common::Result;
use crate::ooxml::xlsx::xml::attr;
use crate::sheet::{StyleFormat, StyleFormatSource};

/// Number formats of the workbook's cell styles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Styles {
    custom: HashMap<u16, String>,
    xf_formats: Vec<u16>,
}

fn format_id(element: &BytesStart<'_>) -> Result<Option<u16>> {
    Ok(attr(element, b"numFmtId")?.and_then(|id| atoi_simd::parse::<u16>(id.as_bytes()).ok()))
}

impl Styles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the content of `xl/styles.xml`.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut styles = Styles::default();
        let mut in_cell_xfs = false;

        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                    b"cellXfs" => in_cell_xfs = true,
                    b"numFmt" => {
                        if let (Some(id), Some(code)) = (format_id(&e)?, attr(&e, b"formatCode")?) {
                            styles.custom.insert(id, code);
                        }
                    },
                    b"xf" if in_cell_xfs => {
                        // An xf without numFmtId uses General.
                        styles.xf_formats.push(format_id(&e)?.unwrap_or(0));
                    },
                    _ => {},
                },
                Event::End(e) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
                Event::Eof => break,
                _ => {},
            }
        }
        log::debug!(
            "parsed {} cell styles and {} custom number formats",
            styles.xf_formats.len(),
            styles.custom.len()
        );
        Ok(styles)
    }

    pub fn xf_count(&self) -> usize {
        self.xf_formats.len()
    }

    pub fn format_pattern(&self, id: u16) -> Option<&str> {
        self.custom.get(&id).map(String::as_str)
    }
}

impl StyleFormatSource for Styles {
    fn resolve_style_format(&self, style_index: u32) -> Option<StyleFormat> {
        let index = *self.xf_formats.get(style_index as usize)?;
        Some(StyleFormat {
            index,
            pattern: self.format_pattern(index).map(str::to_string),
        })
    }
}
