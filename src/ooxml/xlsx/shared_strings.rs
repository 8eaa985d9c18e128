//! Shared strings part (`xl/sharedStrings.xml`).
//!
//! Each `<si>` item is either a plain `<t>` or a list of rich-text runs
//! `<r><t>..</t></r>`; the runs are concatenated. Phonetic hints (`<rPh>`)
//! are not part of the displayed text and are skipped.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::common::Result;
use crate::ooxml::xlsx::xml::{push_entity, push_text};
use crate::sheet::SharedStringSource;

/// Shared string table in item order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedStrings {
    strings: Vec<String>,
}

impl SharedStrings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the content of `xl/sharedStrings.xml`.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut strings = Vec::new();
        let mut current: Option<String> = None;
        let mut in_text = false;
        let mut phonetic_depth = 0usize;

        loop {
            match reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"si" => current = Some(String::new()),
                    b"rPh" => phonetic_depth += 1,
                    b"t" if phonetic_depth == 0 => in_text = true,
                    _ => {},
                },
                Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
                Event::End(e) => match e.local_name().as_ref() {
                    b"si" => strings.extend(current.take()),
                    b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                    b"t" => in_text = false,
                    _ => {},
                },
                Event::Text(e) if in_text => {
                    if let Some(text) = current.as_mut() {
                        push_text(text, &e);
                    }
                },
                Event::CData(e) if in_text => {
                    if let Some(text) = current.as_mut() {
                        push_text(text, &e);
                    }
                },
                Event::GeneralRef(e) if in_text => {
                    if let Some(text) = current.as_mut() {
                        push_entity(text, &e)?;
                    }
                },
                Event::Eof => break,
                _ => {},
            }
        }
        log::debug!("parsed {} shared strings", strings.len());
        Ok(Self { strings })
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl SharedStringSource for SharedStrings {
    fn resolve_shared_string(&self, index: usize) -> Option<&str> {
        self.get(index)
    }

    fn shared_string_count(&self) -> usize {
        self.len()
    }
}
