//! Small helpers shared by the SpreadsheetML part parsers.

use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::BytesStart;

use crate::common::{Error, Result};

/// Unescaped value of the attribute whose local name is `name`.
pub(crate) fn attr(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attribute in element.attributes() {
        let attribute = attribute?;
        if attribute.key.local_name().as_ref() == name {
            let raw = std::str::from_utf8(&attribute.value)
                .map_err(|err| Error::Xml(err.to_string()))?;
            return Ok(Some(unescape(raw)?.into_owned()));
        }
    }
    Ok(None)
}

/// Append raw text content (already free of entity references).
pub(crate) fn push_text(buffer: &mut String, bytes: &[u8]) {
    buffer.push_str(&String::from_utf8_lossy(bytes));
}

/// Append the expansion of an entity reference such as `amp` or `#x41`.
pub(crate) fn push_entity(buffer: &mut String, name: &[u8]) -> Result<()> {
    let name = std::str::from_utf8(name).map_err(|err| Error::Xml(err.to_string()))?;
    let resolved = match name.strip_prefix('#') {
        Some(code) => {
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => code.parse::<u32>().ok(),
            };
            value.and_then(char::from_u32).map(|c| buffer.push(c))
        },
        None => resolve_predefined_entity(name).map(|text| buffer.push_str(text)),
    };
    resolved.ok_or_else(|| Error::Xml(format!("unknown entity reference &{name};")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::Reader;
    use quick_xml::events::Event;

    #[test]
    fn test_attr_lookup() {
        let mut reader = Reader::from_str(r#"<c r="B2" x:s="3" t="a&amp;b"/>"#);
        let Ok(Event::Empty(element)) = reader.read_event() else {
            panic!("expected an empty element");
        };
        assert_eq!(attr(&element, b"r").unwrap().as_deref(), Some("B2"));
        assert_eq!(attr(&element, b"s").unwrap().as_deref(), Some("3"));
        assert_eq!(attr(&element, b"t").unwrap().as_deref(), Some("a&b"));
        assert_eq!(attr(&element, b"missing").unwrap(), None);
    }

    #[test]
    fn test_entities() {
        let mut text = String::new();
        push_entity(&mut text, b"lt").unwrap();
        push_entity(&mut text, b"#65").unwrap();
        push_entity(&mut text, b"#x263A").unwrap();
        assert_eq!(text, "<A\u{263A}");
        assert!(push_entity(&mut text, b"nbsp").is_err());
    }
}
