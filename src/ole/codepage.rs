//! Codepage decoding for 8-bit strings in BIFF records.
//!
//! The workbook's CODEPAGE record names a Windows codepage; compressed string
//! payloads are decoded through the matching `encoding_rs` encoding. Unknown
//! or Unicode codepages fall back to Windows-1252.

use encoding_rs::Encoding;

/// Codepage id Excel writes for BIFF8 workbooks (UTF-16).
pub const CODEPAGE_UTF16: u16 = 1200;

/// Map a Windows codepage identifier to an `encoding_rs` encoding.
///
/// # Examples
///
/// ```
/// use gridfold::ole::codepage::codepage_to_encoding;
/// assert_eq!(codepage_to_encoding(1251), Some(encoding_rs::WINDOWS_1251));
/// assert_eq!(codepage_to_encoding(99), None);
/// ```
pub fn codepage_to_encoding(codepage: u16) -> Option<&'static Encoding> {
    match codepage {
        367 | 20127 => Some(encoding_rs::WINDOWS_1252), // US-ASCII subset
        437 | 850 => Some(encoding_rs::IBM866),         // closest single-byte DOS table
        874 => Some(encoding_rs::WINDOWS_874),
        932 => Some(encoding_rs::SHIFT_JIS),
        936 => Some(encoding_rs::GBK),
        949 => Some(encoding_rs::EUC_KR),
        950 => Some(encoding_rs::BIG5),
        1250 => Some(encoding_rs::WINDOWS_1250),
        1251 => Some(encoding_rs::WINDOWS_1251),
        1252 | 32769 => Some(encoding_rs::WINDOWS_1252),
        1253 => Some(encoding_rs::WINDOWS_1253),
        1254 => Some(encoding_rs::WINDOWS_1254),
        1255 => Some(encoding_rs::WINDOWS_1255),
        1256 => Some(encoding_rs::WINDOWS_1256),
        1257 => Some(encoding_rs::WINDOWS_1257),
        1258 => Some(encoding_rs::WINDOWS_1258),
        10000 | 32768 => Some(encoding_rs::MACINTOSH),
        65001 => Some(encoding_rs::UTF_8),
        _ => None,
    }
}

/// Decoder for the 8-bit strings of one workbook.
#[derive(Debug, Clone, Copy)]
pub struct Codepage {
    id: u16,
    encoding: &'static Encoding,
}

impl Codepage {
    pub fn from_id(id: u16) -> Self {
        let encoding = codepage_to_encoding(id).unwrap_or_else(|| {
            if id != CODEPAGE_UTF16 {
                log::debug!("codepage {id} unsupported, decoding as windows-1252");
            }
            encoding_rs::WINDOWS_1252
        });
        Self { id, encoding }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    /// Decode `bytes`; malformed sequences become U+FFFD.
    pub fn decode(&self, bytes: &[u8]) -> String {
        if bytes.is_ascii() {
            // ASCII is valid UTF-8 in every supported table.
            return String::from_utf8_lossy(bytes).into_owned();
        }
        let (text, _, had_errors) = self.encoding.decode(bytes);
        if had_errors {
            log::warn!("invalid bytes for codepage {} replaced", self.id);
        }
        text.into_owned()
    }
}

impl Default for Codepage {
    fn default() -> Self {
        Self::from_id(CODEPAGE_UTF16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_western() {
        let codepage = Codepage::default();
        assert_eq!(codepage.id(), 1200);
        assert_eq!(codepage.decode(b"caf\xE9"), "café");
    }

    #[test]
    fn test_cyrillic_codepage() {
        let codepage = Codepage::from_id(1251);
        assert_eq!(codepage.decode(b"\xCF\xF0\xE8\xE2\xE5\xF2"), "Привет");
    }

    #[test]
    fn test_ascii_fast_path() {
        assert_eq!(Codepage::from_id(932).decode(b"plain"), "plain");
    }
}
