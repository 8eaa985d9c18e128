//! Column letter references.
//!
//! Columns are a bijective base-26 numeral: `A`=1 … `Z`=26, `AA`=27, up to
//! `XFD`=16384 in current workbooks.

use crate::common::{Error, Result};

/// Largest column index the converters accept.
pub const MAX_COLUMN_INDEX: u32 = u32::MAX / 26;

/// Parse the column letters of a cell reference into a 1-based index.
///
/// The reference may carry a row suffix (`AC123`); if present it must be all
/// digits. Letters are case-insensitive.
///
/// # Examples
///
/// ```
/// use gridfold::sheet::column_to_index;
/// assert_eq!(column_to_index("A").unwrap(), 1);
/// assert_eq!(column_to_index("AC12").unwrap(), 29);
/// assert_eq!(column_to_index("XFD1048576").unwrap(), 16384);
/// assert!(column_to_index("12").is_err());
/// ```
pub fn column_to_index(reference: &str) -> Result<u32> {
    let bytes = reference.as_bytes();
    let letters = bytes.iter().take_while(|b| b.is_ascii_alphabetic()).count();
    if letters == 0 {
        return Err(Error::MalformedReference(reference.to_string()));
    }

    let row = &bytes[letters..];
    if !row.is_empty() && atoi_simd::parse::<u32>(row).is_err() {
        return Err(Error::MalformedReference(reference.to_string()));
    }

    bytes[..letters]
        .iter()
        .try_fold(0u32, |acc, b| {
            let digit = u32::from(b.to_ascii_uppercase() - b'A') + 1;
            acc.checked_mul(26)?.checked_add(digit)
        })
        .filter(|index| *index <= MAX_COLUMN_INDEX)
        .ok_or_else(|| Error::MalformedReference(reference.to_string()))
}

/// Render a 1-based column index as letters.
///
/// Returns an empty string for 0, which has no letter form.
///
/// # Examples
///
/// ```
/// use gridfold::sheet::index_to_column;
/// assert_eq!(index_to_column(27), "AA");
/// assert_eq!(index_to_column(16384), "XFD");
/// ```
pub fn index_to_column(index: u32) -> String {
    let mut letters = Vec::with_capacity(4);
    let mut n = index;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Split a reference such as `B7` into its 1-based column and row.
pub fn split_reference(reference: &str) -> Result<(u32, Option<u32>)> {
    let column = column_to_index(reference)?;
    let digits = reference.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let row = if digits.is_empty() {
        None
    } else {
        atoi_simd::parse::<u32>(digits.as_bytes()).ok()
    };
    Ok((column, row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_columns() {
        assert_eq!(column_to_index("A").unwrap(), 1);
        assert_eq!(column_to_index("Z").unwrap(), 26);
        assert_eq!(column_to_index("AA").unwrap(), 27);
        assert_eq!(column_to_index("az9").unwrap(), 52);
        assert_eq!(column_to_index("XFD").unwrap(), 16384);
    }

    #[test]
    fn test_malformed_references() {
        for bad in ["", "1", "$A$1", "A1B", "A-1", "Ä1"] {
            assert!(
                matches!(column_to_index(bad), Err(Error::MalformedReference(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(column_to_index("ZZZZZZZZ").is_err());
    }

    #[test]
    fn test_split_reference() {
        assert_eq!(split_reference("C12").unwrap(), (3, Some(12)));
        assert_eq!(split_reference("C").unwrap(), (3, None));
    }

    proptest! {
        #[test]
        fn prop_index_round_trip(index in 1u32..=16384) {
            let letters = index_to_column(index);
            prop_assert_eq!(column_to_index(&letters).unwrap(), index);
        }

        #[test]
        fn prop_reference_round_trip(letters in "[A-Z]{1,3}", row in 1u32..1_048_577) {
            let reference = format!("{letters}{row}");
            let index = column_to_index(&reference).unwrap();
            prop_assert_eq!(index_to_column(index), letters);
        }
    }
}
