//! Built-in number formats.
//!
//! Both binary and XML workbooks may reference a format id without storing
//! its pattern. Ids 0-49 are implied by the file format; the codes below are
//! the en-US renderings.

use phf::phf_map;

static BUILTIN_FORMATS: phf::Map<u16, &'static str> = phf_map! {
    0u16 => "General",
    1u16 => "0",
    2u16 => "0.00",
    3u16 => "#,##0",
    4u16 => "#,##0.00",
    5u16 => "\"$\"#,##0_);(\"$\"#,##0)",
    6u16 => "\"$\"#,##0_);[Red](\"$\"#,##0)",
    7u16 => "\"$\"#,##0.00_);(\"$\"#,##0.00)",
    8u16 => "\"$\"#,##0.00_);[Red](\"$\"#,##0.00)",
    9u16 => "0%",
    10u16 => "0.00%",
    11u16 => "0.00E+00",
    12u16 => "# ?/?",
    13u16 => "# ??/??",
    14u16 => "m/d/yy",
    15u16 => "d-mmm-yy",
    16u16 => "d-mmm",
    17u16 => "mmm-yy",
    18u16 => "h:mm AM/PM",
    19u16 => "h:mm:ss AM/PM",
    20u16 => "h:mm",
    21u16 => "h:mm:ss",
    22u16 => "m/d/yy h:mm",
    37u16 => "#,##0_);(#,##0)",
    38u16 => "#,##0_);[Red](#,##0)",
    39u16 => "#,##0.00_);(#,##0.00)",
    40u16 => "#,##0.00_);[Red](#,##0.00)",
    41u16 => "_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)",
    42u16 => "_(\"$\"* #,##0_);_(\"$\"* (#,##0);_(\"$\"* \"-\"_);_(@_)",
    43u16 => "_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)",
    44u16 => "_(\"$\"* #,##0.00_);_(\"$\"* (#,##0.00);_(\"$\"* \"-\"??_);_(@_)",
    45u16 => "mm:ss",
    46u16 => "[h]:mm:ss",
    47u16 => "mm:ss.0",
    48u16 => "##0.0E+0",
    49u16 => "@",
};

/// First id available to workbook-defined formats.
pub const FIRST_CUSTOM_FORMAT_ID: u16 = 164;

/// Get the format code for a built-in number format id.
///
/// Returns `None` for ids the file format reserves without a fixed code
/// (23-36) and for custom ids.
#[inline]
pub fn builtin_format(id: u16) -> Option<&'static str> {
    BUILTIN_FORMATS.get(&id).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_format() {
        assert_eq!(builtin_format(0), Some("General"));
        assert_eq!(builtin_format(14), Some("m/d/yy"));
        assert_eq!(builtin_format(22), Some("m/d/yy h:mm"));
        assert_eq!(builtin_format(49), Some("@"));
        assert_eq!(builtin_format(30), None);
        assert_eq!(builtin_format(FIRST_CUSTOM_FORMAT_ID), None);
    }
}
