//! Number format pattern rendering.
//!
//! A pattern holds up to four `;`-separated sections (positive, negative,
//! zero, text). Each numeric section is tokenized into placeholders and
//! literals, then the value's digits are laid into the placeholders.
//! Padding (`_x`) and fill (`*x`) directives are dropped, as are color and
//! condition brackets.

use smallvec::SmallVec;
use std::fmt::Write;

use super::date::{SectionKind, classify_section, render_date_section};

/// Render a number through a format pattern.
///
/// Date and elapsed-time sections render through the serial-date path; a
/// value that cannot be shown as a date falls back to `General`.
pub fn format_number(value: f64, pattern: &str, date_1904: bool) -> String {
    if !value.is_finite() {
        return format_general(value);
    }
    let sections = split_sections(pattern);
    let (section, signed) = match sections.as_slice() {
        [] => return format_general(value),
        [only] => (*only, true),
        [positive, negative] => {
            if value < 0.0 {
                (*negative, false)
            } else {
                (*positive, false)
            }
        },
        [positive, negative, zero, ..] => {
            if value > 0.0 {
                (*positive, false)
            } else if value < 0.0 {
                (*negative, false)
            } else {
                (*zero, false)
            }
        },
    };

    if sections.len() == 1 && section.trim().is_empty() {
        return format_general(value);
    }
    if section.eq_ignore_ascii_case("general") || section == "@" {
        return format_general(if signed { value } else { value.abs() });
    }

    match classify_section(section) {
        SectionKind::DateTime | SectionKind::Elapsed => {
            render_date_section(section, value, date_1904).unwrap_or_else(|| format_general(value))
        },
        SectionKind::Number => render_number_section(section, value.abs(), signed && value < 0.0),
    }
}

/// `General` rendering: integers verbatim, up to ten decimals otherwise,
/// scientific notation outside `[1e-9, 1e11)`.
///
/// # Examples
///
/// ```
/// use gridfold::sheet::format::format_general;
/// assert_eq!(format_general(42.0), "42");
/// assert_eq!(format_general(0.1 + 0.2), "0.3");
/// assert_eq!(format_general(123456789012.5), "1.23457E+11");
/// ```
pub fn format_general(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let abs = value.abs();
    if value.fract() == 0.0 && abs < 1e15 {
        return itoa::Buffer::new().format(value as i64).to_owned();
    }
    if !(1e-9..1e11).contains(&abs) {
        return format_scientific_general(value);
    }
    let int_digits = if abs >= 1.0 {
        abs.log10().floor() as i32 + 1
    } else {
        1
    };
    let decimals = (10 - int_digits).max(0) as usize;
    let mut text = format!("{value:.decimals$}");
    trim_fraction_zeros(&mut text);
    text
}

fn format_scientific_general(value: f64) -> String {
    let text = format!("{value:.5E}");
    let (mantissa, exponent) = text.split_once('E').unwrap_or((text.as_str(), "0"));
    let mut mantissa = mantissa.to_string();
    trim_fraction_zeros(&mut mantissa);
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}E{sign}{:02}", exponent.unsigned_abs())
}

fn trim_fraction_zeros(text: &mut String) {
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
}

/// Split a pattern on `;` outside quotes, escapes and brackets.
fn split_sections(pattern: &str) -> SmallVec<[&str; 4]> {
    let mut sections = SmallVec::new();
    let mut start = 0;
    let mut in_quote = false;
    let mut in_bracket = false;
    let mut escaped = false;
    for (i, c) in pattern.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if !in_quote => escaped = true,
            '"' => in_quote = !in_quote,
            '[' if !in_quote => in_bracket = true,
            ']' if !in_quote => in_bracket = false,
            ';' if !in_quote && !in_bracket => {
                sections.push(&pattern[start..i]);
                start = i + 1;
            },
            _ => {},
        }
    }
    sections.push(&pattern[start..]);
    sections
}

#[derive(Debug, Clone, PartialEq)]
enum NumToken {
    Literal(String),
    Digit(char),
    Point,
    Comma,
    Percent,
    Exponent { plus: bool },
    Slash,
    General,
}

fn push_literal(tokens: &mut Vec<NumToken>, text: &str) {
    if let Some(NumToken::Literal(existing)) = tokens.last_mut() {
        existing.push_str(text);
    } else {
        tokens.push(NumToken::Literal(text.to_string()));
    }
}

fn tokenize(section: &str) -> Vec<NumToken> {
    let mut tokens = Vec::new();
    let mut chars = section.chars().peekable();
    let mut seen_point = false;
    let mut buf = [0u8; 4];

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    push_literal(&mut tokens, next.encode_utf8(&mut buf));
                }
            },
            '"' => {
                let mut text = String::new();
                for next in chars.by_ref() {
                    if next == '"' {
                        break;
                    }
                    text.push(next);
                }
                push_literal(&mut tokens, &text);
            },
            '_' | '*' => {
                chars.next();
            },
            '[' => {
                let mut content = String::new();
                for next in chars.by_ref() {
                    if next == ']' {
                        break;
                    }
                    content.push(next);
                }
                if let Some(currency) = content.strip_prefix('$') {
                    let symbol = currency.split('-').next().unwrap_or_default();
                    push_literal(&mut tokens, symbol);
                }
            },
            '0' | '#' | '?' => tokens.push(NumToken::Digit(c)),
            '.' if !seen_point => {
                seen_point = true;
                tokens.push(NumToken::Point);
            },
            ',' => tokens.push(NumToken::Comma),
            '%' => tokens.push(NumToken::Percent),
            'E' | 'e' if matches!(chars.peek(), Some('+' | '-')) => {
                let plus = chars.next() == Some('+');
                tokens.push(NumToken::Exponent { plus });
            },
            '/' if tokens.iter().any(|t| matches!(t, NumToken::Digit(_))) => {
                tokens.push(NumToken::Slash);
            },
            'G' | 'g' => {
                let rest: String = chars.clone().take(6).collect();
                if rest.eq_ignore_ascii_case("eneral") {
                    chars.nth(5);
                    tokens.push(NumToken::General);
                } else {
                    push_literal(&mut tokens, c.encode_utf8(&mut buf));
                }
            },
            '@' => tokens.push(NumToken::General),
            _ => push_literal(&mut tokens, c.encode_utf8(&mut buf)),
        }
    }
    tokens
}

/// Layout facts derived from a token stream.
#[derive(Debug, Default)]
struct Layout {
    grouping: bool,
    scale_thousands: i32,
    percents: i32,
    int_placeholders: usize,
    frac_placeholders: usize,
    has_exponent: bool,
    has_fraction: bool,
}

fn analyze(tokens: &[NumToken]) -> Layout {
    let mut layout = Layout::default();
    let mut in_fraction = false;
    let mut in_exponent = false;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            NumToken::Digit(_) if in_exponent => {},
            NumToken::Digit(_) if in_fraction => layout.frac_placeholders += 1,
            NumToken::Digit(_) => layout.int_placeholders += 1,
            NumToken::Point => in_fraction = true,
            NumToken::Exponent { .. } => {
                layout.has_exponent = true;
                in_exponent = true;
            },
            NumToken::Slash => layout.has_fraction = true,
            NumToken::Percent => layout.percents += 1,
            NumToken::Comma if !in_exponent => {
                let digit_before = tokens[..i].iter().any(|t| matches!(t, NumToken::Digit(_)));
                let digit_after = tokens[i + 1..]
                    .iter()
                    .take_while(|t| !matches!(t, NumToken::Point | NumToken::Exponent { .. }))
                    .any(|t| matches!(t, NumToken::Digit(_)));
                if digit_before && digit_after {
                    layout.grouping |= !in_fraction;
                } else if digit_before {
                    layout.scale_thousands += 1;
                }
            },
            _ => {},
        }
    }
    layout
}

/// Round half away from zero and split into integer and fraction digits.
fn split_fixed(value: f64, decimals: usize) -> (String, String) {
    let decimals = decimals.min(15);
    let factor = 10f64.powi(decimals as i32);
    let scaled = (value * factor).round();
    if scaled < 9.0e15 {
        let scaled = scaled as u64;
        let unit = 10u64.pow(decimals as u32);
        let int_part = itoa::Buffer::new().format(scaled / unit).to_owned();
        let frac_part = if decimals > 0 {
            format!("{:0decimals$}", scaled % unit)
        } else {
            String::new()
        };
        (int_part, frac_part)
    } else {
        let text = format!("{value:.decimals$}");
        match text.split_once('.') {
            Some((int_part, frac_part)) => (int_part.to_string(), frac_part.to_string()),
            None => (text, String::new()),
        }
    }
}

fn push_grouped(out: &mut String, digit: char, position: usize, grouping: bool) {
    out.push(digit);
    if grouping && position > 0 && position.is_multiple_of(3) {
        out.push(',');
    }
}

/// Lays integer and fraction digits into their placeholders in token order.
struct DigitWriter<'a> {
    int_digits: Vec<char>,
    frac_digits: Vec<char>,
    layout: &'a Layout,
    int_seen: usize,
    frac_seen: usize,
    /// Fraction placeholders from this index on show no trailing zeros
    frac_cut: usize,
}

impl<'a> DigitWriter<'a> {
    fn new(int_part: &str, frac_part: &str, tokens: &[NumToken], layout: &'a Layout) -> Self {
        let int_digits = if int_part == "0" {
            Vec::new()
        } else {
            int_part.chars().collect()
        };
        let frac_digits: Vec<char> = frac_part.chars().collect();

        let frac_kinds: Vec<char> = tokens
            .iter()
            .skip_while(|t| !matches!(t, NumToken::Point))
            .take_while(|t| !matches!(t, NumToken::Exponent { .. }))
            .filter_map(|t| match t {
                NumToken::Digit(c) => Some(*c),
                _ => None,
            })
            .collect();
        let mut frac_cut = frac_kinds.len();
        while frac_cut > 0
            && frac_kinds[frac_cut - 1] != '0'
            && frac_digits.get(frac_cut - 1).is_none_or(|d| *d == '0')
        {
            frac_cut -= 1;
        }

        Self {
            int_digits,
            frac_digits,
            layout,
            int_seen: 0,
            frac_seen: 0,
            frac_cut,
        }
    }

    fn write_int(&mut self, out: &mut String, kind: char) {
        let position = self.layout.int_placeholders - 1 - self.int_seen;
        let len = self.int_digits.len();
        if self.int_seen == 0 && len > position + 1 {
            for (i, digit) in self.int_digits[..len - position - 1].iter().enumerate() {
                push_grouped(out, *digit, len - 1 - i, self.layout.grouping);
            }
        }
        self.int_seen += 1;
        if len > position {
            push_grouped(out, self.int_digits[len - 1 - position], position, self.layout.grouping);
            return;
        }
        match kind {
            '0' => push_grouped(out, '0', position, self.layout.grouping),
            '?' => out.push(' '),
            _ => {},
        }
    }

    fn write_frac(&mut self, out: &mut String, kind: char) {
        let index = self.frac_seen;
        self.frac_seen += 1;
        if index >= self.frac_cut {
            if kind == '?' {
                out.push(' ');
            }
            return;
        }
        out.push(self.frac_digits.get(index).copied().unwrap_or('0'));
    }

    /// Digits left over when the pattern has no integer placeholders.
    fn write_bare_int(&self, out: &mut String) {
        if self.layout.int_placeholders == 0 {
            out.extend(self.int_digits.iter());
        }
    }
}

fn render_number_section(section: &str, magnitude: f64, negative: bool) -> String {
    let tokens = tokenize(section);
    let layout = analyze(&tokens);

    let mut value = magnitude * 100f64.powi(layout.percents) / 1000f64.powi(layout.scale_thousands);
    let mut out = String::with_capacity(section.len() + 16);
    if negative {
        out.push('-');
    }

    if layout.has_fraction {
        render_fraction(&tokens, value, &mut out);
        return out;
    }

    let mut exponent = 0i32;
    if layout.has_exponent {
        (value, exponent) = normalize_exponent(value, &tokens, &layout);
    }

    let (int_part, frac_part) = split_fixed(value, layout.frac_placeholders);
    let mut writer = DigitWriter::new(&int_part, &frac_part, &tokens, &layout);
    let mut in_fraction = false;
    let mut in_exponent = false;
    let mut exponent_written = false;

    for token in &tokens {
        match token {
            NumToken::Literal(text) => out.push_str(text),
            NumToken::Digit(_) if in_exponent => {
                if !exponent_written {
                    let width = tokens
                        .iter()
                        .skip_while(|t| !matches!(t, NumToken::Exponent { .. }))
                        .filter(|t| matches!(t, NumToken::Digit(_)))
                        .count();
                    let _ = write!(out, "{:0width$}", exponent.unsigned_abs());
                    exponent_written = true;
                }
            },
            NumToken::Digit(kind) if in_fraction => writer.write_frac(&mut out, *kind),
            NumToken::Digit(kind) => writer.write_int(&mut out, *kind),
            NumToken::Point => {
                writer.write_bare_int(&mut out);
                in_fraction = true;
                out.push('.');
            },
            NumToken::Comma => {},
            NumToken::Percent => out.push('%'),
            NumToken::Exponent { plus } => {
                in_exponent = true;
                out.push('E');
                if exponent < 0 {
                    out.push('-');
                } else if *plus {
                    out.push('+');
                }
            },
            NumToken::Slash => out.push('/'),
            NumToken::General => out.push_str(&format_general(magnitude)),
        }
    }
    out
}

/// Scale `value` into the mantissa range implied by the integer placeholders.
fn normalize_exponent(value: f64, tokens: &[NumToken], layout: &Layout) -> (f64, i32) {
    if value == 0.0 {
        return (0.0, 0);
    }
    let int_width = layout.int_placeholders.max(1) as i32;
    let engineering = int_width > 1
        && tokens
            .iter()
            .take_while(|t| !matches!(t, NumToken::Point | NumToken::Exponent { .. }))
            .any(|t| matches!(t, NumToken::Digit('#')));
    let step = if engineering { int_width } else { 1 };

    let mut exponent = value.log10().floor() as i32;
    exponent -= exponent.rem_euclid(step);
    let mut mantissa = value / 10f64.powi(exponent);

    // Rounding to the displayed decimals can carry into a new digit.
    let factor = 10f64.powi(layout.frac_placeholders.min(15) as i32);
    if (mantissa * factor).round() / factor >= 10f64.powi(step) {
        exponent += step;
        mantissa = value / 10f64.powi(exponent);
    }
    (mantissa, exponent)
}

fn render_fraction(tokens: &[NumToken], value: f64, out: &mut String) {
    let Some(slash) = tokens.iter().position(|t| matches!(t, NumToken::Slash)) else {
        return;
    };
    let numerator_start = tokens[..slash]
        .iter()
        .rposition(|t| !matches!(t, NumToken::Digit(_)))
        .map_or(0, |i| i + 1);
    let has_whole = tokens[..numerator_start]
        .iter()
        .any(|t| matches!(t, NumToken::Digit(_)));

    let denominator_digits = tokens[slash + 1..]
        .iter()
        .take_while(|t| matches!(t, NumToken::Digit(_)))
        .count();
    let (fixed_denominator, trailing_start, trailing_prefix) = if denominator_digits == 0 {
        match tokens.get(slash + 1) {
            Some(NumToken::Literal(text)) => {
                let digits = text.chars().take_while(char::is_ascii_digit).count();
                let fixed = atoi_simd::parse::<u64>(text[..digits].as_bytes()).ok();
                (fixed, slash + 2, text[digits..].to_string())
            },
            _ => (None, slash + 1, String::new()),
        }
    } else {
        (None, slash + 1 + denominator_digits, String::new())
    };

    let (mut whole, fraction) = if has_whole {
        (value.trunc() as u64, value.fract())
    } else {
        (0, value)
    };
    let (mut numerator, denominator) = match fixed_denominator.filter(|d| *d > 0) {
        Some(denominator) => ((fraction * denominator as f64).round() as u64, denominator),
        None => {
            let max_denominator = 10u64.pow(denominator_digits.clamp(1, 4) as u32) - 1;
            best_rational(fraction, max_denominator)
        },
    };
    if has_whole && numerator == denominator {
        whole += 1;
        numerator = 0;
    }

    for token in &tokens[..numerator_start] {
        if let NumToken::Literal(text) = token
            && !has_whole
        {
            out.push_str(text);
        }
    }
    let leading: String = tokens
        .iter()
        .take_while(|t| !matches!(t, NumToken::Digit(_)))
        .filter_map(|t| match t {
            NumToken::Literal(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    if has_whole {
        out.push_str(&leading);
    }

    let mut buffer = itoa::Buffer::new();
    if has_whole && (whole > 0 || numerator == 0) {
        out.push_str(buffer.format(whole));
    }
    if numerator > 0 {
        if has_whole && whole > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{numerator}/{denominator}");
    } else if !has_whole {
        out.push('0');
    }

    out.push_str(&trailing_prefix);
    for token in tokens.iter().skip(trailing_start) {
        if let NumToken::Literal(text) = token {
            out.push_str(text);
        }
    }
}

/// Closest `n/d` to `fraction` with `d <= max_denominator`.
fn best_rational(fraction: f64, max_denominator: u64) -> (u64, u64) {
    let mut best = (fraction.round() as u64, 1u64);
    let mut best_error = (fraction - best.0 as f64).abs();
    for denominator in 2..=max_denominator {
        let numerator = (fraction * denominator as f64).round();
        let error = (fraction - numerator / denominator as f64).abs();
        if error < best_error - f64::EPSILON {
            best = (numerator as u64, denominator);
            best_error = error;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(value: f64, pattern: &str) -> String {
        format_number(value, pattern, false)
    }

    #[test]
    fn test_general() {
        assert_eq!(format_general(0.0), "0");
        assert_eq!(format_general(-17.0), "-17");
        assert_eq!(format_general(3.14159265358979), "3.141592654");
        assert_eq!(format_general(1234567.891), "1234567.891");
        assert_eq!(format_general(0.000012345), "0.000012345");
        assert_eq!(format_general(1.5e-12), "1.5E-12");
        assert_eq!(format_general(-2.5e13 + 0.5), "-2.5E+13");
        assert_eq!(fmt(12.5, "General"), "12.5");
        assert_eq!(fmt(12.5, ""), "12.5");
    }

    #[test]
    fn test_fixed_decimals_and_grouping() {
        assert_eq!(fmt(1234.567, "0"), "1235");
        assert_eq!(fmt(1234.567, "0.00"), "1234.57");
        assert_eq!(fmt(1234567.891, "#,##0"), "1,234,568");
        assert_eq!(fmt(1234567.891, "#,##0.00"), "1,234,567.89");
        assert_eq!(fmt(0.0, "#,##0"), "0");
        assert_eq!(fmt(0.5, "#.00"), ".50");
        assert_eq!(fmt(5.0, "000"), "005");
        assert_eq!(fmt(-42.0, "0.0"), "-42.0");
    }

    #[test]
    fn test_optional_fraction_digits() {
        assert_eq!(fmt(1.5, "0.##"), "1.5");
        assert_eq!(fmt(2.0, "0.##"), "2.");
        assert_eq!(fmt(1.25, "0.0#"), "1.25");
        assert_eq!(fmt(1.5, "0.0?"), "1.5 ");
    }

    #[test]
    fn test_percent_and_scaling() {
        assert_eq!(fmt(0.256, "0%"), "26%");
        assert_eq!(fmt(0.25, "0.00%"), "25.00%");
        assert_eq!(fmt(1_234_567.0, "#,##0,"), "1,235");
        assert_eq!(fmt(1_234_567.0, "0.0,,\"M\""), "1.2M");
    }

    #[test]
    fn test_sections() {
        let pattern = "#,##0.00;(#,##0.00);\"zero\"";
        assert_eq!(fmt(1234.5, pattern), "1,234.50");
        assert_eq!(fmt(-1234.5, pattern), "(1,234.50)");
        assert_eq!(fmt(0.0, pattern), "zero");
        assert_eq!(fmt(-5.0, "0;0;"), "5");
        assert_eq!(fmt(0.0, "0;-0;"), "");
    }

    #[test]
    fn test_builtin_accounting_and_currency() {
        assert_eq!(fmt(1234.0, "\"$\"#,##0_);(\"$\"#,##0)"), "$1,234");
        assert_eq!(fmt(-1234.0, "\"$\"#,##0_);[Red](\"$\"#,##0)"), "($1,234)");
        assert_eq!(fmt(9.5, "[$€-407]#,##0.00"), "€9.50");
        assert_eq!(fmt(12.0, "#,##0_);(#,##0)"), "12");
    }

    #[test]
    fn test_scientific() {
        assert_eq!(fmt(12345.0, "0.00E+00"), "1.23E+04");
        assert_eq!(fmt(0.00012, "0.00E+00"), "1.20E-04");
        assert_eq!(fmt(0.0, "0.00E+00"), "0.00E+00");
        assert_eq!(fmt(99999.0, "0.00E+00"), "1.00E+05");
        assert_eq!(fmt(12345.0, "##0.0E+0"), "12.3E+3");
    }

    #[test]
    fn test_fractions() {
        assert_eq!(fmt(1.5, "# ?/?"), "1 1/2");
        assert_eq!(fmt(0.25, "# ?/?"), "1/4");
        assert_eq!(fmt(2.0, "# ?/?"), "2");
        assert_eq!(fmt(3.14159, "# ??/??"), "3 14/99");
        assert_eq!(fmt(0.375, "# ?/8"), "3/8");
        assert_eq!(fmt(1.75, "?/?"), "7/4");
    }

    #[test]
    fn test_literals_and_escapes() {
        assert_eq!(fmt(12.0, "0\" kg\""), "12 kg");
        assert_eq!(fmt(12.0, "\\#0"), "#12");
        assert_eq!(fmt(123456789.0, "000-00-0000"), "123-45-6789");
        assert_eq!(fmt(7.0, "General\" units\""), "7 units");
    }

    #[test]
    fn test_date_sections_dispatch() {
        assert_eq!(fmt(43831.0, "yyyy-mm-dd"), "2020-01-01");
        assert_eq!(fmt(43831.0, "m/d/yy h:mm"), "1/1/20 0:00");
        assert_eq!(fmt(1.5, "[h]:mm"), "36:00");
        assert_eq!(fmt(-1.0, "yyyy-mm-dd"), "-1");
    }

    #[test]
    fn test_split_sections_respects_quotes() {
        let sections = split_sections("0;\"a;b\"0;[<0]0");
        assert_eq!(sections.as_slice(), &["0", "\"a;b\"0", "[<0]0"]);
    }
}
