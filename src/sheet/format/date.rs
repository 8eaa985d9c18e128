//! Serial date conversion and date/time pattern rendering.
//!
//! Spreadsheets store dates as a day count from an epoch with the time of day
//! as the fractional part. The 1900 system keeps the phantom 1900-02-29 that
//! Lotus 1-2-3 introduced, so serial 60 is a real, displayable date.

use chrono::{Datelike, NaiveDate, Weekday};
use std::fmt::Write;
use std::iter::Peekable;
use std::str::Chars;

const MILLIS_PER_DAY: f64 = 86_400_000.0;
/// Serial of 9999-12-31 in the 1900 system; anything later is not a date.
const MAX_SERIAL: f64 = 2_958_466.0;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// How a single format section interprets its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Digits, literals and placeholders
    Number,
    /// Calendar date and/or time of day
    DateTime,
    /// Elapsed duration (`[h]`, `[m]`, `[s]`)
    Elapsed,
}

/// Classify one `;`-free format section.
///
/// Walks the section skipping quoted text, escapes and bracketed modifiers,
/// and reports a date the first time a date/time token letter appears.
pub fn classify_section(section: &str) -> SectionKind {
    let mut escaped = false;
    let mut is_quote = false;
    let mut brackets = 0u8;
    let mut prev = ' ';
    let mut hms = false;
    let mut ap = false;

    for s in section.chars() {
        match (s, escaped, is_quote, ap, brackets) {
            (_, true, ..) => escaped = false,
            ('_' | '\\' | '*', ..) => escaped = true,
            ('"', _, true, _, _) => is_quote = false,
            (_, _, true, _, _) => (),
            ('"', _, _, _, _) => is_quote = true,
            ('[', ..) => brackets += 1,
            (']', .., 1) if hms => return SectionKind::Elapsed,
            (']', ..) => brackets = brackets.saturating_sub(1),
            ('a' | 'A', _, _, false, 0) => ap = true,
            ('p' | 'm' | '/' | 'P' | 'M', _, _, true, 0) => return SectionKind::DateTime,
            ('d' | 'm' | 'h' | 'y' | 's' | 'D' | 'M' | 'H' | 'Y' | 'S', _, _, false, 0) => {
                return SectionKind::DateTime;
            },
            _ => {
                if !(hms && s.eq_ignore_ascii_case(&prev)) {
                    hms = prev == '[' && matches!(s, 'm' | 'h' | 's' | 'M' | 'H' | 'S');
                }
            },
        }
        prev = s;
    }
    SectionKind::Number
}

/// Check if the first section of a format code is a date/time format.
///
/// Elapsed-time formats such as `[h]:mm:ss` are durations, not dates.
pub fn is_date_format(format: &str) -> bool {
    let first = format.split(';').next().unwrap_or_default();
    classify_section(first) == SectionKind::DateTime
}

/// A serial date split into calendar and clock fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialDateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millis: u16,
    serial_day: u64,
    date_1904: bool,
}

impl SerialDateTime {
    /// Convert a serial value, rounding the time of day to whole seconds.
    ///
    /// Returns `None` for negative, non-finite or post-9999 serials.
    pub fn from_serial(value: f64, date_1904: bool) -> Option<Self> {
        Self::convert(value, date_1904, false)
    }

    /// Convert a serial value keeping millisecond precision.
    pub fn from_serial_millis(value: f64, date_1904: bool) -> Option<Self> {
        Self::convert(value, date_1904, true)
    }

    fn convert(value: f64, date_1904: bool, keep_millis: bool) -> Option<Self> {
        if !value.is_finite() || value < 0.0 || value >= MAX_SERIAL {
            return None;
        }
        let total_ms = if keep_millis {
            (value * MILLIS_PER_DAY).round() as u64
        } else {
            (value * 86_400.0).round() as u64 * 1000
        };
        let serial_day = total_ms / MILLIS_PER_DAY as u64;
        let ms_of_day = total_ms % MILLIS_PER_DAY as u64;
        let (year, month, day) = civil_from_serial(serial_day, date_1904);

        let secs = ms_of_day / 1000;
        Some(Self {
            year,
            month,
            day,
            hour: (secs / 3600) as u8,
            minute: (secs / 60 % 60) as u8,
            second: (secs % 60) as u8,
            millis: (ms_of_day % 1000) as u16,
            serial_day,
            date_1904,
        })
    }

    /// Day of the week, following the spreadsheet calendar.
    ///
    /// The phantom 1900-02-29 falls on a Wednesday.
    pub fn weekday(&self) -> Weekday {
        match NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        ) {
            Some(date) => date.weekday(),
            None if !self.date_1904 && self.serial_day == 60 => Weekday::Wed,
            None => Weekday::Sun,
        }
    }

    /// `yyyy-MM-dd` rendering of the date part.
    pub fn iso_date(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Render a serial as `yyyy-MM-dd`.
pub fn iso_date(value: f64, date_1904: bool) -> Option<String> {
    SerialDateTime::from_serial_millis(value, date_1904).map(|dt| dt.iso_date())
}

fn civil_from_serial(serial_day: u64, date_1904: bool) -> (u16, u8, u8) {
    let mut months = [31u64, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    // Day 0 of the running count is 1600-01-01.
    let mut days = if date_1904 {
        serial_day + 111_033
    } else if serial_day > 365 {
        serial_day + 109_571
    } else {
        serial_day + 109_572
    };

    let year_days_400 = days / 146_097;
    days %= 146_097;

    let year_days_100;
    if days < 36_525 {
        year_days_100 = 0;
    } else {
        year_days_100 = 1 + (days - 36_525) / 36_524;
        days = (days - 36_525) % 36_524;
    }

    let year_days_4;
    let mut non_leap_year_block = false;
    if year_days_100 == 0 {
        year_days_4 = days / 1461;
        days %= 1461;
    } else if days < 1460 {
        year_days_4 = 0;
        non_leap_year_block = true;
    } else {
        year_days_4 = 1 + (days - 1460) / 1461;
        days = (days - 1460) % 1461;
    }

    let year_days_1;
    if non_leap_year_block {
        year_days_1 = days / 365;
        days %= 365;
    } else if days < 366 {
        year_days_1 = 0;
    } else {
        year_days_1 = 1 + (days - 366) / 365;
        days = (days - 366) % 365;
    }

    let year = 1600 + year_days_400 * 400 + year_days_100 * 100 + year_days_4 * 4 + year_days_1;
    days += 1;

    if year.is_multiple_of(4) && (!year.is_multiple_of(100) || year.is_multiple_of(400)) {
        months[1] = 29;
    }
    if !date_1904 && year == 1900 {
        months[1] = 29;
        if serial_day == 366 {
            days += 1;
        }
    }

    let mut month = 1u8;
    for month_days in months {
        if days > month_days {
            days -= month_days;
            month += 1;
        } else {
            break;
        }
    }
    (year as u16, month, days as u8)
}

#[derive(Debug, Clone, PartialEq)]
enum DateToken {
    Literal(String),
    Year(usize),
    Month(usize),
    Minute(usize),
    Day(usize),
    Hour(usize),
    Second(usize),
    SubSecond(usize),
    AmPm { upper: bool, short: bool },
    ElapsedHours(usize),
    ElapsedMinutes(usize),
    ElapsedSeconds(usize),
}

impl DateToken {
    fn is_literal(&self) -> bool {
        matches!(self, DateToken::Literal(_))
    }
}

fn push_literal(tokens: &mut Vec<DateToken>, c: char) {
    if let Some(DateToken::Literal(text)) = tokens.last_mut() {
        text.push(c);
    } else {
        tokens.push(DateToken::Literal(c.to_string()));
    }
}

fn run(chars: &mut Peekable<Chars<'_>>, first: char) -> usize {
    let mut count = 1;
    while chars.peek().is_some_and(|c| c.eq_ignore_ascii_case(&first)) {
        chars.next();
        count += 1;
    }
    count
}

fn tokenize(section: &str) -> Vec<DateToken> {
    let mut tokens = Vec::new();
    let mut chars = section.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    push_literal(&mut tokens, next);
                }
            },
            '"' => {
                for next in chars.by_ref() {
                    if next == '"' {
                        break;
                    }
                    push_literal(&mut tokens, next);
                }
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
                    content.push(next.to_ascii_lowercase());
                }
                let width = content.len();
                if width > 0 && content.chars().all(|c| c == 'h') {
                    tokens.push(DateToken::ElapsedHours(width));
                } else if width > 0 && content.chars().all(|c| c == 'm') {
                    tokens.push(DateToken::ElapsedMinutes(width));
                } else if width > 0 && content.chars().all(|c| c == 's') {
                    tokens.push(DateToken::ElapsedSeconds(width));
                } else if let Some(currency) = content.strip_prefix('$') {
                    currency
                        .split('-')
                        .next()
                        .unwrap_or_default()
                        .chars()
                        .for_each(|c| push_literal(&mut tokens, c));
                }
            },
            'y' | 'Y' => tokens.push(DateToken::Year(run(&mut chars, c))),
            'e' | 'E' => tokens.push(DateToken::Year(4)),
            'm' | 'M' => tokens.push(DateToken::Month(run(&mut chars, c))),
            'd' | 'D' => tokens.push(DateToken::Day(run(&mut chars, c))),
            'h' | 'H' => tokens.push(DateToken::Hour(run(&mut chars, c))),
            's' | 'S' => tokens.push(DateToken::Second(run(&mut chars, c))),
            '.' if chars.peek() == Some(&'0')
                && matches!(
                    tokens.last(),
                    Some(DateToken::Second(_) | DateToken::ElapsedSeconds(_))
                ) =>
            {
                let mut digits = 0;
                while chars.peek() == Some(&'0') {
                    chars.next();
                    digits += 1;
                }
                tokens.push(DateToken::SubSecond(digits));
            },
            'a' | 'A' => {
                let rest: String = chars.clone().take(4).collect();
                if rest.eq_ignore_ascii_case("m/pm") {
                    chars.nth(3);
                    tokens.push(DateToken::AmPm {
                        upper: c.is_ascii_uppercase(),
                        short: false,
                    });
                } else if rest.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("/p")) {
                    chars.nth(1);
                    tokens.push(DateToken::AmPm {
                        upper: c.is_ascii_uppercase(),
                        short: true,
                    });
                } else {
                    push_literal(&mut tokens, c);
                }
            },
            _ => push_literal(&mut tokens, c),
        }
    }

    // `m` and `mm` mean minutes right after an hour or right before a second.
    for i in 0..tokens.len() {
        let DateToken::Month(count) = tokens[i] else {
            continue;
        };
        if count > 2 {
            continue;
        }
        let after_hour = tokens[..i]
            .iter()
            .rev()
            .find(|t| !t.is_literal())
            .is_some_and(|t| matches!(t, DateToken::Hour(_) | DateToken::ElapsedHours(_)));
        let before_second = tokens[i + 1..]
            .iter()
            .find(|t| !t.is_literal())
            .is_some_and(|t| matches!(t, DateToken::Second(_) | DateToken::ElapsedSeconds(_)));
        if after_hour || before_second {
            tokens[i] = DateToken::Minute(count);
        }
    }
    tokens
}

fn push_number(out: &mut String, value: u64, width: usize) {
    let _ = write!(out, "{value:0width$}");
}

/// Render a serial value through a date/time or elapsed-time section.
///
/// Returns `None` when the value cannot be represented as a date.
pub fn render_date_section(section: &str, value: f64, date_1904: bool) -> Option<String> {
    let tokens = tokenize(section);
    let sub_second_digits = tokens
        .iter()
        .filter_map(|t| match t {
            DateToken::SubSecond(digits) => Some((*digits).min(3)),
            _ => None,
        })
        .max();
    let twelve_hour = tokens.iter().any(|t| matches!(t, DateToken::AmPm { .. }));
    let dt = match sub_second_digits {
        Some(digits) => {
            // Round to the displayed fraction before splitting into fields.
            let unit = 10f64.powi(3 - digits as i32);
            let rounded = (value * MILLIS_PER_DAY / unit).round() * unit / MILLIS_PER_DAY;
            SerialDateTime::from_serial_millis(rounded, date_1904)?
        },
        None => SerialDateTime::from_serial(value, date_1904)?,
    };
    let total_seconds = (value * 86_400.0).round() as u64;

    let mut out = String::with_capacity(section.len() + 8);
    for token in &tokens {
        match token {
            DateToken::Literal(text) => out.push_str(text),
            DateToken::Year(count) if *count <= 2 => push_number(&mut out, u64::from(dt.year % 100), 2),
            DateToken::Year(_) => push_number(&mut out, u64::from(dt.year), 4),
            DateToken::Month(1) => push_number(&mut out, u64::from(dt.month), 1),
            DateToken::Month(2) => push_number(&mut out, u64::from(dt.month), 2),
            DateToken::Month(count) => {
                let name = MONTH_NAMES[usize::from(dt.month.clamp(1, 12)) - 1];
                match count {
                    3 => out.push_str(&name[..3]),
                    4 => out.push_str(name),
                    _ => out.push_str(&name[..1]),
                }
            },
            DateToken::Day(count) if *count <= 2 => push_number(&mut out, u64::from(dt.day), *count),
            DateToken::Day(count) => {
                let name = weekday_name(dt.weekday());
                out.push_str(if *count == 3 { &name[..3] } else { name });
            },
            DateToken::Hour(count) => {
                let hour = if twelve_hour {
                    match dt.hour % 12 {
                        0 => 12,
                        h => h,
                    }
                } else {
                    dt.hour
                };
                push_number(&mut out, u64::from(hour), (*count).min(2));
            },
            DateToken::Minute(count) => push_number(&mut out, u64::from(dt.minute), (*count).min(2)),
            DateToken::Second(count) => push_number(&mut out, u64::from(dt.second), (*count).min(2)),
            DateToken::SubSecond(digits) => {
                let millis = format!("{:03}", dt.millis);
                out.push('.');
                out.push_str(&millis[..(*digits).min(3)]);
            },
            DateToken::AmPm { upper, short } => {
                let pm = dt.hour >= 12;
                let text = match (short, pm) {
                    (false, false) => "AM",
                    (false, true) => "PM",
                    (true, false) => "A",
                    (true, true) => "P",
                };
                if *upper {
                    out.push_str(text);
                } else {
                    out.push_str(&text.to_ascii_lowercase());
                }
            },
            DateToken::ElapsedHours(width) => push_number(&mut out, total_seconds / 3600, *width),
            DateToken::ElapsedMinutes(width) => push_number(&mut out, total_seconds / 60, *width),
            DateToken::ElapsedSeconds(width) => push_number(&mut out, total_seconds, *width),
        }
    }
    Some(out)
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_section() {
        assert_eq!(classify_section("DD/MM/YY"), SectionKind::DateTime);
        assert_eq!(classify_section("m\"M\"d\"D\""), SectionKind::DateTime);
        assert_eq!(classify_section("[$-404]e\"\\xfc\"m"), SectionKind::DateTime);
        assert_eq!(classify_section("#,##0\\ [$\\u20bd-46D]"), SectionKind::Number);
        assert_eq!(classify_section("\\Y000000"), SectionKind::Number);
        assert_eq!(classify_section("#,##0.0####\" YMD\""), SectionKind::Number);
        assert_eq!(classify_section("0_ "), SectionKind::Number);
        assert_eq!(classify_section("[h]:mm:ss"), SectionKind::Elapsed);
        assert_eq!(classify_section("[ss]"), SectionKind::Elapsed);
        assert_eq!(classify_section("General"), SectionKind::Number);
    }

    #[test]
    fn test_is_date_format_uses_first_section() {
        assert!(is_date_format("H:MM:SS;@"));
        assert!(is_date_format("m/d/yy"));
        assert!(!is_date_format("\"Y: \"0.00\"m\";\"Y: \"-0.00\"m\";\"Y: <num>m\";@"));
        assert!(!is_date_format("[h]:mm:ss"));
    }

    #[test]
    fn test_serial_conversion_1900() {
        let dt = SerialDateTime::from_serial(1.0, false).unwrap();
        assert_eq!((dt.year, dt.month, dt.day), (1900, 1, 1));
        assert_eq!(iso_date(59.0, false).as_deref(), Some("1900-02-28"));
        assert_eq!(iso_date(60.0, false).as_deref(), Some("1900-02-29"));
        assert_eq!(iso_date(61.0, false).as_deref(), Some("1900-03-01"));
        assert_eq!(iso_date(366.0, false).as_deref(), Some("1900-12-31"));
        assert_eq!(iso_date(367.0, false).as_deref(), Some("1901-01-01"));
        assert_eq!(iso_date(43831.0, false).as_deref(), Some("2020-01-01"));
        assert_eq!(iso_date(45292.75, false).as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn test_serial_conversion_1904() {
        assert_eq!(iso_date(0.0, true).as_deref(), Some("1904-01-01"));
        assert_eq!(iso_date(42369.0, true).as_deref(), Some("2020-01-01"));
    }

    #[test]
    fn test_serial_out_of_range() {
        assert_eq!(iso_date(-1.0, false), None);
        assert_eq!(iso_date(f64::NAN, false), None);
        assert_eq!(iso_date(3_000_000.0, false), None);
    }

    #[test]
    fn test_time_rounds_to_seconds() {
        // 12:34:56.6
        let value = (12.0 * 3600.0 + 34.0 * 60.0 + 56.6) / 86_400.0;
        let dt = SerialDateTime::from_serial(value, false).unwrap();
        assert_eq!((dt.hour, dt.minute, dt.second), (12, 34, 57));
        let dt = SerialDateTime::from_serial_millis(value, false).unwrap();
        assert_eq!((dt.second, dt.millis), (56, 600));
    }

    #[test]
    fn test_weekday() {
        let dt = SerialDateTime::from_serial(43831.0, false).unwrap();
        assert_eq!(dt.weekday(), Weekday::Wed);
        let phantom = SerialDateTime::from_serial(60.0, false).unwrap();
        assert_eq!(phantom.weekday(), Weekday::Wed);
    }

    #[test]
    fn test_render_date_section() {
        let value = 43831.5; // 2020-01-01 12:00
        assert_eq!(render_date_section("yyyy-mm-dd", value, false).unwrap(), "2020-01-01");
        assert_eq!(render_date_section("d-mmm-yy", value, false).unwrap(), "1-Jan-20");
        assert_eq!(render_date_section("mmmm d, yyyy", value, false).unwrap(), "January 1, 2020");
        assert_eq!(render_date_section("dddd", value, false).unwrap(), "Wednesday");
        assert_eq!(render_date_section("ddd mmmmm", value, false).unwrap(), "Wed J");
        assert_eq!(render_date_section("h:mm AM/PM", value, false).unwrap(), "12:00 PM");
        assert_eq!(render_date_section("hh:mm:ss", 0.25, false).unwrap(), "06:00:00");
        assert_eq!(render_date_section("h:mm a/p", 0.75, false).unwrap(), "6:00 p");
        assert_eq!(render_date_section("m/d/yy h:mm", value, false).unwrap(), "1/1/20 12:00");
    }

    #[test]
    fn test_minutes_before_seconds() {
        let value = (5.0 * 60.0 + 7.0) / 86_400.0;
        assert_eq!(render_date_section("mm:ss", value, false).unwrap(), "05:07");
        assert_eq!(
            render_date_section("mm:ss.0", value + 0.3 / 86_400.0, false).unwrap(),
            "05:07.3"
        );
    }

    #[test]
    fn test_elapsed_sections() {
        assert_eq!(render_date_section("[h]:mm:ss", 1.5, false).unwrap(), "36:00:00");
        assert_eq!(render_date_section("[mm]", 0.5, false).unwrap(), "720");
        assert_eq!(render_date_section("[s]", 1.0 / 1440.0, false).unwrap(), "60");
    }

    #[test]
    fn test_quoted_literals_and_currency_brackets() {
        assert_eq!(
            render_date_section("yyyy\"年\"m\"月\"d\"日\"", 43831.0, false).unwrap(),
            "2020年1月1日"
        );
        assert_eq!(render_date_section("[$-409]d/m/yyyy", 43831.0, false).unwrap(), "1/1/2020");
    }
}
