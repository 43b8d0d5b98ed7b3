//! Human-readable rendering of money, dates, phone numbers and sizes.
//!
//! These are display helpers for receipts, exports and API responses that want a preformatted
//! string next to the raw value. They never feed back into accounting.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use num_format::{Locale, ToFormattedString};
use rust_decimal::{Decimal, RoundingStrategy};

/// Symbol and number of minor digits for the currencies we render with a symbol
pub fn currency_symbol(code: &str) -> Option<(&'static str, u32)> {
    match code.to_ascii_uppercase().as_str() {
        "PHP" => Some(("₱", 2)),
        "USD" => Some(("$", 2)),
        "EUR" => Some(("€", 2)),
        "GBP" => Some(("£", 2)),
        "JPY" => Some(("¥", 0)),
        _ => None,
    }
}

/// Groups the integer digits of a non-negative decimal already rounded to `dp` places
fn group_digits(value: Decimal, dp: u32) -> String {
    let plain = format!("{:.*}", dp as usize, value);
    let (int_part, frac_part) = match plain.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (plain.as_str(), None),
    };
    let grouped = int_part
        .parse::<u64>()
        .map(|n| n.to_formatted_string(&Locale::en))
        .unwrap_or_else(|_| int_part.to_string());
    match frac_part {
        Some(frac) => format!("{grouped}.{frac}"),
        None => grouped,
    }
}

/// Formats an amount, e.g. `₱1,234.50`, `¥1,235` or `1,234.50 CHF` for codes without a symbol.
///
/// Rounds half away from zero. Negative amounts put the sign before the symbol.
pub fn format_currency(amount: Decimal, code: &str) -> String {
    let (symbol, dp) = currency_symbol(code).map_or((None, 2), |(s, dp)| (Some(s), dp));
    let rounded = amount.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let digits = group_digits(rounded.abs(), dp);
    match symbol {
        Some(symbol) => format!("{sign}{symbol}{digits}"),
        None => format!("{sign}{digits} {}", code.to_ascii_uppercase()),
    }
}

/// `Jan 15, 2024`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// `January 15, 2024`
pub fn format_date_long(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// `Jan 15, 2024 3:04 PM`
pub fn format_date_time(at: NaiveDateTime) -> String {
    at.format("%b %-d, %Y %-I:%M %p").to_string()
}

/// Turns a `YYYY-MM` bucket key into `January 2024`. Keys that do not parse are returned as-is.
pub fn format_month_key(key: &str) -> String {
    NaiveDate::parse_from_str(&format!("{key}-01"), "%Y-%m-%d")
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|_| key.to_string())
}

/// Formats Philippine mobile numbers.
///
/// `09171234567` becomes `0917 123 4567`, and `639171234567` or `+639171234567` become
/// `+63 917 123 4567`. Anything else is returned trimmed.
pub fn format_phone_number(raw: &str) -> String {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    let only_phone_chars = trimmed
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
    if !only_phone_chars {
        return trimmed.to_string();
    }

    if digits.len() == 11 && digits.starts_with("09") {
        format!("{} {} {}", &digits[..4], &digits[4..7], &digits[7..])
    } else if digits.len() == 12 && digits.starts_with("639") {
        format!("+63 {} {} {}", &digits[2..5], &digits[5..8], &digits[8..])
    } else {
        trimmed.to_string()
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 { format!("1 {unit}") } else { format!("{n} {unit}s") }
}

/// Tenancy length between two dates, e.g. `1 year, 2 months` or `12 days`
pub fn format_duration(from: NaiveDate, to: NaiveDate) -> String {
    if to <= from {
        return "0 days".to_string();
    }
    let mut months = i64::from(to.year() - from.year()) * 12 + i64::from(to.month()) - i64::from(from.month());
    if to.day() < from.day() {
        months -= 1;
    }
    if months <= 0 {
        return plural((to - from).num_days(), "day");
    }

    let (years, months) = (months / 12, months % 12);
    match (years, months) {
        (0, m) => plural(m, "month"),
        (y, 0) => plural(y, "year"),
        (y, m) => format!("{}, {}", plural(y, "year"), plural(m, "month")),
    }
}

/// `just now`, `5 minutes ago`, `in 3 days`
pub fn format_relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - then).num_seconds();
    let magnitude = seconds.abs();
    if magnitude < 60 {
        return "just now".to_string();
    }

    let phrase = match magnitude {
        s if s < 3_600 => plural(s / 60, "minute"),
        s if s < 86_400 => plural(s / 3_600, "hour"),
        s if s < 86_400 * 30 => plural(s / 86_400, "day"),
        s if s < 86_400 * 365 => plural(s / (86_400 * 30), "month"),
        s => plural(s / (86_400 * 365), "year"),
    };
    if seconds > 0 { format!("{phrase} ago") } else { format!("in {phrase}") }
}

/// `512 B`, `1.5 KB`, `2.0 MB`
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(Decimal::new(12345, 1), "PHP"), "₱1,234.50");
        assert_eq!(format_currency(Decimal::new(12345, 1), "php"), "₱1,234.50");
        assert_eq!(format_currency(Decimal::new(1_000_000, 0), "USD"), "$1,000,000.00");
        assert_eq!(format_currency(Decimal::new(5, 3), "EUR"), "€0.01");
        assert_eq!(format_currency(Decimal::new(12345, 1), "JPY"), "¥1,235");
        assert_eq!(format_currency(Decimal::new(-2500, 0), "GBP"), "-£2,500.00");
        assert_eq!(format_currency(Decimal::new(12345, 1), "CHF"), "1,234.50 CHF");
        assert_eq!(format_currency(Decimal::ZERO, "PHP"), "₱0.00");
    }

    #[test]
    fn test_format_dates() {
        assert_eq!(format_date(date(2024, 1, 15)), "Jan 15, 2024");
        assert_eq!(format_date_long(date(2024, 1, 5)), "January 5, 2024");
        let at = date(2024, 1, 15).and_hms_opt(15, 4, 0).unwrap();
        assert_eq!(format_date_time(at), "Jan 15, 2024 3:04 PM");
    }

    #[test]
    fn test_format_month_key() {
        assert_eq!(format_month_key("2024-01"), "January 2024");
        assert_eq!(format_month_key("not-a-month"), "not-a-month");
    }

    #[test]
    fn test_format_phone_number() {
        assert_eq!(format_phone_number("09171234567"), "0917 123 4567");
        assert_eq!(format_phone_number("+639171234567"), "+63 917 123 4567");
        assert_eq!(format_phone_number("639171234567"), "+63 917 123 4567");
        assert_eq!(format_phone_number(" (02) 8123-4567 "), "(02) 8123-4567");
        assert_eq!(format_phone_number("call me"), "call me");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(date(2023, 1, 15), date(2024, 3, 15)), "1 year, 2 months");
        assert_eq!(format_duration(date(2024, 1, 15), date(2024, 4, 14)), "2 months");
        assert_eq!(format_duration(date(2023, 6, 1), date(2025, 6, 1)), "2 years");
        assert_eq!(format_duration(date(2024, 1, 1), date(2024, 1, 13)), "12 days");
        assert_eq!(format_duration(date(2024, 1, 1), date(2024, 1, 2)), "1 day");
        assert_eq!(format_duration(date(2024, 1, 1), date(2024, 1, 1)), "0 days");
    }

    #[test]
    fn test_format_relative_time() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(format_relative_time(now - Duration::seconds(30), now), "just now");
        assert_eq!(format_relative_time(now - Duration::minutes(5), now), "5 minutes ago");
        assert_eq!(format_relative_time(now - Duration::hours(1), now), "1 hour ago");
        assert_eq!(format_relative_time(now + Duration::days(3), now), "in 3 days");
        assert_eq!(format_relative_time(now - Duration::days(400), now), "1 year ago");
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2.0 MB");
    }
}
