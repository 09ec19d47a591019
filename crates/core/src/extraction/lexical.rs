//! Money and duration expressions in Korean free text.
//!
//! Both parsers look at the first recognizable expression only. An utterance with
//! two amounts ("월 소득 300만원이고 5천만원 필요해요") yields the first one; picking
//! between them is not attempted here.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::lenient::whole_won;

/// Won multiplier for each amount unit, longest spelling first so that "만원" is
/// never read as "만" followed by stray text.
const AMOUNT_UNITS: [(&str, f64); 6] = [
    ("억", 100_000_000.0),
    ("천만원", 10_000_000.0),
    ("백만원", 1_000_000.0),
    ("만원", 10_000.0),
    ("만", 10_000.0),
    ("원", 1.0),
];

/// Year counts above this are calendar years ("2024년"), not durations.
const MAX_DURATION_YEARS: u32 = 50;

static AMOUNT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    let units = AMOUNT_UNITS.iter().map(|(unit, _)| *unit).collect::<Vec<_>>().join("|");
    Regex::new(&format!(r"([0-9]+(?:\.[0-9]+)?)({units})")).expect("amount pattern compiles")
});

static DURATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([0-9]+)(개월|달|months|month|년|years|year)").expect("duration pattern compiles")
});

/// Amount in won of the first `<number><unit>` expression, rounded to the nearest
/// won. Thousands separators are removed before matching. An amount too large to
/// hold in a `u64` is no amount.
pub fn parse_amount(text: &str) -> Option<u64> {
    let cleaned = text.replace(',', "");
    let captures = AMOUNT_PATTERN.captures(&cleaned)?;
    let number = captures.get(1)?.as_str().parse::<f64>().ok()?;
    let unit = captures.get(2)?.as_str();
    let multiplier = AMOUNT_UNITS.iter().find(|(spelling, _)| *spelling == unit)?.1;

    whole_won(number * multiplier)
}

/// Duration in months of the first `<integer><unit>` expression. Month units are
/// returned as written; year units are converted to months.
pub fn parse_months(text: &str) -> Option<u32> {
    DURATION_PATTERN.captures_iter(text).find_map(|captures| {
        let count = captures.get(1)?.as_str().parse::<u32>().ok()?;
        let unit = captures.get(2)?.as_str().to_lowercase();
        match unit.as_str() {
            "년" | "year" | "years" if count > MAX_DURATION_YEARS => None,
            "년" | "year" | "years" => count.checked_mul(12),
            _ => Some(count),
        }
    })
}
