//! Result-card text parsing shared by flight scrapers.
//!
//! Rendered result cards arrive as blocks of innerText. Parsing is
//! positional line heuristics over the normalized lines, kept separate
//! from page driving so it can be tested without a browser and swapped
//! when the provider's markup shifts.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

fn price_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\s?\d[\d,]*(?:\.\d{1,2})?").unwrap())
}

fn time_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\d{1,2}:\d{2}\s*(?:AM|PM)").unwrap())
}

fn stops_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*stop").unwrap())
}

fn nonstop_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bnonstop\b|\bdirect\b").unwrap())
}

/// Parse a price string into integer cents.
///
/// Accepts currency symbols, commas, and an optional fractional part:
/// `"$1,234"` -> `123400`, `"234.50"` -> `23450`. Returns None for
/// anything that is not a plain decimal amount.
pub fn parse_price_cents(text: &str) -> Option<i64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let (dollars_str, cents_str) = match cleaned.split_once('.') {
        Some((d, c)) => (d, Some(c)),
        None => (cleaned.as_str(), None),
    };

    if dollars_str.is_empty() || !dollars_str.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let dollars: i64 = dollars_str.parse().ok()?;

    let cents = match cents_str {
        None => 0,
        Some(c) => {
            if c.is_empty() || c.len() > 2 || !c.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let value: i64 = c.parse().ok()?;
            // "234.5" means 50 cents, not 5
            if c.len() == 1 {
                value * 10
            } else {
                value
            }
        }
    };

    dollars.checked_mul(100)?.checked_add(cents)
}

/// Structured data pulled out of one result card. The original timing and
/// duration strings are kept verbatim for the raw-data audit payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedCard {
    pub price_cents: i64,
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
    pub airline: Option<String>,
    pub duration: Option<String>,
    pub stops: Option<i32>,
}

/// Parse one result card's text.
///
/// Lines are trimmed and empties dropped, then matched positionally: the
/// first line containing a currency-prefixed amount is the price; times
/// are either one line
/// holding both separated by a dash (probed first) or two consecutive
/// time lines; the airline follows the time line(s) and the duration
/// follows the airline. A card with no price yields None; missing price
/// means missing data, not an error.
pub fn parse_card(text: &str) -> Option<ParsedCard> {
    let lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.trim_matches(|c: char| c.is_whitespace() || c == '·'))
        .filter(|l| !l.is_empty())
        .collect();

    let price_cents = lines
        .iter()
        .find_map(|line| price_re().find(line).and_then(|m| parse_price_cents(m.as_str())))?;

    let (departure_time, arrival_time, time_end) = find_times(&lines);

    let mut airline = None;
    let mut duration = None;
    if let Some(time_end) = time_end {
        if let Some(line) = lines.get(time_end + 1) {
            airline = Some((*line).to_string());
        }
        if let Some(line) = lines.get(time_end + 2) {
            duration = Some((*line).to_string());
        }
    }

    let stops = find_stops(&lines);

    Some(ParsedCard {
        price_cents,
        departure_time,
        arrival_time,
        airline,
        duration,
        stops,
    })
}

/// Locate departure/arrival times and the index of the last time line.
///
/// A combined line ("8:15 AM - 11:40 AM") is probed before the
/// two-consecutive-lines layout.
fn find_times(lines: &[&str]) -> (Option<String>, Option<String>, Option<usize>) {
    for (i, line) in lines.iter().enumerate() {
        if !line.contains(['-', '\u{2013}', '\u{2014}']) {
            continue;
        }
        let times: Vec<&str> = time_re().find_iter(line).map(|m| m.as_str()).collect();
        if times.len() >= 2 {
            return (
                Some(times[0].to_string()),
                Some(times[1].to_string()),
                Some(i),
            );
        }
    }

    for i in 0..lines.len().saturating_sub(1) {
        if time_re().is_match(lines[i]) && time_re().is_match(lines[i + 1]) {
            return (
                time_re().find(lines[i]).map(|m| m.as_str().to_string()),
                time_re().find(lines[i + 1]).map(|m| m.as_str().to_string()),
                Some(i + 1),
            );
        }
    }

    (None, None, None)
}

fn find_stops(lines: &[&str]) -> Option<i32> {
    for line in lines {
        if nonstop_re().is_match(line) {
            return Some(0);
        }
        if let Some(caps) = stops_re().captures(line) {
            return caps.get(1).and_then(|m| m.as_str().parse().ok());
        }
    }
    None
}
