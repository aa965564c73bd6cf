//! Money formatting helpers.
//!
//! Prices are stored as integer cents everywhere; formatting to a
//! display string happens only at the edges (alert messages, CLI output).

/// Format cents as a dollar amount with thousands separators.
///
/// Whole-dollar amounts omit the decimal part: `22000` -> `"$220"`,
/// `123456` -> `"$1,234.56"`.
pub fn format_cents(cents: i64) -> String {
    let negative = cents < 0;
    let cents = cents.unsigned_abs();
    let dollars = cents / 100;
    let remainder = cents % 100;

    let mut digits = dollars.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    while digits.len() > 3 {
        let rest = digits.split_off(digits.len() - 3);
        grouped.insert_str(0, &rest);
        grouped.insert(0, ',');
    }
    grouped.insert_str(0, &digits);

    let sign = if negative { "-" } else { "" };
    if remainder == 0 {
        format!("{sign}${grouped}")
    } else {
        format!("{sign}${grouped}.{remainder:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(0), "$0");
        assert_eq!(format_cents(22_000), "$220");
        assert_eq!(format_cents(123_456), "$1,234.56");
        assert_eq!(format_cents(100_000_005), "$1,000,000.05");
        assert_eq!(format_cents(99), "$0.99");
        assert_eq!(format_cents(-4_550), "-$45.50");
    }
}
