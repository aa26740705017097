//! Currency parsing, percentage and currency formatting, and the
//! price-per-square-foot guard used throughout the engine.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::NOT_AVAILABLE;

static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9.]").expect("valid regex"));

/// Parse a formatted amount such as `"$1,234,000"` by keeping only digits
/// and decimal points. Returns `None` when nothing parsable remains.
pub fn parse_currency(s: &str) -> Option<f64> {
    let cleaned = NON_NUMERIC.replace_all(s, "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Like [`parse_currency`] but `0` when nothing numeric remains.
pub fn parse_currency_string(s: &str) -> f64 {
    parse_currency(s).unwrap_or(0.0)
}

/// `price / sqft`, or `None` unless `sqft` is strictly positive.
pub fn price_per_sqft(price: f64, sqft: f64) -> Option<f64> {
    if !sqft.is_finite() || sqft <= 0.0 || !price.is_finite() {
        return None;
    }
    Some(price / sqft)
}

/// Signed percentage difference of `value` against `reference`, one decimal,
/// e.g. `"+12.5%"`. `"N/A"` when either side is missing or the reference is zero.
pub fn format_percent_diff(value: Option<f64>, reference: Option<f64>) -> String {
    match percent_diff(value, reference) {
        Some(diff) => {
            let rounded = round_to(diff, 1);
            if rounded == 0.0 {
                "0.0%".to_string()
            } else {
                format!("{:+.1}%", rounded)
            }
        }
        None => NOT_AVAILABLE.to_string(),
    }
}

/// `(value - reference) / reference * 100` when finite.
pub fn percent_diff(value: Option<f64>, reference: Option<f64>) -> Option<f64> {
    let (value, reference) = (value?, reference?);
    if reference == 0.0 {
        return None;
    }
    Some((value - reference) / reference * 100.0).filter(|d| d.is_finite())
}

/// US-dollar display with thousands separators and no cents, e.g. `"$500,000"`.
pub fn format_currency(value: Option<f64>) -> String {
    let value = match value.filter(|v| v.is_finite()) {
        Some(v) => v,
        None => return NOT_AVAILABLE.to_string(),
    };
    let rounded = value.abs().round();
    // u64::MAX as f64 is 2^64, which no longer fits
    if rounded >= u64::MAX as f64 {
        return NOT_AVAILABLE.to_string();
    }
    let whole = rounded as u64;
    let sign = if value < 0.0 && whole > 0 { "-" } else { "" };
    format!("{}${}", sign, group_thousands(whole))
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Round to `places` decimals; values too large to scale come back unchanged
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// Mean of the finite values, `None` when there are none
pub fn mean(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    Some(finite.iter().sum::<f64>() / finite.len() as f64)
}

/// Median of the finite values, `None` when there are none
pub fn median(values: &[f64]) -> Option<f64> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(f64::total_cmp);
    let mid = finite.len() / 2;
    Some(if finite.len() % 2 == 0 {
        (finite[mid - 1] + finite[mid]) / 2.0
    } else {
        finite[mid]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_currency_string() {
        assert_eq!(parse_currency_string("$1,234,000"), 1_234_000.0);
        assert_eq!(parse_currency_string("2,150 sqft"), 2150.0);
        assert_eq!(parse_currency_string("$12.50"), 12.5);
        assert_eq!(parse_currency_string(""), 0.0);
        assert_eq!(parse_currency_string("N/A"), 0.0);
        assert_eq!(parse_currency_string("1.2.3"), 0.0);
        assert_eq!(parse_currency("call agent"), None);
    }

    #[test]
    fn test_price_per_sqft_guards_zero_and_negative_area() {
        assert_eq!(price_per_sqft(500_000.0, 2000.0), Some(250.0));
        for sqft in [0.0, -0.0, -1.0, -2500.0, f64::NAN] {
            assert_eq!(price_per_sqft(500_000.0, sqft), None, "sqft = {sqft}");
        }
        assert_eq!(price_per_sqft(0.0, 0.0), None);
        assert_eq!(price_per_sqft(f64::INFINITY, 10.0), None);
    }

    #[test]
    fn test_format_percent_diff() {
        assert_eq!(format_percent_diff(Some(110.0), Some(100.0)), "+10.0%");
        assert_eq!(format_percent_diff(Some(87.5), Some(100.0)), "-12.5%");
        assert_eq!(format_percent_diff(Some(100.0), Some(100.0)), "0.0%");
        assert_eq!(format_percent_diff(None, Some(100.0)), "N/A");
        assert_eq!(format_percent_diff(Some(100.0), None), "N/A");
        assert_eq!(format_percent_diff(Some(5.0), Some(0.0)), "N/A");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(Some(500_000.0)), "$500,000");
        assert_eq!(format_currency(Some(1_234_567.6)), "$1,234,568");
        assert_eq!(format_currency(Some(999.0)), "$999");
        assert_eq!(format_currency(Some(0.0)), "$0");
        assert_eq!(format_currency(Some(-1500.0)), "-$1,500");
        assert_eq!(format_currency(None), "N/A");
        assert_eq!(format_currency(Some(f64::NAN)), "N/A");
        assert_eq!(format_currency(Some(1e19)), "$10,000,000,000,000,000,000");
        assert_eq!(format_currency(Some(2e19)), "N/A");
        assert_eq!(format_currency(Some(-1e30)), "N/A");
    }

    #[test]
    fn test_round_to_keeps_huge_values_finite() {
        assert_eq!(round_to(4.76, 1), 4.8);
        assert_eq!(round_to(1.255, 0), 1.0);
        assert_eq!(round_to(f64::MAX, 1), f64::MAX);
    }

    #[test]
    fn test_mean_and_median() {
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(mean(&[]), None);
        assert_eq!(median(&[f64::NAN]), None);
    }
}
