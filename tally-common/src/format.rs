//! Counter formatting as shown on the dashboard.

pub const CURRENCY_SYMBOL: &str = "GH₵";

/// Formats a count with `,` thousands separators and at most three
/// fraction digits, trailing zeros trimmed (`1234.5` -> `1,234.5`).
///
/// Rounds the shortest decimal form of `value` half away from zero, so
/// `0.5005` gives `0.501` as it does in the browser.
pub fn count(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_string();
    }

    let shortest = value.abs().to_string();
    let (int, frac) = shortest.split_once('.').unwrap_or((shortest.as_str(), ""));
    let (int, frac) = if frac.len() > 3 {
        round_digits(int, &frac[..3], frac.as_bytes()[3] >= b'5')
    } else {
        (int.to_string(), frac.to_string())
    };
    let frac = frac.trim_end_matches('0');

    let mut out = String::with_capacity(int.len() + int.len() / 3 + frac.len() + 2);
    if value.is_sign_negative() {
        out.push('-');
    }
    out.push_str(&group_thousands(&int));
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Formats an amount as `GH₵` followed by exactly two decimals, no grouping.
///
/// Rounds the exact binary value; exact halfway cases (`0.125`, `0.625`) go
/// up, everything else to the nearest cent.
pub fn currency(value: f64) -> String {
    if value.is_nan() {
        return format!("{CURRENCY_SYMBOL}NaN");
    }
    if value.is_infinite() {
        let sign = if value > 0.0 { "" } else { "-" };
        return format!("{CURRENCY_SYMBOL}{sign}Infinity");
    }
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();
    // a cent tie is exact only when `abs` is an odd number of eighths
    let eighths = abs * 8.0;
    if eighths.fract() == 0.0 && eighths % 2.0 == 1.0 {
        let cents = (abs * 100.0).ceil() as u64;
        return format!("{CURRENCY_SYMBOL}{sign}{}.{:02}", cents / 100, cents % 100);
    }
    format!("{CURRENCY_SYMBOL}{sign}{abs:.2}")
}

/// Rounds to two decimals the way amounts are stored and published.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Adds one unit in the last place of `int.frac` when `up` is set.
fn round_digits(int: &str, frac: &str, up: bool) -> (String, String) {
    if !up {
        return (int.to_string(), frac.to_string());
    }
    let mut digits: Vec<u8> = int.bytes().chain(frac.bytes()).collect();
    let mut i = digits.len();
    loop {
        if i == 0 {
            digits.insert(0, b'1');
            break;
        }
        i -= 1;
        if digits[i] == b'9' {
            digits[i] = b'0';
        } else {
            digits[i] += 1;
            break;
        }
    }
    let split = digits.len() - frac.len();
    let text = String::from_utf8_lossy(&digits).into_owned();
    (text[..split].to_string(), text[split..].to_string())
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_grouping() {
        assert_eq!(count(0.0), "0");
        assert_eq!(count(7.0), "7");
        assert_eq!(count(999.0), "999");
        assert_eq!(count(1000.0), "1,000");
        assert_eq!(count(1234.0), "1,234");
        assert_eq!(count(1234567.0), "1,234,567");
        assert_eq!(count(-98765.0), "-98,765");
    }

    #[test]
    fn test_count_fraction() {
        assert_eq!(count(1234.5), "1,234.5");
        assert_eq!(count(0.125), "0.125");
        assert_eq!(count(2.0004), "2");
        assert_eq!(count(-0.0001), "-0");
    }

    #[test]
    fn test_count_rounds_shortest_form() {
        assert_eq!(count(0.5005), "0.501");
        assert_eq!(count(1.0005), "1.001");
        assert_eq!(count(0.9995), "1");
        assert_eq!(count(999.9996), "1,000");
        assert_eq!(count(-1234.5678), "-1,234.568");
        assert_eq!(count(1e21), "1,000,000,000,000,000,000,000");
    }

    #[test]
    fn test_currency() {
        assert_eq!(currency(500.5), "GH₵500.50");
        assert_eq!(currency(1234.0), "GH₵1234.00");
        assert_eq!(currency(0.125), "GH₵0.13");
        assert_eq!(currency(-3.0), "GH₵-3.00");
    }

    #[test]
    fn test_currency_rounds_exact_value() {
        // stored just below the half cent
        assert_eq!(currency(0.015), "GH₵0.01");
        assert_eq!(currency(10.235), "GH₵10.23");
        assert_eq!(currency(1.005), "GH₵1.00");
        // exact halves go up
        assert_eq!(currency(0.625), "GH₵0.63");
        assert_eq!(currency(2.375), "GH₵2.38");
        assert_eq!(currency(-0.625), "GH₵-0.63");
        assert_eq!(currency(0.999), "GH₵1.00");
    }

    #[test]
    fn test_non_finite() {
        assert_eq!(count(f64::NAN), "NaN");
        assert_eq!(count(f64::INFINITY), "∞");
        assert_eq!(currency(f64::NAN), "GH₵NaN");
        assert_eq!(currency(f64::NEG_INFINITY), "GH₵-Infinity");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(10.0 + 0.1 + 0.2), 10.3);
        assert_eq!(round2(99.999), 100.0);
    }
}
