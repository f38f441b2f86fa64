/// Round half away from zero to `places` decimals, folding `-0.0` into `0.0`.
fn round_to(val: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (val * factor).round() / factor + 0.0
}

/// Insert `,` between every group of three integer digits: 1234567 -> 1,234,567
fn group_thousands(digits: &str) -> String {
    let mut with_commas = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    with_commas.chars().rev().collect()
}

fn grouped(fixed: String) -> String {
    let (sign, body) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    match body.split_once('.') {
        Some((int_part, dec_part)) => format!("{sign}{}.{dec_part}", group_thousands(int_part)),
        None => format!("{sign}{}", group_thousands(body)),
    }
}

/// Liters, one decimal: 10 -> "10.0". Non-finite values render empty.
pub fn format_quantity(val: f64) -> String {
    if !val.is_finite() {
        return String::new();
    }
    format!("{:.1}", round_to(val, 1))
}

pub fn format_percentage(val: f64) -> String {
    if !val.is_finite() {
        return String::new();
    }
    format!("{:.1}", round_to(val, 1))
}

/// Currency, two decimals, no separators: 1234.5 -> "1234.50"
#[allow(dead_code)]
pub fn format_amount(val: f64) -> String {
    if !val.is_finite() {
        return String::new();
    }
    format!("{:.2}", round_to(val, 2))
}

/// Currency, two decimals, thousands-separated: 1234.5 -> "1,234.50"
pub fn format_amount_grouped(val: f64) -> String {
    if !val.is_finite() {
        return String::new();
    }
    grouped(format!("{:.2}", round_to(val, 2)))
}

/// The emphasized statement total: nearest integer, thousands-separated.
pub fn format_final_amount(val: f64) -> String {
    if !val.is_finite() {
        return String::new();
    }
    grouped(format!("{:.0}", round_to(val, 0)))
}
