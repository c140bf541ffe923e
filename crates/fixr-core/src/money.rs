//! Rupee and percentage formatting for the arena terminal.
//!
//! The terminal text is matched character for character against the web
//! client, so these helpers follow JavaScript's number formatting rather
//! than Rust's: Indian digit grouping (`20,00,000`), `toFixed(1)` rounding,
//! and `Math.round` half-up.

/// Group digits the way `toLocaleString('en-IN')` does: the last three
/// digits, then pairs.
pub fn group_en_in(amount: u64) -> String {
    let digits = amount.to_string();
    if digits.len() <= 3 {
        return digits;
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut out = String::with_capacity(digits.len() + digits.len() / 2);
    for (i, c) in head.chars().enumerate() {
        if i > 0 && (head.len() - i) % 2 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out.push(',');
    out.push_str(tail);
    out
}

/// Full amount, e.g. `₹20,00,000`.
pub fn format_inr(amount: u64) -> String {
    format!("₹{}", group_en_in(amount))
}

/// Lakh-abbreviated amount, e.g. `₹15.6L`.
pub fn format_lakhs(amount: u64) -> String {
    format!("₹{}L", to_fixed1(amount as f64 / 100_000.0))
}

/// `Number.prototype.toFixed(1)`.
///
/// Rust breaks exact ties to even; `toFixed` picks the larger candidate.
/// With one decimal an exact tie is only possible for odd multiples of 0.25.
pub fn to_fixed1(x: f64) -> String {
    if x < 0.0 {
        return format!("-{}", to_fixed1(-x));
    }
    let quarters = x * 4.0;
    if quarters.fract() == 0.0 && quarters % 2.0 == 1.0 {
        return format!("{:.1}", x + 0.05);
    }
    format!("{x:.1}")
}

/// `Math.round(x * 10) / 10`.
pub fn round1(x: f64) -> f64 {
    (x * 10.0 + 0.5).floor() / 10.0
}

/// A percentage as a JS number would print it: `22`, `12.5`.
pub fn format_percent(x: f64) -> String {
    format!("{x}")
}

/// Savings of `offer` against `original`, in percent, as `toFixed(1)` text.
pub fn savings_percent(original: u64, offer: u64) -> String {
    if original == 0 {
        return to_fixed1(0.0);
    }
    let savings = original as f64 - offer as f64;
    to_fixed1(savings / original as f64 * 100.0)
}
