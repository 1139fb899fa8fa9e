//! Truncating number formatting.
//!
//! Display values are cut, never rounded: `3.149` with two places is `3.14`.

/// Truncate `value` to `places` fractional digits.
#[must_use]
pub fn truncate(value: f64, places: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format_truncated(value, places).parse().unwrap_or(value)
}

/// Format `value` truncated to `places` digits. With zero places no
/// fractional part is emitted at all.
///
/// Digits are cut from the shortest decimal representation, so a value
/// such as `4.35` keeps its last digit and large magnitudes never switch to
/// exponent form.
#[must_use]
pub fn format_truncated(value: f64, places: u32) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let text = value.abs().to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let keep = usize::try_from(places).unwrap_or(usize::MAX).min(fraction.len());
    let fraction = fraction[..keep].trim_end_matches('0');
    let is_zero = whole.bytes().all(|b| b == b'0') && fraction.is_empty();
    let sign = if value.is_sign_negative() && !is_zero { "-" } else { "" };

    if places == 0 {
        format!("{sign}{whole}")
    } else if fraction.is_empty() {
        format!("{sign}{whole}.0")
    } else {
        format!("{sign}{whole}.{fraction}")
    }
}

/// Format with a magnitude suffix (`K`, `M`, `B`).
///
/// Abbreviated magnitudes always keep between one and three places so that
/// `1_500_000` does not collapse to `1M`.
#[must_use]
pub fn format_abbreviated(value: f64, places: u32) -> String {
    let num = value.abs();
    let sign = if value < 0.0 { "-" } else { "" };
    let clamped = places.clamp(1, 3);

    if num >= 1_000_000_000.0 {
        format!("{sign}{}B", format_truncated(num / 1_000_000_000.0, clamped))
    } else if num >= 1_000_000.0 {
        format!("{sign}{}M", format_truncated(num / 1_000_000.0, clamped))
    } else if num >= 1_000.0 {
        format!("{sign}{}K", format_truncated(num / 1_000.0, clamped))
    } else {
        format!("{sign}{}", format_truncated(num, places))
    }
}
