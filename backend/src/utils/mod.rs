//! # Utilities Module
//!
//! This module contains helper functions and utilities used
//! across the backend service: money rounding and formatting,
//! input cleanup, and validators for emails and domain names.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary value to 2 decimal places (half away from zero).
///
/// Applied when an amount is persisted or shown, never mid-computation.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount as human-readable currency.
///
/// ## Examples
///
/// ```rust,ignore
/// assert_eq!(format_currency(Decimal::new(2300000, 2), "₦"), "₦23,000.00");
/// assert_eq!(format_currency(Decimal::new(-150, 2), "$"), "-$1.50");
/// ```
pub fn format_currency(amount: Decimal, symbol: &str) -> String {
    let rounded = round_money(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();

    // `{:.2}` on a Decimal pads to exactly two places without floats.
    let plain = format!("{:.2}", rounded.abs());
    let (whole, frac) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    // Add commas
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}{}{}.{}", if negative { "-" } else { "" }, symbol, grouped, frac)
}

/// Clean free text from a form: trims, drops control characters
/// (newlines and tabs survive) and caps the length.
pub fn sanitize_input(input: &str, max_chars: usize) -> String {
    input
        .trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .take(max_chars)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Like [`sanitize_input`] but maps blank input to `None`.
pub fn sanitize_optional(input: Option<&str>, max_chars: usize) -> Option<String> {
    input
        .map(|s| sanitize_input(s, max_chars))
        .filter(|s| !s.is_empty())
}

/// Loose email check: one `@`, non-empty local part, dotted domain, no spaces.
pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(format!("Invalid email: {}", email));
    };

    let valid = !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace);

    if valid {
        Ok(())
    } else {
        Err(format!("Invalid email: {}", email))
    }
}

/// Normalize a domain name for storage.
///
/// Lowercases, strips a URL scheme and trailing slash, then checks
/// each label is 1-63 chars of `[a-z0-9-]` not starting or ending with `-`.
pub fn normalize_domain_name(raw: &str) -> Result<String, String> {
    let mut name = raw.trim().to_ascii_lowercase();
    for scheme in ["https://", "http://"] {
        if let Some(rest) = name.strip_prefix(scheme) {
            name = rest.to_string();
        }
    }
    let name = name.trim_end_matches('/').to_string();

    if name.is_empty() || name.len() > 253 || !name.contains('.') {
        return Err(format!("Invalid domain name: {}", raw.trim()));
    }

    let labels_ok = name.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });

    if labels_ok {
        Ok(name)
    } else {
        Err(format!("Invalid domain name: {}", raw.trim()))
    }
}

/// Truncate a string to a maximum length.
///
/// Useful for logging long free-text fields.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(Decimal::new(2_300_000, 2), "₦"), "₦23,000.00");
        assert_eq!(format_currency(Decimal::ZERO, "$"), "$0.00");
        assert_eq!(format_currency(Decimal::new(5, 1), "$"), "$0.50");
        assert_eq!(format_currency(Decimal::new(123_456_789, 2), ""), "1,234,567.89");
        assert_eq!(format_currency(Decimal::new(-150, 2), "$"), "-$1.50");
    }

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(Decimal::new(12345, 3)), Decimal::new(1235, 2));
        assert_eq!(round_money(Decimal::new(-12345, 3)), Decimal::new(-1235, 2));
    }

    #[test]
    fn test_sanitize_input() {
        assert_eq!(sanitize_input("  hello\u{0007} world  ", 100), "hello world");
        assert_eq!(sanitize_input("line1\nline2", 100), "line1\nline2");
        assert_eq!(sanitize_input("abcdef", 3), "abc");
        assert_eq!(sanitize_optional(Some("   "), 10), None);
        assert_eq!(sanitize_optional(None, 10), None);
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("jane@example.com").is_ok());
        assert!(validate_email("jane@example").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ja ne@example.com").is_err());
    }

    #[test]
    fn test_normalize_domain_name() {
        assert_eq!(normalize_domain_name(" HTTPS://Shop-One.com/ ").unwrap(), "shop-one.com");
        assert_eq!(normalize_domain_name("a.b.co").unwrap(), "a.b.co");
        assert!(normalize_domain_name("localhost").is_err());
        assert!(normalize_domain_name("-bad.com").is_err());
        assert!(normalize_domain_name("bad..com").is_err());
        assert!(normalize_domain_name("under_score.com").is_err());
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("abcdefghij", 10), "abcdefghij");
        assert_eq!(truncate_string("abcdefghijklmnop", 10), "abcdefg...");
    }
}
