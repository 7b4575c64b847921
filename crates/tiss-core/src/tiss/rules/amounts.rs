//! Amount parsing and formatting for Brazilian-formatted values.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a Brazilian- or plain-formatted amount (e.g., "1.234,56", "200,00" or "1234.56").
///
/// An optional `R$` prefix and whitespace are ignored. Returns `None` for
/// empty, negative or otherwise unreadable input.
pub fn parse_br_amount(s: &str) -> Option<Decimal> {
    let trimmed = s.trim();
    let trimmed = trimmed.strip_prefix("R$").unwrap_or(trimmed);

    // Remove spaces and non-breaking spaces
    let cleaned: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.') {
        return None;
    }

    let commas = cleaned.matches(',').count();
    let dots = cleaned.matches('.').count();

    let normalized = match (commas, dots) {
        (0, 0) | (0, 1) => cleaned,
        (1, 0) => cleaned.replace(',', "."),
        // Repeated separator of a single kind can only be grouping
        (0, _) => cleaned.replace('.', ""),
        (_, 0) => cleaned.replace(',', ""),
        _ => {
            // Both present: whichever comes last is the decimal separator
            let comma_pos = cleaned.rfind(',');
            let dot_pos = cleaned.rfind('.');
            match (comma_pos, dot_pos) {
                (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
                _ => cleaned.replace(',', ""),
            }
        }
    };

    Decimal::from_str(&normalized).ok()
}

/// Format amount in Brazilian style (1.234,56).
pub fn format_br_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let s = format!("{:.2}", rounded.abs());
    let Some((integer_part, decimal_part)) = s.split_once('.') else {
        return s;
    };

    // Add thousand separators
    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();

    if negative {
        formatted.push('-');
    }
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push('.');
        }
        formatted.push(*c);
    }

    format!("{},{}", formatted, decimal_part)
}

/// Format amount as Brazilian currency (R$ 1.234,56).
pub fn format_currency_br(amount: Decimal) -> String {
    format_currency(amount, "R$")
}

/// Format amount with the given currency symbol; the sign goes before the symbol.
pub fn format_currency(amount: Decimal, symbol: &str) -> String {
    let formatted = format_br_amount(amount);
    match formatted.strip_prefix('-') {
        Some(abs) => format!("-{} {}", symbol, abs),
        None => format!("{} {}", symbol, formatted),
    }
}
