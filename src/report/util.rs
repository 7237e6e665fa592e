use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Format an amount with thousand separators, 2 decimal places and the
/// given currency symbol, e.g. `1234567.89` → `"₹1,234,567.89"`.
pub(crate) fn format_amount(val: Decimal, symbol: &str) -> String {
    let abs = val.abs();
    let formatted = format!("{abs:.2}");
    let (int_part, dec_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let with_commas: String = int_part
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or(""))
        .collect::<Vec<_>>()
        .join(",");

    if val < Decimal::ZERO {
        format!("-{symbol}{with_commas}.{dec_part}")
    } else {
        format!("{symbol}{with_commas}.{dec_part}")
    }
}

/// Fits a category or remark into a table column of `max` chars. A cut
/// value keeps `max - 1` chars and ends in "…".
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if s.chars().count() <= max {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max - 1).collect();
    format!("{truncated}…")
}

/// Horizontal bar scaled so that `max` fills `width` cells. Any positive
/// value gets at least one cell.
pub(crate) fn bar(value: Decimal, max: Decimal, width: usize) -> String {
    if value <= Decimal::ZERO || max <= Decimal::ZERO || width == 0 {
        return String::new();
    }
    let ratio = value
        .checked_div(max)
        .and_then(|r| r.to_f64())
        .unwrap_or(0.0)
        .min(1.0);
    let cells = ((ratio * width as f64).round() as usize).max(1);
    "█".repeat(cells)
}
