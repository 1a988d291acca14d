use crate::schema::CellValue;

/// Placeholder glyphs providers print for "no data". The plain `-` also
/// doubles as a reported zero in some tables; that ambiguity is resolved at
/// the call site via [`CellValue::or_zero`].
const PLACEHOLDER_DASHES: [&str; 3] = ["-", "\u{2014}", "\u{2013}"];

const CURRENCY_SYMBOLS: [char; 3] = ['£', '$', '€'];

/// Parses a raw cell into a [`CellValue`]. Never panics: anything that does
/// not survive numeric parsing comes back as [`CellValue::Missing`].
///
/// Handles thousands separators, currency symbols, and parenthesized
/// negatives (`"(1,234.5)"` is -1234.5).
pub fn parse_cell(raw: &str) -> CellValue {
    let mut text = raw.trim().to_string();
    if text.is_empty() || PLACEHOLDER_DASHES.contains(&text.as_str()) {
        return CellValue::Missing;
    }

    let mut negative = false;
    if text.starts_with('(') && text.ends_with(')') {
        negative = true;
        text = text[1..text.len() - 1].to_string();
    }

    let cleaned: String = text
        .chars()
        .filter(|c| *c != ',' && !CURRENCY_SYMBOLS.contains(c))
        .collect();

    match cleaned.trim().parse::<f64>() {
        Ok(value) => CellValue::Number(if negative { -value } else { value }),
        Err(_) => CellValue::Missing,
    }
}

/// Total variant of [`parse_cell`]: unparseable input is coerced to `0.0`.
/// This is the ingestion-boundary behavior; prefer [`parse_cell`] anywhere
/// the missing/zero distinction matters.
pub fn parse_value(raw: &str) -> f64 {
    parse_cell(raw).or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_numbers() {
        assert_eq!(parse_cell("123"), CellValue::Number(123.0));
        assert_eq!(parse_cell("123.45"), CellValue::Number(123.45));
        assert_eq!(parse_cell("-42.5"), CellValue::Number(-42.5));
    }

    #[test]
    fn test_separators_and_currency_symbols() {
        assert_eq!(parse_cell("1,234,567"), CellValue::Number(1_234_567.0));
        assert_eq!(parse_cell("£1,000"), CellValue::Number(1000.0));
        assert_eq!(parse_cell("$2,500.75"), CellValue::Number(2500.75));
        assert_eq!(parse_cell("€99"), CellValue::Number(99.0));
    }

    #[test]
    fn test_parenthesized_negatives() {
        assert_eq!(parse_cell("(123)"), CellValue::Number(-123.0));
        assert_eq!(parse_cell("(1,234.5)"), CellValue::Number(-1234.5));
        assert_eq!(parse_cell("(£500)"), CellValue::Number(-500.0));
    }

    #[test]
    fn test_placeholders_are_missing() {
        assert_eq!(parse_cell(""), CellValue::Missing);
        assert_eq!(parse_cell("   "), CellValue::Missing);
        assert_eq!(parse_cell("-"), CellValue::Missing);
        assert_eq!(parse_cell("\u{2014}"), CellValue::Missing);
        assert_eq!(parse_cell("\u{2013}"), CellValue::Missing);
    }

    #[test]
    fn test_garbage_is_missing_and_parse_value_is_total() {
        for garbage in ["abc", "12a4", "(abc)", "--", "1.2.3", "N/A", "…"] {
            assert_eq!(parse_cell(garbage), CellValue::Missing, "{}", garbage);
            assert_eq!(parse_value(garbage), 0.0, "{}", garbage);
        }
        assert_eq!(parse_value("(1,234.5)"), -1234.5);
        assert_eq!(parse_value("£1,000"), 1000.0);
        assert_eq!(parse_value("—"), 0.0);
        assert_eq!(parse_value("-"), 0.0);
    }
}
