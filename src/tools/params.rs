use chrono::NaiveDate;

use crate::error::{GatewayError, Result};

pub const DEFAULT_BASE_CURRENCY: &str = "USD";

pub fn default_base_currency() -> String {
    DEFAULT_BASE_CURRENCY.to_string()
}

/// Trim and upper-case a currency code; it must be three ASCII letters.
pub fn normalize_currency(field: &str, value: &str) -> Result<String> {
    let code = value.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(GatewayError::InvalidArgument(format!(
            "`{}` must be a three-letter currency code, got {:?}",
            field, value
        )));
    }
    Ok(code)
}

/// Normalize a comma-separated list of currency codes.
///
/// Blank entries are skipped; a list with nothing left is treated as absent.
pub fn normalize_symbols(value: Option<&str>) -> Result<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };

    let codes = value
        .split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(|code| normalize_currency("symbols", code))
        .collect::<Result<Vec<_>>>()?;

    if codes.is_empty() {
        Ok(None)
    } else {
        Ok(Some(codes.join(",")))
    }
}

/// Parse a `YYYY-MM-DD` date, checking both its lexical shape and the calendar.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    let bytes = value.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });

    if !shaped {
        return Err(GatewayError::InvalidArgument(format!(
            "`{}` must use the YYYY-MM-DD format, got {:?}",
            field, value
        )));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
        GatewayError::InvalidArgument(format!("`{}` is not a valid date ({}): {}", field, value, e))
    })
}

/// Both dates must be valid and `start_date` must not come after `end_date`.
pub fn check_date_range(start_date: &str, end_date: &str) -> Result<()> {
    let start = parse_date("start_date", start_date)?;
    let end = parse_date("end_date", end_date)?;
    if start > end {
        return Err(GatewayError::InvalidArgument(format!(
            "start_date {} is after end_date {}",
            start_date, end_date
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_currency() {
        assert_eq!(normalize_currency("base_currency", " usd ").unwrap(), "USD");
        assert!(normalize_currency("base_currency", "US").is_err());
        assert!(normalize_currency("base_currency", "US1").is_err());
        assert!(normalize_currency("base_currency", "").is_err());
    }

    #[test]
    fn test_normalize_symbols() {
        assert_eq!(
            normalize_symbols(Some("eur, gbp")).unwrap(),
            Some("EUR,GBP".to_string())
        );
        assert_eq!(
            normalize_symbols(Some("EUR,,JPY,")).unwrap(),
            Some("EUR,JPY".to_string())
        );
        assert_eq!(normalize_symbols(Some("")).unwrap(), None);
        assert_eq!(normalize_symbols(Some(" , ")).unwrap(), None);
        assert_eq!(normalize_symbols(None).unwrap(), None);
        assert!(normalize_symbols(Some("EUR,EURO")).is_err());
    }

    #[test]
    fn test_parse_date_shape() {
        assert!(parse_date("date", "2024-01-01").is_ok());
        assert!(parse_date("date", "2024-1-1").is_err());
        assert!(parse_date("date", "01-01-2024").is_err());
        assert!(parse_date("date", "2024/01/01").is_err());
        assert!(parse_date("date", " 2024-01-01").is_err());
    }

    #[test]
    fn test_parse_date_calendar() {
        assert!(parse_date("date", "2024-02-29").is_ok());
        assert!(parse_date("date", "2023-02-29").is_err());
        assert!(parse_date("date", "2024-13-01").is_err());
    }

    #[test]
    fn test_check_date_range() {
        assert!(check_date_range("2024-01-01", "2024-01-07").is_ok());
        assert!(check_date_range("2024-01-07", "2024-01-07").is_ok());
        assert!(check_date_range("2024-01-07", "2024-01-01").is_err());
        assert!(check_date_range("2024-01-01", "soon").is_err());
    }
}
