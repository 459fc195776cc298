use std::fmt;

/// Monetary amounts are plain reals, matching how entries are stored (`REAL` columns).
pub type Amount = f64;

/// Format an amount with thousands separators and two decimals.
/// Example: 5000.0 -> "5,000.00", -1234.5 -> "-1,234.50"
pub fn format_amount(amount: Amount) -> String {
    let rounded = format!("{:.2}", amount.abs());
    let (units, decimals) = rounded.split_once('.').unwrap_or((&rounded, "00"));

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && rounded != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, decimals)
}

/// Format a percentage with one decimal, as shown on the dashboard.
pub fn format_percent(percent: f64) -> String {
    format!("{:.1}%", percent)
}

/// Parse a decimal string into an amount.
/// Thousands separators are accepted: "1,250.50" -> 1250.5
pub fn parse_amount(input: &str) -> Result<Amount, ParseAmountError> {
    let cleaned: String = input.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    let amount: f64 = cleaned
        .parse()
        .map_err(|_| ParseAmountError::InvalidFormat)?;

    if !amount.is_finite() {
        return Err(ParseAmountError::InvalidFormat);
    }
    Ok(amount)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    Empty,
    InvalidFormat,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::Empty => write!(f, "amount is empty"),
            ParseAmountError::InvalidFormat => write!(f, "invalid money format"),
        }
    }
}

impl std::error::Error for ParseAmountError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(5000.0), "5,000.00");
        assert_eq!(format_amount(1234567.891), "1,234,567.89");
        assert_eq!(format_amount(100.0), "100.00");
        assert_eq!(format_amount(0.01), "0.01");
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(-1234.5), "-1,234.50");
        assert_eq!(format_amount(-0.001), "0.00");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(75.0), "75.0%");
        assert_eq!(format_percent(-12.345), "-12.3%");
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("50.00"), Ok(50.0));
        assert_eq!(parse_amount("50"), Ok(50.0));
        assert_eq!(parse_amount(" 12.5 "), Ok(12.5));
        assert_eq!(parse_amount("1,250.50"), Ok(1250.5));
        assert_eq!(parse_amount(".5"), Ok(0.5));
        assert_eq!(parse_amount("-20"), Ok(-20.0));
    }

    #[test]
    fn test_parse_amount_invalid() {
        assert_eq!(parse_amount(""), Err(ParseAmountError::Empty));
        assert_eq!(parse_amount("abc"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_amount("12.34.56"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_amount("inf"), Err(ParseAmountError::InvalidFormat));
        assert_eq!(parse_amount("NaN"), Err(ParseAmountError::InvalidFormat));
    }
}
