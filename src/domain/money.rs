use std::fmt;

/// Money is represented as integer cents to avoid floating-point precision
/// issues. 1 unit = 100 cents, so 50.00 = 5000 cents. Account balances are
/// never negative and transaction amounts are strictly positive, so no
/// negative handling exists here.
pub type Cents = i64;

/// Format cents as a human-readable amount string.
/// Example: 5000 -> "50.00", 1 -> "0.01"
pub fn format_cents(cents: Cents) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
///
/// Negative amounts and more than two decimal places are rejected rather
/// than silently adjusted.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    if input.starts_with('-') {
        return Err(ParseCentsError::Negative);
    }

    let (units_str, decimal_str) = match input.split_once('.') {
        Some((units, decimals)) => (units, decimals),
        None => (input, ""),
    };

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?
    };

    let decimal_cents: i64 = match decimal_str.len() {
        0 => 0,
        // Single digit like "5" means 50 cents
        1 => {
            decimal_str
                .parse::<i64>()
                .map_err(|_| ParseCentsError::InvalidFormat)?
                * 10
        }
        2 => decimal_str
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?,
        _ => return Err(ParseCentsError::TooManyDecimals),
    };

    Ok(units * 100 + decimal_cents)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    Negative,
    TooManyDecimals,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::Negative => write!(f, "amount cannot be negative"),
            ParseCentsError::TooManyDecimals => {
                write!(f, "amounts have at most two decimal places")
            }
        }
    }
}

impl std::error::Error for ParseCentsError {}
