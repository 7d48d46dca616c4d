use std::fmt;

/// Money is represented as integer cents to avoid floating-point precision issues.
/// 1 unit = 100 cents, so 50.00 = 5000 cents.
pub type Cents = i64;

/// Largest amount a single expense may carry (10 billion units). Keeps sums
/// over any realistic collection far from `i64` overflow.
pub const MAX_AMOUNT: Cents = 1_000_000_000_000;

/// Format cents as a decimal string with two fraction digits.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000, ".5" -> 50.
/// Digits beyond the second decimal place are truncated.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let (units_str, decimal_str) = digits.split_once('.').unwrap_or((digits, ""));

    if units_str.is_empty() && decimal_str.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }
    if !units_str.chars().all(|c| c.is_ascii_digit())
        || !decimal_str.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| ParseCentsError::Overflow)?
    };

    let decimal_cents: i64 = match decimal_str.len() {
        0 => 0,
        // "5" means 50 cents
        1 => decimal_str.parse::<i64>().map_err(|_| ParseCentsError::InvalidFormat)? * 10,
        _ => decimal_str[..2]
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(decimal_cents))
        .ok_or(ParseCentsError::Overflow)?;

    Ok(if negative { -cents } else { cents })
}

/// Like [`parse_cents`], but rounds half away from zero to the nearest cent
/// instead of truncating.
pub fn parse_cents_rounded(input: &str) -> Result<Cents, ParseCentsError> {
    let truncated = parse_cents(input)?;
    let input = input.trim();
    let round_up = excess_digits(input)
        .chars()
        .next()
        .is_some_and(|d| d >= '5');
    if !round_up {
        return Ok(truncated);
    }
    let step = if input.starts_with('-') { -1 } else { 1 };
    truncated.checked_add(step).ok_or(ParseCentsError::Overflow)
}

/// True when `input` has non-zero digits past the second decimal place.
pub fn loses_precision(input: &str) -> bool {
    excess_digits(input.trim()).chars().any(|d| d != '0')
}

fn excess_digits(input: &str) -> &str {
    input
        .split_once('.')
        .and_then(|(_, fraction)| fraction.get(2..))
        .unwrap_or("")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::Overflow => write!(f, "amount is too large"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

/// Serde adapter for amounts in the persisted slot.
///
/// Amounts are written as decimal strings ("50.00"). On read, both strings
/// and plain JSON numbers are accepted; sub-cent digits are rounded to the
/// nearest cent with a warning.
pub mod amount_serde {
    use serde::de::{self, Deserializer, Visitor};
    use serde::Serializer;
    use std::fmt;

    use super::{format_cents, loses_precision, parse_cents_rounded, Cents};

    pub fn serialize<S: Serializer>(cents: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_cents(*cents))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Cents, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = Cents;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a decimal amount as a string or number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Cents, E> {
            let cents =
                parse_cents_rounded(v).map_err(|e| E::custom(format!("{}: {:?}", e, v)))?;
            if loses_precision(v) {
                tracing::warn!(amount = v, rounded = %format_cents(cents), "stored amount has sub-cent digits");
            }
            Ok(cents)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Cents, E> {
            v.checked_mul(100)
                .ok_or_else(|| E::custom("amount is too large"))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Cents, E> {
            i64::try_from(v)
                .ok()
                .and_then(|v| v.checked_mul(100))
                .ok_or_else(|| E::custom("amount is too large"))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Cents, E> {
            // Go through the shortest decimal representation so 12.34 stays 1234.
            self.visit_str(&v.to_string())
        }
    }
}
