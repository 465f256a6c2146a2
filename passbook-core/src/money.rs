//! Exact statement-currency amounts and the amount lexer.
//!
//! Statement amounts arrive as extracted text tokens such as `1,234.56`,
//! `-15.00`, `15.00-` or `(15.00)`. [`lex_amount`] turns them into [`Money`],
//! an exact decimal with two fraction digits, or reports the original text.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Number of fraction digits carried by statement currency.
pub const MONEY_SCALE: u32 = 2;

/// Amounts must stay below this many whole units (15 integer digits). Sums of
/// any realistic number of rows then stay far inside `Decimal`'s range, so
/// ledger arithmetic cannot overflow.
pub const MAX_WHOLE_UNITS: i64 = 1_000_000_000_000_000;

/// An exact amount in statement currency, always at scale 2.
///
/// Serialized as its decimal string; deserialization goes through
/// [`lex_amount`], so the same bounds apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Build from minor units, e.g. `Money::from_minor(120_050)` is `1200.50`.
    pub fn from_minor(minor: i64) -> Self {
        Money(Decimal::new(minor, MONEY_SCALE))
    }

    /// Wrap a decimal, normalizing it to scale 2.
    ///
    /// Returns `None` when the value carries more than two significant fraction
    /// digits or reaches [`MAX_WHOLE_UNITS`], since neither can be a statement
    /// amount.
    pub fn from_decimal(value: Decimal) -> Option<Self> {
        let normalized = value.normalize();
        if normalized.scale() > MONEY_SCALE || normalized.abs() >= Decimal::from(MAX_WHOLE_UNITS) {
            return None;
        }
        let mut scaled = normalized;
        scaled.rescale(MONEY_SCALE);
        (scaled.scale() == MONEY_SCALE).then_some(Money(scaled))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Render with comma thousands separators, e.g. `-1,234.56`.
    pub fn to_grouped_string(&self) -> String {
        let plain = self.abs().to_string();
        let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

        let mut grouped = String::with_capacity(plain.len() + int_part.len() / 3);
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        let sign = if self.is_negative() { "-" } else { "" };
        format!("{sign}{grouped}.{frac_part}")
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut value = self.0;
        value.rescale(MONEY_SCALE);
        if value.is_zero() {
            // Avoid rendering "-0.00".
            value.set_sign_positive(true);
        }
        write!(f, "{value}")
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl From<Money> for String {
    fn from(money: Money) -> String {
        money.to_string()
    }
}

impl TryFrom<String> for Money {
    type Error = LexError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        lex_amount(&s)
    }
}

impl FromStr for Money {
    type Err = LexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lex_amount(s)
    }
}

/// The lexer could not read a token as an amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unparsable amount: {raw:?}")]
    UnparsableAmount { raw: String },
}

impl LexError {
    fn unparsable(raw: &str) -> Self {
        LexError::UnparsableAmount {
            raw: raw.to_string(),
        }
    }

    /// The original token text.
    pub fn raw(&self) -> &str {
        match self {
            LexError::UnparsableAmount { raw } => raw,
        }
    }
}

/// Lex a mandatory amount. An empty token is an error here.
///
/// Accepted shapes: `1234.5`, `1,234.56`, `-1,234.56`, `1,234.56-`,
/// `(1,234.56)`, `.50`. Surrounding whitespace is ignored.
pub fn lex_amount(token: &str) -> Result<Money, LexError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(LexError::unparsable(token));
    }

    let (negative, body) = strip_sign(trimmed).ok_or_else(|| LexError::unparsable(token))?;
    let digits = body.replace(',', "");
    if !is_plain_decimal(&digits) {
        return Err(LexError::unparsable(token));
    }

    let value = Decimal::from_str(&digits).map_err(|_| LexError::unparsable(token))?;
    let money = Money::from_decimal(value).ok_or_else(|| LexError::unparsable(token))?;
    Ok(if negative && !money.is_zero() { -money } else { money })
}

/// Lex an optional trailing column: an empty token means "no value" and is zero.
pub fn lex_optional_amount(token: &str) -> Result<Money, LexError> {
    if token.trim().is_empty() {
        return Ok(Money::ZERO);
    }
    lex_amount(token)
}

/// Split off at most one negative marker: leading `-`, trailing `-`, or parentheses.
fn strip_sign(s: &str) -> Option<(bool, &str)> {
    if let Some(inner) = s.strip_prefix('(') {
        let inner = inner.strip_suffix(')')?;
        return Some((true, inner.trim()));
    }
    if s.ends_with(')') {
        return None;
    }
    if let Some(rest) = s.strip_prefix('-') {
        if rest.ends_with('-') {
            return None;
        }
        return Some((true, rest));
    }
    if let Some(rest) = s.strip_suffix('-') {
        return Some((true, rest));
    }
    Some((false, s))
}

/// Digits with at most one decimal point and at least one digit.
fn is_plain_decimal(s: &str) -> bool {
    let mut seen_digit = false;
    let mut seen_dot = false;
    for ch in s.chars() {
        match ch {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit && !s.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_plain_and_grouped() {
        assert_eq!(lex_amount("1234.56").unwrap(), Money::from_minor(123_456));
        assert_eq!(lex_amount("1,234.56").unwrap(), Money::from_minor(123_456));
        assert_eq!(lex_amount(" 12,000 ").unwrap(), Money::from_minor(1_200_000));
        assert_eq!(lex_amount(".50").unwrap(), Money::from_minor(50));
    }

    #[test]
    fn test_lex_negative_forms() {
        let expected = Money::from_minor(-1_500);
        assert_eq!(lex_amount("-15.00").unwrap(), expected);
        assert_eq!(lex_amount("15.00-").unwrap(), expected);
        assert_eq!(lex_amount("(15.00)").unwrap(), expected);
        assert_eq!(lex_amount("(1,015.00)").unwrap(), Money::from_minor(-101_500));
    }

    #[test]
    fn test_lex_rejects_garbage() {
        for bad in ["", "  ", "-", "abc", "1.2.3", "12.", "1_000", "--5", "-5-", "(5", "5)", "1.234", "1e5"] {
            let err = lex_amount(bad).unwrap_err();
            assert_eq!(err.raw(), bad);
        }
    }

    #[test]
    fn test_optional_empty_is_zero() {
        assert_eq!(lex_optional_amount("").unwrap(), Money::ZERO);
        assert_eq!(lex_optional_amount("   ").unwrap(), Money::ZERO);
        assert!(lex_optional_amount("x").is_err());
    }

    #[test]
    fn test_render_round_trip() {
        let tokens = [
            "0", "0.01", "1", "12.5", "999.99", "1,000.00", "-1,234.56", "98,765,432.10", "(0.99)",
            "42.00-",
        ];
        for t in tokens {
            let parsed = lex_amount(t).unwrap();
            assert_eq!(lex_amount(&parsed.to_string()).unwrap(), parsed, "plain render of {t}");
            assert_eq!(
                lex_amount(&parsed.to_grouped_string()).unwrap(),
                parsed,
                "grouped render of {t}"
            );
        }
    }

    #[test]
    fn test_display_fixed_scale() {
        assert_eq!(Money::from_minor(120_000).to_string(), "1200.00");
        assert_eq!(lex_amount("12.5").unwrap().to_string(), "12.50");
        assert_eq!(Money::from_minor(-123_456_789).to_grouped_string(), "-1,234,567.89");
        assert_eq!(Money::from_minor(5).to_grouped_string(), "0.05");
        assert_eq!((-Money::ZERO).to_string(), "0.00");
    }

    #[test]
    fn test_lex_rejects_out_of_range() {
        assert_eq!(
            lex_amount("999,999,999,999,999.99").unwrap(),
            Money::from_minor(99_999_999_999_999_999)
        );
        for big in [
            "1,000,000,000,000,000.00",
            "-1000000000000000",
            "9999999999999999999999999999",
            "(99999999999999999999999999.99)",
        ] {
            assert_eq!(lex_amount(big).unwrap_err().raw(), big);
        }
    }

    #[test]
    fn test_from_decimal_bounds() {
        assert_eq!(Money::from_decimal(Decimal::new(1_230, 3)), Some(Money::from_minor(123)));
        assert_eq!(Money::from_decimal(Decimal::new(1_234, 3)), None);
        assert_eq!(Money::from_decimal(Decimal::from(i64::MAX)), None);
        let scaled = Money::from_decimal(Decimal::new(-7, 0)).unwrap();
        assert_eq!(scaled.value().scale(), MONEY_SCALE);
    }

    #[test]
    fn test_serde_goes_through_lexer() {
        let m: Money = serde_json::from_str("\"1,234.5\"").unwrap();
        assert_eq!(m, Money::from_minor(123_450));
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"1234.50\"");
        assert_eq!(serde_json::to_string(&-Money::ZERO).unwrap(), "\"0.00\"");

        assert!(serde_json::from_str::<Money>("\"1.234\"").is_err());
        assert!(serde_json::from_str::<Money>("\"abc\"").is_err());
        assert!(serde_json::from_str::<Money>("\"10000000000000000\"").is_err());
    }

    #[test]
    fn test_sum_is_exact() {
        let rows: Vec<Money> = (0..10_000).map(|_| Money::from_minor(1)).collect();
        let total: Money = rows.iter().sum();
        assert_eq!(total, Money::from_minor(10_000));
    }
}
