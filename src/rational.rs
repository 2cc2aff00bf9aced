//! Exact fraction helpers
//!
//! Every quantity in the engine is a `BigRational`; floats appear only at
//! the final rounding/cost boundary. Catalog numbers arrive as JSON decimal
//! literals and are converted digit-for-digit (so `0.1` is exactly 1/10,
//! not the nearest binary double).

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{ToPrimitive, Zero};

/// Parse a decimal literal (`12`, `2.5`, `-0.04`, `1e3`) into an exact
/// rational: the digits over the matching power of ten.
pub fn parse_decimal(text: &str) -> Option<BigRational> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (mantissa, exponent) = match rest.split_once(['e', 'E']) {
        Some((mantissa, exp)) => (mantissa, exp.parse::<i32>().ok()?),
        None => (rest, 0),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }

    let mut numer: BigInt = format!("{int_part}{frac_part}").parse().ok()?;
    if negative {
        numer = -numer;
    }
    let scale = exponent - frac_part.len() as i32;
    Some(if scale >= 0 {
        BigRational::from_integer(numer * BigInt::from(10u8).pow(scale as u32))
    } else {
        BigRational::new(numer, BigInt::from(10u8).pow(scale.unsigned_abs()))
    })
}

/// Convert a JSON number losslessly via its decimal representation.
pub fn from_number(n: &serde_json::Number) -> Option<BigRational> {
    parse_decimal(&n.to_string())
}

/// Parse a user-supplied quantity: a decimal literal or an `a/b` fraction.
pub fn parse_quantity(text: &str) -> Option<BigRational> {
    match text.trim().split_once('/') {
        Some((numer, denom)) => {
            let numer = parse_decimal(numer.trim())?;
            let denom = parse_decimal(denom.trim())?;
            if denom.is_zero() {
                return None;
            }
            Some(numer / denom)
        }
        None => parse_decimal(text.trim()),
    }
}

/// Format as a mixed number: `2+1/3`, `5`, `1/4`, `0`.
pub fn mixed(value: &BigRational) -> String {
    let whole = value.floor().to_integer();
    let remainder = value - BigRational::from_integer(whole.clone());
    let mut parts = Vec::new();
    if !whole.is_zero() {
        parts.push(whole.to_string());
    }
    if !remainder.is_zero() {
        parts.push(format!("{}/{}", remainder.numer(), remainder.denom()));
    }
    if parts.is_empty() {
        "0".to_string()
    } else {
        parts.join("+")
    }
}

/// Round up to a whole count. The first point where exactness is dropped.
pub fn ceil_to_u64(value: &BigRational) -> u64 {
    value.ceil().to_integer().to_u64().unwrap_or(u64::MAX)
}
