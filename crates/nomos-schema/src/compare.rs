//! JSON equality for `enum` and `uniqueItems`.
//!
//! Numbers compare by value: `1`, `1.0` and `1e0` are equal. Integer
//! literals compare exactly, even beyond the `f64` mantissa.

use serde_json::{Number, Value};

/// Structural equality with numeric comparison of numbers.
pub fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| json_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Whether no two items are equal.
pub fn all_unique(items: &[Value]) -> bool {
    items
        .iter()
        .enumerate()
        .all(|(i, item)| items[i + 1..].iter().all(|other| !json_equal(item, other)))
}

/// Whether a number literal denotes an integer, however large.
///
/// `5.0`, `5e2` and a 40-digit literal are integers; `5.5` and `1e-3` are
/// not.
pub fn is_integer(number: &Number) -> bool {
    decimal(&number.to_string()).is_some_and(|d| d.digits == "0" || d.scale >= 0)
}

/// The exact integer a number literal denotes, if it is an integer that
/// fits an `i128`.
pub fn integer_value(number: &Number) -> Option<i128> {
    let text = number.to_string();
    if let Ok(exact) = text.parse::<i128>() {
        return Some(exact);
    }
    let d = decimal(&text)?;
    if d.digits == "0" {
        return Some(0);
    }
    let scale = u32::try_from(d.scale).ok()?;
    let magnitude = d
        .digits
        .parse::<i128>()
        .ok()?
        .checked_mul(10i128.checked_pow(scale)?)?;
    Some(if d.negative { -magnitude } else { magnitude })
}

/// A literal as `digits * 10^scale`, with trailing zeros moved into the
/// scale.
struct Decimal {
    negative: bool,
    digits: String,
    scale: i64,
}

#[allow(clippy::cast_possible_wrap)]
fn decimal(text: &str) -> Option<Decimal> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
        Some(at) => (&unsigned[..at], unsigned[at + 1..].parse::<i64>().ok()?),
        None => (unsigned, 0),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() || !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let all = format!("{whole}{fraction}");
    let significant = all.trim_start_matches('0');
    let trimmed = significant.trim_end_matches('0');
    let trailing = (significant.len() - trimmed.len()) as i64;
    let digits = if trimmed.is_empty() { "0" } else { trimmed };
    Some(Decimal {
        negative,
        digits: digits.to_string(),
        scale: exponent - fraction.len() as i64 + trailing,
    })
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    match (integer_value(x), integer_value(y)) {
        (Some(a), Some(b)) => a == b,
        _ => match (x.as_f64(), y.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs()),
            _ => x.to_string() == y.to_string(),
        },
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn number(text: &str) -> Number {
        serde_json::from_str(text).unwrap()
    }

    proptest! {
        /// Exponent and fraction spellings of an integer denote the same value.
        #[test]
        fn integer_spellings_agree(n in any::<i64>(), k in 0u32..6) {
            let expected = i128::from(n) * 10i128.pow(k);
            let exponent = number(&format!("{n}e{k}"));
            let fraction = number(&format!("{expected}.000"));

            prop_assert!(is_integer(&exponent));
            prop_assert_eq!(integer_value(&exponent), Some(expected));
            prop_assert_eq!(integer_value(&fraction), Some(expected));
            prop_assert!(json_equal(&Value::Number(exponent), &Value::Number(fraction)));
        }

        /// A non-zero fraction digit never makes an integer.
        #[test]
        fn fractions_are_not_integers(n in any::<i64>(), digit in 1u8..10) {
            let text = format!("{n}.{digit}");
            prop_assert!(!is_integer(&number(&text)));
            prop_assert_eq!(integer_value(&number(&text)), None);
        }
    }
}
