//! Value typing: classify a raw CSV cell as integer, float, string or null.
//!
//! This is a fast syntactic classification, not a numeric grammar. Anything
//! ambiguous (leading zeros, exponents, `+` signs, whitespace) stays a string
//! so the stored value is exactly what was exported.

use crate::types::{NodeId, TypedValue};

/// Infer the typed value of a property cell.
///
/// The same rule is used for node and edge properties.
pub fn infer_value(raw: &str) -> TypedValue {
    if raw.is_empty() {
        return TypedValue::Null;
    }

    let (negative, body) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };

    if is_canonical_digits(body) {
        if let Ok(i) = raw.parse::<i64>() {
            return TypedValue::Integer(i);
        }
        return TypedValue::String(raw.to_string());
    }

    if is_decimal(body) {
        if let Ok(x) = body.parse::<f64>() {
            return TypedValue::Float(if negative { -x } else { x });
        }
    }

    TypedValue::String(raw.to_string())
}

/// Infer the typed identifier of an `id`, `source` or `target` cell.
///
/// Any pure ASCII digit string that fits in i64 is an integer, so `007`
/// and `7` name the same node. Signed, overflowing or non-numeric ids stay
/// strings.
pub fn infer_id(raw: &str) -> NodeId {
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(i) = raw.parse::<i64>() {
            return NodeId::Integer(i);
        }
    }
    NodeId::String(raw.to_string())
}

/// Non-empty ASCII digits with no redundant leading zero.
fn is_canonical_digits(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| b.is_ascii_digit())
        && !(s.len() > 1 && s.starts_with('0'))
}

/// Digits with exactly one `.`, at least one digit, and an integer part that
/// is either empty or canonical.
fn is_decimal(s: &str) -> bool {
    let Some((int_part, frac_part)) = s.split_once('.') else {
        return false;
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return false;
    }
    let int_ok = int_part.is_empty() || is_canonical_digits(int_part);
    let frac_ok = frac_part.bytes().all(|b| b.is_ascii_digit());
    int_ok && frac_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_null() {
        assert_eq!(infer_value(""), TypedValue::Null);
    }

    #[test]
    fn integers() {
        assert_eq!(infer_value("30"), TypedValue::Integer(30));
        assert_eq!(infer_value("0"), TypedValue::Integer(0));
        assert_eq!(infer_value("-42"), TypedValue::Integer(-42));
    }

    #[test]
    fn floats() {
        assert_eq!(infer_value("0.5"), TypedValue::Float(0.5));
        assert_eq!(infer_value("-3.25"), TypedValue::Float(-3.25));
        assert_eq!(infer_value(".5"), TypedValue::Float(0.5));
        assert_eq!(infer_value("5."), TypedValue::Float(5.0));
    }

    #[test]
    fn ambiguous_inputs_stay_strings() {
        for raw in [
            "007", "00.5", "1e5", "+1", " 1", "1,000", "1.2.3", ".", "-", "-.", "nan", "inf",
            "Alice", "٣",
        ] {
            assert_eq!(
                infer_value(raw),
                TypedValue::String(raw.to_string()),
                "input {raw:?}"
            );
        }
    }

    #[test]
    fn overflowing_integer_stays_string() {
        let raw = "99999999999999999999";
        assert_eq!(infer_value(raw), TypedValue::String(raw.into()));
        assert_eq!(infer_id(raw), NodeId::String(raw.into()));
    }

    // Node and edge properties both go through `infer_value`, so a leading
    // minus is accepted for integers and floats alike.
    #[test]
    fn negative_numbers_type_the_same_for_nodes_and_edges() {
        assert_eq!(infer_value("-7"), TypedValue::Integer(-7));
        assert_eq!(infer_value("-0.75"), TypedValue::Float(-0.75));
    }

    #[test]
    fn padded_ids_are_integers() {
        assert_eq!(infer_id("007"), NodeId::Integer(7));
        assert_eq!(infer_id("000"), NodeId::Integer(0));
        // Property cells keep their padding.
        assert_eq!(infer_value("007"), TypedValue::String("007".into()));
    }

    #[test]
    fn inference_is_pure() {
        for raw in ["12", "-1.5", "x", ""] {
            assert_eq!(infer_value(raw), infer_value(raw));
        }
    }

    #[test]
    fn ids() {
        assert_eq!(infer_id("1"), NodeId::Integer(1));
        assert_eq!(infer_id("abc-1"), NodeId::String("abc-1".into()));
        assert_eq!(infer_id("-5"), NodeId::String("-5".into()));
        assert_eq!(infer_id("0"), NodeId::Integer(0));
        assert_eq!(infer_id("1.5"), NodeId::String("1.5".into()));
        assert_eq!(infer_id("o'brien"), NodeId::String("o'brien".into()));
    }
}
