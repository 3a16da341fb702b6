//! Predicate primitives shared by every matcher.
//!
//! Each primitive compares one decoded value against the literal authored in
//! a condition. Combinations a predicate is not defined for evaluate to
//! `false`; nothing here returns an error.

use std::{cmp::Ordering, str::FromStr};

use num_bigint::BigInt;
use num_traits::Num;
use rust_decimal::Decimal;

use crate::models::Predicate;

/// Parses an integer literal, decimal or `0x`-prefixed hex, optionally signed.
pub fn parse_integer(literal: &str) -> Option<BigInt> {
    let literal = literal.trim();
    let (negative, digits) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => BigInt::from_str_radix(hex, 16).ok()?,
        None => BigInt::from_str(digits).ok()?,
    };
    Some(if negative { -magnitude } else { magnitude })
}

/// Parses a decimal literal such as `1.5`, `10` or `1e18`.
pub fn parse_decimal(literal: &str) -> Option<Decimal> {
    let literal = literal.trim();
    Decimal::from_str(literal).or_else(|_| Decimal::from_scientific(literal)).ok()
}

/// Lowercases and strips whitespace and a leading `0x`, so addresses and hex
/// strings compare regardless of checksum casing and prefix.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    match lowered.strip_prefix("0x") {
        Some(rest) => rest.to_string(),
        None => lowered,
    }
}

fn ordered(predicate: Predicate, ordering: Ordering) -> bool {
    match predicate {
        Predicate::Eq => ordering == Ordering::Equal,
        Predicate::BiggerThan => ordering == Ordering::Greater,
        Predicate::SmallerThan => ordering == Ordering::Less,
        Predicate::IsIn => false,
    }
}

/// Compares an integer of any width against an integer literal.
pub fn compare_integer(predicate: Predicate, value: &BigInt, attribute: &str) -> bool {
    match parse_integer(attribute) {
        Some(target) => ordered(predicate, value.cmp(&target)),
        None => {
            tracing::debug!(attribute, "Attribute is not an integer literal.");
            false
        }
    }
}

/// Compares a currency-normalized amount against a decimal literal.
pub fn compare_decimal(predicate: Predicate, value: &Decimal, attribute: &str) -> bool {
    match parse_decimal(attribute) {
        Some(target) => ordered(predicate, value.cmp(&target)),
        None => {
            tracing::debug!(attribute, "Attribute is not a decimal literal.");
            false
        }
    }
}

/// Compares a boolean. Only `Eq` is defined.
pub fn compare_bool(predicate: Predicate, value: bool, attribute: &str) -> bool {
    if predicate != Predicate::Eq {
        return false;
    }
    match attribute.trim().to_ascii_lowercase().as_str() {
        "true" => value,
        "false" => !value,
        _ => false,
    }
}

/// Compares text-like values (addresses, strings, bytes) after
/// normalization. Only `Eq` is defined.
pub fn compare_text(predicate: Predicate, value: &str, attribute: &str) -> bool {
    predicate == Predicate::Eq && normalize_text(value) == normalize_text(attribute)
}

/// Compares an array.
///
/// With an index, the selected element is compared with `compare_element`
/// and an out-of-bounds index is no match. Without one, `Eq`, `BiggerThan`
/// and `SmallerThan` compare the array length, and `IsIn` matches when any
/// element equals the attribute.
pub fn compare_array<T>(
    predicate: Predicate,
    elements: &[T],
    attribute: &str,
    index: Option<usize>,
    compare_element: impl Fn(Predicate, &T, &str) -> bool,
) -> bool {
    match index {
        Some(i) => match elements.get(i) {
            Some(element) => compare_element(predicate, element, attribute),
            None => {
                tracing::debug!(index = i, len = elements.len(), "Array index out of bounds.");
                false
            }
        },
        None => match predicate {
            Predicate::IsIn => elements.iter().any(|e| compare_element(Predicate::Eq, e, attribute)),
            _ => compare_integer(predicate, &BigInt::from(elements.len()), attribute),
        },
    }
}
