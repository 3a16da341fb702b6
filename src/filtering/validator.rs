//! The parameter validator: evaluates one condition against one decoded ABI
//! value, honoring the declared type, element index, tuple component and
//! currency conversion.

use alloy::dyn_abi::DynSolValue;
use num_bigint::{BigInt, Sign};

use super::{
    currency::CurrencyConversion,
    param_type::{ParamType, ScalarKind},
    predicate::{compare_array, compare_bool, compare_decimal, compare_integer, compare_text},
};
use crate::models::{Criterion, Predicate};

/// A tuple field to descend into before evaluating.
#[derive(Debug, Clone, Copy)]
pub struct ComponentSlot<'a> {
    /// Position of the field in the tuple.
    pub position: usize,
    /// Declared type of the field.
    pub ty: &'a ParamType,
}

/// Everything the validator needs besides the value itself.
#[derive(Debug, Clone, Copy)]
pub struct ParameterCheck<'a> {
    /// Declared type of the value.
    pub param_type: &'a ParamType,
    /// Predicate and target literal.
    pub criterion: &'a Criterion,
    /// Element to select from an array or tuple.
    pub index: Option<usize>,
    /// Tuple field to descend into first.
    pub component: Option<ComponentSlot<'a>>,
    /// Normalization applied to integer values before comparison.
    pub conversion: Option<&'a CurrencyConversion>,
}

impl<'a> ParameterCheck<'a> {
    /// A check with no index, component or conversion.
    pub fn new(param_type: &'a ParamType, criterion: &'a Criterion) -> Self {
        Self { param_type, criterion, index: None, component: None, conversion: None }
    }
}

/// Evaluates `check` against `value`. Type mismatches, unsupported types and
/// out-of-bounds accesses evaluate to `false`.
pub fn validate(value: &DynSolValue, check: &ParameterCheck<'_>) -> bool {
    match check.component {
        Some(slot) => {
            let DynSolValue::Tuple(fields) = value else {
                tracing::debug!(actual = ?value.as_type(), "Component requested on a non-tuple value.");
                return false;
            };
            let Some(field) = fields.get(slot.position) else {
                tracing::debug!(position = slot.position, "Tuple component out of bounds.");
                return false;
            };
            let ty = declared_or_inferred(slot.ty, field);
            evaluate(field, &ty, check)
        }
        None => evaluate(value, check.param_type, check),
    }
}

/// Uses the declared type, or the value's own type when none was declared.
fn declared_or_inferred(declared: &ParamType, value: &DynSolValue) -> ParamType {
    match declared {
        ParamType::Unsupported(raw) if raw.is_empty() => infer(value),
        ParamType::Tuple(fields) if fields.is_empty() => infer(value),
        other => other.clone(),
    }
}

fn infer(value: &DynSolValue) -> ParamType {
    value
        .as_type()
        .map(|ty| ParamType::from_sol_type(&ty))
        .unwrap_or_else(|| ParamType::Unsupported("unknown".into()))
}

fn evaluate(value: &DynSolValue, ty: &ParamType, check: &ParameterCheck<'_>) -> bool {
    let predicate = check.criterion.predicate;
    let attribute = check.criterion.attribute.as_str();

    match ty {
        ParamType::Unsupported(raw) => {
            tracing::debug!(declared_type = %raw, "Unsupported parameter type; no match.");
            false
        }
        ParamType::Scalar(kind) => compare_leaf(*kind, value, predicate, attribute, check.conversion),
        ParamType::Array { element, .. } => {
            let items = match value {
                DynSolValue::Array(items) | DynSolValue::FixedArray(items) => items,
                other => return mismatch(ty, other),
            };
            compare_array(predicate, items, attribute, check.index, |p, item, a| {
                compare_element(element, item, p, a, check.conversion)
            })
        }
        ParamType::Tuple(fields) => {
            let DynSolValue::Tuple(items) = value else {
                return mismatch(ty, value);
            };
            match check.index {
                Some(i) => match items.get(i) {
                    Some(item) => {
                        let field_ty = fields.get(i).cloned().unwrap_or_else(|| infer(item));
                        compare_element(&field_ty, item, predicate, attribute, check.conversion)
                    }
                    None => {
                        tracing::debug!(index = i, len = items.len(), "Tuple index out of bounds.");
                        false
                    }
                },
                None => compare_array(predicate, items, attribute, None, |p, item, a| {
                    compare_element(&infer(item), item, p, a, check.conversion)
                }),
            }
        }
    }
}

/// Compares a single array or tuple element. Only scalar elements can be
/// compared.
fn compare_element(
    ty: &ParamType,
    value: &DynSolValue,
    predicate: Predicate,
    attribute: &str,
    conversion: Option<&CurrencyConversion>,
) -> bool {
    match ty {
        ParamType::Scalar(kind) => compare_leaf(*kind, value, predicate, attribute, conversion),
        other => {
            tracing::debug!(element_type = ?other, "Only scalar elements can be compared.");
            false
        }
    }
}

fn compare_leaf(
    kind: ScalarKind,
    value: &DynSolValue,
    predicate: Predicate,
    attribute: &str,
    conversion: Option<&CurrencyConversion>,
) -> bool {
    if kind.is_integer() {
        let Some(number) = integer_of(value) else {
            return mismatch(&ParamType::Scalar(kind), value);
        };
        return match conversion {
            Some(conversion) => match conversion.apply(&number) {
                Some(amount) => compare_decimal(predicate, &amount, attribute),
                None => {
                    tracing::debug!(%number, "Amount does not fit a decimal after conversion.");
                    false
                }
            },
            None => compare_integer(predicate, &number, attribute),
        };
    }

    if kind.is_text() {
        return match text_of(value) {
            Some(text) => compare_text(predicate, &text, attribute),
            None => mismatch(&ParamType::Scalar(kind), value),
        };
    }

    match value {
        DynSolValue::Bool(b) => compare_bool(predicate, *b, attribute),
        other => mismatch(&ParamType::Scalar(kind), other),
    }
}

/// Converts signed and unsigned integers of any width to a `BigInt`.
pub fn integer_of(value: &DynSolValue) -> Option<BigInt> {
    match value {
        DynSolValue::Uint(u, _) => Some(BigInt::from_bytes_be(Sign::Plus, &u.to_be_bytes::<32>())),
        DynSolValue::Int(i, _) => Some(BigInt::from_signed_bytes_be(&i.to_be_bytes::<32>())),
        _ => None,
    }
}

/// Renders text-like values (addresses, strings, bytes) for comparison.
pub fn text_of(value: &DynSolValue) -> Option<String> {
    match value {
        DynSolValue::Address(a) => Some(a.to_string()),
        DynSolValue::String(s) => Some(s.clone()),
        DynSolValue::Bytes(b) => Some(hex::encode(b)),
        DynSolValue::FixedBytes(word, size) => Some(hex::encode(&word[..*size])),
        _ => None,
    }
}

fn mismatch(expected: &ParamType, actual: &DynSolValue) -> bool {
    tracing::debug!(
        expected = ?expected,
        actual = ?actual.as_type(),
        "Decoded value does not match the declared type; no match."
    );
    false
}
