//! Conversions from decoded ABI values to JSON and text.

use alloy::dyn_abi::DynSolValue;
use serde_json::Value;

/// Converts a decoded value into JSON.
///
/// Integers are rendered as decimal strings so that 256-bit values survive
/// the trip through JSON consumers limited to 64-bit numbers.
pub fn dyn_sol_value_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Address(a) => Value::String(a.to_checksum(None)),
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Bytes(b) => Value::String(format!("0x{}", hex::encode(b))),
        DynSolValue::FixedBytes(fb, size) => {
            Value::String(format!("0x{}", hex::encode(&fb[..*size])))
        }
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Array(arr) | DynSolValue::FixedArray(arr) | DynSolValue::Tuple(arr) => {
            Value::Array(arr.iter().map(dyn_sol_value_to_json).collect())
        }
        _ => Value::Null,
    }
}

/// Renders a decoded value as plain text: scalars without JSON quoting,
/// composites as compact JSON.
pub fn dyn_sol_value_to_string(value: &DynSolValue) -> String {
    match dyn_sol_value_to_json(value) {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
