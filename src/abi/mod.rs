//! This module contains the per-trigger ABI cache and the encode/decode
//! helpers used by the matchers.
//!
//! ABIs are authored with the trigger and only known at runtime, so nothing
//! here uses the `sol!` macro.

pub mod conversions;

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, OnceLock},
};

use alloy::{
    dyn_abi::{self, DynSolType, DynSolValue, EventExt, Specifier},
    json_abi::{Event, Function, JsonAbi},
    primitives::{B256, Bytes},
};
use thiserror::Error;

use crate::models::Log;

/// A pre-processed representation of a contract's ABI.
///
/// Functions are indexed by selector for decoding transaction input; events
/// are looked up by name.
#[derive(Debug, Clone, Default)]
pub struct CachedContract {
    /// A map from a function's 4-byte selector to its `Function` definition.
    pub functions: HashMap<[u8; 4], Function>,
    /// The original parsed ABI.
    pub abi: JsonAbi,
}

impl From<&JsonAbi> for CachedContract {
    fn from(abi: &JsonAbi) -> Self {
        let functions = abi
            .functions()
            .map(|func| (func.selector().into(), func.clone()))
            .collect::<HashMap<[u8; 4], Function>>();

        Self { functions, abi: abi.clone() }
    }
}

/// Custom error type for ABI operations.
#[derive(Error, Debug)]
pub enum AbiError {
    /// The trigger carries no ABI.
    #[error("Contract ABI is empty")]
    EmptyAbi,

    /// The ABI JSON could not be parsed.
    #[error("Invalid contract ABI: {0}")]
    InvalidAbi(String),

    /// No function with the given name exists in the ABI.
    #[error("Function not found in ABI: {0}")]
    FunctionNotFound(String),

    /// No event with the given name exists in the ABI.
    #[error("Event not found in ABI: {0}")]
    EventNotFound(String),

    /// The 4-byte selector does not belong to any function in the ABI.
    #[error("Function selector not found in ABI: 0x{}", hex::encode(.0))]
    UnknownSelector([u8; 4]),

    /// The input data is too short to contain a function selector.
    #[error("Input data too short to contain a function selector")]
    InputTooShort,

    /// The log's first topic is not the event's signature.
    #[error("Log topic {actual:?} does not match event signature {expected}")]
    SignatureMismatch {
        /// The selector of the expected event.
        expected: B256,
        /// The log's first topic, if any.
        actual: Option<B256>,
    },

    /// The call arguments do not fit the function's inputs.
    #[error("Arguments do not match inputs of {function}: {reason}")]
    ArgumentMismatch {
        /// The function's signature.
        function: String,
        /// What does not fit.
        reason: String,
    },

    /// Wrapper for decoding errors from the underlying ABI library.
    #[error("Failed to decode data: {0}")]
    DecodingError(#[from] dyn_abi::Error),
}

/// A decoded event log.
#[derive(Debug, Clone)]
pub struct DecodedLog {
    /// The name of the decoded event.
    pub name: String,
    /// The decoded fields, in declaration order.
    pub params: Vec<(String, DynSolValue)>,
}

/// A decoded function call.
#[derive(Debug, Clone)]
pub struct DecodedCall {
    /// The name of the decoded function.
    pub name: String,
    /// The decoded arguments, in declaration order.
    pub params: Vec<(String, DynSolValue)>,
}

impl CachedContract {
    /// Parses ABI JSON into a cached contract.
    pub fn parse(raw: &str) -> Result<Self, AbiError> {
        let abi: JsonAbi =
            serde_json::from_str(raw).map_err(|e| AbiError::InvalidAbi(e.to_string()))?;
        Ok(Self::from(&abi))
    }

    /// Looks up a function by name. The first overload wins.
    pub fn function(&self, name: &str) -> Result<&Function, AbiError> {
        self.abi
            .function(name)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| AbiError::FunctionNotFound(name.to_string()))
    }

    /// Looks up an event by name. The first overload wins.
    pub fn event(&self, name: &str) -> Result<&Event, AbiError> {
        self.abi
            .event(name)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| AbiError::EventNotFound(name.to_string()))
    }

    /// Decodes call data: the 4-byte selector picks the function, the rest
    /// is decoded against its inputs.
    pub fn decode_call(&self, input: &[u8]) -> Result<DecodedCall, AbiError> {
        let Some((selector, args)) = input.split_first_chunk::<4>() else {
            return Err(AbiError::InputTooShort);
        };

        let function = self.functions.get(selector).ok_or(AbiError::UnknownSelector(*selector))?;

        let types = function.inputs.iter().map(|p| p.resolve()).collect::<Result<Vec<_>, _>>()?;
        let decoded = DynSolType::Tuple(types).abi_decode_params(args)?;
        let values = match decoded {
            DynSolValue::Tuple(values) => values,
            other => vec![other],
        };

        let params = function
            .inputs
            .iter()
            .zip(values)
            .map(|(input, value)| (input.name.clone(), value))
            .collect::<Vec<_>>();

        tracing::trace!(function = %function.name, params = params.len(), "Decoded function call.");

        Ok(DecodedCall { name: function.name.clone(), params })
    }

    /// Decodes a log as an emission of `event`, merging indexed topics and
    /// data fields back into declaration order.
    pub fn decode_event(&self, event: &Event, log: &Log) -> Result<DecodedLog, AbiError> {
        let expected = event.selector();
        let actual = log.signature().copied();
        if !event.anonymous && actual != Some(expected) {
            return Err(AbiError::SignatureMismatch { expected, actual });
        }

        let decoded = event.decode_log_parts(log.topics().iter().copied(), log.data())?;

        let mut indexed = decoded.indexed.into_iter();
        let mut body = decoded.body.into_iter();
        let mut params = Vec::with_capacity(event.inputs.len());
        for input in &event.inputs {
            let value = if input.indexed { indexed.next() } else { body.next() };
            if let Some(value) = value {
                params.push((input.name.clone(), value));
            }
        }

        tracing::trace!(event = %event.name, params = params.len(), "Decoded event.");

        Ok(DecodedLog { name: event.name.clone(), params })
    }
}

/// ABI-encodes a call to `function`, selector included.
pub fn encode_call(function: &Function, args: &[DynSolValue]) -> Result<Bytes, AbiError> {
    let mismatch = |reason: String| AbiError::ArgumentMismatch {
        function: function.signature(),
        reason,
    };

    if args.len() != function.inputs.len() {
        return Err(mismatch(format!(
            "expected {} arguments, got {}",
            function.inputs.len(),
            args.len()
        )));
    }
    for (position, (param, arg)) in function.inputs.iter().zip(args).enumerate() {
        let ty = param.resolve()?;
        if !ty.matches(arg) {
            return Err(mismatch(format!("argument {position} is not a {ty}")));
        }
    }

    let mut data = function.selector().to_vec();
    data.extend(DynSolValue::Tuple(args.to_vec()).abi_encode_params());
    Ok(data.into())
}

/// Decodes the return data of a call to `function` into its output values.
pub fn decode_output(function: &Function, data: &[u8]) -> Result<Vec<DynSolValue>, AbiError> {
    let types = function.outputs.iter().map(|p| p.resolve()).collect::<Result<Vec<_>, _>>()?;
    match DynSolType::Tuple(types).abi_decode_params(data)? {
        DynSolValue::Tuple(values) => Ok(values),
        other => Ok(vec![other]),
    }
}

/// A contract ABI kept as raw JSON and parsed on first use.
///
/// Clones share the parsed result, so a trigger's ABI is parsed at most once
/// however many times it is evaluated.
#[derive(Clone, Default)]
pub struct ContractAbi {
    raw: Arc<str>,
    parsed: Arc<OnceLock<Result<Arc<CachedContract>, String>>>,
}

impl ContractAbi {
    /// Wraps raw ABI JSON without parsing it.
    pub fn new(raw: impl Into<Arc<str>>) -> Self {
        Self { raw: raw.into(), parsed: Arc::default() }
    }

    /// Returns `true` if no ABI was supplied.
    pub fn is_empty(&self) -> bool {
        self.raw.trim().is_empty()
    }

    /// Returns the parsed ABI, parsing it on the first call.
    pub fn contract(&self) -> Result<Arc<CachedContract>, AbiError> {
        if self.is_empty() {
            return Err(AbiError::EmptyAbi);
        }
        self.parsed
            .get_or_init(|| CachedContract::parse(&self.raw).map(Arc::new).map_err(|e| e.to_string()))
            .clone()
            .map_err(AbiError::InvalidAbi)
    }
}

impl fmt::Debug for ContractAbi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractAbi")
            .field("len", &self.raw.len())
            .field("parsed", &self.parsed.get().is_some())
            .finish()
    }
}
