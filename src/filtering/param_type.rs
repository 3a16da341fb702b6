//! Structured description of a declared Solidity parameter type.
//!
//! Filter and output types are parsed once at load time into a [`ParamType`],
//! and evaluation dispatches on that description instead of re-reading the
//! type string for every value.

use alloy::dyn_abi::DynSolType;

/// The leaf kinds a parameter value can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// `address`
    Address,
    /// `bool`
    Bool,
    /// `string`
    String,
    /// `bytes`
    Bytes,
    /// `bytesN`
    FixedBytes(usize),
    /// `intN`
    Int(usize),
    /// `uintN`
    Uint(usize),
}

impl ScalarKind {
    /// Returns `true` for the signed and unsigned integer families, which are
    /// compared with arbitrary precision regardless of width.
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Uint(_))
    }

    /// Returns `true` for kinds compared as normalized text.
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Address | Self::String | Self::Bytes | Self::FixedBytes(_))
    }
}

/// A declared parameter type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// A single value.
    Scalar(ScalarKind),
    /// A one-dimensional array, with its length when fixed.
    Array {
        /// Element type.
        element: Box<ParamType>,
        /// Declared length for `T[N]`.
        length: Option<usize>,
    },
    /// A tuple. A bare `tuple` declaration has no field list, in which case
    /// the field types come from the ABI at evaluation time.
    Tuple(Vec<ParamType>),
    /// A type the validator cannot evaluate. Evaluation against it never
    /// matches.
    Unsupported(String),
}

impl ParamType {
    /// Parses a declared type string such as `uint256`, `address[]`,
    /// `bytes32[3]`, `tuple` or `(uint128,address)`.
    pub fn parse(declared: &str) -> Self {
        let declared = declared.trim();
        match declared {
            "tuple" => return Self::Tuple(Vec::new()),
            "tuple[]" => {
                return Self::Array { element: Box::new(Self::Tuple(Vec::new())), length: None };
            }
            _ => {}
        }

        match DynSolType::parse(declared) {
            Ok(ty) => Self::from_sol_type(&ty),
            Err(_) => Self::Unsupported(declared.to_string()),
        }
    }

    /// Maps an ABI type onto the evaluable subset.
    ///
    /// Nested arrays and function pointers are not evaluable.
    pub fn from_sol_type(ty: &DynSolType) -> Self {
        match ty {
            DynSolType::Address => Self::Scalar(ScalarKind::Address),
            DynSolType::Bool => Self::Scalar(ScalarKind::Bool),
            DynSolType::String => Self::Scalar(ScalarKind::String),
            DynSolType::Bytes => Self::Scalar(ScalarKind::Bytes),
            DynSolType::FixedBytes(size) => Self::Scalar(ScalarKind::FixedBytes(*size)),
            DynSolType::Int(bits) => Self::Scalar(ScalarKind::Int(*bits)),
            DynSolType::Uint(bits) => Self::Scalar(ScalarKind::Uint(*bits)),
            DynSolType::Array(inner) => Self::array_of(inner, None, ty),
            DynSolType::FixedArray(inner, length) => Self::array_of(inner, Some(*length), ty),
            DynSolType::Tuple(fields) => Self::Tuple(fields.iter().map(Self::from_sol_type).collect()),
            other => Self::Unsupported(other.sol_type_name().into_owned()),
        }
    }

    fn array_of(inner: &DynSolType, length: Option<usize>, whole: &DynSolType) -> Self {
        match inner {
            DynSolType::Array(_) | DynSolType::FixedArray(..) => {
                Self::Unsupported(whole.sol_type_name().into_owned())
            }
            _ => Self::Array { element: Box::new(Self::from_sol_type(inner)), length },
        }
    }

    /// Returns the scalar kind, if this is a scalar.
    pub fn scalar(&self) -> Option<ScalarKind> {
        match self {
            Self::Scalar(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Returns `true` when evaluation against this type can never match.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

impl Default for ParamType {
    fn default() -> Self {
        Self::Unsupported(String::new())
    }
}
