//! The evaluation primitives shared by every matcher: the declared type
//! grammar, the predicate comparisons, currency normalization and the
//! parameter validator that ties them together.

pub mod currency;
pub mod param_type;
pub mod predicate;
pub mod validator;

pub use currency::{Asset, CurrencyConversion, resolve_conversion};
pub use param_type::{ParamType, ScalarKind};
pub use validator::{ComponentSlot, ParameterCheck, validate};
