//! The rule model: the in-memory form of a user-authored trigger and the
//! loader that builds it from its loosely-typed JSON document.
//!
//! Loading is a pure transform. The contract ABI is kept as raw JSON and only
//! parsed on first use by a matcher (see [`ContractAbi`]).

use std::{fmt, str::FromStr};

use alloy::{
    dyn_abi::{DynSolType, DynSolValue},
    primitives::Address,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{
    abi::ContractAbi,
    engine::cron::{CronError, CronSchedule},
    filtering::ParamType,
};

/// `ContractAdd` value that widens an event trigger to every known ERC-20
/// token contract.
pub const ALL_ERC20_TOKENS: &str = "all_erc20_tokens";

/// Errors raised while turning a trigger document into a [`Trigger`].
#[derive(Debug, Error)]
pub enum RuleConfigurationError {
    /// The document is not valid JSON, or a field has the wrong JSON type.
    #[error("Invalid trigger JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A required field is absent or empty.
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    /// `TriggerType` is not one of the recognized kinds.
    #[error("Unsupported trigger type: '{0}'")]
    UnsupportedTriggerType(String),

    /// A contract-call or cron trigger without a `FunctionName`.
    #[error("{0} triggers require a function name")]
    MissingFunctionName(TriggerType),

    /// `FilterType` is not one of the recognized kinds.
    #[error("Unsupported filter type: '{0}'")]
    UnsupportedFilterType(String),

    /// The filter kind exists but cannot be used with this trigger type.
    #[error("Filter type '{filter_type}' is not allowed on {trigger_type} triggers")]
    FilterNotAllowed {
        /// The offending filter type.
        filter_type: String,
        /// The trigger type it was used with.
        trigger_type: TriggerType,
    },

    /// A `BasicFilter` names a transaction field that cannot be filtered on.
    #[error("Unsupported basic filter parameter: '{0}'")]
    UnsupportedParameter(String),

    /// The condition's predicate is not one of the recognized operators.
    #[error("Unsupported predicate: '{0}'")]
    UnsupportedPredicate(String),

    /// A currency-qualified condition is structurally malformed.
    #[error("Malformed currency: {0}")]
    MalformedCurrency(String),

    /// An address field does not hold a 20-byte hex address.
    #[error("Invalid address: '{0}'")]
    InvalidAddress(String),

    /// An element index or return index is negative.
    #[error("Invalid index {0}: indices must be non-negative")]
    InvalidIndex(i64),

    /// An input's declared ABI type cannot be parsed.
    #[error("Invalid input type '{ty}': {source}")]
    InvalidInputType {
        /// The declared type string.
        ty: String,
        /// The underlying parse error.
        #[source]
        source: alloy::dyn_abi::Error,
    },

    /// The populated sections do not fit the declared trigger type.
    #[error("Invalid {trigger_type} trigger: {reason}")]
    InvalidShape {
        /// The declared trigger type.
        trigger_type: TriggerType,
        /// What is wrong with it.
        reason: String,
    },

    /// The cron rule or its timezone cannot be parsed.
    #[error("Invalid cron job: {0}")]
    InvalidCron(#[from] CronError),
}

/// The kind of data a trigger watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TriggerType {
    /// Filters evaluated against every transaction of a block.
    WatchTransactions,
    /// Outputs evaluated against a contract call made at every block.
    WatchContracts,
    /// Filters evaluated against event logs.
    WatchEvents,
    /// Outputs evaluated against a contract call made on a cron schedule.
    CronTrigger,
}

impl FromStr for TriggerType {
    type Err = RuleConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WatchTransactions" => Ok(Self::WatchTransactions),
            "WatchContracts" => Ok(Self::WatchContracts),
            "WatchEvents" => Ok(Self::WatchEvents),
            "CronTrigger" => Ok(Self::CronTrigger),
            other => Err(RuleConfigurationError::UnsupportedTriggerType(other.to_string())),
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WatchTransactions => "WatchTransactions",
            Self::WatchContracts => "WatchContracts",
            Self::WatchEvents => "WatchEvents",
            Self::CronTrigger => "CronTrigger",
        };
        f.write_str(name)
    }
}

/// The comparison operator applied by a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Predicate {
    /// Equality; on unindexed arrays, length equality.
    Eq,
    /// Strictly greater than.
    BiggerThan,
    /// Strictly smaller than.
    SmallerThan,
    /// The attribute is one of the elements of an array value.
    IsIn,
}

impl FromStr for Predicate {
    type Err = RuleConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Eq" => Ok(Self::Eq),
            "BiggerThan" => Ok(Self::BiggerThan),
            "SmallerThan" => Ok(Self::SmallerThan),
            "IsIn" => Ok(Self::IsIn),
            other => Err(RuleConfigurationError::UnsupportedPredicate(other.to_string())),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A predicate plus the literal it compares against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    /// The comparison operator.
    pub predicate: Predicate,
    /// The literal target, as authored.
    pub attribute: String,
    /// Currency the attribute is expressed in, for value-conversion
    /// conditions (e.g. `USD`).
    pub attribute_currency: Option<String>,
}

/// The condition of a filter, keyed by what it inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// Transaction sender.
    From(Criterion),
    /// Transaction recipient.
    To(Criterion),
    /// Transaction nonce.
    Nonce(Criterion),
    /// Transaction gas limit.
    Gas(Criterion),
    /// Transaction gas price.
    GasPrice(Criterion),
    /// Native value transferred, optionally converted to another currency.
    Value(Criterion),
    /// A decoded argument of the called function.
    FunctionParam(Criterion),
    /// The transaction called the filter's function.
    FunctionCalled,
    /// A decoded event field.
    EventParam(Criterion),
    /// The log is an emission of the filter's event.
    EventEmitted,
}

impl Condition {
    /// Returns the criterion carried by this condition, if any.
    pub fn criterion(&self) -> Option<&Criterion> {
        match self {
            Self::From(c)
            | Self::To(c)
            | Self::Nonce(c)
            | Self::Gas(c)
            | Self::GasPrice(c)
            | Self::Value(c)
            | Self::FunctionParam(c)
            | Self::EventParam(c) => Some(c),
            Self::FunctionCalled | Self::EventEmitted => None,
        }
    }

    /// Short name of the condition, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::From(_) => "From",
            Self::To(_) => "To",
            Self::Nonce(_) => "Nonce",
            Self::Gas(_) => "Gas",
            Self::GasPrice(_) => "GasPrice",
            Self::Value(_) => "Value",
            Self::FunctionParam(_) => "FunctionParam",
            Self::FunctionCalled => "FunctionCalled",
            Self::EventParam(_) => "EventParam",
            Self::EventEmitted => "EventEmitted",
        }
    }

    /// Returns `true` for conditions evaluated against event data.
    pub fn is_event_condition(&self) -> bool {
        matches!(self, Self::EventParam(_) | Self::EventEmitted)
    }
}

/// Where the token for a currency conversion comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrencyRef {
    /// A fixed token contract.
    Token(Address),
    /// The address held by another field of the same event.
    Field(String),
}

/// One clause of a transaction or event trigger.
#[derive(Debug, Clone)]
pub struct Filter {
    /// Name of the decoded argument or event field the filter inspects.
    pub parameter_name: Option<String>,
    /// Declared type of that parameter.
    pub parameter_type: ParamType,
    /// Event the filter applies to, for event filters.
    pub event_name: Option<String>,
    /// Function the filter applies to, for function filters.
    pub function_name: Option<String>,
    /// Element to select from an array or tuple parameter.
    pub index: Option<usize>,
    /// Token whose decimals (and price) normalize the parameter value.
    pub parameter_currency: Option<CurrencyRef>,
    /// What to check.
    pub condition: Condition,
}

/// A named field of a tuple-typed return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Field name, as declared in the ABI.
    pub name: String,
    /// Declared field type.
    pub ty: ParamType,
}

/// One clause of a contract-call trigger, checked against one return value.
#[derive(Debug, Clone)]
pub struct Output {
    /// Element to select from an array or tuple return value.
    pub index: Option<usize>,
    /// Position of the value in the decoded return tuple.
    pub return_index: usize,
    /// Declared type of the return value.
    pub return_type: ParamType,
    /// Token whose decimals (and price) normalize the value.
    pub return_currency: Option<Address>,
    /// Field to descend into when the return value is a struct.
    pub component: Option<Component>,
    /// What to check.
    pub criterion: Criterion,
}

/// One argument of the contract call made by contract-call and cron triggers.
#[derive(Debug, Clone)]
pub struct Input {
    /// Declared ABI type.
    pub parameter_type: DynSolType,
    /// Literal value, as authored.
    pub parameter_value: String,
}

impl Input {
    /// Coerces the literal into an ABI value of the declared type.
    pub fn to_value(&self) -> Result<DynSolValue, alloy::dyn_abi::Error> {
        self.parameter_type.coerce_str(&self.parameter_value)
    }
}

/// The schedule of a cron trigger.
#[derive(Debug, Clone)]
pub struct CronJob {
    /// The five-field cron expression, as authored.
    pub rule: String,
    /// The fixed UTC offset the rule is read in, as authored (`±HHMM`).
    pub timezone: String,
    /// The parsed schedule.
    pub schedule: CronSchedule,
}

/// The contract(s) a trigger is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractTarget {
    /// A single contract.
    Address(Address),
    /// Every contract in the configured ERC-20 token set.
    AllErc20Tokens,
}

/// A validated trigger, ready for evaluation.
#[derive(Debug, Clone)]
pub struct Trigger {
    /// Identifier assigned by the store.
    pub trigger_uuid: String,
    /// Owner of the trigger.
    pub user_uuid: String,
    /// Human readable name.
    pub trigger_name: String,
    /// What the trigger watches.
    pub trigger_type: TriggerType,
    /// The contract(s) the trigger is bound to.
    pub contract: ContractTarget,
    /// The contract ABI, parsed on first use.
    pub contract_abi: ContractAbi,
    /// Function called by contract-call and cron triggers.
    pub function_name: Option<String>,
    /// Clauses for transaction and event triggers, all of which must match.
    pub filters: Vec<Filter>,
    /// Call arguments for contract-call and cron triggers.
    pub inputs: Vec<Input>,
    /// Clauses for contract-call and cron triggers, all of which must match.
    pub outputs: Vec<Output>,
    /// Schedule for cron triggers.
    pub cron_job: Option<CronJob>,
    /// When the trigger last fired; owned by the store.
    pub last_fired: Option<DateTime<Utc>>,
}

impl Trigger {
    /// Parses and validates a trigger document.
    pub fn from_json(document: &str) -> Result<Self, RuleConfigurationError> {
        let doc: TriggerDocument = serde_json::from_str(document)?;
        doc.try_into()
    }

    /// Validates an already parsed trigger document.
    pub fn from_value(document: Value) -> Result<Self, RuleConfigurationError> {
        let doc: TriggerDocument = serde_json::from_value(document)?;
        doc.try_into()
    }

    /// Returns the single contract address, or `None` for wildcard triggers.
    pub fn contract_address(&self) -> Option<Address> {
        match self.contract {
            ContractTarget::Address(address) => Some(address),
            ContractTarget::AllErc20Tokens => None,
        }
    }

    /// Returns the event the trigger's event filters refer to.
    pub fn event_name(&self) -> Option<&str> {
        self.filters
            .iter()
            .filter(|f| f.condition.is_event_condition())
            .find_map(|f| f.event_name.as_deref())
    }
}

// --- Wire documents ---

#[derive(Debug, Deserialize)]
struct TriggerDocument {
    #[serde(rename = "TriggerUUID", default)]
    trigger_uuid: Option<String>,
    #[serde(rename = "UserUUID", default)]
    user_uuid: Option<String>,
    #[serde(rename = "TriggerName", default)]
    trigger_name: Option<String>,
    #[serde(rename = "TriggerType", default)]
    trigger_type: Option<String>,
    #[serde(rename = "ContractAdd", default)]
    contract_add: Option<String>,
    #[serde(rename = "ContractABI", default)]
    contract_abi: Option<Value>,
    #[serde(rename = "FunctionName", default)]
    function_name: Option<String>,
    #[serde(rename = "Filters", default)]
    filters: Vec<FilterDocument>,
    #[serde(rename = "Inputs", default)]
    inputs: Vec<InputDocument>,
    #[serde(rename = "Outputs", default)]
    outputs: Vec<OutputDocument>,
    #[serde(rename = "CronJob", default)]
    cron_job: Option<CronJobDocument>,
    #[serde(rename = "LastFired", default)]
    last_fired: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FilterDocument {
    #[serde(default)]
    filter_type: Option<String>,
    #[serde(default)]
    parameter_name: Option<String>,
    #[serde(default)]
    parameter_type: Option<String>,
    #[serde(default)]
    event_name: Option<String>,
    #[serde(default)]
    function_name: Option<String>,
    #[serde(default)]
    index: Option<i64>,
    #[serde(default)]
    parameter_currency: Option<String>,
    #[serde(default)]
    condition: Option<ConditionDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConditionDocument {
    #[serde(default)]
    predicate: Option<String>,
    #[serde(default)]
    attribute: Option<Value>,
    #[serde(default)]
    attribute_currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OutputDocument {
    #[serde(default)]
    index: Option<i64>,
    #[serde(default)]
    return_index: i64,
    #[serde(default)]
    return_type: Option<String>,
    #[serde(default)]
    return_currency: Option<String>,
    #[serde(default)]
    component: Option<ComponentDocument>,
    #[serde(default)]
    condition: Option<ConditionDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ComponentDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "Type", default)]
    ty: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InputDocument {
    #[serde(default)]
    parameter_type: Option<String>,
    #[serde(default)]
    parameter_value: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CronJobDocument {
    #[serde(default)]
    rule: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
}

/// Treats empty and whitespace-only strings as absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn required(value: Option<String>, field: &'static str) -> Result<String, RuleConfigurationError> {
    non_empty(value).ok_or(RuleConfigurationError::MissingField(field))
}

fn index_from(raw: i64) -> Result<usize, RuleConfigurationError> {
    usize::try_from(raw).map_err(|_| RuleConfigurationError::InvalidIndex(raw))
}

/// Renders a JSON scalar the way a user would have typed it.
fn literal(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_address(raw: &str) -> Result<Address, RuleConfigurationError> {
    raw.parse::<Address>().map_err(|_| RuleConfigurationError::InvalidAddress(raw.to_string()))
}

fn is_identifier(raw: &str) -> bool {
    let mut chars = raw.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl ConditionDocument {
    fn into_criterion(self) -> Result<Criterion, RuleConfigurationError> {
        let predicate = required(self.predicate, "Predicate")?.parse()?;
        let attribute = self
            .attribute
            .and_then(literal)
            .ok_or(RuleConfigurationError::MissingField("Attribute"))?;
        Ok(Criterion {
            predicate,
            attribute: attribute.trim().to_string(),
            attribute_currency: non_empty(self.attribute_currency),
        })
    }
}

fn criterion_of(doc: Option<ConditionDocument>) -> Result<Criterion, RuleConfigurationError> {
    doc.ok_or(RuleConfigurationError::MissingField("Condition"))?.into_criterion()
}

impl FilterDocument {
    fn into_filter(self, trigger_type: TriggerType) -> Result<Filter, RuleConfigurationError> {
        let filter_type = required(self.filter_type, "FilterType")?;
        let parameter_name = non_empty(self.parameter_name);
        let event_name = non_empty(self.event_name);
        let function_name = non_empty(self.function_name);
        let parameter_currency = non_empty(self.parameter_currency);

        let condition = match filter_type.as_str() {
            "BasicFilter" => {
                let name = parameter_name
                    .as_deref()
                    .ok_or(RuleConfigurationError::MissingField("ParameterName"))?;
                let criterion = criterion_of(self.condition)?;
                match name {
                    "From" => Condition::From(criterion),
                    "To" => Condition::To(criterion),
                    "Nonce" => Condition::Nonce(criterion),
                    "Gas" => Condition::Gas(criterion),
                    "GasPrice" => Condition::GasPrice(criterion),
                    "Value" => Condition::Value(criterion),
                    other => return Err(RuleConfigurationError::UnsupportedParameter(other.into())),
                }
            }
            "CheckFunctionParameter" => {
                if parameter_name.is_none() {
                    return Err(RuleConfigurationError::MissingField("ParameterName"));
                }
                Condition::FunctionParam(criterion_of(self.condition)?)
            }
            "CheckFunctionCalled" => {
                if function_name.is_none() {
                    return Err(RuleConfigurationError::MissingField("FunctionName"));
                }
                Condition::FunctionCalled
            }
            "CheckEventParameter" => {
                if parameter_name.is_none() {
                    return Err(RuleConfigurationError::MissingField("ParameterName"));
                }
                if event_name.is_none() {
                    return Err(RuleConfigurationError::MissingField("EventName"));
                }
                Condition::EventParam(criterion_of(self.condition)?)
            }
            "CheckEventEmitted" => {
                if event_name.is_none() {
                    return Err(RuleConfigurationError::MissingField("EventName"));
                }
                Condition::EventEmitted
            }
            other => return Err(RuleConfigurationError::UnsupportedFilterType(other.to_string())),
        };

        let allowed = match trigger_type {
            TriggerType::WatchTransactions => !condition.is_event_condition(),
            TriggerType::WatchEvents => matches!(
                condition,
                Condition::EventParam(_)
                    | Condition::EventEmitted
                    | Condition::From(_)
                    | Condition::To(_)
            ),
            TriggerType::WatchContracts | TriggerType::CronTrigger => false,
        };
        if !allowed {
            return Err(RuleConfigurationError::FilterNotAllowed { filter_type, trigger_type });
        }

        let parameter_currency = validate_filter_currency(&condition, parameter_currency)?;

        Ok(Filter {
            parameter_type: ParamType::parse(self.parameter_type.as_deref().unwrap_or_default()),
            parameter_name,
            event_name,
            function_name,
            index: self.index.map(index_from).transpose()?,
            parameter_currency,
            condition,
        })
    }
}

fn validate_filter_currency(
    condition: &Condition,
    parameter_currency: Option<String>,
) -> Result<Option<CurrencyRef>, RuleConfigurationError> {
    let attribute_currency = condition.criterion().and_then(|c| c.attribute_currency.as_deref());

    match condition {
        Condition::Value(_) => {
            if parameter_currency.is_some() {
                return Err(RuleConfigurationError::MalformedCurrency(
                    "a Value filter is always denominated in the native asset".into(),
                ));
            }
            Ok(None)
        }
        Condition::FunctionParam(_) => match parameter_currency {
            Some(raw) => {
                let token = raw.parse::<Address>().map_err(|_| {
                    RuleConfigurationError::MalformedCurrency(format!(
                        "ParameterCurrency '{raw}' is not a token address"
                    ))
                })?;
                Ok(Some(CurrencyRef::Token(token)))
            }
            None if attribute_currency.is_some() => Err(RuleConfigurationError::MalformedCurrency(
                "AttributeCurrency requires a ParameterCurrency".into(),
            )),
            None => Ok(None),
        },
        Condition::EventParam(_) => match parameter_currency {
            Some(raw) => match raw.parse::<Address>() {
                Ok(token) => Ok(Some(CurrencyRef::Token(token))),
                Err(_) if is_identifier(&raw) => Ok(Some(CurrencyRef::Field(raw))),
                Err(_) => Err(RuleConfigurationError::MalformedCurrency(format!(
                    "ParameterCurrency '{raw}' is neither a token address nor an event field"
                ))),
            },
            None if attribute_currency.is_some() => Err(RuleConfigurationError::MalformedCurrency(
                "AttributeCurrency requires a ParameterCurrency".into(),
            )),
            None => Ok(None),
        },
        _ => {
            if parameter_currency.is_some() || attribute_currency.is_some() {
                return Err(RuleConfigurationError::MalformedCurrency(
                    "currency conversion only applies to value and parameter filters".into(),
                ));
            }
            Ok(None)
        }
    }
}

impl OutputDocument {
    fn into_output(self) -> Result<Output, RuleConfigurationError> {
        let criterion = criterion_of(self.condition)?;

        let return_currency = match non_empty(self.return_currency) {
            Some(raw) => Some(raw.parse::<Address>().map_err(|_| {
                RuleConfigurationError::MalformedCurrency(format!(
                    "ReturnCurrency '{raw}' is not a token address"
                ))
            })?),
            None => None,
        };
        if criterion.attribute_currency.is_some() && return_currency.is_none() {
            return Err(RuleConfigurationError::MalformedCurrency(
                "AttributeCurrency requires a ReturnCurrency".into(),
            ));
        }

        // A component without a name cannot be located in the tuple, so it is
        // rejected rather than silently ignored.
        let component = match self.component {
            Some(doc) => match (non_empty(doc.name), non_empty(doc.ty)) {
                (None, None) => None,
                (Some(name), ty) => {
                    Some(Component { name, ty: ParamType::parse(ty.as_deref().unwrap_or_default()) })
                }
                (None, Some(_)) => return Err(RuleConfigurationError::MissingField("Component.Name")),
            },
            None => None,
        };

        Ok(Output {
            index: self.index.map(index_from).transpose()?,
            return_index: index_from(self.return_index)?,
            return_type: ParamType::parse(self.return_type.as_deref().unwrap_or_default()),
            return_currency,
            component,
            criterion,
        })
    }
}

impl InputDocument {
    fn into_input(self) -> Result<Input, RuleConfigurationError> {
        let ty = required(self.parameter_type, "ParameterType")?;
        let parameter_type = DynSolType::parse(&ty)
            .map_err(|source| RuleConfigurationError::InvalidInputType { ty, source })?;
        let parameter_value = self
            .parameter_value
            .and_then(literal)
            .ok_or(RuleConfigurationError::MissingField("ParameterValue"))?;
        Ok(Input { parameter_type, parameter_value })
    }
}

impl CronJobDocument {
    fn into_cron_job(self) -> Result<CronJob, RuleConfigurationError> {
        let rule = required(self.rule, "CronJob.Rule")?;
        let timezone = non_empty(self.timezone).unwrap_or_else(|| "+0000".to_string());
        let schedule = CronSchedule::parse(&rule, &timezone)?;
        Ok(CronJob { rule, timezone, schedule })
    }
}

impl TryFrom<TriggerDocument> for Trigger {
    type Error = RuleConfigurationError;

    fn try_from(doc: TriggerDocument) -> Result<Self, Self::Error> {
        let trigger_name = required(doc.trigger_name, "TriggerName")?;
        let trigger_type: TriggerType = required(doc.trigger_type, "TriggerType")?.parse()?;
        let contract_add = required(doc.contract_add, "ContractAdd")?;
        let function_name = non_empty(doc.function_name);

        let shape_error = |reason: &str| RuleConfigurationError::InvalidShape {
            trigger_type,
            reason: reason.to_string(),
        };

        let contract = if contract_add.eq_ignore_ascii_case(ALL_ERC20_TOKENS) {
            if trigger_type != TriggerType::WatchEvents {
                return Err(shape_error("only event triggers can watch all ERC-20 tokens"));
            }
            ContractTarget::AllErc20Tokens
        } else {
            ContractTarget::Address(parse_address(&contract_add)?)
        };

        let contract_abi = match doc.contract_abi {
            Some(Value::String(raw)) => ContractAbi::new(raw),
            Some(Value::Null) | None => ContractAbi::default(),
            Some(inline) => ContractAbi::new(inline.to_string()),
        };

        let filters = doc
            .filters
            .into_iter()
            .map(|f| f.into_filter(trigger_type))
            .collect::<Result<Vec<_>, _>>()?;
        let inputs =
            doc.inputs.into_iter().map(InputDocument::into_input).collect::<Result<Vec<_>, _>>()?;
        let outputs = doc
            .outputs
            .into_iter()
            .map(OutputDocument::into_output)
            .collect::<Result<Vec<_>, _>>()?;
        let cron_job = doc.cron_job.map(CronJobDocument::into_cron_job).transpose()?;

        match trigger_type {
            TriggerType::WatchTransactions | TriggerType::WatchEvents => {
                if filters.is_empty() {
                    return Err(shape_error("at least one filter is required"));
                }
                if !outputs.is_empty() || !inputs.is_empty() || cron_job.is_some() {
                    return Err(shape_error("only filters may be set"));
                }
            }
            TriggerType::WatchContracts | TriggerType::CronTrigger => {
                if function_name.is_none() {
                    return Err(RuleConfigurationError::MissingFunctionName(trigger_type));
                }
                if !filters.is_empty() {
                    return Err(shape_error("filters are not evaluated on contract calls"));
                }
            }
        }

        match trigger_type {
            TriggerType::WatchContracts => {
                if outputs.is_empty() {
                    return Err(shape_error("at least one output is required"));
                }
                if cron_job.is_some() {
                    return Err(shape_error("a cron job is only valid on cron triggers"));
                }
            }
            TriggerType::CronTrigger => {
                if cron_job.is_none() {
                    return Err(RuleConfigurationError::MissingField("CronJob"));
                }
            }
            TriggerType::WatchEvents => {
                let mut event_names = filters
                    .iter()
                    .filter(|f| f.condition.is_event_condition())
                    .filter_map(|f| f.event_name.as_deref());
                let Some(first) = event_names.next() else {
                    return Err(shape_error("at least one event filter is required"));
                };
                if event_names.any(|name| name != first) {
                    return Err(shape_error("all event filters must refer to the same event"));
                }
            }
            TriggerType::WatchTransactions => {}
        }

        Ok(Trigger {
            trigger_uuid: non_empty(doc.trigger_uuid).unwrap_or_default(),
            user_uuid: non_empty(doc.user_uuid).unwrap_or_default(),
            trigger_name,
            trigger_type,
            contract,
            contract_abi,
            function_name,
            filters,
            inputs,
            outputs,
            cron_job,
            last_fired: doc.last_fired,
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use serde_json::json;

    use super::*;
    use crate::{
        filtering::ScalarKind,
        test_helpers::{aave_lending_pool_abi_json, erc20_abi_json},
    };

    fn transfer_event_trigger() -> Value {
        json!({
            "TriggerName": "USDC transfers to treasury",
            "TriggerUUID": "trigger-1",
            "UserUUID": "user-1",
            "TriggerType": "WatchEvents",
            "ContractAdd": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
            "ContractABI": erc20_abi_json(),
            "Filters": [
                {
                    "FilterType": "CheckEventParameter",
                    "EventName": "Transfer",
                    "ParameterName": "to",
                    "ParameterType": "address",
                    "Condition": { "Predicate": "Eq", "Attribute": "0xcd95c2b7b1a5ae0a1e7dc4e2f6c10b6f8a8fa3e2" }
                },
                {
                    "FilterType": "CheckEventParameter",
                    "EventName": "Transfer",
                    "ParameterName": "value",
                    "ParameterType": "uint256",
                    "Condition": { "Predicate": "BiggerThan", "Attribute": 0 }
                }
            ]
        })
    }

    #[test]
    fn test_parses_event_trigger() {
        let trigger = Trigger::from_value(transfer_event_trigger()).unwrap();

        assert_eq!(trigger.trigger_name, "USDC transfers to treasury");
        assert_eq!(trigger.trigger_uuid, "trigger-1");
        assert_eq!(trigger.user_uuid, "user-1");
        assert_eq!(trigger.trigger_type, TriggerType::WatchEvents);
        assert_eq!(
            trigger.contract_address(),
            Some(address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"))
        );
        assert_eq!(trigger.event_name(), Some("Transfer"));
        assert_eq!(trigger.filters.len(), 2);
        assert_eq!(trigger.filters[0].parameter_type, ParamType::Scalar(ScalarKind::Address));
        match &trigger.filters[1].condition {
            Condition::EventParam(c) => {
                assert_eq!(c.predicate, Predicate::BiggerThan);
                assert_eq!(c.attribute, "0");
            }
            other => panic!("unexpected condition {other:?}"),
        }
        assert!(trigger.contract_abi.contract().is_ok());
    }

    #[test]
    fn test_parses_contract_trigger_with_component() {
        let doc = json!({
            "TriggerName": "Aave liquidity rate",
            "TriggerType": "WatchContracts",
            "ContractAdd": "0x7d2768de32b0b80b7a3454c06bdac94a69ddc7a9",
            "ContractABI": aave_lending_pool_abi_json(),
            "FunctionName": "getReserveData",
            "Inputs": [
                { "ParameterType": "address", "ParameterValue": "0x6b175474e89094c44da98b954eedeac495271d0f" }
            ],
            "Outputs": [
                {
                    "ReturnIndex": 0,
                    "ReturnType": "tuple",
                    "Component": { "Name": "currentLiquidityRate", "Type": "uint128" },
                    "Condition": { "Predicate": "BiggerThan", "Attribute": "1" }
                }
            ]
        });
        let trigger = Trigger::from_value(doc).unwrap();

        assert_eq!(trigger.function_name.as_deref(), Some("getReserveData"));
        assert_eq!(trigger.inputs.len(), 1);
        assert_eq!(
            trigger.inputs[0].to_value().unwrap(),
            DynSolValue::Address(address!("6b175474e89094c44da98b954eedeac495271d0f"))
        );
        let output = &trigger.outputs[0];
        assert_eq!(output.return_index, 0);
        assert_eq!(
            output.component,
            Some(Component {
                name: "currentLiquidityRate".into(),
                ty: ParamType::Scalar(ScalarKind::Uint(128)),
            })
        );
    }

    #[test]
    fn test_parses_cron_trigger() {
        let doc = json!({
            "TriggerName": "Every five minutes",
            "TriggerType": "CronTrigger",
            "ContractAdd": "0x0000000000000000000000000000000000000001",
            "FunctionName": "totalSupply",
            "CronJob": { "Rule": "*/5 * * * *", "Timezone": "+0100" },
            "LastFired": "2000-01-01T10:00:00Z"
        });
        let trigger = Trigger::from_value(doc).unwrap();

        let job = trigger.cron_job.as_ref().unwrap();
        assert_eq!(job.rule, "*/5 * * * *");
        assert_eq!(job.timezone, "+0100");
        assert_eq!(trigger.last_fired.unwrap().to_rfc3339(), "2000-01-01T10:00:00+00:00");
        assert!(trigger.outputs.is_empty());
    }

    #[test]
    fn test_invalid_json_is_a_configuration_error() {
        let err = Trigger::from_json("{ not json").unwrap_err();
        assert!(matches!(err, RuleConfigurationError::InvalidJson(_)));
    }

    #[test]
    fn test_missing_trigger_name() {
        let mut doc = transfer_event_trigger();
        doc.as_object_mut().unwrap().remove("TriggerName");
        let err = Trigger::from_value(doc).unwrap_err();
        assert!(matches!(err, RuleConfigurationError::MissingField("TriggerName")));
    }

    #[test]
    fn test_unsupported_trigger_type() {
        let mut doc = transfer_event_trigger();
        doc["TriggerType"] = json!("WatchMempool");
        let err = Trigger::from_value(doc).unwrap_err();
        assert!(
            matches!(err, RuleConfigurationError::UnsupportedTriggerType(ref t) if t == "WatchMempool")
        );
    }

    #[test]
    fn test_unsupported_predicate() {
        let mut doc = transfer_event_trigger();
        doc["Filters"][0]["Condition"]["Predicate"] = json!("Contains");
        let err = Trigger::from_value(doc).unwrap_err();
        assert!(matches!(err, RuleConfigurationError::UnsupportedPredicate(ref p) if p == "Contains"));
    }

    #[test]
    fn test_unsupported_filter_type() {
        let mut doc = transfer_event_trigger();
        doc["Filters"][0]["FilterType"] = json!("CheckStorageSlot");
        let err = Trigger::from_value(doc).unwrap_err();
        assert!(matches!(err, RuleConfigurationError::UnsupportedFilterType(_)));
    }

    #[test]
    fn test_function_filter_not_allowed_on_event_trigger() {
        let mut doc = transfer_event_trigger();
        doc["Filters"][0]["FilterType"] = json!("CheckFunctionParameter");
        let err = Trigger::from_value(doc).unwrap_err();
        assert!(matches!(err, RuleConfigurationError::FilterNotAllowed { .. }));
    }

    #[test]
    fn test_unsupported_basic_parameter() {
        let doc = json!({
            "TriggerName": "basic",
            "TriggerType": "WatchTransactions",
            "ContractAdd": "0x0000000000000000000000000000000000000001",
            "Filters": [{
                "FilterType": "BasicFilter",
                "ParameterName": "Signature",
                "Condition": { "Predicate": "Eq", "Attribute": "x" }
            }]
        });
        let err = Trigger::from_value(doc).unwrap_err();
        assert!(matches!(err, RuleConfigurationError::UnsupportedParameter(_)));
    }

    #[test]
    fn test_watch_contracts_requires_function_name() {
        let doc = json!({
            "TriggerName": "no function",
            "TriggerType": "WatchContracts",
            "ContractAdd": "0x0000000000000000000000000000000000000001",
            "Outputs": [{ "ReturnIndex": 0, "ReturnType": "uint256",
                          "Condition": { "Predicate": "Eq", "Attribute": "1" } }]
        });
        let err = Trigger::from_value(doc).unwrap_err();
        assert!(matches!(
            err,
            RuleConfigurationError::MissingFunctionName(TriggerType::WatchContracts)
        ));
    }

    #[test]
    fn test_attribute_currency_requires_return_currency() {
        let doc = json!({
            "TriggerName": "balance in usd",
            "TriggerType": "WatchContracts",
            "ContractAdd": "0x0000000000000000000000000000000000000001",
            "FunctionName": "balanceOf",
            "Outputs": [{ "ReturnIndex": 0, "ReturnType": "uint256",
                          "Condition": { "Predicate": "BiggerThan", "Attribute": "10", "AttributeCurrency": "USD" } }]
        });
        let err = Trigger::from_value(doc).unwrap_err();
        assert!(matches!(err, RuleConfigurationError::MalformedCurrency(_)));
    }

    #[test]
    fn test_malformed_return_currency() {
        let doc = json!({
            "TriggerName": "balance in usd",
            "TriggerType": "WatchContracts",
            "ContractAdd": "0x0000000000000000000000000000000000000001",
            "FunctionName": "balanceOf",
            "Outputs": [{ "ReturnIndex": 0, "ReturnType": "uint256", "ReturnCurrency": "DAI",
                          "Condition": { "Predicate": "BiggerThan", "Attribute": "10", "AttributeCurrency": "USD" } }]
        });
        let err = Trigger::from_value(doc).unwrap_err();
        assert!(matches!(err, RuleConfigurationError::MalformedCurrency(_)));
    }

    #[test]
    fn test_event_currency_may_name_a_sibling_field() {
        let mut doc = transfer_event_trigger();
        doc["Filters"][1]["ParameterCurrency"] = json!("token");
        doc["Filters"][1]["Condition"]["AttributeCurrency"] = json!("USD");
        let trigger = Trigger::from_value(doc).unwrap();
        assert_eq!(
            trigger.filters[1].parameter_currency,
            Some(CurrencyRef::Field("token".to_string()))
        );
    }

    #[test]
    fn test_negative_index_is_rejected() {
        let mut doc = transfer_event_trigger();
        doc["Filters"][0]["Index"] = json!(-1);
        let err = Trigger::from_value(doc).unwrap_err();
        assert!(matches!(err, RuleConfigurationError::InvalidIndex(-1)));
    }

    #[test]
    fn test_invalid_cron_rule() {
        let doc = json!({
            "TriggerName": "bad cron",
            "TriggerType": "CronTrigger",
            "ContractAdd": "0x0000000000000000000000000000000000000001",
            "FunctionName": "totalSupply",
            "CronJob": { "Rule": "every tuesday", "Timezone": "+0000" }
        });
        let err = Trigger::from_value(doc).unwrap_err();
        assert!(matches!(err, RuleConfigurationError::InvalidCron(_)));
    }

    #[test]
    fn test_wildcard_only_for_event_triggers() {
        let doc = json!({
            "TriggerName": "wildcard",
            "TriggerType": "WatchContracts",
            "ContractAdd": "all_erc20_tokens",
            "FunctionName": "totalSupply",
            "Outputs": [{ "ReturnIndex": 0, "ReturnType": "uint256",
                          "Condition": { "Predicate": "Eq", "Attribute": "1" } }]
        });
        let err = Trigger::from_value(doc).unwrap_err();
        assert!(matches!(err, RuleConfigurationError::InvalidShape { .. }));

        let mut events = transfer_event_trigger();
        events["ContractAdd"] = json!("all_erc20_tokens");
        let trigger = Trigger::from_value(events).unwrap();
        assert_eq!(trigger.contract, ContractTarget::AllErc20Tokens);
    }

    #[test]
    fn test_event_filters_must_share_event() {
        let mut doc = transfer_event_trigger();
        doc["Filters"][1]["EventName"] = json!("Approval");
        let err = Trigger::from_value(doc).unwrap_err();
        assert!(matches!(err, RuleConfigurationError::InvalidShape { .. }));
    }

    #[test]
    fn test_unknown_parameter_type_loads_as_unsupported() {
        let mut doc = transfer_event_trigger();
        doc["Filters"][0]["ParameterType"] = json!("function");
        let trigger = Trigger::from_value(doc).unwrap();
        assert!(matches!(trigger.filters[0].parameter_type, ParamType::Unsupported(_)));
    }
}
