//! Error taxonomy for contract loading, evaluation and enforcement.
//!
//! Uses `thiserror` for structured, matchable variants:
//!
//! - [`MalformedContractError`]: the descriptor cannot be built. Load time,
//!   always surfaced.
//! - [`ConstraintEvaluationError`]: an expression is broken at evaluation
//!   time. Always raised, whatever the reaction mode.
//! - [`ContractError`]: a legitimate breach (routed per reaction) or an
//!   evaluation failure.
//! - [`InvocationError`]: what calls on a [`Structure`](crate::structure::Structure)
//!   return; wraps contract errors raised by enforced structures.
//! - [`ConfigError`]: an invalid enforcement configuration value.

use thiserror::Error;

use crate::breach::{BreachKind, BreachRecord};
use crate::descriptor::{ContractKind, SourceLocation};
use crate::id::StructureId;

/// A contract definition that cannot be turned into a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedContractError {
    /// An annotation carries an empty expression.
    #[error("empty {annotation} expression at {location}")]
    EmptyExpression {
        annotation: &'static str,
        location: SourceLocation,
    },

    /// An annotation has no quoted expression argument at all.
    #[error("@{annotation} at {location} must carry a quoted expression")]
    MissingExpression {
        annotation: &'static str,
        location: SourceLocation,
    },

    /// A synthetic variable was used where its kind does not provide it,
    /// e.g. `result` inside a precondition.
    #[error("`{variable}` is not available in a {kind} ({location})")]
    InvalidScopeVariable {
        variable: String,
        kind: ContractKind,
        location: SourceLocation,
    },

    /// The expression does not parse.
    #[error("syntax error in `{expression}` at {location}: {message} (offset {position})")]
    Syntax {
        expression: String,
        location: SourceLocation,
        message: String,
        position: usize,
    },

    /// A type hint does not parse.
    #[error("invalid type `{text}` on {structure}::{member}: {reason}")]
    InvalidTypeHint {
        structure: StructureId,
        member: String,
        text: String,
        reason: String,
    },

    /// `@param` names a parameter the method does not declare.
    #[error("@param names unknown parameter ${parameter} on {structure}::{method}")]
    UnknownParameter {
        structure: StructureId,
        method: String,
        parameter: String,
    },

    /// An annotation appears on a target that cannot carry it.
    #[error("@{annotation} is not allowed at {location}")]
    MisplacedAnnotation {
        annotation: String,
        location: SourceLocation,
    },
}

/// Why an expression failed to evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationFailure {
    #[error("syntax error at offset {position}: {message}")]
    Syntax { message: String, position: usize },

    #[error("undefined identifier `{name}`")]
    UndefinedIdentifier { name: String },

    /// `result` or `priorState` referenced outside a postcondition scope.
    #[error("`{name}` is not bound in this scope")]
    UnboundSynthetic { name: String },

    #[error("`{receiver}` has no member `{member}`")]
    UnknownMember { receiver: String, member: String },

    #[error("`{receiver}` has no predicate `{predicate}`")]
    UnknownPredicate { receiver: String, predicate: String },

    #[error("`{target}` is not callable")]
    NotCallable { target: String },

    #[error("invalid operands for {operation}: {operands}")]
    TypeError { operation: String, operands: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("cannot index {target} with {index}")]
    InvalidIndex { target: String, index: String },

    #[error("wrong number of arguments to {function}: expected {expected}, got {actual}")]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },

    /// A predicate call itself failed.
    #[error("predicate `{predicate}` failed: {message}")]
    Predicate { predicate: String, message: String },
}

/// A constraint that could not be evaluated. Indicates a broken contract,
/// never a breach.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("constraint `{expression}` at {location} could not be evaluated: {failure}")]
pub struct ConstraintEvaluationError {
    pub location: SourceLocation,
    pub expression: String,
    pub failure: EvaluationFailure,
}

/// Errors raised by enforcement checkpoints.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractError {
    #[error("{0}")]
    PreconditionViolation(Box<BreachRecord>),

    #[error("{0}")]
    PostconditionViolation(Box<BreachRecord>),

    #[error("{0}")]
    InvariantViolation(Box<BreachRecord>),

    #[error("{0}")]
    TypeContractViolation(Box<BreachRecord>),

    #[error(transparent)]
    Evaluation(#[from] ConstraintEvaluationError),
}

impl ContractError {
    /// Wraps a breach record in the variant matching its kind.
    pub fn breach(record: BreachRecord) -> Self {
        let kind = record.kind;
        let record = Box::new(record);
        match kind {
            BreachKind::Precondition => ContractError::PreconditionViolation(record),
            BreachKind::Postcondition => ContractError::PostconditionViolation(record),
            BreachKind::Invariant => ContractError::InvariantViolation(record),
            BreachKind::TypeContract => ContractError::TypeContractViolation(record),
        }
    }

    /// The breach record, if this is a breach rather than an evaluation error.
    pub fn record(&self) -> Option<&BreachRecord> {
        match self {
            ContractError::PreconditionViolation(r)
            | ContractError::PostconditionViolation(r)
            | ContractError::InvariantViolation(r)
            | ContractError::TypeContractViolation(r) => Some(r),
            ContractError::Evaluation(_) => None,
        }
    }
}

/// Errors returned by calls on a structure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvocationError {
    #[error("unknown method `{method}`")]
    UnknownMethod { method: String },

    #[error("unknown member `{member}`")]
    UnknownMember { member: String },

    #[error("unknown predicate `{predicate}`")]
    UnknownPredicate { predicate: String },

    #[error("`{member}` is read-only")]
    ReadOnly { member: String },

    /// Postconditions call predicates on `priorState`, but the structure
    /// only provides member snapshots.
    #[error("`priorState` predicate calls ({}) need a full snapshot; the structure only copies members", .predicates.join(", "))]
    SnapshotUnsupported { predicates: Vec<String> },

    #[error("invalid arguments to `{method}`: {reason}")]
    InvalidArguments { method: String, reason: String },

    /// The method body itself failed.
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl InvocationError {
    /// The contract error carried by this invocation error, if any.
    pub fn contract(&self) -> Option<&ContractError> {
        match self {
            InvocationError::Contract(err) => Some(err),
            _ => None,
        }
    }

    /// The breach record carried by this invocation error, if any.
    pub fn breach(&self) -> Option<&BreachRecord> {
        self.contract().and_then(ContractError::record)
    }
}

impl From<ConstraintEvaluationError> for InvocationError {
    fn from(err: ConstraintEvaluationError) -> Self {
        InvocationError::Contract(ContractError::Evaluation(err))
    }
}

/// Invalid enforcement configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid enforcement level {0}: only bits 0b111 are defined")]
    InvalidLevel(u8),
}
