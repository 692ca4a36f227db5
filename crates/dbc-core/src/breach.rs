//! Structured breach records.
//!
//! A [`BreachRecord`] describes one failed check at one checkpoint. Under the
//! logging reaction it is handed to the logging collaborator; under the
//! raising reaction it travels inside a [`ContractError`](crate::error::ContractError).

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::descriptor::{ContractKind, SourceLocation};
use crate::id::StructureId;
use crate::types::TypeSpec;

/// The category of a breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreachKind {
    Precondition,
    Postcondition,
    Invariant,
    TypeContract,
}

impl From<ContractKind> for BreachKind {
    fn from(kind: ContractKind) -> Self {
        match kind {
            ContractKind::Precondition => BreachKind::Precondition,
            ContractKind::Postcondition => BreachKind::Postcondition,
            ContractKind::Invariant => BreachKind::Invariant,
        }
    }
}

impl fmt::Display for BreachKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreachKind::Precondition => write!(f, "Precondition"),
            BreachKind::Postcondition => write!(f, "Postcondition"),
            BreachKind::Invariant => write!(f, "Invariant"),
            BreachKind::TypeContract => write!(f, "TypeContract"),
        }
    }
}

/// What a type contract was checked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeTarget {
    Parameter { name: String, position: usize },
    ReturnValue,
    Property { name: String },
}

impl fmt::Display for TypeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTarget::Parameter { name, .. } => write!(f, "parameter ${name}"),
            TypeTarget::ReturnValue => write!(f, "return value"),
            TypeTarget::Property { name } => write!(f, "property ${name}"),
        }
    }
}

/// The failing check itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BreachDetail {
    /// An expression constraint evaluated to false.
    Expression {
        expression: String,
        location: SourceLocation,
    },
    /// A value did not satisfy its declared type.
    TypeMismatch {
        target: TypeTarget,
        expected: TypeSpec,
        actual: String,
    },
}

impl fmt::Display for BreachDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreachDetail::Expression { expression, location } => {
                write!(f, "`{expression}` declared at {location}")
            }
            BreachDetail::TypeMismatch { target, expected, actual } => {
                write!(f, "{target} expected {expected}, got {actual}")
            }
        }
    }
}

/// One breach at one checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreachRecord {
    pub kind: BreachKind,
    pub structure_id: StructureId,
    /// Method or property accessor; `None` for post-construction invariants.
    pub method: Option<String>,
    pub detail: BreachDetail,
    /// Rendered bindings visible at the checkpoint.
    pub scope_summary: IndexMap<String, String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

impl BreachRecord {
    /// Creates a record stamped with the current time.
    pub fn new(
        kind: BreachKind,
        structure_id: StructureId,
        method: Option<String>,
        detail: BreachDetail,
        scope_summary: IndexMap<String, String>,
    ) -> Self {
        BreachRecord {
            kind,
            structure_id,
            method,
            detail,
            scope_summary,
            timestamp_ms: now_ms(),
        }
    }

    /// The one-line human-readable message for logs and errors.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BreachRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.method {
            Some(method) => write!(
                f,
                "{} breached in {}::{}: {}",
                self.kind, self.structure_id, method, self.detail
            ),
            None => write!(f, "{} breached in {}: {}", self.kind, self.structure_id, self.detail),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
