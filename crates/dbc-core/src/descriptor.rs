//! Contract descriptors: the parsed, immutable contract of one structure.
//!
//! A [`ContractDescriptor`] is produced once by the constraint parser and is
//! owned 1:1 by its structure definition. It holds expressions as text plus
//! their declaring location; compiling them is the weaver's job.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::id::StructureId;
use crate::types::TypeSpec;

/// The category of an expression constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractKind {
    /// Checked before a method body runs.
    Precondition,
    /// Checked after a method body runs; may see `result` and `priorState`.
    Postcondition,
    /// Checked at structure lifecycle boundaries.
    Invariant,
}

impl ContractKind {
    /// The annotation name that declares this kind.
    pub fn annotation(self) -> &'static str {
        match self {
            ContractKind::Precondition => "Requires",
            ContractKind::Postcondition => "Ensures",
            ContractKind::Invariant => "Invariant",
        }
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractKind::Precondition => write!(f, "precondition"),
            ContractKind::Postcondition => write!(f, "postcondition"),
            ContractKind::Invariant => write!(f, "invariant"),
        }
    }
}

/// Which bindings a constraint evaluates against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintScope {
    /// Parameters plus `this` (and `result`/`priorState` for postconditions).
    Method,
    /// `this` only.
    Structure,
}

/// Where a constraint was declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub structure: StructureId,
    /// Method or property name; `None` for structure-level annotations.
    pub member: Option<String>,
    pub file: Option<String>,
    pub line: u32,
}

impl SourceLocation {
    pub fn structure(structure: StructureId, line: u32) -> Self {
        SourceLocation {
            structure,
            member: None,
            file: None,
            line,
        }
    }

    pub fn member(structure: StructureId, member: impl Into<String>, line: u32) -> Self {
        SourceLocation {
            structure,
            member: Some(member.into()),
            file: None,
            line,
        }
    }

    pub fn in_file(mut self, file: Option<String>) -> Self {
        self.file = file;
        self
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.member {
            Some(member) => write!(f, "{}::{}", self.structure, member)?,
            None => write!(f, "{}", self.structure)?,
        }
        match &self.file {
            Some(file) => write!(f, " ({}:{})", file, self.line),
            None => write!(f, " (line {})", self.line),
        }
    }
}

/// A single expression constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraint {
    pub expression: String,
    pub scope: ConstraintScope,
    pub location: SourceLocation,
}

impl Constraint {
    pub fn new(expression: impl Into<String>, scope: ConstraintScope, location: SourceLocation) -> Self {
        Constraint {
            expression: expression.into(),
            scope,
            location,
        }
    }
}

/// The contract of a single method.
///
/// `parameter_types` has one entry per declared parameter; `None` entries
/// are unconstrained. Constraint sequences keep declaration order, which is
/// also evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodContract {
    pub parameter_types: Vec<Option<TypeSpec>>,
    pub return_type: Option<TypeSpec>,
    pub preconditions: Vec<Constraint>,
    pub postconditions: Vec<Constraint>,
}

impl MethodContract {
    /// True if the method declares nothing the weaver could check.
    pub fn is_empty(&self) -> bool {
        self.parameter_types.iter().all(Option::is_none)
            && self.return_type.is_none()
            && self.preconditions.is_empty()
            && self.postconditions.is_empty()
    }
}

/// The type contract of a property (`@var`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyContract {
    pub var_type: Option<TypeSpec>,
}

/// Every contract a structure declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDescriptor {
    pub structure_id: StructureId,
    /// Empty when the structure declares no `@Invariant`.
    pub invariants: Vec<Constraint>,
    /// Keyed by method name, in declaration order.
    pub methods: IndexMap<String, MethodContract>,
    pub properties: IndexMap<String, PropertyContract>,
}

impl ContractDescriptor {
    pub fn new(structure_id: StructureId) -> Self {
        ContractDescriptor {
            structure_id,
            invariants: Vec::new(),
            methods: IndexMap::new(),
            properties: IndexMap::new(),
        }
    }

    /// True if no invariant, method contract or property contract is declared.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
            && self.methods.values().all(MethodContract::is_empty)
            && self.properties.values().all(|p| p.var_type.is_none())
    }

    /// Iterates every expression constraint in the descriptor, tagged with
    /// its kind.
    pub fn constraints(&self) -> impl Iterator<Item = (ContractKind, &Constraint)> {
        let invariants = self.invariants.iter().map(|c| (ContractKind::Invariant, c));
        let methods = self.methods.values().flat_map(|m| {
            m.preconditions
                .iter()
                .map(|c| (ContractKind::Precondition, c))
                .chain(m.postconditions.iter().map(|c| (ContractKind::Postcondition, c)))
        });
        invariants.chain(methods)
    }
}
