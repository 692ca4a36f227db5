//! Woven plans: the artifact a weave produces.
//!
//! A [`WovenPlan`] is everything an enforced structure needs at call time,
//! precomputed once per (definition, policy) pair: compiled constraints for
//! each public method, type contracts, and the members a `priorState`
//! snapshot must copy. Only checks the policy activates are included, so the
//! wrapper never consults the configuration again.
//!
//! Plans are plain data and serialize with serde, which is how the
//! definition cache persists them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use dbc_check::CompiledConstraint;
use dbc_core::{ResolvedPolicy, TypeSpec};
use dbc_storage::CacheKey;

/// Checks for one public method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodPlan {
    pub name: String,
    /// Parameter names in declaration order.
    pub parameters: Vec<String>,
    /// One entry per parameter; empty when type safety is off.
    pub parameter_types: Vec<Option<TypeSpec>>,
    pub return_type: Option<TypeSpec>,
    pub preconditions: Vec<CompiledConstraint>,
    pub postconditions: Vec<CompiledConstraint>,
    /// True if a postcondition reads `priorState`.
    pub captures_prior_state: bool,
    /// Members copied into the `priorState` snapshot.
    pub prior_state_members: Vec<String>,
    /// Predicates postconditions call on `priorState`; the snapshot must be
    /// able to answer them.
    #[serde(default)]
    pub prior_state_predicates: Vec<String>,
}

impl MethodPlan {
    /// The arguments are still needed after the body consumed them, by
    /// postconditions or by a return type breach's scope summary.
    pub fn needs_arguments_after_call(&self) -> bool {
        !self.postconditions.is_empty() || self.return_type.is_some()
    }
}

/// Checks for one public property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyPlan {
    pub name: String,
    pub var_type: Option<TypeSpec>,
}

/// The woven form of one structure under one policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WovenPlan {
    /// Identity the plan was woven for; checked when a persisted plan is
    /// re-attached.
    pub key: CacheKey,
    pub policy: ResolvedPolicy,
    /// Empty when invariants are off or none are declared.
    pub invariants: Vec<CompiledConstraint>,
    /// Public methods with at least one active check. Other methods pass
    /// straight through.
    pub methods: IndexMap<String, MethodPlan>,
    /// Public properties with at least one active check.
    pub properties: IndexMap<String, PropertyPlan>,
    /// Public property names, rendered into breach scope summaries.
    pub public_properties: Vec<String>,
}

impl WovenPlan {
    /// True if the plan checks nothing at all.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty() && self.methods.is_empty() && self.properties.is_empty()
    }

    pub fn method(&self, name: &str) -> Option<&MethodPlan> {
        self.methods.get(name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyPlan> {
        self.properties.get(name)
    }
}
