//! The contract weaver.
//!
//! Weaving happens in two steps. [`build_plan`] turns a descriptor and a
//! resolved policy into a [`WovenPlan`]; this is the expensive, cacheable
//! part. [`weave`] then attaches a plan to a structure class, producing an
//! [`EnforcedClass`] whose instances run the plan's checks around every
//! public call and property access.
//!
//! Weaving is idempotent: [`weave`] always starts from the original class,
//! discarding any plan already attached, and [`wrap_instance`] returns an
//! already-enforced instance unchanged.

use std::sync::Arc;

use indexmap::IndexMap;

use dbc_check::expr::PriorStateUsage;
use dbc_check::CompiledConstraint;
use dbc_core::{
    Constraint, ContractDescriptor, MalformedContractError, MethodContract, ResolvedPolicy,
    Structure, StructureMetadata, Visibility,
};
use dbc_storage::CacheKey;

use crate::class::{EnforcedClass, LoadedClass};
use crate::enforced::EnforcedStructure;
use crate::plan::{MethodPlan, PropertyPlan, WovenPlan};
use crate::reaction::Reactor;

/// Builds the plan for one structure under `policy`.
///
/// Fails only if a constraint does not parse, which cannot happen for
/// descriptors produced by [`parse_descriptor`](dbc_check::parse_descriptor).
pub fn build_plan(
    metadata: &StructureMetadata,
    descriptor: &ContractDescriptor,
    policy: ResolvedPolicy,
    key: CacheKey,
) -> Result<WovenPlan, MalformedContractError> {
    let invariants = if policy.invariants {
        compile_all(&descriptor.invariants)?
    } else {
        Vec::new()
    };

    let empty = MethodContract::default();
    let mut methods = IndexMap::new();
    for method in metadata.methods.iter().filter(|m| m.visibility == Visibility::Public) {
        let contract = descriptor.methods.get(&method.name).unwrap_or(&empty);

        let parameter_types = if policy.type_safety {
            (0..method.parameters.len())
                .map(|i| contract.parameter_types.get(i).cloned().flatten())
                .collect()
        } else {
            Vec::new()
        };
        let return_type = contract.return_type.clone().filter(|_| policy.type_safety);
        let preconditions = if policy.preconditions {
            compile_all(&contract.preconditions)?
        } else {
            Vec::new()
        };
        let postconditions = if policy.postconditions {
            compile_all(&contract.postconditions)?
        } else {
            Vec::new()
        };

        let mut usage = PriorStateUsage::default();
        for post in &postconditions {
            usage.merge(&post.prior_state_usage());
        }

        let plan = MethodPlan {
            name: method.name.clone(),
            parameters: method.parameters.clone(),
            parameter_types,
            return_type,
            preconditions,
            postconditions,
            captures_prior_state: usage.referenced,
            prior_state_members: usage.members,
            prior_state_predicates: usage.predicates,
        };
        let has_checks = plan.parameter_types.iter().any(Option::is_some)
            || plan.return_type.is_some()
            || !plan.preconditions.is_empty()
            || !plan.postconditions.is_empty()
            || !invariants.is_empty();
        if has_checks {
            methods.insert(method.name.clone(), plan);
        }
    }

    let mut properties = IndexMap::new();
    for name in metadata.public_properties() {
        let var_type = descriptor
            .properties
            .get(name)
            .and_then(|p| p.var_type.clone())
            .filter(|_| policy.type_safety);
        if var_type.is_some() || !invariants.is_empty() {
            properties.insert(
                name.to_string(),
                PropertyPlan {
                    name: name.to_string(),
                    var_type,
                },
            );
        }
    }

    Ok(WovenPlan {
        key,
        policy,
        invariants,
        methods,
        properties,
        public_properties: metadata.public_properties().map(str::to_string).collect(),
    })
}

fn compile_all(constraints: &[Constraint]) -> Result<Vec<CompiledConstraint>, MalformedContractError> {
    constraints
        .iter()
        .map(|c| {
            CompiledConstraint::compile(c.clone()).map_err(|err| MalformedContractError::Syntax {
                expression: c.expression.clone(),
                location: c.location.clone(),
                message: err.message,
                position: err.position,
            })
        })
        .collect()
}

/// Attaches `plan` to the original form of `class`.
pub fn weave(class: impl Into<LoadedClass>, plan: Arc<WovenPlan>, reactor: Reactor) -> EnforcedClass {
    let class: LoadedClass = class.into();
    EnforcedClass::new(class.into_original(), plan, reactor)
}

/// Wraps a live instance. Enforced instances are returned unchanged.
pub fn wrap_instance(instance: Box<dyn Structure>, plan: Arc<WovenPlan>, reactor: Reactor) -> Box<dyn Structure> {
    if instance.is_enforced() {
        return instance;
    }
    Box::new(EnforcedStructure::new(instance, plan, reactor))
}
