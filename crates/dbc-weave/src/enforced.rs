//! Enforced structure instances.
//!
//! [`EnforcedStructure`] owns the original instance and runs a
//! [`WovenPlan`]'s checks around it. For a public method call the order is:
//!
//! 1. parameter types
//! 2. preconditions
//! 3. invariants
//! 4. `priorState` capture, then the original body
//! 5. return type
//! 6. postconditions
//! 7. invariants
//!
//! Each checkpoint reports at most its first failing check. Under the
//! logging reaction a breach is recorded and the call proceeds; a
//! constraint that cannot be evaluated always aborts the call.
//!
//! Property reads are bracketed by invariant checks; property writes add a
//! `@var` type check before the write. Predicate queries and snapshots pass
//! straight through, so constraints never re-enter the checks.

use std::sync::Arc;

use indexmap::IndexMap;

use dbc_check::{check_value, CompiledConstraint, EvaluationScope};
use dbc_core::{
    BreachDetail, BreachKind, BreachRecord, ContractError, InvocationError, Structure, TypeSpec,
    TypeTarget, Value,
};

use crate::plan::{MethodPlan, WovenPlan};
use crate::reaction::Reactor;

/// Stands in for arguments the caller did not pass.
static MISSING: Value = Value::Null;

pub struct EnforcedStructure {
    inner: Box<dyn Structure>,
    plan: Arc<WovenPlan>,
    reactor: Reactor,
}

impl EnforcedStructure {
    pub fn new(inner: Box<dyn Structure>, plan: Arc<WovenPlan>, reactor: Reactor) -> Self {
        EnforcedStructure { inner, plan, reactor }
    }

    pub fn plan(&self) -> &WovenPlan {
        &self.plan
    }

    /// Checks invariants with no call context. Run once after construction.
    pub fn check_invariants(&self, method: Option<&str>) -> Result<(), ContractError> {
        check_invariants(self.inner.as_ref(), &self.plan, &self.reactor, method)
    }

    /// Unwraps the original instance.
    pub fn into_inner(self) -> Box<dyn Structure> {
        self.inner
    }
}

impl Structure for EnforcedStructure {
    fn call(&mut self, method: &str, args: Vec<Value>) -> Result<Value, InvocationError> {
        let plan = Arc::clone(&self.plan);
        let Some(method_plan) = plan.method(method) else {
            return self.inner.call(method, args);
        };
        let ctx = Checkpoint {
            plan: &plan,
            reactor: &self.reactor,
            method: Some(method),
        };

        if let Some((position, expected)) = first_type_mismatch(method_plan, &args) {
            let target = TypeTarget::Parameter {
                name: method_plan.parameters[position].clone(),
                position,
            };
            let scope = EvaluationScope::for_method(self.inner.as_ref(), &method_plan.parameters, &args);
            ctx.type_breach(target, expected, args.get(position).unwrap_or(&MISSING), &scope)?;
        }

        {
            let scope = EvaluationScope::for_method(self.inner.as_ref(), &method_plan.parameters, &args);
            ctx.expressions(BreachKind::Precondition, &method_plan.preconditions, &scope)?;
        }
        ctx.invariants(self.inner.as_ref())?;

        let prior = if method_plan.captures_prior_state {
            Some(
                self.inner
                    .snapshot(&method_plan.prior_state_members, &method_plan.prior_state_predicates)?,
            )
        } else {
            None
        };
        let saved_args = method_plan.needs_arguments_after_call().then(|| args.clone());

        let result = self.inner.call(method, args)?;

        if let Some(expected) = &method_plan.return_type {
            if check_value(expected, &result).is_err() {
                let mut scope = EvaluationScope::for_method(
                    self.inner.as_ref(),
                    &method_plan.parameters,
                    saved_args.as_deref().unwrap_or_default(),
                );
                scope.result = Some(result.clone());
                ctx.type_breach(TypeTarget::ReturnValue, expected, &result, &scope)?;
            }
        }

        if !method_plan.postconditions.is_empty() {
            let saved = saved_args.as_deref().unwrap_or_default();
            let mut scope = EvaluationScope::for_method(self.inner.as_ref(), &method_plan.parameters, saved)
                .with_result(result.clone());
            if let Some(prior) = &prior {
                scope = scope.with_prior_state(&**prior);
            }
            ctx.expressions(BreachKind::Postcondition, &method_plan.postconditions, &scope)?;
        }
        ctx.invariants(self.inner.as_ref())?;

        Ok(result)
    }

    fn get(&self, property: &str) -> Result<Value, InvocationError> {
        if self.plan.property(property).is_none() {
            return self.inner.get(property);
        }
        let accessor = format!("get {property}");
        check_invariants(self.inner.as_ref(), &self.plan, &self.reactor, Some(accessor.as_str()))?;
        let value = self.inner.get(property)?;
        check_invariants(self.inner.as_ref(), &self.plan, &self.reactor, Some(accessor.as_str()))?;
        Ok(value)
    }

    fn set(&mut self, property: &str, value: Value) -> Result<(), InvocationError> {
        let plan = Arc::clone(&self.plan);
        let Some(property_plan) = plan.property(property) else {
            return self.inner.set(property, value);
        };
        let accessor = format!("set {property}");
        let ctx = Checkpoint {
            plan: &plan,
            reactor: &self.reactor,
            method: Some(accessor.as_str()),
        };

        if let Some(expected) = &property_plan.var_type {
            if check_value(expected, &value).is_err() {
                let scope = EvaluationScope::for_structure(self.inner.as_ref()).bind("value", value.clone());
                let target = TypeTarget::Property {
                    name: property.to_string(),
                };
                ctx.type_breach(target, expected, &value, &scope)?;
            }
        }
        ctx.invariants(self.inner.as_ref())?;
        self.inner.set(property, value)?;
        ctx.invariants(self.inner.as_ref())?;
        Ok(())
    }

    fn query(&self, predicate: &str, args: &[Value]) -> Result<Value, InvocationError> {
        self.inner.query(predicate, args)
    }

    fn snapshot(&self, members: &[String], predicates: &[String]) -> Result<Box<dyn Structure>, InvocationError> {
        self.inner.snapshot(members, predicates)
    }

    fn is_enforced(&self) -> bool {
        true
    }
}

fn first_type_mismatch<'p>(plan: &'p MethodPlan, args: &[Value]) -> Option<(usize, &'p TypeSpec)> {
    plan.parameter_types
        .iter()
        .enumerate()
        .find_map(|(position, spec)| {
            let spec = spec.as_ref()?;
            let arg = args.get(position).unwrap_or(&MISSING);
            check_value(spec, arg).is_err().then_some((position, spec))
        })
}

pub(crate) fn check_invariants(
    this: &dyn Structure,
    plan: &WovenPlan,
    reactor: &Reactor,
    method: Option<&str>,
) -> Result<(), ContractError> {
    Checkpoint { plan, reactor, method }.invariants(this)
}

/// One checkpoint's worth of context for building breach records.
struct Checkpoint<'a> {
    plan: &'a WovenPlan,
    reactor: &'a Reactor,
    method: Option<&'a str>,
}

impl Checkpoint<'_> {
    fn invariants(&self, this: &dyn Structure) -> Result<(), ContractError> {
        if self.plan.invariants.is_empty() {
            return Ok(());
        }
        let scope = EvaluationScope::for_structure(this);
        self.expressions(BreachKind::Invariant, &self.plan.invariants, &scope)
    }

    /// Evaluates constraints in order and reports the first that fails.
    fn expressions(
        &self,
        kind: BreachKind,
        constraints: &[CompiledConstraint],
        scope: &EvaluationScope<'_>,
    ) -> Result<(), ContractError> {
        for compiled in constraints {
            if !compiled.evaluate(scope)? {
                let detail = BreachDetail::Expression {
                    expression: compiled.constraint.expression.clone(),
                    location: compiled.constraint.location.clone(),
                };
                return self.reactor.react(self.record(kind, detail, scope));
            }
        }
        Ok(())
    }

    fn type_breach(
        &self,
        target: TypeTarget,
        expected: &TypeSpec,
        actual: &Value,
        scope: &EvaluationScope<'_>,
    ) -> Result<(), ContractError> {
        let detail = BreachDetail::TypeMismatch {
            target,
            expected: expected.clone(),
            actual: check_value(expected, actual)
                .err()
                .map_or_else(|| actual.describe_type(), |m| m.actual),
        };
        self.reactor
            .react(self.record(BreachKind::TypeContract, detail, scope))
    }

    fn record(&self, kind: BreachKind, detail: BreachDetail, scope: &EvaluationScope<'_>) -> BreachRecord {
        let summary: IndexMap<String, String> = scope.summary(&self.plan.public_properties);
        BreachRecord::new(
            kind,
            self.plan.key.structure_id.clone(),
            self.method.map(str::to_string),
            detail,
            summary,
        )
    }
}
