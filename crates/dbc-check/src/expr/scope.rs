//! Explicit evaluation context for constraint expressions.
//!
//! Everything an expression can see is in an [`EvaluationScope`]: the
//! structure instance, named parameter bindings, and in postconditions the
//! `result` value and the `priorState` snapshot. Instances are held by shared
//! reference, so evaluation cannot mutate them.

use indexmap::IndexMap;

use dbc_core::{Structure, Value};

#[derive(Default)]
pub struct EvaluationScope<'a> {
    pub this: Option<&'a dyn Structure>,
    pub bindings: IndexMap<String, Value>,
    pub result: Option<Value>,
    pub prior_state: Option<&'a dyn Structure>,
}

impl<'a> EvaluationScope<'a> {
    /// A scope with no instance and no bindings.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Scope for invariants: `this` only.
    pub fn for_structure(this: &'a dyn Structure) -> Self {
        EvaluationScope {
            this: Some(this),
            ..Self::default()
        }
    }

    /// Scope for method constraints. Parameters are bound positionally;
    /// missing arguments bind as null.
    pub fn for_method(this: &'a dyn Structure, parameters: &[String], args: &[Value]) -> Self {
        let bindings = parameters
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), args.get(i).cloned().unwrap_or(Value::Null)))
            .collect();
        EvaluationScope {
            this: Some(this),
            bindings,
            ..Self::default()
        }
    }

    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bindings.insert(name.into(), value.into());
        self
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_prior_state(mut self, prior: &'a dyn Structure) -> Self {
        self.prior_state = Some(prior);
        self
    }

    /// Renders the scope for a breach record: bindings, `result` when bound,
    /// and the listed members of `this` that can be read.
    pub fn summary(&self, members: &[String]) -> IndexMap<String, String> {
        let mut out: IndexMap<String, String> = self
            .bindings
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect();
        if let Some(result) = &self.result {
            out.insert("result".to_string(), result.to_string());
        }
        if let Some(this) = self.this {
            for member in members {
                if let Ok(value) = this.get(member) {
                    out.insert(format!("this.{member}"), value.to_string());
                }
            }
        }
        out
    }
}
