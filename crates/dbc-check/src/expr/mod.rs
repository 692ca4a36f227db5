//! Expression evaluator.
//!
//! Constraint expressions are parsed once into an [`Expr`] tree and then
//! evaluated any number of times against an explicit [`EvaluationScope`].
//! Evaluation is pure: the scope holds shared references only, so an
//! expression cannot change the state it checks. The result is coerced to a
//! boolean by truthiness; an expression that cannot be evaluated raises a
//! [`ConstraintEvaluationError`] naming its declaring location.

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod scope;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dbc_core::{Constraint, ConstraintEvaluationError, EvaluationFailure};

pub use ast::{BinaryOp, Expr, PriorStateUsage, UnaryOp};
pub use eval::evaluate_expr;
pub use scope::EvaluationScope;

/// A lexing or parsing failure with the byte offset it occurred at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (offset {position})")]
pub struct SyntaxError {
    pub message: String,
    pub position: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, position: usize) -> Self {
        SyntaxError {
            message: message.into(),
            position,
        }
    }
}

impl From<SyntaxError> for EvaluationFailure {
    fn from(err: SyntaxError) -> Self {
        EvaluationFailure::Syntax {
            message: err.message,
            position: err.position,
        }
    }
}

/// Parses an expression without evaluating it.
pub fn parse_expression(input: &str) -> Result<Expr, SyntaxError> {
    parser::parse(input)
}

/// Parses and evaluates `constraint` in one step.
///
/// Syntax errors are reported as evaluation errors here; the constraint
/// parser rejects them earlier when descriptors are built.
pub fn evaluate(constraint: &Constraint, scope: &EvaluationScope<'_>) -> Result<bool, ConstraintEvaluationError> {
    let expr = parse_expression(&constraint.expression).map_err(|err| failure(constraint, err.into()))?;
    evaluate_expr(&expr, scope)
        .map(|v| v.is_truthy())
        .map_err(|f| failure(constraint, f))
}

fn failure(constraint: &Constraint, failure: EvaluationFailure) -> ConstraintEvaluationError {
    ConstraintEvaluationError {
        location: constraint.location.clone(),
        expression: constraint.expression.clone(),
        failure,
    }
}

/// A constraint with its parsed tree, ready for repeated evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledConstraint {
    pub constraint: Constraint,
    pub expr: Expr,
}

impl CompiledConstraint {
    pub fn compile(constraint: Constraint) -> Result<Self, SyntaxError> {
        let expr = parse_expression(&constraint.expression)?;
        Ok(CompiledConstraint { constraint, expr })
    }

    pub fn evaluate(&self, scope: &EvaluationScope<'_>) -> Result<bool, ConstraintEvaluationError> {
        evaluate_expr(&self.expr, scope)
            .map(|v| v.is_truthy())
            .map_err(|f| failure(&self.constraint, f))
    }

    pub fn prior_state_usage(&self) -> PriorStateUsage {
        self.expr.prior_state_usage()
    }
}
