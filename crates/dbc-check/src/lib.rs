//! Contract extraction and evaluation.
//!
//! - [`annotations`]: the constraint parser. Scans docblocks attached to a
//!   structure's metadata and builds its
//!   [`ContractDescriptor`](dbc_core::ContractDescriptor).
//! - [`expr`]: the expression evaluator. Lexes, parses and evaluates
//!   constraint expressions against an explicit [`EvaluationScope`].
//! - [`typecheck`]: runtime validation of values against
//!   [`TypeSpec`](dbc_core::TypeSpec)s.

pub mod annotations;
pub mod expr;
pub mod typecheck;

pub use annotations::{parse_descriptor, parse_type_hint};
pub use expr::{evaluate, parse_expression, CompiledConstraint, EvaluationScope, Expr, SyntaxError};
pub use typecheck::{check_value, TypeMismatch};
