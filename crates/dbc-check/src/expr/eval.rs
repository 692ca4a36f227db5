//! Tree-walking evaluator.
//!
//! Sub-expressions evaluate to an [`Operand`]: either a plain [`Value`] or a
//! borrowed structure instance (`this`, `priorState`). Instances only
//! support member reads and predicate calls; every other operator needs
//! plain values.

use smallvec::SmallVec;

use dbc_core::{EvaluationFailure, InvocationError, Structure, Value};

use super::ast::{BinaryOp, Expr, UnaryOp, PRIOR_STATE, RESULT, THIS};
use super::scope::EvaluationScope;

/// An evaluated sub-expression.
pub enum Operand<'a> {
    Value(Value),
    Instance(&'a dyn Structure, &'static str),
}

impl Operand<'_> {
    fn truthy(&self) -> bool {
        match self {
            Operand::Value(v) => v.is_truthy(),
            Operand::Instance(..) => true,
        }
    }

    fn describe(&self) -> String {
        match self {
            Operand::Value(v) => v.describe_type(),
            Operand::Instance(_, label) => (*label).to_string(),
        }
    }
}

/// Evaluates `expr` to a value. Instances evaluate to `true`.
pub fn evaluate_expr(expr: &Expr, scope: &EvaluationScope<'_>) -> Result<Value, EvaluationFailure> {
    let evaluator = Evaluator { scope };
    match evaluator.eval(expr)? {
        Operand::Value(v) => Ok(v),
        Operand::Instance(..) => Ok(Value::Bool(true)),
    }
}

struct Evaluator<'s, 'a> {
    scope: &'s EvaluationScope<'a>,
}

impl<'s, 'a> Evaluator<'s, 'a> {
    fn eval(&self, expr: &Expr) -> Result<Operand<'a>, EvaluationFailure> {
        match expr {
            Expr::Literal(v) => Ok(Operand::Value(v.clone())),
            Expr::Identifier(name) => self.identifier(name),
            Expr::Member { target, member } => {
                let target = self.eval(target)?;
                member_of(target, member)
            }
            Expr::Call {
                receiver,
                name,
                args,
            } => self.call(receiver.as_deref(), name, args),
            Expr::Index { target, index } => {
                let target = self.value(target, "[]")?;
                let index = self.value(index, "[]")?;
                index_into(target, index)
            }
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(Operand::Value(Value::Bool(!operand.truthy()))),
                    UnaryOp::Neg => match operand {
                        Operand::Value(Value::Int(v)) => v
                            .checked_neg()
                            .map(|n| Operand::Value(Value::Int(n)))
                            .ok_or_else(|| overflow("-")),
                        Operand::Value(Value::Float(v)) => Ok(Operand::Value(Value::Float(-v))),
                        other => Err(EvaluationFailure::TypeError {
                            operation: "unary -".into(),
                            operands: other.describe(),
                        }),
                    },
                }
            }
            Expr::Binary { op, left, right } => self.binary(*op, left, right),
        }
    }

    /// Evaluates to a plain value; instances are rejected.
    fn value(&self, expr: &Expr, operation: &str) -> Result<Value, EvaluationFailure> {
        match self.eval(expr)? {
            Operand::Value(v) => Ok(v),
            Operand::Instance(_, label) => Err(EvaluationFailure::TypeError {
                operation: operation.to_string(),
                operands: label.to_string(),
            }),
        }
    }

    fn identifier(&self, name: &str) -> Result<Operand<'a>, EvaluationFailure> {
        let synthetic = match name {
            THIS => Some(self.scope.this.map(|s| Operand::Instance(s, THIS))),
            RESULT => Some(self.scope.result.clone().map(Operand::Value)),
            PRIOR_STATE => Some(self.scope.prior_state.map(|s| Operand::Instance(s, PRIOR_STATE))),
            _ => None,
        };
        let binding = self.scope.bindings.get(name).cloned().map(Operand::Value);
        match (synthetic, binding) {
            (Some(Some(operand)), _) | (_, Some(operand)) => return Ok(operand),
            (Some(None), None) => {
                return Err(EvaluationFailure::UnboundSynthetic { name: name.to_string() })
            }
            (None, None) => {}
        }
        match self.scope.this {
            Some(this) => match this.get(name) {
                Ok(value) => Ok(Operand::Value(value)),
                Err(InvocationError::UnknownMember { .. }) => {
                    Err(EvaluationFailure::UndefinedIdentifier { name: name.to_string() })
                }
                Err(err) => Err(EvaluationFailure::Predicate {
                    predicate: name.to_string(),
                    message: err.to_string(),
                }),
            },
            None => Err(EvaluationFailure::UndefinedIdentifier { name: name.to_string() }),
        }
    }

    fn call(
        &self,
        receiver: Option<&Expr>,
        name: &str,
        args: &[Expr],
    ) -> Result<Operand<'a>, EvaluationFailure> {
        let receiver = match receiver {
            Some(expr) => Some(self.eval(expr)?),
            None => None,
        };
        let mut values: SmallVec<[Value; 4]> = SmallVec::with_capacity(args.len());
        for arg in args {
            values.push(self.value(arg, &format!("argument to {name}()"))?);
        }

        match receiver {
            None => {
                if let Some(result) = builtin(name, &values) {
                    return result.map(Operand::Value);
                }
                match self.scope.this {
                    Some(this) => query(this, THIS, name, &values),
                    None => Err(EvaluationFailure::NotCallable { target: name.to_string() }),
                }
            }
            Some(Operand::Instance(instance, label)) => query(instance, label, name, &values),
            Some(Operand::Value(v)) => Err(EvaluationFailure::NotCallable {
                target: format!("{}.{name}", v.describe_type()),
            }),
        }
    }

    fn binary(&self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Operand<'a>, EvaluationFailure> {
        match op {
            BinaryOp::Or => {
                let truth = self.eval(left)?.truthy() || self.eval(right)?.truthy();
                return Ok(Operand::Value(Value::Bool(truth)));
            }
            BinaryOp::And => {
                let truth = self.eval(left)?.truthy() && self.eval(right)?.truthy();
                return Ok(Operand::Value(Value::Bool(truth)));
            }
            _ => {}
        }

        let l = self.value(left, op.symbol())?;
        let r = self.value(right, op.symbol())?;
        let value = match op {
            BinaryOp::Eq => Value::Bool(loose_eq(&l, &r)),
            BinaryOp::Ne => Value::Bool(!loose_eq(&l, &r)),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => compare(op, &l, &r)?,
            BinaryOp::Add => add(&l, &r)?,
            BinaryOp::Sub | BinaryOp::Mul => arithmetic(op, &l, &r)?,
            BinaryOp::Div => divide(&l, &r)?,
            BinaryOp::Rem => remainder(&l, &r)?,
            BinaryOp::Or => Value::Bool(l.is_truthy() || r.is_truthy()),
            BinaryOp::And => Value::Bool(l.is_truthy() && r.is_truthy()),
        };
        Ok(Operand::Value(value))
    }
}

fn member_of<'a>(target: Operand<'a>, member: &str) -> Result<Operand<'a>, EvaluationFailure> {
    match target {
        Operand::Instance(instance, label) => match instance.get(member) {
            Ok(v) => Ok(Operand::Value(v)),
            Err(InvocationError::UnknownMember { .. }) => Err(EvaluationFailure::UnknownMember {
                receiver: label.to_string(),
                member: member.to_string(),
            }),
            Err(err) => Err(EvaluationFailure::Predicate {
                predicate: member.to_string(),
                message: err.to_string(),
            }),
        },
        Operand::Value(Value::Object(mut obj)) => match obj.fields.shift_remove(member) {
            Some(v) => Ok(Operand::Value(v)),
            None => Err(EvaluationFailure::UnknownMember {
                receiver: obj.class,
                member: member.to_string(),
            }),
        },
        Operand::Value(other) => Err(EvaluationFailure::UnknownMember {
            receiver: other.describe_type(),
            member: member.to_string(),
        }),
    }
}

fn query<'a>(
    instance: &dyn Structure,
    label: &str,
    predicate: &str,
    args: &[Value],
) -> Result<Operand<'a>, EvaluationFailure> {
    match instance.query(predicate, args) {
        Ok(v) => Ok(Operand::Value(v)),
        Err(InvocationError::UnknownPredicate { .. }) => Err(EvaluationFailure::UnknownPredicate {
            receiver: label.to_string(),
            predicate: predicate.to_string(),
        }),
        Err(err) => Err(EvaluationFailure::Predicate {
            predicate: predicate.to_string(),
            message: err.to_string(),
        }),
    }
}

/// Built-in pure functions. `None` means `name` is not a builtin.
fn builtin(name: &str, args: &[Value]) -> Option<Result<Value, EvaluationFailure>> {
    let f: fn(&Value) -> Result<Value, EvaluationFailure> = match name {
        "count" => |v| match v {
            Value::Array(items) => Ok(Value::from(items.len())),
            Value::String(s) => Ok(Value::from(s.chars().count())),
            Value::Object(obj) => Ok(Value::from(obj.fields.len())),
            other => Err(EvaluationFailure::TypeError {
                operation: "count()".into(),
                operands: other.describe_type(),
            }),
        },
        "empty" => |v| Ok(Value::Bool(!v.is_truthy())),
        _ => return None,
    };
    Some(match args {
        [arg] => f(arg),
        _ => Err(EvaluationFailure::Arity {
            function: name.to_string(),
            expected: 1,
            actual: args.len(),
        }),
    })
}

fn index_into<'a>(target: Value, index: Value) -> Result<Operand<'a>, EvaluationFailure> {
    let invalid = |target: &Value, index: &Value| EvaluationFailure::InvalidIndex {
        target: target.describe_type(),
        index: index.to_string(),
    };
    match (&target, &index) {
        (Value::Array(items), Value::Int(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .map(Operand::Value)
            .ok_or_else(|| invalid(&target, &index)),
        (Value::Object(obj), Value::String(key)) => obj
            .fields
            .get(key)
            .cloned()
            .map(Operand::Value)
            .ok_or_else(|| invalid(&target, &index)),
        _ => Err(invalid(&target, &index)),
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        _ => None,
    }
}

/// Equality with int/float widening. Everything else compares structurally.
fn loose_eq(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
        _ => l == r,
    }
}

fn type_error(op: BinaryOp, l: &Value, r: &Value) -> EvaluationFailure {
    EvaluationFailure::TypeError {
        operation: op.symbol().to_string(),
        operands: format!("{} and {}", l.describe_type(), r.describe_type()),
    }
}

fn overflow(operation: &str) -> EvaluationFailure {
    EvaluationFailure::TypeError {
        operation: operation.to_string(),
        operands: "integer overflow".to_string(),
    }
}

fn compare(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvaluationFailure> {
    let ordering = match (l, r) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => a.partial_cmp(b),
        _ => match (as_f64(l), as_f64(r)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => return Err(type_error(op, l, r)),
        },
    };
    // NaN compares false on every side.
    let Some(ordering) = ordering else {
        return Ok(Value::Bool(false));
    };
    let holds = match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    };
    Ok(Value::Bool(holds))
}

/// Renders a scalar for string concatenation.
fn concat_piece(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Int(_) | Value::Float(_) | Value::Bool(_) => Some(v.to_string()),
        _ => None,
    }
}

fn add(l: &Value, r: &Value) -> Result<Value, EvaluationFailure> {
    if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) {
        return match (concat_piece(l), concat_piece(r)) {
            (Some(a), Some(b)) => Ok(Value::String(a + &b)),
            _ => Err(type_error(BinaryOp::Add, l, r)),
        };
    }
    arithmetic(BinaryOp::Add, l, r)
}

fn arithmetic(op: BinaryOp, l: &Value, r: &Value) -> Result<Value, EvaluationFailure> {
    if let (Value::Int(a), Value::Int(b)) = (l, r) {
        let out = match op {
            BinaryOp::Add => a.checked_add(*b),
            BinaryOp::Sub => a.checked_sub(*b),
            _ => a.checked_mul(*b),
        };
        return out.map(Value::Int).ok_or_else(|| overflow(op.symbol()));
    }
    match (as_f64(l), as_f64(r)) {
        (Some(a), Some(b)) => Ok(Value::Float(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            _ => a * b,
        })),
        _ => Err(type_error(op, l, r)),
    }
}

fn divide(l: &Value, r: &Value) -> Result<Value, EvaluationFailure> {
    let (Some(_), Some(divisor)) = (as_f64(l), as_f64(r)) else {
        return Err(type_error(BinaryOp::Div, l, r));
    };
    if divisor == 0.0 {
        return Err(EvaluationFailure::DivisionByZero);
    }
    if let (Value::Int(a), Value::Int(b)) = (l, r) {
        if let Some(0) = a.checked_rem(*b) {
            return a.checked_div(*b).map(Value::Int).ok_or_else(|| overflow("/"));
        }
    }
    match (as_f64(l), as_f64(r)) {
        (Some(a), Some(b)) => Ok(Value::Float(a / b)),
        _ => Err(type_error(BinaryOp::Div, l, r)),
    }
}

fn remainder(l: &Value, r: &Value) -> Result<Value, EvaluationFailure> {
    match (l, r) {
        (Value::Int(_), Value::Int(0)) => Err(EvaluationFailure::DivisionByZero),
        (Value::Int(a), Value::Int(b)) => a.checked_rem(*b).map(Value::Int).ok_or_else(|| overflow("%")),
        _ => Err(type_error(BinaryOp::Rem, l, r)),
    }
}
