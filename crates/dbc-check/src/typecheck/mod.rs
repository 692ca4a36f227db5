//! Runtime type-contract checks.
//!
//! Widening follows one rule only: an `int` satisfies `float`. Everything
//! else must match its declared kind exactly.

use thiserror::Error;

use dbc_core::{ScalarKind, TypeKind, TypeSpec, Value};

/// A value that does not satisfy its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected}, got {actual}")]
pub struct TypeMismatch {
    pub expected: TypeSpec,
    /// Description of the offending value, e.g. `int` or
    /// `array<mixed> (element 1 is int)`.
    pub actual: String,
}

/// Checks `value` against `spec`.
pub fn check_value(spec: &TypeSpec, value: &Value) -> Result<(), TypeMismatch> {
    match first_violation(spec, value) {
        None => Ok(()),
        Some(detail) => Err(TypeMismatch {
            expected: spec.clone(),
            actual: match detail {
                Violation::Value => value.describe_type(),
                Violation::Element { index, actual } => {
                    format!("{} (element {index} is {actual})", value.describe_type())
                }
            },
        }),
    }
}

/// Returns true if `value` satisfies `spec`.
pub fn matches(spec: &TypeSpec, value: &Value) -> bool {
    first_violation(spec, value).is_none()
}

enum Violation {
    Value,
    Element { index: usize, actual: String },
}

fn first_violation(spec: &TypeSpec, value: &Value) -> Option<Violation> {
    if value.is_null() {
        return if spec.accepts_null() { None } else { Some(Violation::Value) };
    }
    let ok = match &spec.kind {
        TypeKind::Scalar(kind) => scalar_matches(*kind, value),
        TypeKind::Named(name) => matches!(value, Value::Object(obj) if obj.is_instance_of(name)),
        TypeKind::ArrayOf(element) => {
            let Value::Array(items) = value else {
                return Some(Violation::Value);
            };
            return items
                .iter()
                .position(|item| !matches(element, item))
                .map(|index| Violation::Element {
                    index,
                    actual: items[index].describe_type(),
                });
        }
    };
    if ok {
        None
    } else {
        Some(Violation::Value)
    }
}

fn scalar_matches(kind: ScalarKind, value: &Value) -> bool {
    match kind {
        ScalarKind::Int => matches!(value, Value::Int(_)),
        ScalarKind::Float => matches!(value, Value::Float(_) | Value::Int(_)),
        ScalarKind::String => matches!(value, Value::String(_)),
        ScalarKind::Bool => matches!(value, Value::Bool(_)),
        ScalarKind::Array => matches!(value, Value::Array(_)),
        ScalarKind::Object => matches!(value, Value::Object(_)),
        ScalarKind::Mixed => true,
        // Null was handled by the caller.
        ScalarKind::Void => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbc_core::ObjectValue;

    fn scalar(kind: ScalarKind) -> TypeSpec {
        TypeSpec::scalar(kind)
    }

    #[test]
    fn scalars_match_their_kind() {
        assert!(check_value(&scalar(ScalarKind::String), &Value::from("x")).is_ok());
        assert!(check_value(&scalar(ScalarKind::Bool), &Value::Bool(false)).is_ok());
        let err = check_value(&scalar(ScalarKind::String), &Value::Int(5)).unwrap_err();
        assert_eq!(err.actual, "int");
        assert_eq!(err.to_string(), "expected string, got int");
    }

    #[test]
    fn float_accepts_int_but_not_the_reverse() {
        assert!(check_value(&scalar(ScalarKind::Float), &Value::Int(1)).is_ok());
        assert!(check_value(&scalar(ScalarKind::Int), &Value::Float(1.0)).is_err());
    }

    #[test]
    fn null_handling() {
        assert!(check_value(&scalar(ScalarKind::Int), &Value::Null).is_err());
        assert!(check_value(&scalar(ScalarKind::Int).or_null(), &Value::Null).is_ok());
        assert!(check_value(&scalar(ScalarKind::Mixed), &Value::Null).is_ok());
        assert!(check_value(&scalar(ScalarKind::Void), &Value::Null).is_ok());
        assert!(check_value(&scalar(ScalarKind::Void), &Value::Int(0)).is_err());
    }

    #[test]
    fn named_types_match_class_or_interface() {
        let logger = Value::Object(ObjectValue::new("FileLogger").implementing("Logger"));
        assert!(check_value(&TypeSpec::named("Logger"), &logger).is_ok());
        assert!(check_value(&TypeSpec::named("FileLogger"), &logger).is_ok());
        let err = check_value(&TypeSpec::named("Writer"), &logger).unwrap_err();
        assert_eq!(err.actual, "object(FileLogger)");
        assert!(check_value(&TypeSpec::named("Logger"), &Value::from("Logger")).is_err());
    }

    #[test]
    fn typed_arrays_check_every_element() {
        let strings = TypeSpec::array_of(scalar(ScalarKind::String));
        assert!(check_value(&strings, &Value::Array(vec![])).is_ok());
        assert!(check_value(&strings, &Value::Array(vec!["a".into(), "b".into()])).is_ok());

        let err = check_value(&strings, &Value::Array(vec!["a".into(), Value::Int(2)])).unwrap_err();
        assert_eq!(err.actual, "array<mixed> (element 1 is int)");
        assert!(check_value(&strings, &Value::from("a")).is_err());
    }

    #[test]
    fn nested_arrays() {
        let grid = TypeSpec::array_of(TypeSpec::array_of(scalar(ScalarKind::Int)));
        let ok = Value::Array(vec![Value::Array(vec![Value::Int(1)]), Value::Array(vec![])]);
        assert!(matches(&grid, &ok));
        let bad = Value::Array(vec![Value::Array(vec![Value::from("x")])]);
        assert!(!matches(&grid, &bad));
    }
}
