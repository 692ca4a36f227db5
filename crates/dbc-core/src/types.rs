//! Type contracts attached to parameters, return values and properties.
//!
//! A [`TypeSpec`] is one of three kinds: a scalar, a named structure or
//! interface, or a homogeneous "array of T". Nullability is a separate flag
//! rather than a kind of its own, so `?string` and `string` share a kind.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scalar type kinds recognised in type hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Int,
    Float,
    String,
    Bool,
    /// Any array, element types unconstrained.
    Array,
    /// Any object, class unconstrained.
    Object,
    /// Accepts every value, including null.
    Mixed,
    /// Accepts only null. Used for `void` returns.
    Void,
}

impl ScalarKind {
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::String => "string",
            ScalarKind::Bool => "bool",
            ScalarKind::Array => "array",
            ScalarKind::Object => "object",
            ScalarKind::Mixed => "mixed",
            ScalarKind::Void => "void",
        }
    }
}

/// The base kind of a type contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Scalar(ScalarKind),
    /// A named structure or interface.
    Named(String),
    /// Homogeneous array whose every element satisfies the inner spec.
    ArrayOf(Box<TypeSpec>),
}

/// A parsed type contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeSpec {
    pub kind: TypeKind,
    #[serde(default)]
    pub nullable: bool,
}

impl TypeSpec {
    pub fn scalar(kind: ScalarKind) -> Self {
        TypeSpec {
            kind: TypeKind::Scalar(kind),
            nullable: false,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        TypeSpec {
            kind: TypeKind::Named(name.into()),
            nullable: false,
        }
    }

    pub fn array_of(element: TypeSpec) -> Self {
        TypeSpec {
            kind: TypeKind::ArrayOf(Box::new(element)),
            nullable: false,
        }
    }

    /// Returns the same spec with null additionally accepted.
    pub fn or_null(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// True if null satisfies this spec.
    pub fn accepts_null(&self) -> bool {
        self.nullable
            || matches!(
                self.kind,
                TypeKind::Scalar(ScalarKind::Mixed) | TypeKind::Scalar(ScalarKind::Void)
            )
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let implicit_null = matches!(
            self.kind,
            TypeKind::Scalar(ScalarKind::Mixed) | TypeKind::Scalar(ScalarKind::Void)
        );
        if self.nullable && !implicit_null {
            write!(f, "?")?;
        }
        match &self.kind {
            TypeKind::Scalar(kind) => write!(f, "{}", kind.name()),
            TypeKind::Named(name) => write!(f, "{name}"),
            TypeKind::ArrayOf(element) if element.nullable => write!(f, "array<{element}>"),
            TypeKind::ArrayOf(element) => write!(f, "{element}[]"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_scalars_and_names() {
        assert_eq!(TypeSpec::scalar(ScalarKind::String).to_string(), "string");
        assert_eq!(TypeSpec::named("Account").to_string(), "Account");
        assert_eq!(TypeSpec::named("Account").or_null().to_string(), "?Account");
    }

    #[test]
    fn display_arrays() {
        let strings = TypeSpec::array_of(TypeSpec::scalar(ScalarKind::String));
        assert_eq!(strings.to_string(), "string[]");

        let nested = TypeSpec::array_of(strings.clone());
        assert_eq!(nested.to_string(), "string[][]");

        let nullable_elems = TypeSpec::array_of(TypeSpec::scalar(ScalarKind::Int).or_null());
        assert_eq!(nullable_elems.to_string(), "array<?int>");

        assert_eq!(strings.or_null().to_string(), "?string[]");
    }

    #[test]
    fn mixed_and_void_accept_null_without_flag() {
        assert!(TypeSpec::scalar(ScalarKind::Mixed).accepts_null());
        assert!(TypeSpec::scalar(ScalarKind::Void).accepts_null());
        assert!(!TypeSpec::scalar(ScalarKind::Int).accepts_null());
        assert!(TypeSpec::scalar(ScalarKind::Int).or_null().accepts_null());
        assert_eq!(TypeSpec::scalar(ScalarKind::Mixed).or_null().to_string(), "mixed");
    }

    #[test]
    fn serde_roundtrip_nested_spec() {
        let spec = TypeSpec::array_of(TypeSpec::named("Item").or_null()).or_null();
        let json = serde_json::to_string(&spec).unwrap();
        let back: TypeSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, back);
    }
}
