//! Data model for design-by-contract enforcement.
//!
//! Everything the parser, evaluator and weaver exchange lives here: runtime
//! [`Value`]s, [`TypeSpec`]s, the raw [`StructureMetadata`] a host hands in,
//! the immutable [`ContractDescriptor`] built from it, enforcement
//! configuration, the [`Structure`] capability trait that enforced wrappers
//! implement, breach records and the error taxonomy.

pub mod breach;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod id;
pub mod metadata;
pub mod structure;
pub mod types;
pub mod value;

// Re-export commonly used types
pub use breach::{BreachDetail, BreachKind, BreachRecord, TypeTarget};
pub use config::{
    DirectoryRule, EnforcementConfig, EnforcementLevel, Environment, Reaction, ResolvedPolicy,
};
pub use descriptor::{
    Constraint, ConstraintScope, ContractDescriptor, ContractKind, MethodContract,
    PropertyContract, SourceLocation,
};
pub use error::{
    ConfigError, ConstraintEvaluationError, ContractError, EvaluationFailure, InvocationError,
    MalformedContractError,
};
pub use id::StructureId;
pub use metadata::{MethodMetadata, PropertyMetadata, StructureMetadata, Visibility};
pub use structure::{Constructor, MemberSnapshot, Structure, StructureClass};
pub use types::{ScalarKind, TypeKind, TypeSpec};
pub use value::{ObjectValue, Value};
