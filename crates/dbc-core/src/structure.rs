//! The capability surface shared by original and enforced structures.
//!
//! A host exposes each instance as a [`Structure`]: method calls, property
//! reads and writes, and read-only predicate queries. State lives behind
//! these accessors, so the same wrapper that intercepts method calls can
//! also intercept property access. An enforced structure implements the
//! same trait and owns the original instance.
//!
//! Predicates take `&self`. Constraint evaluation only ever holds shared
//! references, which is what keeps contract expressions from mutating the
//! instance they check.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::InvocationError;
use crate::metadata::StructureMetadata;
use crate::value::Value;

/// A live instance of a structure.
pub trait Structure: Send {
    /// Invokes a method by name.
    fn call(&mut self, method: &str, args: Vec<Value>) -> Result<Value, InvocationError>;

    /// Reads a property.
    fn get(&self, property: &str) -> Result<Value, InvocationError>;

    /// Writes a property.
    fn set(&mut self, property: &str, value: Value) -> Result<(), InvocationError>;

    /// Invokes a side-effect-free predicate, e.g. `stringExists(s)`.
    fn query(&self, predicate: &str, args: &[Value]) -> Result<Value, InvocationError> {
        let _ = args;
        Err(InvocationError::UnknownPredicate {
            predicate: predicate.to_string(),
        })
    }

    /// Captures the pre-call state used as `priorState` by postconditions.
    ///
    /// `members` lists every member an `@Ensures` expression reads through
    /// `priorState`, and `predicates` every predicate it calls on it. The
    /// default copies exactly the members into a [`MemberSnapshot`], which
    /// cannot answer predicates, so it refuses a non-empty `predicates`.
    /// Structures whose postconditions call `priorState.<predicate>(..)`
    /// override this to return a full copy.
    fn snapshot(&self, members: &[String], predicates: &[String]) -> Result<Box<dyn Structure>, InvocationError> {
        if !predicates.is_empty() {
            return Err(InvocationError::SnapshotUnsupported {
                predicates: predicates.to_vec(),
            });
        }
        let mut captured = IndexMap::new();
        for member in members {
            captured.insert(member.clone(), self.get(member)?);
        }
        Ok(Box::new(MemberSnapshot::new(captured)))
    }

    /// True for enforced wrappers. Weaving an enforced instance again is a
    /// no-op.
    fn is_enforced(&self) -> bool {
        false
    }
}

/// Read-only copy of selected members, taken before a method body runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberSnapshot {
    members: IndexMap<String, Value>,
}

impl MemberSnapshot {
    pub fn new(members: IndexMap<String, Value>) -> Self {
        MemberSnapshot { members }
    }

    pub fn members(&self) -> &IndexMap<String, Value> {
        &self.members
    }
}

impl Structure for MemberSnapshot {
    fn call(&mut self, method: &str, _args: Vec<Value>) -> Result<Value, InvocationError> {
        Err(InvocationError::ReadOnly {
            member: method.to_string(),
        })
    }

    fn get(&self, property: &str) -> Result<Value, InvocationError> {
        self.members
            .get(property)
            .cloned()
            .ok_or_else(|| InvocationError::UnknownMember {
                member: property.to_string(),
            })
    }

    fn set(&mut self, property: &str, _value: Value) -> Result<(), InvocationError> {
        Err(InvocationError::ReadOnly {
            member: property.to_string(),
        })
    }

    fn snapshot(&self, _members: &[String], predicates: &[String]) -> Result<Box<dyn Structure>, InvocationError> {
        if !predicates.is_empty() {
            return Err(InvocationError::SnapshotUnsupported {
                predicates: predicates.to_vec(),
            });
        }
        Ok(Box::new(self.clone()))
    }
}

/// Builds a fresh instance from constructor arguments.
pub type Constructor =
    Arc<dyn Fn(Vec<Value>) -> Result<Box<dyn Structure>, InvocationError> + Send + Sync>;

/// A loadable structure definition: its metadata plus how to construct it.
///
/// This is what the host loader hands to the engine, and what it gets back
/// unchanged when enforcement is disabled for the structure's directory.
#[derive(Clone)]
pub struct StructureClass {
    metadata: Arc<StructureMetadata>,
    constructor: Constructor,
}

impl StructureClass {
    pub fn new<F>(metadata: StructureMetadata, constructor: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Box<dyn Structure>, InvocationError> + Send + Sync + 'static,
    {
        StructureClass {
            metadata: Arc::new(metadata),
            constructor: Arc::new(constructor),
        }
    }

    pub fn metadata(&self) -> &StructureMetadata {
        &self.metadata
    }

    /// Runs the original constructor.
    pub fn construct(&self, args: Vec<Value>) -> Result<Box<dyn Structure>, InvocationError> {
        (self.constructor)(args)
    }
}

impl fmt::Debug for StructureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructureClass")
            .field("id", &self.metadata.id)
            .finish_non_exhaustive()
    }
}
