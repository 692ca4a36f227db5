//! Loaded structure definitions, original or enforced.

use std::fmt;
use std::sync::Arc;

use dbc_core::{InvocationError, Structure, StructureClass, StructureMetadata, Value};

use crate::enforced::EnforcedStructure;
use crate::plan::WovenPlan;
use crate::reaction::Reactor;

/// A structure class with a woven plan attached.
///
/// Constructing through it runs the original constructor, wraps the
/// instance, and checks invariants once before handing it out.
#[derive(Clone)]
pub struct EnforcedClass {
    original: StructureClass,
    plan: Arc<WovenPlan>,
    reactor: Reactor,
}

impl EnforcedClass {
    pub fn new(original: StructureClass, plan: Arc<WovenPlan>, reactor: Reactor) -> Self {
        EnforcedClass {
            original,
            plan,
            reactor,
        }
    }

    pub fn plan(&self) -> &Arc<WovenPlan> {
        &self.plan
    }

    pub fn original(&self) -> &StructureClass {
        &self.original
    }

    pub fn construct(&self, args: Vec<Value>) -> Result<Box<dyn Structure>, InvocationError> {
        let instance = self.original.construct(args)?;
        let enforced = EnforcedStructure::new(instance, Arc::clone(&self.plan), self.reactor.clone());
        enforced.check_invariants(None)?;
        Ok(Box::new(enforced))
    }
}

impl fmt::Debug for EnforcedClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnforcedClass")
            .field("id", &self.original.metadata().id)
            .field("key", &self.plan.key)
            .finish_non_exhaustive()
    }
}

/// What the engine hands back to the host loader.
#[derive(Debug, Clone)]
pub enum LoadedClass {
    /// Enforcement is off for this structure's directory.
    Original(StructureClass),
    Enforced(EnforcedClass),
}

impl LoadedClass {
    pub fn construct(&self, args: Vec<Value>) -> Result<Box<dyn Structure>, InvocationError> {
        match self {
            LoadedClass::Original(class) => class.construct(args),
            LoadedClass::Enforced(class) => class.construct(args),
        }
    }

    pub fn metadata(&self) -> &StructureMetadata {
        self.original().metadata()
    }

    pub fn is_enforced(&self) -> bool {
        matches!(self, LoadedClass::Enforced(_))
    }

    pub fn original(&self) -> &StructureClass {
        match self {
            LoadedClass::Original(class) => class,
            LoadedClass::Enforced(class) => class.original(),
        }
    }

    /// Strips any attached plan.
    pub fn into_original(self) -> StructureClass {
        match self {
            LoadedClass::Original(class) => class,
            LoadedClass::Enforced(class) => class.original,
        }
    }

    pub fn plan(&self) -> Option<&Arc<WovenPlan>> {
        match self {
            LoadedClass::Original(_) => None,
            LoadedClass::Enforced(class) => Some(class.plan()),
        }
    }
}

impl From<StructureClass> for LoadedClass {
    fn from(class: StructureClass) -> Self {
        LoadedClass::Original(class)
    }
}

impl From<EnforcedClass> for LoadedClass {
    fn from(class: EnforcedClass) -> Self {
        LoadedClass::Enforced(class)
    }
}
