//! Identity newtype for structure definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fully qualified name of a structure (class or interface) definition.
///
/// Two structures with the same id are the same definition as far as the
/// engine is concerned; the definition cache keys on it together with
/// content fingerprints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructureId(pub String);

impl StructureId {
    pub fn new(name: impl Into<String>) -> Self {
        StructureId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StructureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StructureId {
    fn from(name: &str) -> Self {
        StructureId(name.to_string())
    }
}

impl From<String> for StructureId {
    fn from(name: String) -> Self {
        StructureId(name)
    }
}
