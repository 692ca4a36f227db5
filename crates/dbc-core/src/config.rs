//! Enforcement configuration consumed by the policy engine and weaver.
//!
//! The host resolves its configuration format into an [`EnforcementConfig`]
//! value; this crate only defines the shape and its defaults. The config is
//! immutable once built and shared read-only by everything that consults it.

use std::fmt;
use std::ops::BitOr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Whether woven definitions may be served from cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Cache hits skip weaving.
    Production,
    /// Every load weaves fresh.
    #[default]
    Development,
}

/// What happens when a contract is breached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    /// Emit a breach record and continue as if the check passed.
    Logging,
    /// Abort the call with a typed contract error.
    #[default]
    Raising,
}

/// Three independent bits selecting the active contract categories.
///
/// `1` is preconditions only, `2` postconditions, `4` invariants, `7` all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct EnforcementLevel(u8);

impl EnforcementLevel {
    pub const NONE: EnforcementLevel = EnforcementLevel(0);
    pub const PRECONDITIONS: EnforcementLevel = EnforcementLevel(0b001);
    pub const POSTCONDITIONS: EnforcementLevel = EnforcementLevel(0b010);
    pub const INVARIANTS: EnforcementLevel = EnforcementLevel(0b100);
    pub const ALL: EnforcementLevel = EnforcementLevel(0b111);

    /// Builds a level from raw bits, rejecting anything above `7`.
    pub fn from_bits(bits: u8) -> Result<Self, ConfigError> {
        if bits > Self::ALL.0 {
            return Err(ConfigError::InvalidLevel(bits));
        }
        Ok(EnforcementLevel(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    /// True if every bit of `other` is set in `self`.
    pub fn contains(self, other: EnforcementLevel) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for EnforcementLevel {
    fn default() -> Self {
        EnforcementLevel::ALL
    }
}

impl BitOr for EnforcementLevel {
    type Output = EnforcementLevel;

    fn bitor(self, rhs: Self) -> Self::Output {
        EnforcementLevel(self.0 | rhs.0)
    }
}

impl TryFrom<u8> for EnforcementLevel {
    type Error = ConfigError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        EnforcementLevel::from_bits(bits)
    }
}

impl From<EnforcementLevel> for u8 {
    fn from(level: EnforcementLevel) -> Self {
        level.0
    }
}

impl fmt::Display for EnforcementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03b}", self.0)
    }
}

/// A per-directory switch. The longest matching path prefix wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRule {
    pub path: PathBuf,
    pub enforced: bool,
}

impl DirectoryRule {
    pub fn new(path: impl Into<PathBuf>, enforced: bool) -> Self {
        DirectoryRule {
            path: path.into(),
            enforced,
        }
    }
}

/// Process-wide enforcement configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementConfig {
    pub environment: Environment,
    pub level: EnforcementLevel,
    pub type_safety: bool,
    pub reaction: Reaction,
    pub directories: Vec<DirectoryRule>,
}

impl Default for EnforcementConfig {
    fn default() -> Self {
        EnforcementConfig {
            environment: Environment::Development,
            level: EnforcementLevel::ALL,
            type_safety: true,
            reaction: Reaction::Raising,
            directories: Vec::new(),
        }
    }
}

impl EnforcementConfig {
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_level(mut self, level: EnforcementLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_type_safety(mut self, type_safety: bool) -> Self {
        self.type_safety = type_safety;
        self
    }

    pub fn with_reaction(mut self, reaction: Reaction) -> Self {
        self.reaction = reaction;
        self
    }

    pub fn with_directory(mut self, rule: DirectoryRule) -> Self {
        self.directories.push(rule);
        self
    }
}

/// The checks that apply to one structure after policy resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedPolicy {
    /// False when the directory is excluded; every other flag is then off.
    pub enforced: bool,
    pub preconditions: bool,
    pub postconditions: bool,
    pub invariants: bool,
    pub type_safety: bool,
    pub reaction: Reaction,
}

impl ResolvedPolicy {
    /// A policy with every check off.
    pub fn disabled(reaction: Reaction) -> Self {
        ResolvedPolicy {
            enforced: false,
            preconditions: false,
            postconditions: false,
            invariants: false,
            type_safety: false,
            reaction,
        }
    }

    /// True if at least one category of check is on.
    pub fn any_active(&self) -> bool {
        self.preconditions || self.postconditions || self.invariants || self.type_safety
    }
}
