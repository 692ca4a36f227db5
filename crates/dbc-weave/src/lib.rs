//! Contract weaving, policy resolution and the definition cache.
//!
//! A host loader hands each structure class to a [`ContractEngine`]. The
//! engine resolves the enforcement policy for the class's directory, parses
//! its contract descriptor, and attaches a [`WovenPlan`] so that every
//! instance checks types, preconditions, postconditions and invariants
//! around its public methods and property accessors.
//!
//! # Modules
//!
//! - [`policy`]: config plus directory to [`ResolvedPolicy`](dbc_core::ResolvedPolicy)
//! - [`plan`]: the serializable woven plan
//! - [`weaver`]: plan building and attachment
//! - [`enforced`]: the enforced instance wrapper
//! - [`class`]: original and enforced classes
//! - [`reaction`]: raising vs logging, breach sinks
//! - [`cache`]: the per-process definition cache with optional persistence
//! - [`engine`]: the entry point tying it together

pub mod cache;
pub mod class;
pub mod enforced;
pub mod engine;
pub mod error;
pub mod plan;
pub mod policy;
pub mod reaction;
pub mod weaver;

pub use cache::{CacheStats, DefinitionCache};
pub use class::{EnforcedClass, LoadedClass};
pub use enforced::EnforcedStructure;
pub use engine::{cache_key, ContractEngine};
pub use error::WeaveError;
pub use plan::{MethodPlan, PropertyPlan, WovenPlan};
pub use policy::resolve_policy;
pub use reaction::{BreachSink, MemorySink, Reactor, TracingSink};
pub use weaver::{build_plan, weave, wrap_instance};
