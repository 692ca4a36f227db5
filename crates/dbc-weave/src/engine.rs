//! The contract engine: the one object a host loader talks to.
//!
//! [`ContractEngine::load`] takes a structure class and the directory it
//! was loaded from and returns either the original class (enforcement off
//! for that directory) or an enforced class. It ties together policy
//! resolution, descriptor parsing, fingerprinting, the definition cache and
//! the weaver.
//!
//! The engine is `Send + Sync`; share it behind an `Arc` across loader
//! threads.

use std::path::Path;
use std::sync::Arc;

use dbc_check::parse_descriptor;
use dbc_core::{ContractDescriptor, EnforcementConfig, ResolvedPolicy, StructureMetadata};
use dbc_storage::{fingerprint_definition, fingerprint_policy, ArtifactStore, CacheKey};

use crate::cache::{CacheStats, DefinitionCache};
use crate::class::LoadedClass;
use crate::error::WeaveError;
use crate::plan::WovenPlan;
use crate::policy::resolve_policy;
use crate::reaction::{BreachSink, Reactor, TracingSink};
use crate::weaver::{build_plan, weave};

pub struct ContractEngine {
    config: EnforcementConfig,
    cache: DefinitionCache,
    sink: Arc<dyn BreachSink>,
}

impl ContractEngine {
    /// An engine that logs breaches through `tracing` and caches in memory.
    pub fn new(config: EnforcementConfig) -> Self {
        ContractEngine {
            config,
            cache: DefinitionCache::new(),
            sink: Arc::new(TracingSink),
        }
    }

    /// Routes logged breaches to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: Arc<dyn BreachSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Persists woven plans through `store`. Replaces the cache, so call
    /// this before loading anything.
    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.cache = DefinitionCache::with_store(store);
        self
    }

    pub fn config(&self) -> &EnforcementConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache(&self) -> &DefinitionCache {
        &self.cache
    }

    pub fn resolve_policy(&self, directory: &Path) -> ResolvedPolicy {
        resolve_policy(&self.config, directory)
    }

    /// Loads a structure class from `directory`.
    ///
    /// Loading an already enforced class re-weaves its original, so the
    /// result never carries two layers of checks. Malformed contracts fail
    /// here, before any instance exists.
    pub fn load(&self, class: impl Into<LoadedClass>, directory: &Path) -> Result<LoadedClass, WeaveError> {
        let class: LoadedClass = class.into();
        let original = class.into_original();
        let policy = self.resolve_policy(directory);
        if !policy.enforced {
            tracing::debug!(
                structure = %original.metadata().id,
                directory = %directory.display(),
                "enforcement disabled for directory"
            );
            return Ok(LoadedClass::Original(original));
        }

        let metadata = original.metadata();
        let descriptor = parse_descriptor(metadata)?;
        let key = cache_key(metadata, &descriptor, &policy)?;
        let plan = self.cache.get_or_weave(self.config.environment, &key, || {
            tracing::debug!(%key, "weaving contracts");
            build_plan(metadata, &descriptor, policy, key.clone())
        })?;

        let reactor = Reactor::new(policy.reaction, Arc::clone(&self.sink));
        Ok(LoadedClass::Enforced(weave(original, plan, reactor)))
    }

    /// Builds the plan `load` would attach, without attaching it.
    pub fn plan_for(&self, metadata: &StructureMetadata, directory: &Path) -> Result<Arc<WovenPlan>, WeaveError> {
        let policy = self.resolve_policy(directory);
        let descriptor = parse_descriptor(metadata)?;
        let key = cache_key(metadata, &descriptor, &policy)?;
        let plan = self
            .cache
            .get_or_weave(self.config.environment, &key, || build_plan(metadata, &descriptor, policy, key.clone()))?;
        Ok(plan)
    }
}

/// The cache key for one structure under one policy.
pub fn cache_key(
    metadata: &StructureMetadata,
    descriptor: &ContractDescriptor,
    policy: &ResolvedPolicy,
) -> Result<CacheKey, WeaveError> {
    Ok(CacheKey {
        structure_id: metadata.id.clone(),
        definition: fingerprint_definition(metadata, descriptor)?,
        policy: fingerprint_policy(policy)?,
    })
}
