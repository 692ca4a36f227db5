//! Breach routing.
//!
//! Under [`Reaction::Raising`] a breach becomes a [`ContractError`] that
//! aborts the call. Under [`Reaction::Logging`] it is handed to a
//! [`BreachSink`] and execution continues as if the check had passed.

use std::sync::{Arc, Mutex, PoisonError};

use dbc_core::{BreachRecord, ContractError, Reaction};

/// Receives breach records under the logging reaction.
pub trait BreachSink: Send + Sync {
    fn record(&self, breach: &BreachRecord);
}

/// Emits each breach as a `tracing` warning under the `dbc::breach` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl BreachSink for TracingSink {
    fn record(&self, breach: &BreachRecord) {
        let scope = serde_json::to_string(&breach.scope_summary).unwrap_or_default();
        tracing::warn!(
            target: "dbc::breach",
            kind = %breach.kind,
            structure = %breach.structure_id,
            method = breach.method.as_deref().unwrap_or("<construct>"),
            detail = %breach.detail,
            scope = %scope,
            timestamp_ms = breach.timestamp_ms,
            "contract breached"
        );
    }
}

/// Keeps breach records in memory. Useful for tests and for hosts that
/// forward breaches in batches.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<BreachRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<BreachRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl BreachSink for MemorySink {
    fn record(&self, breach: &BreachRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(breach.clone());
    }
}

/// Applies a reaction mode to breaches.
#[derive(Clone)]
pub struct Reactor {
    reaction: Reaction,
    sink: Arc<dyn BreachSink>,
}

impl Reactor {
    pub fn new(reaction: Reaction, sink: Arc<dyn BreachSink>) -> Self {
        Reactor { reaction, sink }
    }

    pub fn reaction(&self) -> Reaction {
        self.reaction
    }

    /// Routes one breach. `Ok` means the call continues.
    pub fn react(&self, breach: BreachRecord) -> Result<(), ContractError> {
        match self.reaction {
            Reaction::Logging => {
                self.sink.record(&breach);
                Ok(())
            }
            Reaction::Raising => Err(ContractError::breach(breach)),
        }
    }
}

impl std::fmt::Debug for Reactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reactor")
            .field("reaction", &self.reaction)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbc_core::{BreachDetail, BreachKind, SourceLocation, StructureId};
    use indexmap::IndexMap;

    fn breach() -> BreachRecord {
        BreachRecord::new(
            BreachKind::Precondition,
            StructureId::from("Queue"),
            Some("push".into()),
            BreachDetail::Expression {
                expression: "item != null".into(),
                location: SourceLocation::member(StructureId::from("Queue"), "push", 3),
            },
            IndexMap::new(),
        )
    }

    #[test]
    fn raising_returns_typed_error() {
        let sink = Arc::new(MemorySink::new());
        let reactor = Reactor::new(Reaction::Raising, sink.clone());
        let err = reactor.react(breach()).unwrap_err();
        assert!(matches!(err, ContractError::PreconditionViolation(_)));
        assert!(sink.is_empty());
    }

    #[test]
    fn logging_records_and_continues() {
        let sink = Arc::new(MemorySink::new());
        let reactor = Reactor::new(Reaction::Logging, sink.clone());
        reactor.react(breach()).unwrap();
        reactor.react(breach()).unwrap();
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.records()[0].method.as_deref(), Some("push"));
        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn tracing_sink_does_not_panic_without_subscriber() {
        TracingSink.record(&breach());
    }
}
