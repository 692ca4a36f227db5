//! End-to-end enforcement through the engine.

mod common;

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dbc_core::{
    BreachDetail, BreachKind, ContractError, DirectoryRule, EnforcementConfig, EnforcementLevel,
    EvaluationFailure, InvocationError, MethodMetadata, Reaction, Structure, StructureClass,
    StructureMetadata, TypeTarget, Value,
};
use dbc_weave::{wrap_instance, ContractEngine, LoadedClass, MemorySink, Reactor, WeaveError};

use common::{class, class_with, metadata_with_add_ensures, s};

fn raising() -> ContractEngine {
    ContractEngine::new(EnforcementConfig::default())
}

fn logging() -> (ContractEngine, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let engine = ContractEngine::new(EnforcementConfig::default().with_reaction(Reaction::Logging))
        .with_sink(sink.clone());
    (engine, sink)
}

fn src() -> &'static Path {
    Path::new("src")
}

fn contract_error(err: InvocationError) -> ContractError {
    match err {
        InvocationError::Contract(err) => err,
        other => panic!("expected a contract error, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Method checkpoints
// ---------------------------------------------------------------------------

#[test]
fn satisfied_contracts_are_transparent() {
    let (class, _) = class();
    let loaded = raising().load(class, src()).unwrap();
    assert!(loaded.is_enforced());

    let mut storage = loaded.construct(vec![]).unwrap();
    assert!(storage.is_enforced());
    assert_eq!(storage.call("addString", vec![s("a")]).unwrap(), Value::Int(1));
    assert_eq!(storage.call("addString", vec![s("b")]).unwrap(), Value::Int(2));
    assert_eq!(storage.call("remove", vec![s("a")]).unwrap(), Value::Null);
    assert_eq!(storage.call("size", vec![]).unwrap(), Value::Int(1));
}

#[test]
fn parameter_type_breach_stops_before_body() {
    let (class, body_calls) = class();
    let mut storage = raising().load(class, src()).unwrap().construct(vec![]).unwrap();

    let err = contract_error(storage.call("addString", vec![Value::Int(5)]).unwrap_err());
    let ContractError::TypeContractViolation(record) = err else {
        panic!("expected type contract violation, got {err:?}");
    };
    assert_eq!(record.method.as_deref(), Some("addString"));
    assert_eq!(
        record.detail,
        BreachDetail::TypeMismatch {
            target: TypeTarget::Parameter {
                name: "s".into(),
                position: 0
            },
            expected: dbc_core::TypeSpec::scalar(dbc_core::ScalarKind::String),
            actual: "int".into(),
        }
    );
    assert_eq!(body_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn precondition_breach_stops_before_body() {
    let (class, body_calls) = class();
    let mut storage = raising().load(class, src()).unwrap().construct(vec![]).unwrap();

    let err = storage.call("remove", vec![s("missing")]).unwrap_err();
    let record = err.breach().unwrap();
    assert_eq!(record.kind, BreachKind::Precondition);
    insta::assert_snapshot!(
        record.message(),
        @"Precondition breached in StringStorage::remove: `stringExists(s)` declared at StringStorage::remove (src/StringStorage.php:25)"
    );
    assert_eq!(body_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn invariant_breach_after_body() {
    let (class, body_calls) = class();
    let mut storage = raising().load(class, src()).unwrap().construct(vec![]).unwrap();

    let err = contract_error(storage.call("addUnchecked", vec![Value::Int(3)]).unwrap_err());
    assert!(matches!(err, ContractError::InvariantViolation(_)));
    assert_eq!(err.record().unwrap().method.as_deref(), Some("addUnchecked"));
    // The body ran; the breach was detected on the way out.
    assert_eq!(body_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn prior_state_is_taken_before_the_body() {
    // Holds only if `priorState` still has the pre-call length.
    let (class, _) = class_with(metadata_with_add_ensures("size() == count(priorState.strings) + 1"));
    let mut storage = raising().load(class, src()).unwrap().construct(vec![]).unwrap();
    assert_eq!(storage.call("addString", vec![s("a")]).unwrap(), Value::Int(1));

    // Holds only if `priorState` were taken after the body.
    let (class, _) = class_with(metadata_with_add_ensures("size() == count(priorState.strings)"));
    let mut storage = raising().load(class, src()).unwrap().construct(vec![]).unwrap();
    let err = contract_error(storage.call("addString", vec![s("a")]).unwrap_err());
    let ContractError::PostconditionViolation(record) = err else {
        panic!("expected postcondition violation, got {err:?}");
    };
    let BreachDetail::Expression { expression, .. } = &record.detail else {
        panic!("expected expression detail");
    };
    assert_eq!(expression, "size() == count(priorState.strings)");
    assert_eq!(record.scope_summary.get("result").map(String::as_str), Some("1"));
}

#[test]
fn return_type_is_checked() {
    let (class, _) = class();
    let mut storage = raising().load(class, src()).unwrap().construct(vec![]).unwrap();
    let err = storage.call("brokenReturn", vec![]).unwrap_err();
    let record = err.breach().unwrap();
    assert_eq!(record.kind, BreachKind::TypeContract);
    assert!(matches!(
        &record.detail,
        BreachDetail::TypeMismatch { target: TypeTarget::ReturnValue, actual, .. } if actual == "string"
    ));
}

#[test]
fn return_type_breach_summary_names_the_arguments() {
    let (class, _) = class();
    let mut storage = raising().load(class, src()).unwrap().construct(vec![]).unwrap();
    let err = storage.call("echo", vec![s("x")]).unwrap_err();
    let record = err.breach().unwrap();
    assert_eq!(record.kind, BreachKind::TypeContract);
    assert!(record.scope_summary.contains_key("s"), "{:?}", record.scope_summary);
    assert!(record.scope_summary.contains_key("result"));
}

#[test]
fn prior_state_predicates_use_a_full_snapshot() {
    let (class, _) = class_with(metadata_with_add_ensures("!priorState.stringExists(s)"));
    let mut storage = raising().load(class, src()).unwrap().construct(vec![]).unwrap();
    assert_eq!(storage.call("addString", vec![s("a")]).unwrap(), Value::Int(1));

    // "a" was already stored before the second call.
    let err = contract_error(storage.call("addString", vec![s("a")]).unwrap_err());
    let ContractError::PostconditionViolation(record) = err else {
        panic!("expected postcondition violation, got {err:?}");
    };
    assert!(matches!(
        &record.detail,
        BreachDetail::Expression { expression, .. } if expression == "!priorState.stringExists(s)"
    ));
}

/// A counter that keeps the default member-only snapshot.
struct Tally {
    count: i64,
}

impl Structure for Tally {
    fn call(&mut self, method: &str, _args: Vec<Value>) -> Result<Value, InvocationError> {
        match method {
            "bump" => {
                self.count += 1;
                Ok(Value::Int(self.count))
            }
            other => Err(InvocationError::UnknownMethod { method: other.into() }),
        }
    }

    fn get(&self, property: &str) -> Result<Value, InvocationError> {
        match property {
            "count" => Ok(Value::Int(self.count)),
            other => Err(InvocationError::UnknownMember { member: other.into() }),
        }
    }

    fn set(&mut self, property: &str, _value: Value) -> Result<(), InvocationError> {
        Err(InvocationError::ReadOnly { member: property.into() })
    }

    fn query(&self, predicate: &str, _args: &[Value]) -> Result<Value, InvocationError> {
        match predicate {
            "isEmpty" => Ok(Value::Bool(self.count == 0)),
            other => Err(InvocationError::UnknownPredicate { predicate: other.into() }),
        }
    }
}

fn tally_class(ensures: &str) -> StructureClass {
    let meta = StructureMetadata::new("Tally").with_method(
        MethodMetadata::public("bump", Vec::<String>::new())
            .with_docblock(format!("/** @Ensures(\"{ensures}\") */")),
    );
    StructureClass::new(meta, |_| Ok(Box::new(Tally { count: 0 }) as Box<dyn Structure>))
}

#[test]
fn member_snapshots_refuse_prior_state_predicates() {
    let (engine, sink) = logging();

    let mut tally = engine
        .load(tally_class("count == priorState.count + 1"), src())
        .unwrap()
        .construct(vec![])
        .unwrap();
    assert_eq!(tally.call("bump", vec![]).unwrap(), Value::Int(1));

    let mut tally = engine
        .load(tally_class("priorState.isEmpty() || count > 1"), src())
        .unwrap()
        .construct(vec![])
        .unwrap();
    let err = tally.call("bump", vec![]).unwrap_err();
    assert_eq!(
        err,
        InvocationError::SnapshotUnsupported {
            predicates: vec!["isEmpty".into()]
        }
    );
    // Refused before the body ran, and never logged as a breach.
    assert_eq!(tally.get("count").unwrap(), Value::Int(0));
    assert!(sink.is_empty());
}

#[test]
fn non_public_methods_pass_through() {
    let (class, body_calls) = class();
    let mut storage = raising().load(class, src()).unwrap().construct(vec![]).unwrap();
    assert_eq!(storage.call("compact", vec![]).unwrap(), Value::Null);
    assert_eq!(body_calls.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Construction and property access
// ---------------------------------------------------------------------------

#[test]
fn invariant_checked_after_construction() {
    let (class, _) = class();
    let loaded = raising().load(class, src()).unwrap();
    let err = loaded.construct(vec![s("ok"), Value::Int(1)]).err().unwrap();
    let record = err.breach().unwrap();
    assert_eq!(record.kind, BreachKind::Invariant);
    assert_eq!(record.method, None);
}

#[test]
fn property_write_checks_var_type() {
    let (class, _) = class();
    let mut storage = raising().load(class, src()).unwrap().construct(vec![]).unwrap();

    let err = storage.set("label", Value::Int(3)).unwrap_err();
    let record = err.breach().unwrap();
    assert_eq!(record.method.as_deref(), Some("set label"));
    assert!(matches!(
        &record.detail,
        BreachDetail::TypeMismatch { target: TypeTarget::Property { name }, .. } if name == "label"
    ));
    assert_eq!(storage.get("label").unwrap(), s("default"));

    storage.set("label", s("inbox")).unwrap();
    assert_eq!(storage.get("label").unwrap(), s("inbox"));
}

#[test]
fn property_read_checks_invariants() {
    let (engine, sink) = logging();
    let (class, _) = class();
    let mut storage = engine.load(class, src()).unwrap().construct(vec![]).unwrap();

    // Logged, so the instance is left broken.
    storage.call("addUnchecked", vec![Value::Int(1)]).unwrap();
    sink.clear();

    storage.get("label").unwrap();
    let kinds: Vec<_> = sink.records().iter().map(|r| (r.kind, r.method.clone())).collect();
    assert_eq!(
        kinds,
        vec![
            (BreachKind::Invariant, Some("get label".to_string())),
            (BreachKind::Invariant, Some("get label".to_string())),
        ]
    );
}

// ---------------------------------------------------------------------------
// Reaction modes
// ---------------------------------------------------------------------------

#[test]
fn logging_records_and_continues() {
    let (engine, sink) = logging();
    let (class, body_calls) = class();
    let mut storage = engine.load(class, src()).unwrap().construct(vec![]).unwrap();

    assert_eq!(storage.call("remove", vec![s("missing")]).unwrap(), Value::Null);
    assert_eq!(body_calls.load(Ordering::SeqCst), 1);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.kind, BreachKind::Precondition);
    assert_eq!(record.structure_id.as_str(), "StringStorage");
    assert_eq!(record.scope_summary.get("s").map(String::as_str), Some("\"missing\""));
    assert_eq!(
        record.scope_summary.get("this.label").map(String::as_str),
        Some("\"default\"")
    );
    assert!(!record.scope_summary.contains_key("this.strings"));
}

#[test]
fn logging_reports_each_failing_checkpoint_once() {
    let (engine, sink) = logging();
    let (class, _) = class();
    let mut storage = engine.load(class, src()).unwrap().construct(vec![]).unwrap();

    // Parameter type, then the invariant after the body. The postconditions
    // hold because the int was stored.
    storage.call("addString", vec![Value::Int(9)]).unwrap();
    let kinds: Vec<BreachKind> = sink.records().iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![BreachKind::TypeContract, BreachKind::Invariant]);
}

#[test]
fn evaluation_errors_are_raised_under_both_reactions() {
    let (class, _) = class();
    let mut storage = raising().load(class.clone(), src()).unwrap().construct(vec![]).unwrap();
    let err = contract_error(storage.call("brokenEnsure", vec![]).unwrap_err());
    assert!(matches!(err, ContractError::Evaluation(_)));

    let (engine, sink) = logging();
    let mut storage = engine.load(class, src()).unwrap().construct(vec![]).unwrap();
    let err = contract_error(storage.call("brokenEnsure", vec![]).unwrap_err());
    let ContractError::Evaluation(eval) = err else {
        panic!("expected evaluation error, got {err:?}");
    };
    assert_eq!(
        eval.failure,
        EvaluationFailure::UndefinedIdentifier {
            name: "undefinedThing".into()
        }
    );
    assert_eq!(eval.location.line, 38);
    assert!(sink.is_empty());
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[test]
fn preconditions_only_level() {
    let config = EnforcementConfig::default().with_level(EnforcementLevel::PRECONDITIONS);
    let (class, _) = class();
    let mut storage = ContractEngine::new(config).load(class, src()).unwrap().construct(vec![]).unwrap();

    // Invariants and postconditions are off.
    storage.call("addUnchecked", vec![Value::Int(1)]).unwrap();
    assert_eq!(storage.call("brokenEnsure", vec![]).unwrap(), Value::Null);
    // Type safety is independent of the level.
    assert!(storage.call("brokenReturn", vec![]).is_err());
    let err = storage.call("remove", vec![s("missing")]).unwrap_err();
    assert_eq!(err.breach().unwrap().kind, BreachKind::Precondition);
}

#[test]
fn type_safety_off_skips_type_contracts() {
    let config = EnforcementConfig::default().with_type_safety(false);
    let (class, _) = class();
    let mut storage = ContractEngine::new(config).load(class, src()).unwrap().construct(vec![]).unwrap();

    storage.call("brokenReturn", vec![]).unwrap();
    storage.set("label", Value::Int(1)).unwrap();
    // The int reaches the body; the invariant catches it.
    let err = storage.call("addString", vec![Value::Int(5)]).unwrap_err();
    assert_eq!(err.breach().unwrap().kind, BreachKind::Invariant);
}

#[test]
fn disabled_directory_loads_original() {
    let config = EnforcementConfig::default()
        .with_directory(DirectoryRule::new("vendor", false))
        .with_directory(DirectoryRule::new("vendor/acme", true));
    let engine = ContractEngine::new(config);

    let (class, _) = class();
    let loaded = engine.load(class.clone(), Path::new("vendor/lib")).unwrap();
    assert!(!loaded.is_enforced());
    let mut storage = loaded.construct(vec![Value::Int(1)]).unwrap();
    assert!(!storage.is_enforced());
    storage.call("remove", vec![s("missing")]).unwrap();

    assert!(engine.load(class, Path::new("vendor/acme/src")).unwrap().is_enforced());
}

// ---------------------------------------------------------------------------
// Idempotence and load-time errors
// ---------------------------------------------------------------------------

#[test]
fn weaving_twice_adds_no_second_layer() {
    let (engine, sink) = logging();
    let (class, _) = class();
    let once = engine.load(class, src()).unwrap();
    let twice = engine.load(once.clone(), src()).unwrap();
    assert!(matches!(twice, LoadedClass::Enforced(_)));

    let mut storage = twice.construct(vec![]).unwrap();
    storage.call("remove", vec![s("missing")]).unwrap();
    assert_eq!(sink.len(), 1);

    // Re-wrapping an enforced instance is a no-op.
    let plan = Arc::clone(once.plan().unwrap());
    let reactor = Reactor::new(Reaction::Logging, sink.clone());
    let mut rewrapped = wrap_instance(storage, plan, reactor);
    sink.clear();
    rewrapped.call("remove", vec![s("missing")]).unwrap();
    assert_eq!(sink.len(), 1);
}

#[test]
fn malformed_contract_fails_the_load() {
    let meta = StructureMetadata::new("Broken").with_method(
        MethodMetadata::public("run", ["n"]).with_docblock("/** @Requires(\"n >\") */"),
    );
    let (class, _) = class_with(meta);
    let err = raising().load(class, src()).unwrap_err();
    assert!(matches!(err, WeaveError::Malformed(_)));
}

#[test]
fn structure_without_contracts_behaves_like_original() {
    let meta = StructureMetadata::new("Plain").with_method(MethodMetadata::public("addString", ["s"]));
    let (class, body_calls) = class_with(meta);
    let loaded = raising().load(class, src()).unwrap();
    assert!(loaded.plan().unwrap().is_empty());

    let mut storage = loaded.construct(vec![Value::Int(1)]).unwrap();
    assert_eq!(storage.call("addString", vec![Value::Int(2)]).unwrap(), Value::Int(2));
    assert_eq!(body_calls.load(Ordering::SeqCst), 1);
}
