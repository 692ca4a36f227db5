//! Shared fixture: a string storage with contracts on every public member.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dbc_core::{
    InvocationError, MethodMetadata, PropertyMetadata, Structure, StructureClass, StructureMetadata,
    Value, Visibility,
};

pub const CLASS_DOC: &str = "/**\n * Holds strings only.\n *\n * @Invariant(\"onlyContainsStrings()\")\n */";

pub fn metadata() -> StructureMetadata {
    metadata_with_add_ensures("this.stringExists(s)")
}

/// Same structure, with a different first postcondition on `addString`.
pub fn metadata_with_add_ensures(ensures: &str) -> StructureMetadata {
    StructureMetadata::new("StringStorage")
        .in_file("src/StringStorage.php")
        .with_docblock(CLASS_DOC)
        .with_method(MethodMetadata::public("addString", ["s"]).at_line(12).with_docblock(format!(
            "/**\n * @param string $s\n * @return int\n * @Ensures(\"{ensures}\")\n * @Ensures(\"result == count(priorState.strings) + 1\")\n */"
        )))
        .with_method(MethodMetadata::public("addUnchecked", ["s"]).at_line(20))
        .with_method(MethodMetadata::public("remove", ["s"]).at_line(24).with_docblock(
            "/**\n * @Requires(\"stringExists(s)\")\n * @Ensures(\"!stringExists(s)\")\n */",
        ))
        .with_method(MethodMetadata::public("size", Vec::<String>::new()).at_line(30))
        .with_method(
            MethodMetadata::public("brokenReturn", Vec::<String>::new())
                .at_line(34)
                .with_docblock("/** @return int */"),
        )
        .with_method(
            MethodMetadata::public("brokenEnsure", Vec::<String>::new())
                .at_line(38)
                .with_docblock("/** @Ensures(\"undefinedThing > 0\") */"),
        )
        .with_method(
            MethodMetadata::public("echo", ["s"])
                .at_line(42)
                .with_docblock("/** @return int */"),
        )
        .with_method(
            MethodMetadata::public("compact", Vec::<String>::new())
                .with_visibility(Visibility::Private)
                .with_docblock("/** @Requires(\"false\") */"),
        )
        .with_property(PropertyMetadata::public("label").with_docblock("/** @var string */"))
        .with_property(PropertyMetadata::public("strings").with_visibility(Visibility::Private))
}

pub struct StringStorage {
    strings: Vec<Value>,
    label: Value,
    body_calls: Arc<AtomicUsize>,
}

impl Structure for StringStorage {
    fn call(&mut self, method: &str, args: Vec<Value>) -> Result<Value, InvocationError> {
        self.body_calls.fetch_add(1, Ordering::SeqCst);
        let first = args.into_iter().next().unwrap_or(Value::Null);
        match method {
            "addString" | "addUnchecked" => {
                self.strings.push(first);
                Ok(Value::Int(self.strings.len() as i64))
            }
            "remove" => {
                self.strings.retain(|s| *s != first);
                Ok(Value::Null)
            }
            "size" => Ok(Value::Int(self.strings.len() as i64)),
            "brokenReturn" => Ok(Value::String("seven".into())),
            "brokenEnsure" | "compact" => Ok(Value::Null),
            "echo" => Ok(first),
            other => Err(InvocationError::UnknownMethod { method: other.into() }),
        }
    }

    fn get(&self, property: &str) -> Result<Value, InvocationError> {
        match property {
            "strings" => Ok(Value::Array(self.strings.clone())),
            "label" => Ok(self.label.clone()),
            other => Err(InvocationError::UnknownMember { member: other.into() }),
        }
    }

    fn set(&mut self, property: &str, value: Value) -> Result<(), InvocationError> {
        match property {
            "label" => {
                self.label = value;
                Ok(())
            }
            other => Err(InvocationError::UnknownMember { member: other.into() }),
        }
    }

    fn query(&self, predicate: &str, args: &[Value]) -> Result<Value, InvocationError> {
        match predicate {
            "stringExists" => Ok(Value::Bool(
                args.first().is_some_and(|needle| self.strings.contains(needle)),
            )),
            "onlyContainsStrings" => Ok(Value::Bool(
                self.strings.iter().all(|s| matches!(s, Value::String(_))),
            )),
            "size" => Ok(Value::Int(self.strings.len() as i64)),
            other => Err(InvocationError::UnknownPredicate { predicate: other.into() }),
        }
    }

    /// A full copy, so `priorState` answers predicates as well as members.
    fn snapshot(&self, _members: &[String], _predicates: &[String]) -> Result<Box<dyn Structure>, InvocationError> {
        Ok(Box::new(StringStorage {
            strings: self.strings.clone(),
            label: self.label.clone(),
            body_calls: Arc::clone(&self.body_calls),
        }))
    }
}

/// The class plus a counter of how many times any method body ran.
pub fn class_with(metadata: StructureMetadata) -> (StructureClass, Arc<AtomicUsize>) {
    let body_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&body_calls);
    let class = StructureClass::new(metadata, move |args| {
        Ok(Box::new(StringStorage {
            strings: args,
            label: Value::String("default".into()),
            body_calls: Arc::clone(&counter),
        }) as Box<dyn Structure>)
    });
    (class, body_calls)
}

pub fn class() -> (StructureClass, Arc<AtomicUsize>) {
    class_with(metadata())
}

pub fn s(text: &str) -> Value {
    Value::String(text.into())
}
