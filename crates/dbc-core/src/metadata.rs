//! Raw structure metadata handed over by the host loader.
//!
//! Metadata is the input side of the pipeline: method signatures and the
//! docblock text attached to methods, properties and the structure itself.
//! Nothing here is interpreted yet; the constraint parser turns it into a
//! [`ContractDescriptor`](crate::descriptor::ContractDescriptor).

use serde::{Deserialize, Serialize};

use crate::id::StructureId;

/// Visibility of a method or property.
///
/// Only public members are intercepted by enforced structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

/// A structure definition as declared in source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureMetadata {
    pub id: StructureId,
    /// Source file the definition came from, for diagnostics.
    #[serde(default)]
    pub file: Option<String>,
    /// Docblock attached to the structure (carries `@Invariant`s).
    #[serde(default)]
    pub docblock: String,
    /// Line on which the structure docblock starts.
    #[serde(default = "default_line")]
    pub line: u32,
    #[serde(default)]
    pub methods: Vec<MethodMetadata>,
    #[serde(default)]
    pub properties: Vec<PropertyMetadata>,
}

/// A method signature plus its docblock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodMetadata {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    /// Parameter names in declaration order, without a `$` sigil.
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub docblock: String,
    #[serde(default = "default_line")]
    pub line: u32,
}

/// A property declaration plus its docblock (carries `@var`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyMetadata {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub docblock: String,
    #[serde(default = "default_line")]
    pub line: u32,
}

fn default_line() -> u32 {
    1
}

impl StructureMetadata {
    pub fn new(id: impl Into<StructureId>) -> Self {
        StructureMetadata {
            id: id.into(),
            file: None,
            docblock: String::new(),
            line: 1,
            methods: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_docblock(mut self, docblock: impl Into<String>) -> Self {
        self.docblock = docblock.into();
        self
    }

    pub fn with_method(mut self, method: MethodMetadata) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_property(mut self, property: PropertyMetadata) -> Self {
        self.properties.push(property);
        self
    }

    pub fn method(&self, name: &str) -> Option<&MethodMetadata> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyMetadata> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Names of public properties in declaration order.
    pub fn public_properties(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .filter(|p| p.visibility == Visibility::Public)
            .map(|p| p.name.as_str())
    }
}

impl MethodMetadata {
    pub fn public<I, S>(name: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MethodMetadata {
            name: name.into(),
            visibility: Visibility::Public,
            parameters: parameters.into_iter().map(Into::into).collect(),
            docblock: String::new(),
            line: 1,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_docblock(mut self, docblock: impl Into<String>) -> Self {
        self.docblock = docblock.into();
        self
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }
}

impl PropertyMetadata {
    pub fn public(name: impl Into<String>) -> Self {
        PropertyMetadata {
            name: name.into(),
            visibility: Visibility::Public,
            docblock: String::new(),
            line: 1,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_docblock(mut self, docblock: impl Into<String>) -> Self {
        self.docblock = docblock.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_with_defaults() {
        let json = r#"{
            "id": "Counter",
            "methods": [{ "name": "increment", "parameters": ["by"] }],
            "properties": [{ "name": "count", "visibility": "private" }]
        }"#;
        let meta: StructureMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.id, StructureId::from("Counter"));
        assert_eq!(meta.line, 1);
        assert!(meta.docblock.is_empty());
        let method = meta.method("increment").unwrap();
        assert_eq!(method.visibility, Visibility::Public);
        assert_eq!(method.parameters, vec!["by".to_string()]);
        assert_eq!(meta.public_properties().count(), 0);
    }

    #[test]
    fn builder_preserves_declaration_order() {
        let meta = StructureMetadata::new("Point")
            .with_property(PropertyMetadata::public("y"))
            .with_property(PropertyMetadata::public("x"))
            .with_property(PropertyMetadata::public("secret").with_visibility(Visibility::Private));
        let names: Vec<&str> = meta.public_properties().collect();
        assert_eq!(names, vec!["y", "x"]);
    }
}
