//! Constraint parser: docblock annotations to [`ContractDescriptor`].
//!
//! Recognised tags, matched case-insensitively and with any namespace
//! prefix dropped:
//!
//! | Tag | Target | Meaning |
//! |---|---|---|
//! | `@Invariant("expr")` | structure | invariant |
//! | `@Requires("expr")`, `@Verify` | method | precondition |
//! | `@Ensures("expr")`, `@Ensure` | method | postcondition |
//! | `@param T $name` | method | parameter type contract |
//! | `@return T` | method | return type contract |
//! | `@var T` | property | property type contract |
//!
//! Unknown tags are ignored. Every expression is parsed here, so syntax
//! errors and misused synthetic variables (`result` in a precondition)
//! fail the load instead of the first call.

pub mod docblock;
pub mod type_hint;

use dbc_core::{
    Constraint, ConstraintScope, ContractDescriptor, ContractKind, MalformedContractError,
    MethodContract, MethodMetadata, PropertyContract, PropertyMetadata, SourceLocation,
    StructureMetadata,
};

use crate::expr::ast::{PRIOR_STATE, RESULT};
use crate::expr::parse_expression;
use docblock::{first_word, quoted_argument, scan, Tag};

pub use type_hint::parse_type_hint;

/// What a tag declares, once its name is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Contract(ContractKind),
    Param,
    Return,
    Var,
}

impl TagKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "invariant" => Some(TagKind::Contract(ContractKind::Invariant)),
            "requires" | "verify" => Some(TagKind::Contract(ContractKind::Precondition)),
            "ensures" | "ensure" => Some(TagKind::Contract(ContractKind::Postcondition)),
            "param" => Some(TagKind::Param),
            "return" => Some(TagKind::Return),
            "var" => Some(TagKind::Var),
            _ => None,
        }
    }
}

/// Builds the contract descriptor for one structure.
///
/// Methods and properties without any contract are left out of the
/// descriptor. A structure without annotations yields an empty descriptor.
pub fn parse_descriptor(metadata: &StructureMetadata) -> Result<ContractDescriptor, MalformedContractError> {
    let mut descriptor = ContractDescriptor::new(metadata.id.clone());

    for (kind, tag) in tags_of(&metadata.docblock) {
        let location = SourceLocation::structure(metadata.id.clone(), metadata.line.saturating_add(tag.line_offset))
            .in_file(metadata.file.clone());
        if kind != TagKind::Contract(ContractKind::Invariant) {
            return Err(misplaced(&tag, location));
        }
        let constraint =
            expression_constraint(&tag, ContractKind::Invariant, ConstraintScope::Structure, location, &[])?;
        descriptor.invariants.push(constraint);
    }

    for method in &metadata.methods {
        let contract = parse_method(metadata, method)?;
        if !contract.is_empty() {
            descriptor.methods.insert(method.name.clone(), contract);
        }
    }

    for property in &metadata.properties {
        let contract = parse_property(metadata, property)?;
        if contract.var_type.is_some() {
            descriptor.properties.insert(property.name.clone(), contract);
        }
    }

    Ok(descriptor)
}

fn tags_of(docblock: &str) -> impl Iterator<Item = (TagKind, Tag)> {
    scan(docblock)
        .into_iter()
        .filter_map(|tag| TagKind::from_name(&tag.name).map(|kind| (kind, tag)))
}

fn parse_method(
    metadata: &StructureMetadata,
    method: &MethodMetadata,
) -> Result<MethodContract, MalformedContractError> {
    let mut contract = MethodContract {
        parameter_types: vec![None; method.parameters.len()],
        ..MethodContract::default()
    };

    for (kind, tag) in tags_of(&method.docblock) {
        let location = SourceLocation::member(metadata.id.clone(), &method.name, method.line.saturating_add(tag.line_offset))
            .in_file(metadata.file.clone());
        match kind {
            TagKind::Contract(ContractKind::Invariant) | TagKind::Var => {
                return Err(misplaced(&tag, location));
            }
            TagKind::Contract(kind) => {
                let constraint =
                    expression_constraint(&tag, kind, ConstraintScope::Method, location, &method.parameters)?;
                match kind {
                    ContractKind::Precondition => contract.preconditions.push(constraint),
                    _ => contract.postconditions.push(constraint),
                }
            }
            TagKind::Param => {
                let (first, rest) = first_word(&tag.body);
                // `@param $name` carries no type; `@param T $name` does.
                let (type_text, name) = if first.starts_with('$') {
                    (None, first)
                } else {
                    (Some(first), first_word(rest).0)
                };
                let Some(name) = name.strip_prefix('$').filter(|n| !n.is_empty()) else {
                    return Err(MalformedContractError::InvalidTypeHint {
                        structure: metadata.id.clone(),
                        member: method.name.clone(),
                        text: tag.body.clone(),
                        reason: "@param needs a `$name`".to_string(),
                    });
                };
                let Some(position) = method.parameters.iter().position(|p| p == name) else {
                    return Err(MalformedContractError::UnknownParameter {
                        structure: metadata.id.clone(),
                        method: method.name.clone(),
                        parameter: name.to_string(),
                    });
                };
                if let Some(text) = type_text {
                    contract.parameter_types[position] = Some(type_spec(metadata, &method.name, text)?);
                }
            }
            TagKind::Return => {
                let (text, _) = first_word(&tag.body);
                contract.return_type = Some(type_spec(metadata, &method.name, text)?);
            }
        }
    }

    Ok(contract)
}

fn parse_property(
    metadata: &StructureMetadata,
    property: &PropertyMetadata,
) -> Result<PropertyContract, MalformedContractError> {
    let mut contract = PropertyContract::default();
    for (kind, tag) in tags_of(&property.docblock) {
        match kind {
            TagKind::Var => {
                let (text, _) = first_word(&tag.body);
                contract.var_type = Some(type_spec(metadata, &property.name, text)?);
            }
            _ => {
                let location =
                    SourceLocation::member(metadata.id.clone(), &property.name, property.line.saturating_add(tag.line_offset))
                        .in_file(metadata.file.clone());
                return Err(misplaced(&tag, location));
            }
        }
    }
    Ok(contract)
}

fn type_spec(
    metadata: &StructureMetadata,
    member: &str,
    text: &str,
) -> Result<dbc_core::TypeSpec, MalformedContractError> {
    parse_type_hint(text, &metadata.id).map_err(|reason| MalformedContractError::InvalidTypeHint {
        structure: metadata.id.clone(),
        member: member.to_string(),
        text: text.to_string(),
        reason,
    })
}

fn misplaced(tag: &Tag, location: SourceLocation) -> MalformedContractError {
    MalformedContractError::MisplacedAnnotation {
        annotation: tag.raw_name.clone(),
        location,
    }
}

/// Extracts, parses and scope-checks one expression annotation.
///
/// `parameters` may shadow a synthetic name: a precondition on a method
/// with a `$result` parameter can read it.
fn expression_constraint(
    tag: &Tag,
    kind: ContractKind,
    scope: ConstraintScope,
    location: SourceLocation,
    parameters: &[String],
) -> Result<Constraint, MalformedContractError> {
    let Some(expression) = quoted_argument(&tag.body) else {
        return Err(MalformedContractError::MissingExpression {
            annotation: kind.annotation(),
            location,
        });
    };
    if expression.trim().is_empty() {
        return Err(MalformedContractError::EmptyExpression {
            annotation: kind.annotation(),
            location,
        });
    }

    let expr = parse_expression(&expression).map_err(|err| MalformedContractError::Syntax {
        expression: expression.clone(),
        location: location.clone(),
        message: err.message,
        position: err.position,
    })?;

    if kind != ContractKind::Postcondition {
        for synthetic in [RESULT, PRIOR_STATE] {
            if expr.references(synthetic) && !parameters.iter().any(|p| p == synthetic) {
                return Err(MalformedContractError::InvalidScopeVariable {
                    variable: synthetic.to_string(),
                    kind,
                    location,
                });
            }
        }
    }

    Ok(Constraint::new(expression, scope, location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbc_core::{ScalarKind, TypeSpec};

    fn storage(doc: &str) -> StructureMetadata {
        StructureMetadata::new("Storage").with_method(MethodMetadata::public("add", ["item"]).with_docblock(doc))
    }

    #[test]
    fn aliases_map_to_canonical_kinds() {
        let meta = storage("/**\n * @Verify(\"item != null\")\n * @Ensure(\"result > 0\")\n */");
        let d = parse_descriptor(&meta).unwrap();
        let add = &d.methods["add"];
        assert_eq!(add.preconditions[0].expression, "item != null");
        assert_eq!(add.postconditions[0].expression, "result > 0");
        assert_eq!(add.preconditions[0].scope, ConstraintScope::Method);
    }

    #[test]
    fn untyped_param_leaves_slot_empty() {
        let meta = storage("/** @param $item the item */");
        let d = parse_descriptor(&meta).unwrap();
        assert!(d.methods.is_empty());
    }

    #[test]
    fn result_parameter_may_be_read_in_precondition() {
        let meta = StructureMetadata::new("Parser").with_method(
            MethodMetadata::public("feed", ["result"]).with_docblock("/** @Requires(\"result != null\") */"),
        );
        assert!(parse_descriptor(&meta).is_ok());
    }

    #[test]
    fn param_without_name_is_rejected() {
        let meta = storage("/** @param string */");
        assert!(matches!(
            parse_descriptor(&meta),
            Err(MalformedContractError::InvalidTypeHint { .. })
        ));
    }

    #[test]
    fn var_on_method_is_misplaced() {
        let meta = storage("/** @var int */");
        let err = parse_descriptor(&meta).unwrap_err();
        assert!(matches!(
            err,
            MalformedContractError::MisplacedAnnotation { ref annotation, .. } if annotation == "var"
        ));
    }

    #[test]
    fn return_type_ignores_description() {
        let meta = storage("/** @return ?int the new count */");
        let d = parse_descriptor(&meta).unwrap();
        assert_eq!(
            d.methods["add"].return_type,
            Some(TypeSpec::scalar(ScalarKind::Int).or_null())
        );
    }
}
