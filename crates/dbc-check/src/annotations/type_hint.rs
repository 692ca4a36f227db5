//! Type-hint grammar for `@param`, `@return` and `@var`.

use dbc_core::{ScalarKind, StructureId, TypeSpec};

/// Parses a type hint. `self_id` is what `self` and `static` resolve to.
///
/// Errors carry a short reason; the caller attaches the location.
pub fn parse_type_hint(text: &str, self_id: &StructureId) -> Result<TypeSpec, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty type".to_string());
    }

    let parts = split_top_level(text, '|');
    match parts.as_slice() {
        [single] => parse_single(single, self_id),
        [a, b] if a.trim().eq_ignore_ascii_case("null") => Ok(parse_single(b, self_id)?.or_null()),
        [a, b] if b.trim().eq_ignore_ascii_case("null") => Ok(parse_single(a, self_id)?.or_null()),
        _ => Err("only `T|null` unions are supported".to_string()),
    }
}

fn parse_single(text: &str, self_id: &StructureId) -> Result<TypeSpec, String> {
    let text = text.trim();
    if let Some(inner) = text.strip_prefix('?') {
        return Ok(parse_single(inner, self_id)?.or_null());
    }
    if let Some(element) = text.strip_suffix("[]") {
        return Ok(TypeSpec::array_of(parse_single(element, self_id)?));
    }
    if let Some(inner) = generic_argument(text) {
        // `array<K, V>` constrains values only.
        let args = split_top_level(inner, ',');
        let element = match args.as_slice() {
            [value] | [_, value] => parse_type_hint(value, self_id)?,
            _ => return Err(format!("`{text}` takes one or two type arguments")),
        };
        return Ok(TypeSpec::array_of(element));
    }

    let scalar = match text.to_ascii_lowercase().as_str() {
        "int" | "integer" => Some(ScalarKind::Int),
        "float" | "double" => Some(ScalarKind::Float),
        "string" => Some(ScalarKind::String),
        "bool" | "boolean" => Some(ScalarKind::Bool),
        "array" => Some(ScalarKind::Array),
        "object" => Some(ScalarKind::Object),
        "mixed" => Some(ScalarKind::Mixed),
        "void" | "null" => Some(ScalarKind::Void),
        "self" | "static" => return Ok(TypeSpec::named(self_id.as_str())),
        "callable" | "iterable" | "resource" | "never" | "true" | "false" => {
            return Err(format!("`{text}` is not supported in type contracts"))
        }
        _ => None,
    };
    if let Some(kind) = scalar {
        return Ok(TypeSpec::scalar(kind));
    }

    let name = text.strip_prefix('\\').unwrap_or(text);
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name
            .split('\\')
            .all(|seg| !seg.is_empty() && seg.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    if valid {
        Ok(TypeSpec::named(name))
    } else {
        Err(format!("`{text}` is not a valid type name"))
    }
}

/// `array<...>` → the text between the brackets.
fn generic_argument(text: &str) -> Option<&str> {
    let head = text.get(..6)?;
    if !head.eq_ignore_ascii_case("array<") {
        return None;
    }
    text[6..].strip_suffix('>')
}

/// Splits on `sep` outside `<...>`.
fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}
