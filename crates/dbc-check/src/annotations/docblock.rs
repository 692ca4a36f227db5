//! Docblock scanning.
//!
//! Splits a docblock into tags. Decoration (`/**`, leading `*`, `*/`) is
//! stripped, namespace prefixes on tag names are dropped and names are
//! lowercased, so `@Contract\Ensures` and `@ensures` scan alike.

/// One `@tag` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Lowercased tag name without namespace prefix.
    pub name: String,
    /// Name as written, for diagnostics.
    pub raw_name: String,
    /// Everything after the tag name, trimmed.
    pub body: String,
    /// Zero-based line offset within the docblock.
    pub line_offset: u32,
}

/// Scans every tag in `docblock`, in order.
pub fn scan(docblock: &str) -> Vec<Tag> {
    let mut tags = Vec::new();
    for (offset, raw) in docblock.lines().enumerate() {
        let line = strip_decoration(raw);
        let Some(rest) = line.strip_prefix('@') else {
            continue;
        };
        let end = rest
            .find(|c: char| c.is_whitespace() || c == '(' || c == '"' || c == '\'')
            .unwrap_or(rest.len());
        let raw_name = &rest[..end];
        let name = raw_name.rsplit('\\').next().unwrap_or(raw_name);
        if name.is_empty() {
            continue;
        }
        tags.push(Tag {
            name: name.to_ascii_lowercase(),
            raw_name: raw_name.to_string(),
            body: rest[end..].trim().to_string(),
            line_offset: u32::try_from(offset).unwrap_or(u32::MAX),
        });
    }
    tags
}

fn strip_decoration(line: &str) -> &str {
    let mut line = line.trim();
    if let Some(rest) = line.strip_prefix("/**") {
        line = rest;
    }
    if let Some(rest) = line.strip_suffix("*/") {
        line = rest;
    }
    line = line.trim_start();
    if let Some(rest) = line.strip_prefix('*') {
        line = rest;
    }
    line.trim()
}

/// Extracts the quoted expression from an annotation body such as
/// `("count() > 0")` or `'x != null'`.
///
/// Returns `None` when the body carries no quoted string. `\"` and `\\`
/// are unescaped; any other backslash is kept, so namespaced names survive.
pub fn quoted_argument(body: &str) -> Option<String> {
    let body = body.trim_start();
    let body = body.strip_prefix('(').unwrap_or(body).trim_start();
    let mut chars = body.chars();
    let quote = chars.next().filter(|c| *c == '"' || *c == '\'')?;
    let mut out = String::new();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) if next == quote || next == '\\' => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => return None,
            },
            c if c == quote => return Some(out),
            c => out.push(c),
        }
    }
    None
}

/// Splits off the first whitespace-delimited word, treating `<...>` as
/// part of the word so `array<int, string>` stays whole.
pub fn first_word(body: &str) -> (&str, &str) {
    let body = body.trim_start();
    let mut depth = 0usize;
    for (i, c) in body.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => return (&body[..i], body[i..].trim_start()),
            _ => {}
        }
    }
    (body, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_tags_with_decoration_and_namespaces() {
        let doc = "/**\n * Adds a string.\n *\n * @param string $s\n * @Contract\\Ensures(\"this.stringExists(s)\")\n * @return int\n */";
        let tags = scan(doc);
        let names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["param", "ensures", "return"]);
        assert_eq!(tags[0].body, "string $s");
        assert_eq!(tags[0].line_offset, 3);
        assert_eq!(tags[1].raw_name, "Contract\\Ensures");
        assert_eq!(tags[1].body, "(\"this.stringExists(s)\")");
    }

    #[test]
    fn single_line_docblock() {
        let tags = scan("/** @var int */");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "var");
        assert_eq!(tags[0].body, "int");
    }

    #[test]
    fn quoted_argument_forms() {
        assert_eq!(quoted_argument("(\"a > 1\")").as_deref(), Some("a > 1"));
        assert_eq!(quoted_argument("'a != null'").as_deref(), Some("a != null"));
        assert_eq!(
            quoted_argument(r#"("name == \"x\"")"#).as_deref(),
            Some("name == \"x\"")
        );
        assert_eq!(
            quoted_argument(r#"("x instanceof \App\Foo")"#).as_deref(),
            Some(r"x instanceof \App\Foo")
        );
        assert_eq!(quoted_argument("(a > 1)"), None);
        assert_eq!(quoted_argument("(\"unterminated"), None);
        assert_eq!(quoted_argument("(\"\")").as_deref(), Some(""));
    }

    #[test]
    fn first_word_keeps_generics_together() {
        assert_eq!(first_word("array<int, string> $map rest"), ("array<int, string>", "$map rest"));
        assert_eq!(first_word("int"), ("int", ""));
    }
}
