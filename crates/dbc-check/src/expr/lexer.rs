//! Tokenizer for constraint expressions.
//!
//! Accepts both the dotted form (`this.count`) and the docblock-friendly
//! form (`$this->count`): a leading `$` on identifiers is dropped and `->`
//! lexes as `.`. `===`/`!==` are accepted as `==`/`!=`.

use super::SyntaxError;

/// Maximum accepted expression size in bytes.
pub const MAX_EXPRESSION_BYTES: usize = 64 * 1024;

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eof,
}

impl Token {
    /// Short description used in "unexpected token" messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier `{name}`"),
            Token::Int(v) => format!("number `{v}`"),
            Token::Float(v) => format!("number `{v}`"),
            Token::Str(s) => format!("string {s:?}"),
            Token::True => "`true`".into(),
            Token::False => "`false`".into(),
            Token::Null => "`null`".into(),
            Token::And => "`&&`".into(),
            Token::Or => "`||`".into(),
            Token::Not => "`!`".into(),
            Token::EqEq => "`==`".into(),
            Token::NotEq => "`!=`".into(),
            Token::Lt => "`<`".into(),
            Token::Le => "`<=`".into(),
            Token::Gt => "`>`".into(),
            Token::Ge => "`>=`".into(),
            Token::Plus => "`+`".into(),
            Token::Minus => "`-`".into(),
            Token::Star => "`*`".into(),
            Token::Slash => "`/`".into(),
            Token::Percent => "`%`".into(),
            Token::Dot => "`.`".into(),
            Token::Comma => "`,`".into(),
            Token::LParen => "`(`".into(),
            Token::RParen => "`)`".into(),
            Token::LBracket => "`[`".into(),
            Token::RBracket => "`]`".into(),
            Token::Eof => "end of expression".into(),
        }
    }
}

/// Token paired with its byte offset.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub position: usize,
}

/// Lexer over a single expression.
pub struct Lexer<'a> {
    input: &'a str,
    offset: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, offset: 0 }
    }

    /// Lexes the whole input. The returned stream always ends with
    /// [`Token::Eof`].
    pub fn tokenize(mut self) -> Result<Vec<SpannedToken>, SyntaxError> {
        if self.input.len() > MAX_EXPRESSION_BYTES {
            return Err(SyntaxError::new(
                format!(
                    "expression exceeds size limit: {} bytes (max {MAX_EXPRESSION_BYTES})",
                    self.input.len()
                ),
                0,
            ));
        }

        let bytes = self.input.as_bytes();
        let mut tokens = Vec::new();

        while self.offset < bytes.len() {
            let start = self.offset;
            let ch = bytes[start];
            let token = match ch {
                b' ' | b'\t' | b'\n' | b'\r' => {
                    self.offset += 1;
                    continue;
                }
                b'(' => self.single(Token::LParen),
                b')' => self.single(Token::RParen),
                b'[' => self.single(Token::LBracket),
                b']' => self.single(Token::RBracket),
                b',' => self.single(Token::Comma),
                b'.' => self.single(Token::Dot),
                b'+' => self.single(Token::Plus),
                b'*' => self.single(Token::Star),
                b'/' => self.single(Token::Slash),
                b'%' => self.single(Token::Percent),
                b'-' => {
                    if self.peek(1) == Some(b'>') {
                        self.offset += 2;
                        Token::Dot
                    } else {
                        self.single(Token::Minus)
                    }
                }
                b'!' => {
                    if self.peek(1) == Some(b'=') {
                        let width = if self.peek(2) == Some(b'=') { 3 } else { 2 };
                        self.offset += width;
                        Token::NotEq
                    } else {
                        self.single(Token::Not)
                    }
                }
                b'=' => {
                    if self.peek(1) == Some(b'=') {
                        let width = if self.peek(2) == Some(b'=') { 3 } else { 2 };
                        self.offset += width;
                        Token::EqEq
                    } else {
                        return Err(SyntaxError::new(
                            "assignment is not allowed in constraints; use `==`",
                            start,
                        ));
                    }
                }
                b'<' => self.with_optional_eq(Token::Lt, Token::Le),
                b'>' => self.with_optional_eq(Token::Gt, Token::Ge),
                b'&' => self.doubled(b'&', Token::And)?,
                b'|' => self.doubled(b'|', Token::Or)?,
                b'"' | b'\'' => self.string(ch)?,
                b'0'..=b'9' => self.number()?,
                b'$' => {
                    self.offset += 1;
                    match self.peek(0) {
                        Some(b) if b.is_ascii_alphabetic() || b == b'_' => self.word(),
                        _ => return Err(SyntaxError::new("expected identifier after `$`", start)),
                    }
                }
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.word(),
                _ => {
                    let found = self.input[start..].chars().next().unwrap_or('?');
                    return Err(SyntaxError::new(format!("unexpected character `{found}`"), start));
                }
            };
            tokens.push(SpannedToken { token, position: start });
        }

        tokens.push(SpannedToken {
            token: Token::Eof,
            position: self.offset,
        });
        Ok(tokens)
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.input.as_bytes().get(self.offset + ahead).copied()
    }

    fn single(&mut self, token: Token) -> Token {
        self.offset += 1;
        token
    }

    fn with_optional_eq(&mut self, bare: Token, with_eq: Token) -> Token {
        if self.peek(1) == Some(b'=') {
            self.offset += 2;
            with_eq
        } else {
            self.offset += 1;
            bare
        }
    }

    fn doubled(&mut self, ch: u8, token: Token) -> Result<Token, SyntaxError> {
        if self.peek(1) == Some(ch) {
            self.offset += 2;
            Ok(token)
        } else {
            Err(SyntaxError::new(
                format!("expected `{0}{0}`", char::from(ch)),
                self.offset,
            ))
        }
    }

    fn consume_while(&mut self, condition: impl Fn(u8) -> bool) {
        while let Some(b) = self.peek(0) {
            if condition(b) {
                self.offset += 1;
            } else {
                break;
            }
        }
    }

    fn word(&mut self) -> Token {
        let start = self.offset;
        self.consume_while(|b| b.is_ascii_alphanumeric() || b == b'_');
        let word = &self.input[start..self.offset];
        match word {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            w if w.eq_ignore_ascii_case("true") => Token::True,
            w if w.eq_ignore_ascii_case("false") => Token::False,
            w if w.eq_ignore_ascii_case("null") => Token::Null,
            w => Token::Ident(w.to_string()),
        }
    }

    fn number(&mut self) -> Result<Token, SyntaxError> {
        let start = self.offset;
        self.consume_while(|b| b.is_ascii_digit());
        let is_float = self.peek(0) == Some(b'.') && self.peek(1).is_some_and(|b| b.is_ascii_digit());
        if is_float {
            self.offset += 1;
            self.consume_while(|b| b.is_ascii_digit());
        }
        let raw = &self.input[start..self.offset];
        if is_float {
            raw.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| SyntaxError::new(format!("invalid number `{raw}`"), start))
        } else {
            raw.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| SyntaxError::new(format!("integer literal `{raw}` out of range"), start))
        }
    }

    fn string(&mut self, quote: u8) -> Result<Token, SyntaxError> {
        let start = self.offset;
        self.offset += 1;
        let mut out = String::new();
        let mut chars = self.input[self.offset..].char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => {
                    let Some((_, escaped)) = chars.next() else {
                        break;
                    };
                    out.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        other => other,
                    });
                }
                c if c as u32 == u32::from(quote) => {
                    self.offset += i + 1;
                    return Ok(Token::Str(out));
                }
                c => out.push(c),
            }
        }
        Err(SyntaxError::new("unterminated string literal", start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn lexes_dotted_and_arrow_member_access_alike() {
        assert_eq!(tokens("this.count"), tokens("$this->count"));
        assert_eq!(
            tokens("this.count"),
            vec![Token::Ident("this".into()), Token::Dot, Token::Ident("count".into()), Token::Eof]
        );
    }

    #[test]
    fn lexes_operators() {
        assert_eq!(
            tokens("a >= 1 && b != 2 || !c"),
            vec![
                Token::Ident("a".into()),
                Token::Ge,
                Token::Int(1),
                Token::And,
                Token::Ident("b".into()),
                Token::NotEq,
                Token::Int(2),
                Token::Or,
                Token::Not,
                Token::Ident("c".into()),
                Token::Eof,
            ]
        );
        assert_eq!(tokens("a === b"), tokens("a == b"));
        assert_eq!(tokens("a !== b"), tokens("a != b"));
    }

    #[test]
    fn lexes_keywords_case_insensitively_for_literals() {
        assert_eq!(
            tokens("TRUE and Null or not false"),
            vec![Token::True, Token::And, Token::Null, Token::Or, Token::Not, Token::False, Token::Eof]
        );
    }

    #[test]
    fn lexes_numbers() {
        assert_eq!(tokens("42 3.5"), vec![Token::Int(42), Token::Float(3.5), Token::Eof]);
        // A dot followed by a non-digit is member access, not a float.
        assert_eq!(
            tokens("1.x"),
            vec![Token::Int(1), Token::Dot, Token::Ident("x".into()), Token::Eof]
        );
    }

    #[test]
    fn lexes_strings_with_escapes() {
        assert_eq!(
            tokens(r#""a\"b" 'c\'d'"#),
            vec![Token::Str("a\"b".into()), Token::Str("c'd".into()), Token::Eof]
        );
    }

    #[test]
    fn rejects_assignment() {
        let err = Lexer::new("a = 1").tokenize().unwrap_err();
        assert_eq!(err.position, 2);
        assert!(err.message.contains("assignment"));
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = Lexer::new("name == 'abc").tokenize().unwrap_err();
        assert_eq!(err.position, 8);
    }

    #[test]
    fn rejects_oversized_input() {
        let input = "a".repeat(MAX_EXPRESSION_BYTES + 1);
        assert!(Lexer::new(&input).tokenize().is_err());
    }

    proptest! {
        #[test]
        fn never_panics_on_arbitrary_input(input in ".{0,64}") {
            let _ = Lexer::new(&input).tokenize();
        }
    }
}
