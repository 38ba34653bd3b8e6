//! Typed setting values and their text form
//!
//! Values are printed the way the host prints settings values, a small
//! subset of the GVariant text format:
//!
//! - booleans: `true`, `false`
//! - strings: `'single quoted'` with backslash escapes
//! - string lists: `['a', 'b']`, the empty list as `@as []`
//!
//! The printed form is what lands in the override journal blob and in the
//! settings store file, so decoding rejects anything it would not print
//! itself (plus double-quoted strings and a bare `[]`, which the host
//! accepts too).

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Type annotation the host puts in front of an empty string list
const EMPTY_LIST_ANNOTATION: &str = "@as";

/// A settings value of one of the supported kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    Bool(bool),
    StringList(Vec<String>),
    Str(String),
}

impl Variant {
    /// Build a string list from anything iterable over string-likes
    pub fn strv<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Variant::StringList(items.into_iter().map(Into::into).collect())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_strv(&self) -> Option<&[String]> {
        match self {
            Variant::StringList(values) => Some(values),
            _ => None,
        }
    }

    /// Short type name, for log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Variant::Bool(_) => "bool",
            Variant::StringList(_) => "string-list",
            Variant::Str(_) => "string",
        }
    }
}

/// Print a variant in its text form.
pub fn encode(value: &Variant) -> String {
    match value {
        Variant::Bool(true) => "true".to_string(),
        Variant::Bool(false) => "false".to_string(),
        Variant::Str(text) => quote(text),
        Variant::StringList(items) if items.is_empty() => format!("{EMPTY_LIST_ANNOTATION} []"),
        Variant::StringList(items) => {
            let quoted: Vec<String> = items.iter().map(|item| quote(item)).collect();
            format!("[{}]", quoted.join(", "))
        }
    }
}

/// Parse the text form back into a variant.
pub fn decode(text: &str) -> Result<Variant, DecodeError> {
    let mut parser = Parser::new(text);
    let value = parser.value()?;
    parser.skip_whitespace();
    match parser.peek() {
        None => Ok(value),
        Some(_) => Err(DecodeError::TrailingInput(parser.rest())),
    }
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn rest(&self) -> String {
        self.chars[self.pos..].iter().collect()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let len = keyword.chars().count();
        let matches = self.chars.len() >= self.pos + len
            && self.chars[self.pos..self.pos + len].iter().copied().eq(keyword.chars());
        // keyword must not run into an identifier (`trueish`)
        let boundary = self
            .chars
            .get(self.pos + len)
            .is_none_or(|c| !c.is_alphanumeric() && *c != '_' && *c != '-');
        if matches && boundary {
            self.pos += len;
            true
        } else {
            false
        }
    }

    fn value(&mut self) -> Result<Variant, DecodeError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(DecodeError::Empty),
            Some('\'') | Some('"') => Ok(Variant::Str(self.string()?)),
            Some('[') => Ok(Variant::StringList(self.list()?)),
            Some('@') => {
                if !self.eat_keyword(EMPTY_LIST_ANNOTATION) {
                    return Err(DecodeError::UnsupportedType(self.rest()));
                }
                self.skip_whitespace();
                let items = self.list()?;
                Ok(Variant::StringList(items))
            }
            Some(_) if self.eat_keyword("true") => Ok(Variant::Bool(true)),
            Some(_) if self.eat_keyword("false") => Ok(Variant::Bool(false)),
            Some(_) => Err(DecodeError::UnexpectedToken(self.rest())),
        }
    }

    fn list(&mut self) -> Result<Vec<String>, DecodeError> {
        if self.bump() != Some('[') {
            return Err(DecodeError::ExpectedList);
        }
        let mut items = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(items);
        }
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('\'') | Some('"') => items.push(self.string()?),
                Some(_) => return Err(DecodeError::ExpectedString(self.rest())),
                None => return Err(DecodeError::UnexpectedEnd),
            }
            self.skip_whitespace();
            match self.bump() {
                Some(',') => continue,
                Some(']') => return Ok(items),
                Some(c) => return Err(DecodeError::UnexpectedToken(c.to_string())),
                None => return Err(DecodeError::UnexpectedEnd),
            }
        }
    }

    fn string(&mut self) -> Result<String, DecodeError> {
        let quote = match self.bump() {
            Some(c @ ('\'' | '"')) => c,
            _ => return Err(DecodeError::ExpectedString(self.rest())),
        };
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(DecodeError::UnterminatedString),
                Some('\\') => match self.bump() {
                    Some('\\') => out.push('\\'),
                    Some('\'') => out.push('\''),
                    Some('"') => out.push('"'),
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(other) => return Err(DecodeError::InvalidEscape(other)),
                    None => return Err(DecodeError::UnterminatedString),
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
            }
        }
    }
}

impl Display for Variant {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&encode(self))
    }
}

impl FromStr for Variant {
    type Err = DecodeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        decode(text)
    }
}

/// Malformed persisted text.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("empty value text")]
    Empty,

    #[error("unexpected end of value text")]
    UnexpectedEnd,

    #[error("unexpected token at {0:?}")]
    UnexpectedToken(String),

    #[error("unsupported type annotation at {0:?}")]
    UnsupportedType(String),

    #[error("expected a list")]
    ExpectedList,

    #[error("expected a quoted string at {0:?}")]
    ExpectedString(String),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),

    #[error("trailing input {0:?}")]
    TrailingInput(String),

    #[error("malformed blob: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a {expected} value, found {found}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
    },
}
