//! Canonical tokens produced by the hashing engine.

use core::fmt;

/// Canonical key of a value.
///
/// Integers take a fast path and stay native; every other shape becomes a
/// string whose first character identifies the shape (`n`, `t`, `f`, a
/// backtick, `[`, `#`, `r`, a digit or sign for floats, or an object prefix).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Token {
    Int(i64),
    Str(Box<str>),
}

impl Token {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Token::Int(i) => Some(*i),
            Token::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Token::Int(_) => None,
            Token::Str(s) => Some(s),
        }
    }

    /// Append the textual form of this token, as used when it is nested
    /// inside a larger token.
    pub(crate) fn write_into(&self, out: &mut String) {
        match self {
            Token::Int(i) => out.push_str(&i.to_string()),
            Token::Str(s) => out.push_str(s),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Int(i) => write!(f, "{}", i),
            Token::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Token {
    fn from(i: i64) -> Self {
        Token::Int(i)
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Token::Str(s.into())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Token::Str(s.into_boxed_str())
    }
}

impl PartialEq<str> for Token {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for Token {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl PartialEq<i64> for Token {
    fn eq(&self, other: &i64) -> bool {
        self.as_int() == Some(*other)
    }
}
