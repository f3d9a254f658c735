//! Canonical encoder: value -> token.
//!
//! Grammar (each symbol is reserved and never appears unescaped inside a
//! string payload):
//!
//! | shape        | token                                     |
//! |--------------|-------------------------------------------|
//! | null         | `n`                                       |
//! | true / false | `t` / `f`                                 |
//! | integer      | native integer (decimal when nested)      |
//! | float        | shortest round-trip decimal, `NAN`, `INF` |
//! | string       | `` `payload` `` with `` ` `` escaped as `` \` `` |
//! | list         | `[` then `item,` for each item, then `]`  |
//! | associative  | `[` then `key:value,` for each pair, `]`  |
//! | resource     | `r` + resource id                         |
//! | object       | resolved by the hasher (`prefix@...` or `#id`) |

use crate::depth::DepthLimit;
use crate::error::Result;
use crate::object::Object;
use crate::token::Token;
use crate::value::{is_list_shaped, Value};
use std::rc::Rc;

const NULL: &str = "n";
const TRUE: &str = "t";
const FALSE: &str = "f";
const STRING_QUOTE: char = '`';
const STRING_ESCAPE: char = '\\';
const ARRAY_START: char = '[';
const ARRAY_END: char = ']';
const ARRAY_COMMA: char = ',';
const ARRAY_COLON: char = ':';
const RESOURCE_ID_PREFIX: char = 'r';
pub(crate) const OBJECT_ID_PREFIX: char = '#';
pub(crate) const OBJECT_DATA_PREFIX: char = '@';

/// Source of tokens for object values.
pub(crate) trait ObjectTokens {
    fn object_token(&self, object: &Rc<dyn Object>) -> Result<Token>;
}

pub(crate) struct Encoder<'a, O: ?Sized> {
    objects: &'a O,
    depth: &'a DepthLimit,
}

impl<'a, O: ObjectTokens + ?Sized> Encoder<'a, O> {
    pub(crate) fn new(objects: &'a O, depth: &'a DepthLimit) -> Self {
        Self { objects, depth }
    }

    pub(crate) fn encode(&self, value: &Value) -> Result<Token> {
        match value {
            Value::Int(i) => Ok(Token::Int(*i)),
            Value::Object(object) => self.objects.object_token(object),
            other => {
                let mut out = String::new();
                self.write(other, &mut out)?;
                Ok(Token::Str(out.into_boxed_str()))
            }
        }
    }

    fn write(&self, value: &Value, out: &mut String) -> Result<()> {
        match value {
            Value::Null => out.push_str(NULL),
            Value::Bool(true) => out.push_str(TRUE),
            Value::Bool(false) => out.push_str(FALSE),
            Value::Int(i) => out.push_str(&i.to_string()),
            Value::Float(f) => out.push_str(&float_repr(*f)),
            Value::String(s) => write_string(s, out),
            Value::List(items) => {
                let _guard = self.depth.enter()?;
                out.push(ARRAY_START);
                for item in items {
                    self.write(item, out)?;
                    out.push(ARRAY_COMMA);
                }
                out.push(ARRAY_END);
            }
            Value::Assoc(pairs) => {
                let _guard = self.depth.enter()?;
                let list = is_list_shaped(pairs);
                out.push(ARRAY_START);
                for (key, item) in pairs {
                    if !list {
                        self.write(key, out)?;
                        out.push(ARRAY_COLON);
                    }
                    self.write(item, out)?;
                    out.push(ARRAY_COMMA);
                }
                out.push(ARRAY_END);
            }
            Value::Object(object) => self.objects.object_token(object)?.write_into(out),
            Value::Resource(id) => {
                out.push(RESOURCE_ID_PREFIX);
                out.push_str(&id.get().to_string());
            }
        }
        Ok(())
    }
}

/// Backtick-quoted payload; embedded backticks get a leading backslash.
fn write_string(s: &str, out: &mut String) {
    out.reserve(s.len() + 2);
    out.push(STRING_QUOTE);
    for c in s.chars() {
        if c == STRING_QUOTE {
            out.push(STRING_ESCAPE);
        }
        out.push(c);
    }
    out.push(STRING_QUOTE);
}

/// Shortest decimal that round-trips, with fixed spellings for the
/// non-finite values. Not an IEEE-754 canonicalization: every NaN payload
/// maps to `NAN`.
pub(crate) fn float_repr(f: f64) -> String {
    if f.is_nan() {
        "NAN".to_owned()
    } else if f == f64::INFINITY {
        "INF".to_owned()
    } else if f == f64::NEG_INFINITY {
        "-INF".to_owned()
    } else {
        f.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ResourceId;

    struct FixedObjects;

    impl ObjectTokens for FixedObjects {
        fn object_token(&self, _object: &Rc<dyn Object>) -> Result<Token> {
            Ok(Token::from("obj@1"))
        }
    }

    fn encode(value: &Value) -> Token {
        let depth = DepthLimit::new(None);
        Encoder::new(&FixedObjects, &depth).encode(value).unwrap()
    }

    #[test]
    fn scalars_follow_the_grammar() {
        assert_eq!(encode(&Value::Null), "n");
        assert_eq!(encode(&Value::Bool(true)), "t");
        assert_eq!(encode(&Value::Bool(false)), "f");
        assert_eq!(encode(&Value::Int(-100)), -100);
        assert_eq!(encode(&Value::Float(0.5)), "0.5");
        assert_eq!(encode(&Value::Float(-0.5)), "-0.5");
        assert_eq!(encode(&Value::Float(f64::NAN)), "NAN");
        assert_eq!(encode(&Value::Float(f64::INFINITY)), "INF");
        assert_eq!(encode(&Value::Float(f64::NEG_INFINITY)), "-INF");
        assert_eq!(encode(&Value::Resource(ResourceId::new(3))), "r3");
    }

    #[test]
    fn strings_escape_only_backticks() {
        assert_eq!(encode(&Value::from("")), "``");
        assert_eq!(encode(&Value::from("test")), "`test`");
        assert_eq!(encode(&Value::from("`")), "`\\``");
        assert_eq!(encode(&Value::from("\\`")), "`\\\\``");
        assert_eq!(encode(&Value::from("```")), "`\\`\\`\\``");
    }

    #[test]
    fn nested_values_use_textual_tokens() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert_eq!(encode(&list), "[1,2,3,]");
        assert_eq!(encode(&Value::List(vec![])), "[]");
        assert_eq!(encode(&Value::assoc([("a", "b")])), "[`a`:`b`,]");

        let with_object = Value::List(vec![Value::object(crate::object::Record::new())]);
        assert_eq!(encode(&with_object), "[obj@1,]");
    }

    #[test]
    fn list_shaped_assoc_encodes_as_list() {
        let assoc = Value::assoc([(0, 1), (1, 2), (2, 3)]);
        assert_eq!(encode(&assoc), "[1,2,3,]");
        let shifted = Value::assoc([(1, 1), (2, 2)]);
        assert_eq!(encode(&shifted), "[1:1,2:2,]");
    }

    #[test]
    fn depth_limit_counts_containers() {
        let depth = DepthLimit::new(Some(2));
        let encoder = Encoder::new(&FixedObjects, &depth);
        let two = Value::List(vec![Value::List(vec![])]);
        let three = Value::List(vec![two.clone()]);

        assert!(encoder.encode(&two).is_ok());
        assert_eq!(
            encoder.encode(&three),
            Err(crate::error::Error::DepthExceeded(2))
        );
        // The failed walk released every level it entered.
        assert_eq!(depth.current(), 0);
        assert!(encoder.encode(&two).is_ok());
    }
}
