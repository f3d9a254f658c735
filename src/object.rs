//! Objects: user-extensible values hashed through per-class normalizers.
//!
//! Rust has no runtime class hierarchy, so every object type declares its
//! own [`Class`]: a name, the ancestor names it should inherit normalizers
//! from (nearest first), and the capability names it implements. The
//! registry walks that declaration instead of reflecting on the type.

use crate::error::{Error, Result};
use crate::kv_pair::KVPair;
use crate::value::Value;
use chrono::{DateTime, FixedOffset, Utc};
use core::any::Any;
use core::fmt;
use indexmap::IndexMap;

/// Capability implemented by the built-in date/time objects.
pub const DATE_TIME_INTERFACE: &str = "DateTimeInterface";

/// Static description of an object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Class {
    name: &'static str,
    parents: &'static [&'static str],
    interfaces: &'static [&'static str],
}

impl Class {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            parents: &[],
            interfaces: &[],
        }
    }

    /// Ancestor class names, nearest first.
    pub const fn extends(self, parents: &'static [&'static str]) -> Self {
        Self {
            name: self.name,
            parents,
            interfaces: self.interfaces,
        }
    }

    /// Capability names, in declaration order.
    pub const fn implements(self, interfaces: &'static [&'static str]) -> Self {
        Self {
            name: self.name,
            parents: self.parents,
            interfaces,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn parents(&self) -> &'static [&'static str] {
        self.parents
    }

    pub const fn interfaces(&self) -> &'static [&'static str] {
        self.interfaces
    }

    /// Names to try when resolving a normalizer: the class itself, then its
    /// ancestors, then its capabilities.
    pub(crate) fn lookup_chain(&self) -> impl Iterator<Item = &'static str> {
        core::iter::once(self.name)
            .chain(self.parents.iter().copied())
            .chain(self.interfaces.iter().copied())
    }
}

/// A value with a class. Unregistered classes hash by identity.
pub trait Object: Any + fmt::Debug + 'static {
    fn class(&self) -> &'static Class;
}

impl dyn Object {
    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        let any: &dyn Any = self;
        any.downcast_ref::<T>()
    }

    pub fn is<T: Object>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }
}

static RECORD_CLASS: Class = Class::new("Record");
static KV_PAIR_CLASS: Class = Class::new("KVPair");
static UTC_DATE_TIME_CLASS: Class =
    Class::new("DateTime<Utc>").implements(&[DATE_TIME_INTERFACE]);
static FIXED_DATE_TIME_CLASS: Class =
    Class::new("DateTime<FixedOffset>").implements(&[DATE_TIME_INTERFACE]);

/// Anonymous struct-like object: named fields in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Object for Record {
    fn class(&self) -> &'static Class {
        &RECORD_CLASS
    }
}

impl Object for KVPair<Value, Value> {
    fn class(&self) -> &'static Class {
        &KV_PAIR_CLASS
    }
}

impl Object for DateTime<Utc> {
    fn class(&self) -> &'static Class {
        &UTC_DATE_TIME_CLASS
    }
}

impl Object for DateTime<FixedOffset> {
    fn class(&self) -> &'static Class {
        &FIXED_DATE_TIME_CLASS
    }
}

// Surrogates used by the pre-seeded hashers. A user type may resolve to one
// of these through its ancestors or capabilities without being the concrete
// type the surrogate reads; that is reported, never hashed as a placeholder.

fn unsupported(object: &dyn Object) -> Error {
    Error::UnsupportedShape(object.class().name().to_owned())
}

pub(crate) fn normalize_record(object: &dyn Object) -> Result<Value> {
    let record = object
        .downcast_ref::<Record>()
        .ok_or_else(|| unsupported(object))?;
    Ok(Value::Assoc(
        record
            .fields
            .iter()
            .map(|(k, v)| (Value::String(k.clone()), v.clone()))
            .collect(),
    ))
}

pub(crate) fn normalize_kv_pair(object: &dyn Object) -> Result<Value> {
    let kv = object
        .downcast_ref::<KVPair<Value, Value>>()
        .ok_or_else(|| unsupported(object))?;
    Ok(Value::List(vec![kv.key.clone(), kv.value.clone()]))
}

/// Microsecond timestamp followed by the zone: `UTC` or a `+hh:mm` offset.
pub(crate) fn normalize_date_time(object: &dyn Object) -> Result<Value> {
    if let Some(dt) = object.downcast_ref::<DateTime<Utc>>() {
        return Ok(Value::String(dt.format("%Y%m%d%H%M%S%6fUTC").to_string()));
    }
    if let Some(dt) = object.downcast_ref::<DateTime<FixedOffset>>() {
        return Ok(Value::String(dt.format("%Y%m%d%H%M%S%6f%:z").to_string()));
    }
    Err(unsupported(object))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Widget;

    static WIDGET: Class = Class::new("Widget")
        .extends(&["Base", "Root"])
        .implements(&["Named", "Sized"]);

    impl Object for Widget {
        fn class(&self) -> &'static Class {
            &WIDGET
        }
    }

    #[test]
    fn lookup_chain_is_class_then_parents_then_interfaces() {
        let chain: Vec<_> = WIDGET.lookup_chain().collect();
        assert_eq!(chain, ["Widget", "Base", "Root", "Named", "Sized"]);
    }

    #[test]
    fn downcast_recovers_concrete_type() {
        let object: &dyn Object = &Widget;
        assert!(object.is::<Widget>());
        assert!(object.downcast_ref::<Record>().is_none());
    }

    #[test]
    fn record_normalizes_to_ordered_fields() {
        let record = Record::new().with("b", 1).with("a", "x");
        let surrogate = normalize_record(&record).unwrap();
        assert_eq!(surrogate.to_string(), "[\"b\" => 1, \"a\" => \"x\"]");
    }

    #[test]
    fn date_time_surrogate_keeps_microseconds_and_zone() {
        let dt = DateTime::parse_from_rfc3339("2020-04-06T01:02:03.671881+03:30").unwrap();
        assert_eq!(
            normalize_date_time(&dt).unwrap().to_string(),
            "\"20200406010203671881+03:30\""
        );
        let utc = dt.with_timezone(&Utc);
        assert_eq!(
            normalize_date_time(&utc).unwrap().to_string(),
            "\"20200405213203671881UTC\""
        );
    }

    #[test]
    fn builtin_surrogates_reject_foreign_types() {
        assert_eq!(
            normalize_date_time(&Widget),
            Err(Error::UnsupportedShape("Widget".into()))
        );
        assert_eq!(
            normalize_record(&Widget),
            Err(Error::UnsupportedShape("Widget".into()))
        );
        assert!(normalize_kv_pair(&Widget).is_err());
    }
}
