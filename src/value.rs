//! Dynamic value model fed to the hashing engine.

use crate::encoder;
use crate::error::{Error, Result};
use crate::kv_pair::KVPair;
use crate::object::{Object, Record};
use chrono::{DateTime, FixedOffset, Utc};
use indexmap::IndexMap;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Identifier of an externally managed handle (file, socket, ...).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Identify an open descriptor by its raw fd.
    #[cfg(unix)]
    pub fn of<H: std::os::fd::AsRawFd + ?Sized>(handle: &H) -> Self {
        Self(u64::from(handle.as_raw_fd().unsigned_abs()))
    }
}

/// Any value the engine knows how to canonicalize.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// No value / null
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Ordered sequence of values
    List(Vec<Value>),
    /// Ordered key/value pairs with arbitrary keys
    Assoc(Vec<(Value, Value)>),
    /// Object compared through its registered normalizer, or by identity
    Object(Rc<dyn Object>),
    Resource(ResourceId),
}

impl Value {
    /// Wrap an object instance.
    pub fn object<T: Object>(object: T) -> Self {
        Value::Object(Rc::new(object))
    }

    /// Build an associative value from pairs, keeping their order.
    pub fn assoc<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Value>,
        V: Into<Value>,
    {
        Value::Assoc(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Assoc(_) => "assoc",
            Value::Object(o) => o.class().name(),
            Value::Resource(_) => "resource",
        }
    }
}

/// True when the keys are exactly `0, 1, 2, ...` in order. Such a collection
/// is the same shape as a list and is encoded as one.
pub(crate) fn is_list_shaped(pairs: &[(Value, Value)]) -> bool {
    pairs
        .iter()
        .zip(0i64..)
        .all(|((k, _), i)| matches!(k, Value::Int(n) if *n == i))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => f.write_str(&encoder::float_repr(*fl)),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Value::List(list) => {
                write!(f, "[")?;
                for (i, v) in list.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Assoc(pairs) => {
                let list = is_list_shaped(pairs);
                write!(f, "[")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if !list {
                        write!(f, "{} => ", k)?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Object(o) => write!(f, "{}{{}}", o.class().name()),
            Value::Resource(id) => write!(f, "resource#{}", id.get()),
        }
    }
}

/// Equality agrees with token equality for everything but normalized
/// objects, which are only equal to themselves here: a list equals the
/// sequentially keyed assoc value with the same elements, `Int(1)` differs
/// from `Float(1.0)`, and `NaN` equals `NaN`.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

/// Values order by shape first:
/// `Null < Bool < Int/Float < String < List/Assoc < Object < Resource`.
///
/// Within a shape:
/// - numbers compare numerically; on a tie an `Int` sorts before a `Float`
///   and `-0.0` before `0.0`. `NaN` only compares with `NaN`.
/// - strings compare bytewise.
/// - arrays compare by length, then entry by entry (key, then value), a list
///   entry's key being its index.
/// - objects order by class name; two instances of one class compare only
///   with themselves.
/// - resources compare by id.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => compare_floats(*a, *b),
            (Value::Int(a), Value::Float(b)) => {
                compare_floats(*a as f64, *b).map(|o| o.then(Ordering::Less))
            }
            (Value::Float(a), Value::Int(b)) => {
                compare_floats(*a, *b as f64).map(|o| o.then(Ordering::Greater))
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::List(_) | Value::Assoc(_), Value::List(_) | Value::Assoc(_)) => {
                compare_arrays(&array_entries(self), &array_entries(other))
            }
            (Value::Object(a), Value::Object(b)) => {
                match a.class().name().cmp(b.class().name()) {
                    Ordering::Equal if core::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)) => {
                        Some(Ordering::Equal)
                    }
                    Ordering::Equal => None,
                    order => Some(order),
                }
            }
            (Value::Resource(a), Value::Resource(b)) => Some(a.cmp(b)),
            _ => Some(shape_rank(self).cmp(&shape_rank(other))),
        }
    }
}

fn shape_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Float(_) => 2,
        Value::String(_) => 3,
        Value::List(_) | Value::Assoc(_) => 4,
        Value::Object(_) => 5,
        Value::Resource(_) => 6,
    }
}

fn compare_floats(a: f64, b: f64) -> Option<Ordering> {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Some(Ordering::Equal),
        (false, false) => a
            .partial_cmp(&b)
            .map(|o| o.then_with(|| b.is_sign_negative().cmp(&a.is_sign_negative()))),
        _ => None,
    }
}

fn array_entries(value: &Value) -> Vec<(Cow<'_, Value>, &Value)> {
    match value {
        Value::List(items) => (0i64..)
            .zip(items)
            .map(|(i, v)| (Cow::Owned(Value::Int(i)), v))
            .collect(),
        Value::Assoc(pairs) => pairs.iter().map(|(k, v)| (Cow::Borrowed(k), v)).collect(),
        _ => Vec::new(),
    }
}

fn compare_arrays(a: &[(Cow<'_, Value>, &Value)], b: &[(Cow<'_, Value>, &Value)]) -> Option<Ordering> {
    if a.len() != b.len() {
        return Some(a.len().cmp(&b.len()));
    }
    for ((k1, v1), (k2, v2)) in a.iter().zip(b) {
        match k1.as_ref().partial_cmp(k2.as_ref())? {
            Ordering::Equal => {}
            order => return Some(order),
        }
        match v1.partial_cmp(v2)? {
            Ordering::Equal => {}
            order => return Some(order),
        }
    }
    Some(Ordering::Equal)
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<Vec<Value>> for Value {
    fn from(list: Vec<Value>) -> Self {
        Value::List(list)
    }
}

impl From<ResourceId> for Value {
    fn from(id: ResourceId) -> Self {
        Value::Resource(id)
    }
}

impl From<Rc<dyn Object>> for Value {
    fn from(object: Rc<dyn Object>) -> Self {
        Value::Object(object)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

/// Conversion of a caller's key (or normalized surrogate) into a [`Value`].
///
/// Implemented for the shapes with a deterministic iteration order. Types
/// whose order is unspecified (`HashMap`, `HashSet`) are intentionally left
/// out; convert them to a sorted or insertion-ordered collection first.
pub trait ToValue {
    fn to_value(&self) -> Result<Value>;
}

impl ToValue for Value {
    fn to_value(&self) -> Result<Value> {
        Ok(self.clone())
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Result<Value> {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for Box<T> {
    fn to_value(&self) -> Result<Value> {
        (**self).to_value()
    }
}

impl ToValue for () {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Null)
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Bool(*self))
    }
}

macro_rules! lossless_int {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Result<Value> {
                    Ok(Value::Int(i64::from(*self)))
                }
            }
        )*
    };
}

lossless_int!(i8, i16, i32, i64, u8, u16, u32);

// Integers wider than i64 have no canonical form once they leave its range.
macro_rules! ranged_int {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Result<Value> {
                    i64::try_from(*self).map(Value::Int).map_err(|_| {
                        Error::UnsupportedShape(format!(
                            "{} ({} is outside the i64 range)",
                            stringify!($t),
                            self
                        ))
                    })
                }
            }
        )*
    };
}

ranged_int!(u64, usize, isize, i128, u128);

impl ToValue for f32 {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Float(f64::from(*self)))
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Float(*self))
    }
}

impl ToValue for char {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::String(self.to_string()))
    }
}

impl ToValue for str {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::String(self.to_owned()))
    }
}

impl ToValue for String {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::String(self.clone()))
    }
}

impl ToValue for ResourceId {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::Resource(*self))
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Result<Value> {
        match self {
            Some(v) => v.to_value(),
            None => Ok(Value::Null),
        }
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Result<Value> {
        self.iter()
            .map(ToValue::to_value)
            .collect::<Result<Vec<_>>>()
            .map(Value::List)
    }
}

impl<T: ToValue, const N: usize> ToValue for [T; N] {
    fn to_value(&self) -> Result<Value> {
        self.as_slice().to_value()
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Result<Value> {
        self.as_slice().to_value()
    }
}

impl<A: ToValue, B: ToValue> ToValue for (A, B) {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::List(vec![self.0.to_value()?, self.1.to_value()?]))
    }
}

impl<A: ToValue, B: ToValue, C: ToValue> ToValue for (A, B, C) {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::List(vec![
            self.0.to_value()?,
            self.1.to_value()?,
            self.2.to_value()?,
        ]))
    }
}

fn assoc_from<'a, K, V, I>(pairs: I) -> Result<Value>
where
    K: ToValue + 'a,
    V: ToValue + 'a,
    I: Iterator<Item = (&'a K, &'a V)>,
{
    pairs
        .map(|(k, v)| Ok((k.to_value()?, v.to_value()?)))
        .collect::<Result<Vec<_>>>()
        .map(Value::Assoc)
}

impl<K: ToValue, V: ToValue> ToValue for BTreeMap<K, V> {
    fn to_value(&self) -> Result<Value> {
        assoc_from(self.iter())
    }
}

impl<K: ToValue, V: ToValue, S> ToValue for IndexMap<K, V, S> {
    fn to_value(&self) -> Result<Value> {
        assoc_from(self.iter())
    }
}

impl<T: Object> ToValue for Rc<T> {
    fn to_value(&self) -> Result<Value> {
        let object: Rc<dyn Object> = self.clone();
        Ok(Value::Object(object))
    }
}

impl ToValue for Record {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::object(self.clone()))
    }
}

impl<K: ToValue, V: ToValue> ToValue for KVPair<K, V> {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::object(KVPair::new(
            self.key.to_value()?,
            self.value.to_value()?,
        )))
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::object(*self))
    }
}

impl ToValue for DateTime<FixedOffset> {
    fn to_value(&self) -> Result<Value> {
        Ok(Value::object(*self))
    }
}
