//! Map: persistent view over a shared [`MutableMap`].
//!
//! Every `with*`/`without` call returns a new `Map` and leaves the receiver
//! untouched. Calls that change nothing hand back the receiver itself (the
//! same allocation, see [`Map::ptr_eq`]) rather than a copy.

use crate::error::Result;
use crate::hasher::StructuralHasher;
use crate::kv_pair::KVPair;
use crate::mutable_map::{self, MutableMap};
use crate::value::ToValue;
use core::cmp::Ordering;
use core::fmt;
use core::ops::Deref;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::rc::Rc;

pub struct Map<K, V> {
    inner: Rc<MutableMap<K, V>>,
}

impl<K, V> Map<K, V> {
    pub fn new() -> Self {
        MutableMap::new().into()
    }

    pub fn with_hasher(hasher: Rc<StructuralHasher>) -> Self {
        MutableMap::with_hasher(hasher).into()
    }

    /// True when both maps are the same instance.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.inner, &other.inner)
    }

    /// Owned mutable copy; avoids the copy when this is the only handle.
    pub fn into_mutable(self) -> MutableMap<K, V>
    where
        K: Clone,
        V: Clone,
    {
        Rc::try_unwrap(self.inner).unwrap_or_else(|shared| (*shared).clone())
    }

    pub fn filter<P>(&self, predicate: P) -> Self
    where
        K: Clone,
        V: Clone,
        P: FnMut(&V) -> bool,
    {
        self.inner.filter(predicate).into()
    }

    pub fn filter_kv<P>(&self, predicate: P) -> Self
    where
        K: Clone,
        V: Clone,
        P: FnMut(&K, &V) -> bool,
    {
        self.inner.filter_kv(predicate).into()
    }

    pub fn map<NV, F>(&self, mapper: F) -> Map<K, NV>
    where
        K: Clone,
        F: FnMut(&V) -> NV,
    {
        self.inner.map(mapper).into()
    }

    pub fn map_kv<NV, F>(&self, mapper: F) -> Map<K, NV>
    where
        K: Clone,
        F: FnMut(&K, &V) -> NV,
    {
        self.inner.map_kv(mapper).into()
    }

    pub fn usort<F>(&self, comparator: F) -> Self
    where
        K: Clone,
        V: Clone,
        F: FnMut(&V, &V) -> Ordering,
    {
        self.inner.usort(comparator).into()
    }

    pub fn usort_kv<F>(&self, comparator: F) -> Self
    where
        K: Clone,
        V: Clone,
        F: FnMut(&K, &V, &K, &V) -> Ordering,
    {
        self.inner.usort_kv(comparator).into()
    }

    pub fn sort(&self) -> Self
    where
        K: Clone,
        V: Clone + PartialOrd,
    {
        self.inner.sort().into()
    }

    pub fn sort_desc(&self) -> Self
    where
        K: Clone,
        V: Clone + PartialOrd,
    {
        self.inner.sort_desc().into()
    }

    pub fn ksort(&self) -> Self
    where
        K: Clone + PartialOrd,
        V: Clone,
    {
        self.inner.ksort().into()
    }

    pub fn ksort_desc(&self) -> Self
    where
        K: Clone + PartialOrd,
        V: Clone,
    {
        self.inner.ksort_desc().into()
    }

    pub fn slice(&self, offset: isize, length: Option<isize>) -> Self
    where
        K: Clone,
        V: Clone,
    {
        self.inner.slice(offset, length).into()
    }
}

impl<K: ToValue, V> Map<K, V> {
    pub fn of<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        MutableMap::of(entries).map(Map::from)
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = KVPair<K, V>>,
    {
        MutableMap::from_pairs(pairs).map(Map::from)
    }

    pub fn from_keys<I, F>(keys: I, value: F) -> Result<Self>
    where
        I: IntoIterator<Item = K>,
        F: FnMut(&K) -> V,
    {
        MutableMap::from_keys(keys, value).map(Map::from)
    }

    pub fn from_values<I, F>(values: I, key: F) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        F: FnMut(&V) -> K,
    {
        MutableMap::from_values(values, key).map(Map::from)
    }

    /// Copy with `key` bound to `value`; an existing binding is replaced at
    /// its original position.
    pub fn with(&self, key: K, value: V) -> Result<Self>
    where
        K: Clone,
        V: Clone,
    {
        let mut map = (*self.inner).clone();
        map.put(key, value)?;
        Ok(map.into())
    }

    /// Copy with every pair put in order. No pairs returns `self`.
    pub fn with_pairs<I>(&self, pairs: I) -> Result<Self>
    where
        K: Clone,
        V: Clone,
        I: IntoIterator<Item = KVPair<K, V>>,
    {
        let mut pairs = pairs.into_iter().peekable();
        if pairs.peek().is_none() {
            return Ok(self.clone());
        }
        let mut map = (*self.inner).clone();
        map.put_pairs(pairs)?;
        Ok(map.into())
    }

    /// Copy with every entry put in order. No entries returns `self`.
    pub fn with_all<I>(&self, entries: I) -> Result<Self>
    where
        K: Clone,
        V: Clone,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut entries = entries.into_iter().peekable();
        if entries.peek().is_none() {
            return Ok(self.clone());
        }
        let mut map = (*self.inner).clone();
        map.put_all(entries)?;
        Ok(map.into())
    }

    /// Run `producer` now and behave like [`with_all`](Self::with_all).
    pub fn with_all_from<I, F>(&self, producer: F) -> Result<Self>
    where
        K: Clone,
        V: Clone,
        F: FnOnce() -> I,
        I: IntoIterator<Item = (K, V)>,
    {
        self.with_all(producer())
    }

    /// Copy without the listed keys. No keys returns `self`.
    pub fn without<I>(&self, keys: I) -> Result<Self>
    where
        K: Clone,
        V: Clone,
        I: IntoIterator,
        I::Item: ToValue,
    {
        let mut keys = keys.into_iter().peekable();
        if keys.peek().is_none() {
            return Ok(self.clone());
        }
        let mut map = (*self.inner).clone();
        map.remove_all(keys)?;
        Ok(map.into())
    }

    pub fn map_key<NK, F>(&self, mapper: F) -> Result<Map<NK, V>>
    where
        NK: ToValue,
        V: Clone,
        F: FnMut(&V) -> NK,
    {
        self.inner.map_key(mapper).map(Map::from)
    }

    pub fn map_key_kv<NK, F>(&self, mapper: F) -> Result<Map<NK, V>>
    where
        NK: ToValue,
        V: Clone,
        F: FnMut(&K, &V) -> NK,
    {
        self.inner.map_key_kv(mapper).map(Map::from)
    }

    pub fn flat_map<NK, NV, I, F>(&self, mapper: F) -> Result<Map<NK, NV>>
    where
        NK: ToValue,
        I: IntoIterator<Item = (NK, NV)>,
        F: FnMut(&V) -> I,
    {
        self.inner.flat_map(mapper).map(Map::from)
    }

    pub fn flat_map_kv<NK, NV, I, F>(&self, mapper: F) -> Result<Map<NK, NV>>
    where
        NK: ToValue,
        I: IntoIterator<Item = (NK, NV)>,
        F: FnMut(&K, &V) -> I,
    {
        self.inner.flat_map_kv(mapper).map(Map::from)
    }

    pub fn flip(&self) -> Result<Map<V, K>>
    where
        K: Clone,
        V: ToValue + Clone,
    {
        self.inner.flip().map(Map::from)
    }
}

impl<K, V> Deref for Map<K, V> {
    type Target = MutableMap<K, V>;

    fn deref(&self) -> &MutableMap<K, V> {
        &self.inner
    }
}

/// Shares the underlying map.
impl<K, V> Clone for Map<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<K, V> From<MutableMap<K, V>> for Map<K, V> {
    fn from(map: MutableMap<K, V>) -> Self {
        Self {
            inner: Rc::new(map),
        }
    }
}

impl<K, V> Default for Map<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V: PartialEq> PartialEq for Map<K, V> {
    fn eq(&self, other: &Self) -> bool {
        Map::ptr_eq(self, other) || *self.inner == *other.inner
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Map<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl<'a, K, V> IntoIterator for &'a Map<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = mutable_map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl<K: Serialize, V: Serialize> Serialize for Map<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        self.inner.serialize(serializer)
    }
}

impl<'de, K, V> Deserialize<'de> for Map<K, V>
where
    K: Deserialize<'de> + ToValue,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        MutableMap::<K, V>::deserialize(deserializer).map(Map::from)
    }
}
