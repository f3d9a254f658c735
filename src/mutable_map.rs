//! MutableMap: ordered, structurally keyed map that updates in place.
//!
//! Keys are hashed to [`Token`]s by a [`StructuralHasher`]; two keys with the
//! same structure address the same binding. Bindings keep insertion order,
//! and overwriting a key replaces its binding where it stands.

use crate::error::{Error, Result};
use crate::hasher::{Flavor, StructuralHasher};
use crate::kv_pair::KVPair;
use crate::token::Token;
use crate::token_table::{self, TokenTable};
use crate::value::ToValue;
use core::cmp::Ordering;
use core::fmt;
use core::hash::Hash;
use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use std::rc::Rc;

pub struct MutableMap<K, V> {
    hasher: Rc<StructuralHasher>,
    table: TokenTable<KVPair<K, V>>,
}

impl<K, V> MutableMap<K, V> {
    /// Empty map hashing through the default global hasher.
    pub fn new() -> Self {
        Self::with_hasher(StructuralHasher::global(Flavor::default()))
    }

    /// Empty map hashing through `hasher`.
    pub fn with_hasher(hasher: Rc<StructuralHasher>) -> Self {
        Self {
            hasher,
            table: TokenTable::new(),
        }
    }

    pub fn hasher(&self) -> &Rc<StructuralHasher> {
        &self.hasher
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// First binding in iteration order.
    pub fn first(&self) -> Option<&KVPair<K, V>> {
        self.table.first().map(|(_, kv)| kv)
    }

    /// Last binding in iteration order.
    pub fn last(&self) -> Option<&KVPair<K, V>> {
        self.table.last().map(|(_, kv)| kv)
    }

    pub fn find_first<P>(&self, mut predicate: P) -> Option<&KVPair<K, V>>
    where
        P: FnMut(&V) -> bool,
    {
        self.pairs().find(|kv| predicate(&kv.value))
    }

    pub fn find_first_kv<P>(&self, mut predicate: P) -> Option<&KVPair<K, V>>
    where
        P: FnMut(&K, &V) -> bool,
    {
        self.pairs().find(|kv| predicate(&kv.key, &kv.value))
    }

    pub fn any<P: FnMut(&V) -> bool>(&self, mut predicate: P) -> bool {
        self.values().any(|v| predicate(v))
    }

    pub fn any_kv<P: FnMut(&K, &V) -> bool>(&self, mut predicate: P) -> bool {
        self.iter().any(|(k, v)| predicate(k, v))
    }

    pub fn all<P: FnMut(&V) -> bool>(&self, mut predicate: P) -> bool {
        self.values().all(|v| predicate(v))
    }

    pub fn all_kv<P: FnMut(&K, &V) -> bool>(&self, mut predicate: P) -> bool {
        self.iter().all(|(k, v)| predicate(k, v))
    }

    /// Left fold seeded with the first value. Fails with
    /// [`Error::EmptyMap`] when there is nothing to seed from.
    pub fn reduce<F>(&self, mut operation: F) -> Result<V>
    where
        V: Clone,
        F: FnMut(V, &V) -> V,
    {
        self.reduce_kv(|acc, _, v| operation(acc, v))
    }

    pub fn reduce_kv<F>(&self, mut operation: F) -> Result<V>
    where
        V: Clone,
        F: FnMut(V, &K, &V) -> V,
    {
        let mut pairs = self.pairs();
        let seed = pairs.next().ok_or(Error::EmptyMap)?.value.clone();
        Ok(pairs.fold(seed, |acc, kv| operation(acc, &kv.key, &kv.value)))
    }

    pub fn fold<A, F>(&self, initial: A, mut operation: F) -> A
    where
        F: FnMut(A, &V) -> A,
    {
        self.values().fold(initial, |acc, v| operation(acc, v))
    }

    pub fn fold_kv<A, F>(&self, initial: A, mut operation: F) -> A
    where
        F: FnMut(A, &K, &V) -> A,
    {
        self.iter().fold(initial, |acc, (k, v)| operation(acc, k, v))
    }

    /// Bindings as `(key, value)` in iteration order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Bindings as stored pairs, in iteration order.
    pub fn pairs(&self) -> Pairs<'_, K, V> {
        Pairs {
            inner: self.table.iter(),
        }
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + ExactSizeIterator + '_ {
        self.pairs().map(|kv| &kv.key)
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator + '_ {
        self.pairs().map(|kv| &kv.value)
    }

    /// Same tokens, values replaced by `mapper(value)`.
    pub fn map<NV, F>(&self, mut mapper: F) -> MutableMap<K, NV>
    where
        K: Clone,
        F: FnMut(&V) -> NV,
    {
        self.map_kv(|_, v| mapper(v))
    }

    pub fn map_kv<NV, F>(&self, mut mapper: F) -> MutableMap<K, NV>
    where
        K: Clone,
        F: FnMut(&K, &V) -> NV,
    {
        let table = self
            .table
            .iter()
            .map(|(token, kv)| {
                let value = mapper(&kv.key, &kv.value);
                (token.clone(), KVPair::new(kv.key.clone(), value))
            })
            .collect();
        MutableMap {
            hasher: Rc::clone(&self.hasher),
            table,
        }
    }

    /// Rebuild with the same hasher from already hashed entries.
    fn rebuild<I>(&self, entries: I) -> Self
    where
        I: IntoIterator<Item = (Token, KVPair<K, V>)>,
    {
        MutableMap {
            hasher: Rc::clone(&self.hasher),
            table: entries.into_iter().collect(),
        }
    }

    fn sorted_by<F>(&self, mut compare: F) -> Self
    where
        K: Clone,
        V: Clone,
        F: FnMut(&KVPair<K, V>, &KVPair<K, V>) -> Ordering,
    {
        let mut entries: Vec<_> = self.table.iter().collect();
        entries.sort_by(|(_, a), (_, b)| compare(*a, *b));
        self.rebuild(
            entries
                .into_iter()
                .map(|(token, kv)| (token.clone(), kv.clone())),
        )
    }

    pub fn filter<P>(&self, mut predicate: P) -> Self
    where
        K: Clone,
        V: Clone,
        P: FnMut(&V) -> bool,
    {
        self.filter_kv(|_, v| predicate(v))
    }

    pub fn filter_kv<P>(&self, mut predicate: P) -> Self
    where
        K: Clone,
        V: Clone,
        P: FnMut(&K, &V) -> bool,
    {
        self.rebuild(
            self.table
                .iter()
                .filter(|(_, kv)| predicate(&kv.key, &kv.value))
                .map(|(token, kv)| (token.clone(), kv.clone())),
        )
    }

    /// Stable sort by value.
    pub fn usort<F>(&self, mut comparator: F) -> Self
    where
        K: Clone,
        V: Clone,
        F: FnMut(&V, &V) -> Ordering,
    {
        self.sorted_by(|a, b| comparator(&a.value, &b.value))
    }

    /// Stable sort with a comparator over `(key1, value1, key2, value2)`.
    pub fn usort_kv<F>(&self, mut comparator: F) -> Self
    where
        K: Clone,
        V: Clone,
        F: FnMut(&K, &V, &K, &V) -> Ordering,
    {
        self.sorted_by(|a, b| comparator(&a.key, &a.value, &b.key, &b.value))
    }

    /// Ascending by value. Incomparable values keep their relative order.
    pub fn sort(&self) -> Self
    where
        K: Clone,
        V: Clone + PartialOrd,
    {
        self.usort(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
    }

    pub fn sort_desc(&self) -> Self
    where
        K: Clone,
        V: Clone + PartialOrd,
    {
        self.usort(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal))
    }

    pub fn ksort(&self) -> Self
    where
        K: Clone + PartialOrd,
        V: Clone,
    {
        self.usort_kv(|k1, _, k2, _| k1.partial_cmp(k2).unwrap_or(Ordering::Equal))
    }

    pub fn ksort_desc(&self) -> Self
    where
        K: Clone + PartialOrd,
        V: Clone,
    {
        self.usort_kv(|k1, _, k2, _| k2.partial_cmp(k1).unwrap_or(Ordering::Equal))
    }

    /// Window of the bindings in iteration order.
    ///
    /// A negative `offset` counts from the end and stops at the first
    /// binding. `length` of `None` runs to the end, a negative one stops that
    /// many bindings before the end, a positive one counts from the resolved
    /// offset.
    pub fn slice(&self, offset: isize, length: Option<isize>) -> Self
    where
        K: Clone,
        V: Clone,
    {
        let (start, end) = slice_bounds(self.len(), offset, length);
        self.rebuild(
            self.table
                .iter()
                .skip(start)
                .take(end - start)
                .map(|(token, kv)| (token.clone(), kv.clone())),
        )
    }

    /// Bindings as owned `(key, value)` tuples.
    pub fn to_vec(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Bindings in a natively keyed, insertion-ordered map. Keys that are
    /// structurally distinct but `Eq` to each other collapse, last one wins.
    pub fn to_index_map(&self) -> IndexMap<K, V>
    where
        K: Clone + Hash + Eq,
        V: Clone,
    {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    /// Ordered pairs, the persisted form of the map.
    pub fn export(&self) -> Vec<KVPair<K, V>>
    where
        K: Clone,
        V: Clone,
    {
        self.pairs().cloned().collect()
    }
}

/// Resolve `(offset, length)` against `count` to a half-open index range.
pub(crate) fn slice_bounds(count: usize, offset: isize, length: Option<isize>) -> (usize, usize) {
    let n = isize::try_from(count).unwrap_or(isize::MAX);
    let start = if offset < 0 {
        (n + offset).max(0)
    } else {
        offset.min(n)
    };
    let end = match length {
        None => n,
        Some(l) if l < 0 => n + l,
        Some(l) => start.saturating_add(l),
    };
    let end = end.max(start).min(n);
    (start as usize, end as usize)
}

impl<K: ToValue, V> MutableMap<K, V> {
    fn token<Q: ToValue + ?Sized>(&self, key: &Q) -> Result<Token> {
        self.hasher.hash_of(key)
    }

    /// Map built from `(key, value)` entries. Later duplicates replace
    /// earlier ones in place.
    pub fn of<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut map = Self::new();
        map.put_all(entries)?;
        Ok(map)
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = KVPair<K, V>>,
    {
        let mut map = Self::new();
        map.put_pairs(pairs)?;
        Ok(map)
    }

    /// Map from keys, each bound to `value(&key)`.
    pub fn from_keys<I, F>(keys: I, mut value: F) -> Result<Self>
    where
        I: IntoIterator<Item = K>,
        F: FnMut(&K) -> V,
    {
        let mut map = Self::new();
        for key in keys {
            let v = value(&key);
            map.put(key, v)?;
        }
        Ok(map)
    }

    /// Map from values, each keyed by `key(&value)`.
    pub fn from_values<I, F>(values: I, mut key: F) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        F: FnMut(&V) -> K,
    {
        let mut map = Self::new();
        for value in values {
            let k = key(&value);
            map.put(k, value)?;
        }
        Ok(map)
    }

    /// Bind `key` to `value`, returning the value it replaced. An existing
    /// binding is overwritten in place; a new one goes to the end.
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>> {
        self.put_pair(KVPair::new(key, value))
    }

    pub fn put_pair(&mut self, pair: KVPair<K, V>) -> Result<Option<V>> {
        let token = self.token(&pair.key)?;
        Ok(self.table.insert(token, pair).map(|old| old.value))
    }

    /// Put each pair in order. Stops at the first key that fails to hash,
    /// keeping the pairs already put.
    pub fn put_pairs<I>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = KVPair<K, V>>,
    {
        for pair in pairs {
            self.put_pair(pair)?;
        }
        Ok(())
    }

    pub fn put_all<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.put(key, value)?;
        }
        Ok(())
    }

    /// Run `producer` now and put everything it yields.
    pub fn put_all_from<I, F>(&mut self, producer: F) -> Result<()>
    where
        F: FnOnce() -> I,
        I: IntoIterator<Item = (K, V)>,
    {
        self.put_all(producer())
    }

    /// Remove the binding for `key`, returning its value.
    pub fn remove<Q: ToValue + ?Sized>(&mut self, key: &Q) -> Result<Option<V>> {
        let token = self.token(key)?;
        Ok(self.table.remove(&token).map(|kv| kv.value))
    }

    /// Remove every listed key; returns how many bindings were removed.
    pub fn remove_all<I>(&mut self, keys: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: ToValue,
    {
        let mut removed = 0;
        for key in keys {
            if self.remove(&key)?.is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn contains<Q: ToValue + ?Sized>(&self, key: &Q) -> Result<bool> {
        Ok(self.table.contains(&self.token(key)?))
    }

    pub fn get<Q: ToValue + ?Sized>(&self, key: &Q) -> Result<Option<&V>> {
        Ok(self.get_pair(key)?.map(|kv| &kv.value))
    }

    pub fn get_pair<Q: ToValue + ?Sized>(&self, key: &Q) -> Result<Option<&KVPair<K, V>>> {
        let token = self.token(key)?;
        Ok(self.table.get(&token))
    }

    /// Value for `key`, or `default` when absent.
    pub fn get_or<'a, Q: ToValue + ?Sized>(&'a self, key: &Q, default: &'a V) -> Result<&'a V> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Value for `key`, or the result of `or` when absent. `or` only runs on
    /// a miss.
    pub fn get_or_else<Q, F>(&self, key: &Q, or: F) -> Result<V>
    where
        Q: ToValue + ?Sized,
        V: Clone,
        F: FnOnce() -> V,
    {
        Ok(match self.get(key)? {
            Some(v) => v.clone(),
            None => or(),
        })
    }

    /// Value for `key`, failing with [`Error::KeyNotFound`] when absent.
    pub fn at<Q: ToValue + ?Sized>(&self, key: &Q) -> Result<&V> {
        match self.get(key)? {
            Some(v) => Ok(v),
            None => Err(Error::KeyNotFound(key.to_value()?.to_string())),
        }
    }

    /// New map keyed by `mapper(value)`. Bindings whose new keys collide
    /// keep the position of the first and the value of the last.
    pub fn map_key<NK, F>(&self, mut mapper: F) -> Result<MutableMap<NK, V>>
    where
        NK: ToValue,
        V: Clone,
        F: FnMut(&V) -> NK,
    {
        self.map_key_kv(|_, v| mapper(v))
    }

    pub fn map_key_kv<NK, F>(&self, mut mapper: F) -> Result<MutableMap<NK, V>>
    where
        NK: ToValue,
        V: Clone,
        F: FnMut(&K, &V) -> NK,
    {
        let mut map = MutableMap::with_hasher(Rc::clone(&self.hasher));
        for (k, v) in self {
            map.put(mapper(k, v), v.clone())?;
        }
        Ok(map)
    }

    /// New map from every binding `mapper(value)` yields, in order.
    pub fn flat_map<NK, NV, I, F>(&self, mut mapper: F) -> Result<MutableMap<NK, NV>>
    where
        NK: ToValue,
        I: IntoIterator<Item = (NK, NV)>,
        F: FnMut(&V) -> I,
    {
        self.flat_map_kv(|_, v| mapper(v))
    }

    pub fn flat_map_kv<NK, NV, I, F>(&self, mut mapper: F) -> Result<MutableMap<NK, NV>>
    where
        NK: ToValue,
        I: IntoIterator<Item = (NK, NV)>,
        F: FnMut(&K, &V) -> I,
    {
        let mut map = MutableMap::with_hasher(Rc::clone(&self.hasher));
        for (k, v) in self {
            map.put_all(mapper(k, v))?;
        }
        Ok(map)
    }

    /// Swap keys and values. Values that hash alike collapse, last one wins.
    pub fn flip(&self) -> Result<MutableMap<V, K>>
    where
        K: Clone,
        V: ToValue + Clone,
    {
        let mut map = MutableMap::with_hasher(Rc::clone(&self.hasher));
        for (k, v) in self {
            map.put(v.clone(), k.clone())?;
        }
        Ok(map)
    }
}

impl<K, V> Clone for MutableMap<K, V>
where
    K: Clone,
    V: Clone,
{
    fn clone(&self) -> Self {
        Self {
            hasher: Rc::clone(&self.hasher),
            table: self.table.clone(),
        }
    }
}

impl<K, V> Default for MutableMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Equal when both maps hold the same tokens in the same order, bound to
/// equal values.
impl<K, V: PartialEq> PartialEq for MutableMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .table
                .iter()
                .zip(other.table.iter())
                .all(|((ta, a), (tb, b))| ta == tb && a.value == b.value)
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for MutableMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Serialize, V: Serialize> Serialize for MutableMap<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.pairs())
    }
}

/// Keys are re-hashed through the default global hasher.
impl<'de, K, V> Deserialize<'de> for MutableMap<K, V>
where
    K: Deserialize<'de> + ToValue,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let pairs = Vec::<KVPair<K, V>>::deserialize(deserializer)?;
        Self::from_pairs(pairs).map_err(de::Error::custom)
    }
}

/// Iterator over `(key, value)` in insertion order.
pub struct Iter<'a, K, V> {
    inner: token_table::Iter<'a, KVPair<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, kv)| (&kv.key, &kv.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, kv)| (&kv.key, &kv.value))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Iterator over stored pairs in insertion order.
pub struct Pairs<'a, K, V> {
    inner: token_table::Iter<'a, KVPair<K, V>>,
}

impl<'a, K, V> Iterator for Pairs<'a, K, V> {
    type Item = &'a KVPair<K, V>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, kv)| kv)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Pairs<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, kv)| kv)
    }
}

impl<K, V> ExactSizeIterator for Pairs<'_, K, V> {}

/// Owning iterator over `(key, value)` in insertion order.
pub struct IntoIter<K, V> {
    inner: token_table::IntoIter<KVPair<K, V>>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, kv)| kv.into_parts())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

impl<'a, K, V> IntoIterator for &'a MutableMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K, V> IntoIterator for MutableMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> IntoIter<K, V> {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}
