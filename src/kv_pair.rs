//! Immutable key/value pair stored by the maps.

use serde::{Deserialize, Serialize};

/// A key together with its value, exactly as the caller supplied them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KVPair<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> KVPair<K, V> {
    pub const fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    /// Same value under a new key.
    pub fn with_key<NK>(self, key: NK) -> KVPair<NK, V> {
        KVPair::new(key, self.value)
    }

    /// Same key with a new value.
    pub fn with_value<NV>(self, value: NV) -> KVPair<K, NV> {
        KVPair::new(self.key, value)
    }

    /// Swap the roles of key and value.
    pub fn flip(self) -> KVPair<V, K> {
        KVPair::new(self.value, self.key)
    }

    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K, V> From<(K, V)> for KVPair<K, V> {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

impl<K, V> From<KVPair<K, V>> for (K, V) {
    fn from(pair: KVPair<K, V>) -> Self {
        pair.into_parts()
    }
}

#[cfg(test)]
mod tests {
    use super::KVPair;

    #[test]
    fn projections_do_not_touch_the_source() {
        let kv = KVPair::new("a", 1);
        let renamed = kv.clone().with_key(10u8);
        let revalued = kv.clone().with_value("one");

        assert_eq!(kv, KVPair::new("a", 1));
        assert_eq!(renamed, KVPair::new(10u8, 1));
        assert_eq!(revalued, KVPair::new("a", "one"));
    }

    #[test]
    fn flip_swaps_roles() {
        let flipped = KVPair::new("key", 2.5).flip();
        assert_eq!(flipped.key, 2.5);
        assert_eq!(flipped.value, "key");
        assert_eq!(flipped.flip().into_parts(), ("key", 2.5));
    }
}
