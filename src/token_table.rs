//! TokenTable: insertion-ordered store keyed by [`Token`].
//!
//! Entries live in a `SlotMap` and are threaded on a doubly linked list in
//! insertion order; a `HashTable` of slot keys indexes them by token. Each
//! entry keeps its precomputed hash so the index never rehashes a token.

use crate::token::Token;
use core::hash::BuildHasher;
use hashbrown::hash_table::Entry as TableEntry;
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

#[derive(Debug, Clone)]
struct Entry<V> {
    token: Token,
    value: V,
    hash: u64,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

#[derive(Clone)]
pub(crate) struct TokenTable<V, S = RandomState> {
    hasher: S,
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, Entry<V>>,
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

impl<V> TokenTable<V> {
    pub(crate) fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<V> Default for TokenTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, S: BuildHasher> TokenTable<V, S> {
    pub(crate) fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            index: HashTable::new(),
            slots: SlotMap::with_key(),
            head: None,
            tail: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn find(&self, token: &Token) -> Option<DefaultKey> {
        let hash = self.hasher.hash_one(token);
        self.index
            .find(hash, |&k| {
                self.slots
                    .get(k)
                    .map(|e| e.token == *token)
                    .unwrap_or(false)
            })
            .copied()
    }

    pub(crate) fn contains(&self, token: &Token) -> bool {
        self.find(token).is_some()
    }

    pub(crate) fn get(&self, token: &Token) -> Option<&V> {
        let k = self.find(token)?;
        self.slots.get(k).map(|e| &e.value)
    }

    /// Insert or replace. A replaced entry keeps its position and its
    /// original token; the previous value is returned.
    pub(crate) fn insert(&mut self, token: Token, value: V) -> Option<V> {
        let hash = self.hasher.hash_one(&token);
        match self.index.entry(
            hash,
            |&kk| {
                self.slots
                    .get(kk)
                    .map(|e| e.token == token)
                    .unwrap_or(false)
            },
            |&kk| self.slots.get(kk).map(|e| e.hash).unwrap_or(0),
        ) {
            TableEntry::Occupied(o) => {
                let k = *o.get();
                self.slots
                    .get_mut(k)
                    .map(|e| core::mem::replace(&mut e.value, value))
            }
            TableEntry::Vacant(v) => {
                let k = self.slots.insert(Entry {
                    token,
                    value,
                    hash,
                    prev: self.tail,
                    next: None,
                });
                let _ = v.insert(k);
                self.link_back(k);
                None
            }
        }
    }

    pub(crate) fn remove(&mut self, token: &Token) -> Option<V> {
        let hash = self.hasher.hash_one(token);
        let slots = &self.slots;
        let (k, _) = self
            .index
            .find_entry(hash, |&kk| {
                slots.get(kk).map(|e| e.token == *token).unwrap_or(false)
            })
            .ok()?
            .remove();
        let entry = self.slots.remove(k)?;
        self.unlink(entry.prev, entry.next);
        Some(entry.value)
    }

    pub(crate) fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.head = None;
        self.tail = None;
    }

    pub(crate) fn first(&self) -> Option<(&Token, &V)> {
        let e = self.slots.get(self.head?)?;
        Some((&e.token, &e.value))
    }

    pub(crate) fn last(&self) -> Option<(&Token, &V)> {
        let e = self.slots.get(self.tail?)?;
        Some((&e.token, &e.value))
    }

    pub(crate) fn iter(&self) -> Iter<'_, V> {
        Iter {
            slots: &self.slots,
            front: self.head,
            back: self.tail,
            remaining: self.slots.len(),
        }
    }

    fn link_back(&mut self, k: DefaultKey) {
        match self.tail.and_then(|t| self.slots.get_mut(t)) {
            Some(tail) => tail.next = Some(k),
            None => self.head = Some(k),
        }
        self.tail = Some(k);
    }

    fn unlink(&mut self, prev: Option<DefaultKey>, next: Option<DefaultKey>) {
        match prev.and_then(|p| self.slots.get_mut(p)) {
            Some(p) => p.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.slots.get_mut(n)) {
            Some(n) => n.prev = prev,
            None => self.tail = prev,
        }
    }
}

impl<V, S: BuildHasher + Default> FromIterator<(Token, V)> for TokenTable<V, S> {
    fn from_iter<I: IntoIterator<Item = (Token, V)>>(iter: I) -> Self {
        let mut table = Self::with_hasher(S::default());
        table.extend(iter);
        table
    }
}

impl<V, S: BuildHasher> Extend<(Token, V)> for TokenTable<V, S> {
    fn extend<I: IntoIterator<Item = (Token, V)>>(&mut self, iter: I) {
        for (token, value) in iter {
            self.insert(token, value);
        }
    }
}

/// Iterator over entries in insertion order.
pub(crate) struct Iter<'a, V> {
    slots: &'a SlotMap<DefaultKey, Entry<V>>,
    front: Option<DefaultKey>,
    back: Option<DefaultKey>,
    remaining: usize,
}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a Token, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let e = self.slots.get(self.front?)?;
        self.front = e.next;
        self.remaining -= 1;
        Some((&e.token, &e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> DoubleEndedIterator for Iter<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let e = self.slots.get(self.back?)?;
        self.back = e.prev;
        self.remaining -= 1;
        Some((&e.token, &e.value))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

/// Owning iterator in insertion order.
pub(crate) struct IntoIter<V> {
    slots: SlotMap<DefaultKey, Entry<V>>,
    front: Option<DefaultKey>,
}

impl<V> Iterator for IntoIter<V> {
    type Item = (Token, V);

    fn next(&mut self) -> Option<Self::Item> {
        let e = self.slots.remove(self.front?)?;
        self.front = e.next;
        Some((e.token, e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.slots.len(), Some(self.slots.len()))
    }
}

impl<V> ExactSizeIterator for IntoIter<V> {}

impl<V, S> IntoIterator for TokenTable<V, S> {
    type Item = (Token, V);
    type IntoIter = IntoIter<V>;

    fn into_iter(self) -> IntoIter<V> {
        IntoIter {
            slots: self.slots,
            front: self.head,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::hash::Hasher;

    fn tokens<V, S: BuildHasher>(t: &TokenTable<V, S>) -> Vec<Token> {
        t.iter().map(|(k, _)| k.clone()).collect()
    }

    /// Invariant: replacing an existing token keeps its position and returns
    /// the previous value.
    #[test]
    fn insert_replaces_in_place() {
        let mut t: TokenTable<&str> = TokenTable::new();
        assert_eq!(t.insert(Token::Int(1), "a"), None);
        assert_eq!(t.insert(Token::from("`b`"), "b"), None);
        assert_eq!(t.insert(Token::Int(3), "c"), None);
        assert_eq!(t.insert(Token::from("`b`"), "B"), Some("b"));

        let values: Vec<_> = t.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, ["a", "B", "c"]);
        assert_eq!(t.len(), 3);
    }

    /// Invariant: removal unlinks the entry and preserves the order of the
    /// remaining ones; re-inserting appends at the end.
    #[test]
    fn remove_relinks_neighbours() {
        let mut t: TokenTable<i32> = (1..=4).map(|i| (Token::Int(i), i as i32)).collect();
        assert_eq!(t.remove(&Token::Int(1)), Some(1));
        assert_eq!(t.remove(&Token::Int(3)), Some(3));
        assert_eq!(t.remove(&Token::Int(3)), None);
        assert_eq!(tokens(&t), [Token::Int(2), Token::Int(4)]);
        assert_eq!(t.first(), Some((&Token::Int(2), &2)));
        assert_eq!(t.last(), Some((&Token::Int(4), &4)));

        t.insert(Token::Int(1), 10);
        assert_eq!(tokens(&t), [Token::Int(2), Token::Int(4), Token::Int(1)]);

        assert_eq!(t.remove(&Token::Int(1)), Some(10));
        assert_eq!(t.remove(&Token::Int(2)), Some(2));
        assert_eq!(t.remove(&Token::Int(4)), Some(4));
        assert!(t.is_empty());
        assert_eq!(t.first(), None);
        assert_eq!(t.last(), None);
    }

    #[test]
    fn iteration_is_double_ended_and_exact() {
        let t: TokenTable<i32> = (0..5).map(|i| (Token::Int(i), i as i32)).collect();
        let mut it = t.iter();
        assert_eq!(it.len(), 5);
        assert_eq!(it.next().map(|(_, v)| *v), Some(0));
        assert_eq!(it.next_back().map(|(_, v)| *v), Some(4));
        let middle: Vec<_> = it.map(|(_, v)| *v).collect();
        assert_eq!(middle, [1, 2, 3]);

        let back: Vec<_> = t.iter().rev().map(|(_, v)| *v).collect();
        assert_eq!(back, [4, 3, 2, 1, 0]);

        let owned: Vec<_> = t.into_iter().map(|(_, v)| v).collect();
        assert_eq!(owned, [0, 1, 2, 3, 4]);
    }

    /// Invariant: integer and string tokens never collide, even when their
    /// text matches.
    #[test]
    fn integer_and_string_tokens_are_distinct() {
        let mut t: TokenTable<i32> = TokenTable::new();
        t.insert(Token::Int(1), 1);
        t.insert(Token::from("1"), 2);
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(&Token::Int(1)), Some(&1));
        assert_eq!(t.get(&Token::from("1")), Some(&2));
    }

    /// Invariant: lookups work under heavy hash collisions; equality resolves
    /// to the correct entry.
    #[test]
    fn collision_handling_with_const_hasher() {
        #[derive(Clone, Default)]
        struct ConstBuildHasher;
        struct ConstHasher;
        impl BuildHasher for ConstBuildHasher {
            type Hasher = ConstHasher;
            fn build_hasher(&self) -> Self::Hasher {
                ConstHasher
            }
        }
        impl Hasher for ConstHasher {
            fn write(&mut self, _bytes: &[u8]) {}
            fn finish(&self) -> u64 {
                0
            } // force all tokens into the same hash bucket
        }

        let mut t: TokenTable<i32, ConstBuildHasher> = TokenTable::with_hasher(ConstBuildHasher);
        t.insert(Token::from("`a`"), 1);
        t.insert(Token::from("`b`"), 2);
        t.insert(Token::from("`a`"), 3);
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(&Token::from("`a`")), Some(&3));
        assert_eq!(t.remove(&Token::from("`a`")), Some(3));
        assert_eq!(t.get(&Token::from("`b`")), Some(&2));
        assert!(!t.contains(&Token::from("`a`")));
    }

    /// Invariant: clones are independent.
    #[test]
    fn clone_is_independent() {
        let mut a: TokenTable<i32> = TokenTable::new();
        a.insert(Token::Int(1), 1);
        let mut b = a.clone();
        b.insert(Token::Int(2), 2);
        b.insert(Token::Int(1), 10);
        assert_eq!(a.len(), 1);
        assert_eq!(a.get(&Token::Int(1)), Some(&1));
        assert_eq!(tokens(&b), [Token::Int(1), Token::Int(2)]);
    }

    #[test]
    fn clear_resets_order() {
        let mut t: TokenTable<i32> = (0..3).map(|i| (Token::Int(i), i as i32)).collect();
        t.clear();
        assert!(t.is_empty());
        t.insert(Token::Int(9), 9);
        assert_eq!(tokens(&t), [Token::Int(9)]);
    }
}
