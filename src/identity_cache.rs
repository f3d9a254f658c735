//! Identity cache: object allocation -> token.
//!
//! Entries are keyed by the address of the object's `Rc` allocation and hold
//! a `Weak`, so caching never extends the object's lifetime. While an entry
//! exists its `Weak` pins the allocation, which keeps the address from being
//! handed to an unrelated object. Dead entries are dropped by `sweep`, run
//! automatically whenever the table has doubled since the last sweep.

use crate::object::Object;
use crate::token::Token;
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::debug;

const MIN_SWEEP_THRESHOLD: usize = 64;

struct CachedToken {
    object: Weak<dyn Object>,
    token: Token,
}

pub(crate) struct IdentityCache {
    entries: HashMap<usize, CachedToken>,
    sweep_at: usize,
    next_id: u64,
}

#[inline]
fn address(object: &Rc<dyn Object>) -> usize {
    Rc::as_ptr(object).cast::<()>() as usize
}

impl IdentityCache {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
            sweep_at: MIN_SWEEP_THRESHOLD,
            next_id: 0,
        }
    }

    pub(crate) fn get(&self, object: &Rc<dyn Object>) -> Option<Token> {
        self.entries
            .get(&address(object))
            .filter(|cached| cached.object.strong_count() > 0)
            .map(|cached| cached.token.clone())
    }

    /// Store `token` for `object` unless a live entry already exists, and
    /// return whichever token ends up cached.
    pub(crate) fn insert(&mut self, object: &Rc<dyn Object>, token: Token) -> Token {
        if self.entries.len() >= self.sweep_at {
            self.sweep();
        }
        let key = address(object);
        if let Some(cached) = self.entries.get(&key) {
            if cached.object.strong_count() > 0 {
                return cached.token.clone();
            }
        }
        self.entries.insert(
            key,
            CachedToken {
                object: Rc::downgrade(object),
                token: token.clone(),
            },
        );
        token
    }

    /// Next id for an object hashed by identity. Ids are never reused.
    pub(crate) fn next_object_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Drop entries whose object is gone. Returns the number evicted.
    pub(crate) fn sweep(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, cached| cached.object.strong_count() > 0);
        let live = self.entries.len();
        self.sweep_at = (live * 2).max(MIN_SWEEP_THRESHOLD);
        let evicted = before - live;
        debug!(evicted, live, "swept identity cache");
        evicted
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Default for IdentityCache {
    fn default() -> Self {
        Self::new()
    }
}
