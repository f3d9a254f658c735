//! canonmap: ordered maps keyed by value structure rather than identity,
//! built on a structural hashing engine that turns arbitrary nested values
//! into canonical tokens.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: any value (scalars, strings, nested lists, associative
//!   collections, user objects) can key a map, and two keys address the
//!   same binding exactly when they have the same structure.
//! - Layers:
//!   - Encoder: value -> token. Integers stay native; everything else
//!     becomes a string whose first character identifies the shape, with
//!     reserved sentinels escaped inside string payloads.
//!   - NormalizerRegistry: class -> normalizer. Objects of a registered
//!     class (or of a class whose ancestors or capabilities are registered)
//!     are reduced to a surrogate value and encoded as `prefix@surrogate`;
//!     everything else hashes by identity as `#id`.
//!   - IdentityCache: object allocation -> token, holding only `Weak`
//!     references so caching never keeps an object alive.
//!   - StructuralHasher: the facade combining the three; locks itself on
//!     the first `hash` so every token it issues is computed against one
//!     registry.
//!   - TokenTable: insertion-ordered store indexed by token, backing
//!     `MutableMap` (in-place updates) and `Map` (persistent updates that
//!     share unchanged instances).
//!
//! Constraints
//! - Single-threaded: `!Send`/`!Sync` (shared state is `Rc` + `Cell`/
//!   `RefCell`).
//! - Determinism: equal structures give equal tokens for the lifetime of a
//!   hasher. Identity tokens (`#id`) are only stable within one hasher.
//! - No `RefCell` borrow is held while a user normalizer runs, so a
//!   normalizer may hash other values through the same hasher.
//!
//! Hasher and rehashing invariants
//! - Each table entry stores a precomputed `u64` hash of its token and the
//!   index always uses the stored hash; tokens are never rehashed after
//!   insertion.
//!
//! Notes and non-goals
//! - No cycle detection: a value that contains itself recurses until the
//!   optional depth limit (`HasherOptions::max_depth`) trips, or forever
//!   without one.
//! - Floats use their shortest round-trip decimal form, so nested `1.0`
//!   and `1` share a token.
//! - The global hashers are per thread; each test thread starts fresh.

mod depth;
mod encoder;
mod error;
mod hasher;
mod identity_cache;
mod kv_pair;
mod map;
mod mutable_map;
mod object;
mod registry;
mod token;
mod token_table;
mod token_table_proptest;
mod value;

// Public surface
pub use error::{Error, Result};
pub use hasher::{register_object_normalizer, Flavor, HasherOptions, StructuralHasher};
pub use kv_pair::KVPair;
pub use map::Map;
pub use mutable_map::{IntoIter, Iter, MutableMap, Pairs};
pub use object::{Class, Object, Record, DATE_TIME_INTERFACE};
pub use token::Token;
pub use value::{ResourceId, ToValue, Value};
