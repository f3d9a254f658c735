//! Hashing facade: encoder + normalizer registry + identity cache.
//!
//! A `StructuralHasher` starts unlocked. Normalizers may be registered until
//! the first `hash` call, which locks it for good; every token issued after
//! that point is computed against the same registry, so equal values always
//! produce equal tokens for the lifetime of the hasher.

use crate::depth::DepthLimit;
use crate::encoder::{Encoder, ObjectTokens, OBJECT_DATA_PREFIX, OBJECT_ID_PREFIX};
use crate::error::{Error, Result};
use crate::identity_cache::IdentityCache;
use crate::object::{self, Object, DATE_TIME_INTERFACE};
use crate::registry::{NormalizeFn, NormalizerRegistry, Resolution};
use crate::token::Token;
use crate::value::{ToValue, Value};
use core::cell::{Cell, RefCell};
use core::fmt;
use std::rc::Rc;
use tracing::debug;

/// The two historical hasher flavors. They behave identically; each has its
/// own global instance.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Flavor {
    Unique,
    #[default]
    Perfect,
}

/// Tunables for a [`StructuralHasher`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HasherOptions {
    /// Maximum nesting of containers and normalized objects. `None` (the
    /// default) leaves recursion unbounded.
    pub max_depth: Option<usize>,
}

impl HasherOptions {
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }
}

pub struct StructuralHasher {
    flavor: Flavor,
    locked: Cell<bool>,
    registry: RefCell<NormalizerRegistry>,
    identities: RefCell<IdentityCache>,
    depth: DepthLimit,
}

thread_local! {
    static UNIQUE: Rc<StructuralHasher> =
        Rc::new(StructuralHasher::with_default_normalizers(Flavor::Unique));
    static PERFECT: Rc<StructuralHasher> =
        Rc::new(StructuralHasher::with_default_normalizers(Flavor::Perfect));
}

impl StructuralHasher {
    /// Empty hasher: no normalizers, every object hashes by identity.
    pub fn new(flavor: Flavor) -> Self {
        Self::with_options(flavor, HasherOptions::default())
    }

    pub fn with_options(flavor: Flavor, options: HasherOptions) -> Self {
        Self {
            flavor,
            locked: Cell::new(false),
            registry: RefCell::new(NormalizerRegistry::new()),
            identities: RefCell::new(IdentityCache::new()),
            depth: DepthLimit::new(options.max_depth),
        }
    }

    /// Hasher pre-seeded with normalizers for [`Record`](crate::Record),
    /// the date/time objects and [`KVPair`](crate::KVPair).
    pub fn with_default_normalizers(flavor: Flavor) -> Self {
        let hasher = Self::new(flavor);
        {
            let mut registry = hasher.registry.borrow_mut();
            seed(&mut registry, "Record", object::normalize_record);
            seed(&mut registry, DATE_TIME_INTERFACE, object::normalize_date_time);
            seed(&mut registry, "KVPair", object::normalize_kv_pair);
        }
        debug!(?flavor, "seeded default object normalizers");
        hasher
    }

    /// Per-thread shared hasher for `flavor`, created on first use with the
    /// default normalizers.
    pub fn global(flavor: Flavor) -> Rc<Self> {
        match flavor {
            Flavor::Unique => UNIQUE.with(Rc::clone),
            Flavor::Perfect => PERFECT.with(Rc::clone),
        }
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// True once any value has been hashed.
    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }

    /// Number of objects currently held in the identity cache, live or not.
    pub fn cached_objects(&self) -> usize {
        self.identities.borrow().len()
    }

    /// Drop identity-cache entries for objects that no longer exist.
    pub fn sweep_identity_cache(&self) -> usize {
        self.identities.borrow_mut().sweep()
    }

    /// Register `normalize` for every class in `classes`.
    ///
    /// Objects of a registered class (or of a class whose ancestors or
    /// capabilities include one) hash as `prefix@` followed by the token of
    /// the normalized surrogate. `prefix` defaults to the class names joined
    /// with `|` and may only contain ASCII letters, digits, `_`, `.`, `|` and
    /// `\`.
    ///
    /// Fails with [`Error::RegistrationLocked`] once the hasher has produced
    /// a token.
    pub fn register_normalizer<F, R>(
        &self,
        classes: &[&str],
        normalize: F,
        prefix: Option<&str>,
    ) -> Result<()>
    where
        F: Fn(&dyn Object) -> R + 'static,
        R: ToValue,
    {
        if self.is_locked() {
            return Err(Error::RegistrationLocked);
        }
        let normalize: Rc<NormalizeFn> =
            Rc::new(move |object: &dyn Object| normalize(object).to_value());
        let prefix = self
            .registry
            .borrow_mut()
            .register(classes, normalize, prefix)?;
        debug!(?classes, prefix = &*prefix, "registered object normalizer");
        Ok(())
    }

    /// Alias of [`register_normalizer`](Self::register_normalizer).
    pub fn register_hasher<F, R>(
        &self,
        classes: &[&str],
        normalize: F,
        prefix: Option<&str>,
    ) -> Result<()>
    where
        F: Fn(&dyn Object) -> R + 'static,
        R: ToValue,
    {
        self.register_normalizer(classes, normalize, prefix)
    }

    /// Canonical token of `value`. Locks the hasher.
    pub fn hash(&self, value: &Value) -> Result<Token> {
        self.lock();
        Encoder::new(self, &self.depth).encode(value)
    }

    /// Convert `value` and hash it. Locks the hasher even when the conversion
    /// fails.
    pub fn hash_of<T: ToValue + ?Sized>(&self, value: &T) -> Result<Token> {
        self.lock();
        self.hash(&value.to_value()?)
    }

    fn lock(&self) {
        if !self.locked.replace(true) {
            debug!(flavor = ?self.flavor, "hasher locked; normalizer registration closed");
        }
    }
}

fn seed(
    registry: &mut NormalizerRegistry,
    class: &'static str,
    normalize: fn(&dyn Object) -> Result<Value>,
) {
    registry.insert(&[class], Rc::new(normalize), class.into());
}

impl ObjectTokens for StructuralHasher {
    fn object_token(&self, object: &Rc<dyn Object>) -> Result<Token> {
        if let Some(token) = self.identities.borrow().get(object) {
            return Ok(token);
        }
        // Registry borrow ends here; the normalizer below may re-enter `hash`.
        let resolution = self.registry.borrow_mut().resolve(object.class());
        let token = match resolution {
            Resolution::Normalizer(normalizer) => {
                let _guard = self.depth.enter()?;
                let surrogate = (normalizer.normalize)(&**object)?;
                let inner = Encoder::new(self, &self.depth).encode(&surrogate)?;
                let mut out = String::with_capacity(normalizer.prefix.len() + 16);
                out.push_str(&normalizer.prefix);
                out.push(OBJECT_DATA_PREFIX);
                inner.write_into(&mut out);
                Token::from(out)
            }
            Resolution::Identity => {
                let id = self.identities.borrow_mut().next_object_id();
                Token::from(format!("{OBJECT_ID_PREFIX}{id}"))
            }
        };
        Ok(self.identities.borrow_mut().insert(object, token))
    }
}

impl Default for StructuralHasher {
    fn default() -> Self {
        Self::with_default_normalizers(Flavor::default())
    }
}

impl fmt::Debug for StructuralHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuralHasher")
            .field("flavor", &self.flavor)
            .field("locked", &self.locked.get())
            .field("cached_objects", &self.cached_objects())
            .finish()
    }
}

/// Register a normalizer on the default global hasher, the one maps use
/// unless given another.
pub fn register_object_normalizer<F, R>(
    classes: &[&str],
    normalize: F,
    prefix: Option<&str>,
) -> Result<()>
where
    F: Fn(&dyn Object) -> R + 'static,
    R: ToValue,
{
    StructuralHasher::global(Flavor::default()).register_normalizer(classes, normalize, prefix)
}
