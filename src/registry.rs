//! Object normalizer registry: class name -> normalizer, with fallback
//! resolution through ancestors and capabilities.

use crate::error::{Error, Result};
use crate::object::{Class, Object};
use crate::value::Value;
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::trace;

pub(crate) type NormalizeFn = dyn Fn(&dyn Object) -> Result<Value>;

/// A registered normalizer and the prefix that tags its tokens.
pub(crate) struct Normalizer {
    pub(crate) prefix: Rc<str>,
    pub(crate) normalize: Rc<NormalizeFn>,
}

/// Outcome of resolving a concrete class.
#[derive(Clone)]
pub(crate) enum Resolution {
    Normalizer(Rc<Normalizer>),
    Identity,
}

#[derive(Default)]
pub(crate) struct NormalizerRegistry {
    registered: HashMap<String, Rc<Normalizer>>,
    // Memo per concrete class; only filled once hashing has begun.
    resolved: HashMap<&'static str, Resolution>,
}

impl NormalizerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register `normalize` for every class in `classes`. The prefix defaults
    /// to the class names joined with `|`. Returns the effective prefix.
    pub(crate) fn register(
        &mut self,
        classes: &[&str],
        normalize: Rc<NormalizeFn>,
        prefix: Option<&str>,
    ) -> Result<Rc<str>> {
        let prefix = match prefix {
            Some(p) => p.to_owned(),
            None => classes.join("|"),
        };
        validate_prefix(&prefix)?;
        Ok(self.insert(classes, normalize, prefix.into()))
    }

    /// Register with a prefix already known to be valid.
    pub(crate) fn insert(
        &mut self,
        classes: &[&str],
        normalize: Rc<NormalizeFn>,
        prefix: Rc<str>,
    ) -> Rc<str> {
        debug_assert!(validate_prefix(&prefix).is_ok());
        let normalizer = Rc::new(Normalizer {
            prefix: Rc::clone(&prefix),
            normalize,
        });
        for class in classes {
            self.registered
                .insert((*class).to_owned(), Rc::clone(&normalizer));
        }
        prefix
    }

    /// Resolve the handler for a concrete class: exact name, then ancestors
    /// nearest first, then capabilities, then identity. Memoized.
    pub(crate) fn resolve(&mut self, class: &'static Class) -> Resolution {
        if let Some(resolution) = self.resolved.get(class.name()) {
            return resolution.clone();
        }
        let found = class
            .lookup_chain()
            .find_map(|name| self.registered.get(name).map(|n| (name, Rc::clone(n))));
        let resolution = match found {
            Some((via, normalizer)) => {
                trace!(class = class.name(), via, "resolved object normalizer");
                Resolution::Normalizer(normalizer)
            }
            None => {
                trace!(class = class.name(), "no normalizer; hashing by identity");
                Resolution::Identity
            }
        };
        self.resolved.insert(class.name(), resolution.clone());
        resolution
    }

    #[cfg(test)]
    pub(crate) fn resolved_len(&self) -> usize {
        self.resolved.len()
    }
}

/// Prefixes are limited to word characters, dots, pipes and backslashes so
/// they can never contain a grammar sentinel.
pub(crate) fn validate_prefix(prefix: &str) -> Result<()> {
    let valid = !prefix.is_empty()
        && prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '|' | '\\'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidPrefix(prefix.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Leaf;

    static LEAF: Class = Class::new("Leaf")
        .extends(&["Middle", "Base"])
        .implements(&["Printable", "Comparable"]);

    impl Object for Leaf {
        fn class(&self) -> &'static Class {
            &LEAF
        }
    }

    fn constant(tag: &'static str) -> Rc<NormalizeFn> {
        Rc::new(move |_: &dyn Object| -> Result<Value> { Ok(Value::from(tag)) })
    }

    fn prefix_of(resolution: &Resolution) -> Option<&str> {
        match resolution {
            Resolution::Normalizer(n) => Some(&n.prefix),
            Resolution::Identity => None,
        }
    }

    #[test]
    fn valid_prefixes_are_accepted() {
        for prefix in ["abc", "123", "a.b.c", "A\\B\\C", "A|B", "snake_case"] {
            assert!(validate_prefix(prefix).is_ok(), "{prefix}");
        }
    }

    #[test]
    fn reserved_characters_are_rejected() {
        for prefix in ["[", "]", "#", "@", ",", ":", "`", "a b", "", "DateTime<Utc>"] {
            assert_eq!(
                validate_prefix(prefix),
                Err(Error::InvalidPrefix(prefix.to_owned()))
            );
        }
    }

    #[test]
    fn default_prefix_joins_class_names() {
        let mut registry = NormalizerRegistry::new();
        let prefix = registry
            .register(&["A", "B"], constant("x"), None)
            .unwrap();
        assert_eq!(&*prefix, "A|B");
    }

    /// Invariant: the nearest ancestor wins over farther ancestors and over
    /// capabilities; capabilities win over identity.
    #[test]
    fn resolution_order() {
        let mut registry = NormalizerRegistry::new();
        registry.register(&["Comparable"], constant("c"), None).unwrap();
        assert_eq!(prefix_of(&registry.resolve(&LEAF)), Some("Comparable"));

        let mut registry = NormalizerRegistry::new();
        registry.register(&["Printable"], constant("p"), None).unwrap();
        registry.register(&["Comparable"], constant("c"), None).unwrap();
        assert_eq!(prefix_of(&registry.resolve(&LEAF)), Some("Printable"));

        let mut registry = NormalizerRegistry::new();
        registry.register(&["Base"], constant("b"), None).unwrap();
        registry.register(&["Printable"], constant("p"), None).unwrap();
        assert_eq!(prefix_of(&registry.resolve(&LEAF)), Some("Base"));

        let mut registry = NormalizerRegistry::new();
        registry.register(&["Base"], constant("b"), None).unwrap();
        registry.register(&["Middle"], constant("m"), None).unwrap();
        registry.register(&["Leaf"], constant("l"), Some("Custom")).unwrap();
        assert_eq!(prefix_of(&registry.resolve(&LEAF)), Some("Custom"));

        let mut registry = NormalizerRegistry::new();
        assert_eq!(prefix_of(&registry.resolve(&LEAF)), None);
    }

    #[test]
    fn resolution_is_memoized_per_class() {
        let mut registry = NormalizerRegistry::new();
        registry.register(&["Base"], constant("b"), None).unwrap();
        let first = registry.resolve(&LEAF);
        let second = registry.resolve(&LEAF);
        assert_eq!(registry.resolved_len(), 1);
        match (first, second) {
            (Resolution::Normalizer(a), Resolution::Normalizer(b)) => assert!(Rc::ptr_eq(&a, &b)),
            _ => panic!("expected normalizer resolutions"),
        }
    }

    #[test]
    fn normalizer_sees_the_object() {
        let mut registry = NormalizerRegistry::new();
        let normalize: Rc<NormalizeFn> =
            Rc::new(|o: &dyn Object| -> Result<Value> { Ok(Value::from(o.class().name())) });
        registry.register(&["Leaf"], normalize, None).unwrap();
        let Resolution::Normalizer(n) = registry.resolve(&LEAF) else {
            panic!("expected a normalizer");
        };
        let surrogate = (n.normalize)(&Leaf).unwrap();
        assert_eq!(surrogate.to_string(), "\"Leaf\"");
    }
}
