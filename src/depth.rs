//! Nesting-depth limiter for the encoder.
//!
//! Single-threaded counter of how deep the current encoding walk is. Each
//! container or object normalization enters one level and the returned
//! guard leaves it on drop, so an early `?` return unwinds the count
//! correctly. Without a maximum it only counts.

use crate::error::{Error, Result};
use core::cell::Cell;
use core::marker::PhantomData;

#[derive(Debug)]
pub(crate) struct DepthLimit {
    depth: Cell<usize>,
    max: Option<usize>,
    // Keep !Send + !Sync in line with single-threaded design.
    _nosend: PhantomData<*mut ()>,
}

impl DepthLimit {
    pub(crate) const fn new(max: Option<usize>) -> Self {
        Self {
            depth: Cell::new(0),
            max,
            _nosend: PhantomData,
        }
    }

    /// Enter one level. Fails once the configured maximum would be exceeded.
    #[inline]
    pub(crate) fn enter(&self) -> Result<DepthGuard<'_>> {
        let next = self.depth.get() + 1;
        if let Some(max) = self.max {
            if next > max {
                return Err(Error::DepthExceeded(max));
            }
        }
        self.depth.set(next);
        Ok(DepthGuard { owner: self })
    }

    pub(crate) fn current(&self) -> usize {
        self.depth.get()
    }
}

/// RAII guard returned by `DepthLimit::enter`.
pub(crate) struct DepthGuard<'a> {
    owner: &'a DepthLimit,
}

impl<'a> Drop for DepthGuard<'a> {
    fn drop(&mut self) {
        let d = self.owner.depth.get();
        debug_assert!(d > 0);
        self.owner.depth.set(d - 1);
    }
}

#[cfg(test)]
mod tests {
    use super::DepthLimit;
    use crate::error::Error;

    #[test]
    fn enter_and_exit_restores_depth() {
        let limit = DepthLimit::new(None);
        {
            let _g1 = limit.enter().unwrap();
            let _g2 = limit.enter().unwrap();
            assert_eq!(limit.current(), 2);
        }
        assert_eq!(limit.current(), 0);
    }

    #[test]
    fn exceeding_the_maximum_fails_without_counting() {
        let limit = DepthLimit::new(Some(1));
        let _g1 = limit.enter().unwrap();
        assert!(matches!(limit.enter(), Err(Error::DepthExceeded(1))));
        assert_eq!(limit.current(), 1);
    }

    #[test]
    fn unbounded_limit_never_fails() {
        let limit = DepthLimit::new(None);
        let guards: Vec<_> = (0..10_000).map(|_| limit.enter().unwrap()).collect();
        assert_eq!(limit.current(), 10_000);
        drop(guards);
        assert_eq!(limit.current(), 0);
    }
}
