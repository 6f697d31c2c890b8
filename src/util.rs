//! Shared utilities: unsigned lexicographic byte comparison and the
//! recursion-depth guard (spec.md §4.5, §4.3 "Depth guard").

use std::cell::Cell;

use crate::error::{TlvError, TlvResult};

/// Unsigned byte-by-byte comparison; a shorter buffer is smaller on a
/// common prefix (spec.md §4.5). Used to order SET children in DER
/// canonical order and to check that order on strict parse.
pub fn compare_unsigned_lex(a: &[u8], b: &[u8]) -> std::cmp::Ordering {
    let min_len = a.len().min(b.len());
    for i in 0..min_len {
        match a[i].cmp(&b[i]) {
            std::cmp::Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

/// A per-call recursion guard (spec.md §4.3): increments on descent,
/// decrements on return (even on failure), and refuses to exceed
/// `max_depth`.
pub struct DepthGuard {
    current: Cell<usize>,
    max_depth: usize,
}

impl DepthGuard {
    pub fn new(max_depth: usize) -> Self {
        Self {
            current: Cell::new(0),
            max_depth,
        }
    }

    /// Enter one level of recursion, returning a token that restores the
    /// counter on drop regardless of how the caller's frame exits.
    pub fn enter(&self, context: &str) -> TlvResult<DepthToken<'_>> {
        let depth = self.current.get() + 1;
        if depth > self.max_depth {
            log::warn!("max_depth {} exceeded while descending into {context}", self.max_depth);
            return Err(TlvError::DepthExceeded(format!(
                "exceeded max_depth {} while descending into {context}",
                self.max_depth
            )));
        }
        self.current.set(depth);
        Ok(DepthToken { guard: self })
    }
}

/// RAII token: decrements the depth counter when dropped.
pub struct DepthToken<'a> {
    guard: &'a DepthGuard,
}

impl Drop for DepthToken<'_> {
    fn drop(&mut self) {
        let depth = self.guard.current.get();
        self.guard.current.set(depth.saturating_sub(1));
    }
}
