//! Interned names for signals, fragments, ports and clock domains.

use lasso::ThreadedRodeo;
use serde::{Deserialize, Serialize};

/// An interned name.
///
/// Names are stored once in an [`Interner`] and referred to by a `u32` index,
/// giving O(1) equality and copying. An `Ident` is only meaningful together
/// with the interner that produced it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Ident(u32);

impl Ident {
    /// Creates an `Ident` from a raw index, for deserialization and tests.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index of this identifier.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

// SAFETY: `Ident` wraps a `u32`, which always fits in `usize` on supported
// targets, and `try_from_usize` rejects values that do not fit in `u32`.
unsafe impl lasso::Key for Ident {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Ident)
    }
}

/// String interner owned by a single design.
///
/// Each design carries its own interner rather than sharing a process-wide
/// table, so independent designs built in one process never observe each
/// other's names.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Interner {
    rodeo: ThreadedRodeo<Ident>,
}

impl Interner {
    /// Creates an empty interner.
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Interns `s`, returning the existing identifier when already present.
    pub fn get_or_intern(&self, s: &str) -> Ident {
        self.rodeo.get_or_intern(s)
    }

    /// Looks up `s` without interning it.
    pub fn get(&self, s: &str) -> Option<Ident> {
        self.rodeo.get(s)
    }

    /// Resolves an identifier back to its string.
    ///
    /// # Panics
    ///
    /// Panics if `ident` was not produced by this interner.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.rodeo.resolve(&ident)
    }

    /// Resolves an identifier, returning `None` for foreign identifiers.
    pub fn try_resolve(&self, ident: Ident) -> Option<&str> {
        self.rodeo.try_resolve(&ident)
    }

    /// Returns the number of distinct interned strings.
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    /// Returns `true` if nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Interner {
    fn clone(&self) -> Self {
        let mut entries: Vec<(Ident, &str)> = self.rodeo.iter().collect();
        entries.sort_by_key(|(key, _)| *key);
        let copy = Self::new();
        for (_, s) in entries {
            copy.get_or_intern(s);
        }
        copy
    }
}

impl std::fmt::Debug for Interner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interner").field("len", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_resolve_roundtrip() {
        let interner = Interner::new();
        let id = interner.get_or_intern("count");
        assert_eq!(interner.resolve(id), "count");
    }

    #[test]
    fn same_name_same_ident() {
        let interner = Interner::new();
        assert_eq!(interner.get_or_intern("clk"), interner.get_or_intern("clk"));
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn lookup_does_not_intern() {
        let interner = Interner::new();
        assert_eq!(interner.get("rst"), None);
        assert!(interner.is_empty());
        let id = interner.get_or_intern("rst");
        assert_eq!(interner.get("rst"), Some(id));
    }

    #[test]
    fn clone_preserves_indices() {
        let interner = Interner::new();
        let a = interner.get_or_intern("a");
        let b = interner.get_or_intern("b");
        let copy = interner.clone();
        assert_eq!(copy.resolve(a), "a");
        assert_eq!(copy.resolve(b), "b");
    }

    #[test]
    fn foreign_ident_does_not_resolve() {
        let interner = Interner::new();
        assert_eq!(interner.try_resolve(Ident::from_raw(7)), None);
    }

    #[test]
    fn interner_serde_keeps_indices() {
        let interner = Interner::new();
        let clk = interner.get_or_intern("clk");
        let count = interner.get_or_intern("count");
        let json = serde_json::to_string(&interner).unwrap();
        let back: Interner = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.resolve(clk), "clk");
        assert_eq!(back.resolve(count), "count");
        assert_eq!(back.get("count"), Some(count));
    }

    #[test]
    fn serde_roundtrip() {
        let id = Ident::from_raw(42);
        let json = serde_json::to_string(&id).unwrap();
        let back: Ident = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
