//! Symbol interning for identifiers.
//!
//! Every identifier (variable, constant, function head, wildcard) is stored
//! once and referenced by `SymbolId`, so comparisons on hot paths are integer
//! comparisons instead of string comparisons.

use rustc_hash::FxHashMap;

/// Unique identifier for an interned symbol.
///
/// Using usize for direct Vec indexing without casts.
pub type SymbolId = usize;

/// Symbol table for interning identifiers.
///
/// # Design
/// - `strings`: canonical storage, indexed by SymbolId
/// - `lookup`: reverse map for O(1) intern check
///
/// # Thread Safety
/// Not thread-safe. Intended for single-threaded use within `Context`.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    strings: Vec<String>,
    lookup: FxHashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its SymbolId.
    ///
    /// If the string is already interned, returns the existing id.
    pub fn intern(&mut self, s: &str) -> SymbolId {
        if let Some(&id) = self.lookup.get(s) {
            return id;
        }
        let id = self.strings.len();
        let owned = s.to_string();
        self.strings.push(owned.clone());
        self.lookup.insert(owned, id);
        id
    }

    /// Resolve a SymbolId back to its string.
    ///
    /// # Panics
    /// Panics if id is invalid (out of bounds).
    #[inline]
    pub fn resolve(&self, id: SymbolId) -> &str {
        &self.strings[id]
    }

    /// Get id for a string if it exists, without interning.
    #[inline]
    pub fn get_id(&self, s: &str) -> Option<SymbolId> {
        self.lookup.get(s).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_roundtrip() {
        let mut table = SymbolTable::new();
        let id = table.intern("x");
        assert_eq!(table.resolve(id), "x");
    }

    #[test]
    fn test_intern_deduplication() {
        let mut table = SymbolTable::new();
        let id1 = table.intern("Pi");
        let id2 = table.intern("Pi");
        assert_eq!(id1, id2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_get_id_missing() {
        let table = SymbolTable::new();
        assert_eq!(table.get_id("Missing"), None);
    }

    #[test]
    fn test_unicode_symbols() {
        let mut table = SymbolTable::new();
        let alpha = table.intern("α");
        let beta = table.intern("β");
        assert_ne!(alpha, beta);
        assert_eq!(table.resolve(alpha), "α");
    }
}
