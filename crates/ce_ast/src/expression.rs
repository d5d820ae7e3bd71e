//! The boxed expression tree.
//!
//! Expressions live in an append-only arena (`Context`) and are referenced by
//! `ExprId`. Nodes are immutable once added; lazily-computed facts (canonical
//! form, evaluated numeric value) are one-shot caches in side tables, filled
//! once and reused until `unbind` clears them.
//!
//! Per-node metadata (source LaTeX, external identifier) is also a side table
//! and never affects structural identity.

use crate::numeric::NumericValue;
use crate::symbol::{SymbolId, SymbolTable};
use rustc_hash::{FxHashMap, FxHashSet};

/// Index of an expression node in its `Context` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub u32);

/// An expression node. The universal value of the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal; exactly one representation populated (see `NumericValue`).
    Number(NumericValue),
    /// Identifier naming a constant, variable or function head.
    Symbol(SymbolId),
    /// String literal.
    Str(String),
    /// Function application. The head is usually a `Symbol` node but may be
    /// any expression, e.g. `InverseFunction(Sin)` applied to an argument.
    Function(ExprId, Vec<ExprId>),
    /// Ordered mapping of string keys to expressions.
    Dict(Vec<(String, ExprId)>),
}

/// Source metadata attached to a node. Never part of structural identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta {
    pub latex: Option<String>,
    pub wikidata: Option<String>,
}

/// Arena statistics, used by the memory low-water check.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextStats {
    pub nodes_created: u64,
}

/// Append-only expression arena with interned symbols and one-shot caches.
#[derive(Debug, Default)]
pub struct Context {
    nodes: Vec<Expr>,
    symbols: SymbolTable,
    meta: FxHashMap<ExprId, Meta>,
    /// Cache: non-canonical node -> its canonical form. Filled by the engine.
    canonical_cache: FxHashMap<ExprId, ExprId>,
    /// Nodes known to be in canonical form.
    canonical_set: FxHashSet<ExprId>,
    /// Cache: pure node -> its evaluated numeric value.
    value_cache: FxHashMap<ExprId, NumericValue>,
    stats: ContextStats,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Add a node to the arena.
    pub fn push(&mut self, expr: Expr) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(expr);
        self.stats.nodes_created += 1;
        id
    }

    pub fn num(&mut self, n: i64) -> ExprId {
        self.push(Expr::Number(NumericValue::int(n)))
    }

    pub fn rational(&mut self, n: i64, d: i64) -> ExprId {
        self.push(Expr::Number(NumericValue::rational(n, d)))
    }

    pub fn number(&mut self, v: NumericValue) -> ExprId {
        self.push(Expr::Number(v))
    }

    pub fn sym(&mut self, name: &str) -> ExprId {
        let id = self.symbols.intern(name);
        self.push(Expr::Symbol(id))
    }

    pub fn str(&mut self, s: &str) -> ExprId {
        self.push(Expr::Str(s.to_string()))
    }

    /// Function application with a symbol head.
    pub fn call(&mut self, head: &str, args: Vec<ExprId>) -> ExprId {
        let h = self.sym(head);
        self.push(Expr::Function(h, args))
    }

    /// Function application with an expression head.
    pub fn apply(&mut self, head: ExprId, args: Vec<ExprId>) -> ExprId {
        self.push(Expr::Function(head, args))
    }

    // ------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------

    #[inline]
    pub fn get(&self, id: ExprId) -> &Expr {
        &self.nodes[id.0 as usize]
    }

    #[inline]
    pub fn sym_name(&self, id: SymbolId) -> &str {
        self.symbols.resolve(id)
    }

    pub fn intern(&mut self, name: &str) -> SymbolId {
        self.symbols.intern(name)
    }

    pub fn sym_id(&self, name: &str) -> Option<SymbolId> {
        self.symbols.get_id(name)
    }

    /// Name of a node if it is a symbol.
    pub fn symbol_name(&self, id: ExprId) -> Option<&str> {
        match self.get(id) {
            Expr::Symbol(s) => Some(self.sym_name(*s)),
            _ => None,
        }
    }

    /// Head name of a function application whose head is a symbol.
    pub fn head_name(&self, id: ExprId) -> Option<&str> {
        match self.get(id) {
            Expr::Function(h, _) => self.symbol_name(*h),
            _ => None,
        }
    }

    /// Operands of a function application with the given symbol head.
    pub fn args_of(&self, id: ExprId, head: &str) -> Option<&[ExprId]> {
        match self.get(id) {
            Expr::Function(h, args) if self.symbol_name(*h) == Some(head) => Some(args),
            _ => None,
        }
    }

    pub fn is_symbol(&self, id: ExprId, name: &str) -> bool {
        self.symbol_name(id) == Some(name)
    }

    /// Numeric literal value of a node, if it is one.
    pub fn numeric_value(&self, id: ExprId) -> Option<&NumericValue> {
        match self.get(id) {
            Expr::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_integer(&self, id: ExprId) -> Option<i64> {
        self.numeric_value(id).and_then(|n| n.as_i64())
    }

    pub fn stats(&self) -> ContextStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    pub fn set_meta(&mut self, id: ExprId, meta: Meta) {
        self.meta.insert(id, meta);
    }

    pub fn meta(&self, id: ExprId) -> Option<&Meta> {
        self.meta.get(&id)
    }

    // ------------------------------------------------------------------
    // Canonical / value caches
    // ------------------------------------------------------------------

    /// Mark a node as being in canonical form. One-directional.
    pub fn mark_canonical(&mut self, id: ExprId) {
        self.canonical_set.insert(id);
    }

    pub fn is_canonical(&self, id: ExprId) -> bool {
        self.canonical_set.contains(&id)
    }

    /// Record the canonical form computed for a (non-canonical) node.
    pub fn cache_canonical(&mut self, id: ExprId, canonical: ExprId) {
        self.canonical_cache.insert(id, canonical);
    }

    pub fn cached_canonical(&self, id: ExprId) -> Option<ExprId> {
        if self.canonical_set.contains(&id) {
            return Some(id);
        }
        self.canonical_cache.get(&id).copied()
    }

    pub fn cache_value(&mut self, id: ExprId, value: NumericValue) {
        self.value_cache.insert(id, value);
    }

    pub fn cached_value(&self, id: ExprId) -> Option<&NumericValue> {
        self.value_cache.get(&id)
    }

    /// Drop the cached canonical form and numeric value of one node.
    /// Called when precision or assumptions change underneath it.
    pub fn unbind(&mut self, id: ExprId) {
        self.canonical_cache.remove(&id);
        self.value_cache.remove(&id);
    }

    /// Drop every cached value and canonical link (global invalidation).
    /// Canonical *status* is structural and survives; bindings do not.
    pub fn unbind_all(&mut self) {
        self.canonical_cache.clear();
        self.value_cache.clear();
    }

    // ------------------------------------------------------------------
    // Structural equality
    // ------------------------------------------------------------------

    /// Structural equality: equal heads and operand sequences, order
    /// sensitive. Metadata is ignored. This is the cheap/weak notion;
    /// mathematical equality lives in the engine.
    pub fn is_same(&self, a: ExprId, b: ExprId) -> bool {
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (Expr::Number(x), Expr::Number(y)) => x == y,
            (Expr::Symbol(x), Expr::Symbol(y)) => x == y,
            (Expr::Str(x), Expr::Str(y)) => x == y,
            (Expr::Function(h1, a1), Expr::Function(h2, a2)) => {
                a1.len() == a2.len()
                    && self.is_same(*h1, *h2)
                    && a1.iter().zip(a2.iter()).all(|(x, y)| self.is_same(*x, *y))
            }
            (Expr::Dict(d1), Expr::Dict(d2)) => {
                d1.len() == d2.len()
                    && d1
                        .iter()
                        .zip(d2.iter())
                        .all(|((k1, v1), (k2, v2))| k1 == k2 && self.is_same(*v1, *v2))
            }
            _ => false,
        }
    }

    /// Number of nodes in the subtree rooted at `id`.
    pub fn node_count(&self, id: ExprId) -> usize {
        match self.get(id) {
            Expr::Function(h, args) => {
                1 + self.node_count(*h)
                    + args.iter().map(|a| self.node_count(*a)).sum::<usize>()
            }
            Expr::Dict(entries) => {
                1 + entries
                    .iter()
                    .map(|(_, v)| self.node_count(*v))
                    .sum::<usize>()
            }
            _ => 1,
        }
    }

    /// Depth-first walk over the subtree, head before operands.
    pub fn walk(&self, id: ExprId, f: &mut impl FnMut(ExprId)) {
        f(id);
        match self.get(id) {
            Expr::Function(h, args) => {
                self.walk(*h, f);
                for a in args.clone() {
                    self.walk(a, f);
                }
            }
            Expr::Dict(entries) => {
                for (_, v) in entries.clone() {
                    self.walk(v, f);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_get() {
        let mut ctx = Context::new();
        let two = ctx.num(2);
        let x = ctx.sym("x");
        let mul = ctx.call("Multiply", vec![two, x]);
        assert_eq!(ctx.head_name(mul), Some("Multiply"));
        assert_eq!(ctx.args_of(mul, "Multiply").map(|a| a.len()), Some(2));
    }

    #[test]
    fn test_is_same_ignores_ids() {
        let mut ctx = Context::new();
        let a1 = ctx.num(1);
        let a2 = ctx.num(1);
        assert_ne!(a1, a2);
        assert!(ctx.is_same(a1, a2));
    }

    #[test]
    fn test_is_same_order_sensitive() {
        let mut ctx = Context::new();
        let x = ctx.sym("x");
        let y = ctx.sym("y");
        let xy = ctx.call("Add", vec![x, y]);
        let x2 = ctx.sym("x");
        let y2 = ctx.sym("y");
        let yx = ctx.call("Add", vec![y2, x2]);
        assert!(!ctx.is_same(xy, yx));
    }

    #[test]
    fn test_metadata_does_not_affect_identity() {
        let mut ctx = Context::new();
        let a = ctx.num(7);
        let b = ctx.num(7);
        ctx.set_meta(
            a,
            Meta {
                latex: Some("7".to_string()),
                wikidata: None,
            },
        );
        assert!(ctx.is_same(a, b));
    }

    #[test]
    fn test_canonical_cache_one_shot() {
        let mut ctx = Context::new();
        let a = ctx.num(1);
        let b = ctx.num(2);
        let sum = ctx.call("Add", vec![a, b]);
        assert_eq!(ctx.cached_canonical(sum), None);
        ctx.mark_canonical(sum);
        assert_eq!(ctx.cached_canonical(sum), Some(sum));
    }

    #[test]
    fn test_unbind_clears_value() {
        let mut ctx = Context::new();
        let n = ctx.num(3);
        ctx.cache_value(n, NumericValue::int(3));
        assert!(ctx.cached_value(n).is_some());
        ctx.unbind(n);
        assert!(ctx.cached_value(n).is_none());
    }

    #[test]
    fn test_node_count() {
        let mut ctx = Context::new();
        let a = ctx.num(1);
        let x = ctx.sym("x");
        let m = ctx.call("Multiply", vec![a, x]);
        // Multiply node + head symbol + two operands
        assert_eq!(ctx.node_count(m), 4);
    }
}
