//! The compute engine: one `Context` arena, a scope stack, numeric
//! configuration and the signal channel.
//!
//! All operations are synchronous and single-threaded; re-entrancy happens
//! only through nested calls (a handler invoking `simplify` on a
//! sub-expression). Mutating configuration (precision, numeric mode,
//! assumptions) invalidates dependent caches via `unbind`.

use crate::canonical;
use crate::definitions::{FunctionDef, SymbolDef, SymbolValue};
use crate::error::{EngineError, Signal, Warning};
use crate::evaluate;
use crate::library;
use crate::order;
use crate::rules::RuleSet;
use crate::scope::{ResourceLimits, Scope, ScopeStack};
use crate::sign;
use crate::simplify;
use ce_ast::{has_no_errors, Context, Expr, ExprId, NumericValue, Sgn};
use std::cmp::Ordering;
use std::rc::Rc;
use std::time::Instant;
use tracing::debug;

/// Which numeric representations the N pipeline may produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NumericMode {
    /// Pick the widest representation the computation needs.
    #[default]
    Auto,
    /// Machine floats only; bignum results are down-converted.
    Machine,
    /// Machine + arbitrary-precision decimal; complex results are
    /// down-converted to their real part.
    Bignum,
    /// Everything, including complex literals.
    Complex,
}

const DEFAULT_RECURSION_LIMIT: u32 = 512;
const DEFAULT_ITERATION_LIMIT: u32 = 100;

/// Engine instance owning all shared state.
pub struct ComputeEngine {
    pub ctx: Context,
    pub(crate) scopes: ScopeStack,
    numeric_mode: NumericMode,
    precision: u32,
    /// Chop threshold for `is_equal`.
    pub tolerance: f64,
    signal_handler: Option<Rc<dyn Fn(&Signal)>>,
    std_rules: Option<Rc<RuleSet>>,
    pub(crate) depth: u32,
    pub(crate) deadline: Option<Instant>,
}

impl Default for ComputeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeEngine {
    /// Engine with the standard library registered in the global scope.
    pub fn new() -> Self {
        let mut ng = Self::empty();
        library::register_standard(&mut ng);
        let rules = library::standard_rules(&mut ng);
        ng.std_rules = Some(Rc::new(rules));
        ng
    }

    /// Engine with no definitions at all. Used by tests and by library
    /// bootstrap.
    pub fn empty() -> Self {
        Self {
            ctx: Context::new(),
            scopes: ScopeStack::new(),
            numeric_mode: NumericMode::default(),
            precision: 21,
            tolerance: 1e-10,
            signal_handler: None,
            std_rules: None,
            depth: 0,
            deadline: None,
        }
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    pub fn numeric_mode(&self) -> NumericMode {
        self.numeric_mode
    }

    /// Changing the numeric mode invalidates cached numeric values.
    pub fn set_numeric_mode(&mut self, mode: NumericMode) {
        if self.numeric_mode != mode {
            self.numeric_mode = mode;
            self.ctx.unbind_all();
        }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Changing the precision invalidates cached numeric values (π at 50
    /// digits is not π at 21 digits).
    pub fn set_precision(&mut self, digits: u32) {
        if self.precision != digits {
            self.precision = digits.max(1);
            self.ctx.unbind_all();
        }
    }

    /// Install the handler that receives warnings and fatal signals.
    pub fn on_signal(&mut self, handler: impl Fn(&Signal) + 'static) {
        self.signal_handler = Some(Rc::new(handler));
    }

    pub(crate) fn signal(&self, signal: Signal) {
        if let Some(h) = &self.signal_handler {
            h(&signal);
        } else if let Signal::Fatal(e) = &signal {
            debug!("fatal signal with no handler installed: {}", e);
        }
    }

    pub(crate) fn warn(&self, warning: Warning) {
        self.signal(Signal::Warning(warning));
    }

    pub(crate) fn standard_rules(&self) -> Option<Rc<RuleSet>> {
        self.std_rules.clone()
    }

    // ------------------------------------------------------------------
    // Scopes, definitions, assumptions
    // ------------------------------------------------------------------

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    pub fn push_scope_with_limits(&mut self, limits: ResourceLimits) {
        self.scopes.push(Scope::with_limits(limits));
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.depth()
    }

    /// Declare a function in the innermost scope.
    pub fn declare_function(&mut self, def: FunctionDef) {
        self.scopes
            .innermost_mut()
            .functions
            .insert(def.name.clone(), Rc::new(def));
    }

    /// Declare a symbol in the innermost scope.
    pub fn declare_symbol(&mut self, name: &str, def: SymbolDef) {
        self.scopes
            .innermost_mut()
            .symbols
            .insert(name.to_string(), def);
    }

    pub fn function_def(&self, name: &str) -> Option<Rc<FunctionDef>> {
        self.scopes.function(name)
    }

    pub fn symbol_def(&self, name: &str) -> Option<SymbolDef> {
        self.scopes.symbol(name).cloned()
    }

    /// Record a truth assumption in the innermost scope. Invalidates all
    /// cached values and canonical bindings.
    pub fn assume(&mut self, expr: ExprId, truth: bool) {
        self.scopes.innermost_mut().assumptions.push((expr, truth));
        self.ctx.unbind_all();
    }

    /// Innermost assumption recorded for a structurally-equal expression.
    pub fn assumption_for(&self, expr: ExprId) -> Option<bool> {
        self.scopes
            .assumptions()
            .find(|(e, _)| self.ctx.is_same(*e, expr))
            .map(|(_, t)| *t)
    }

    pub fn effective_limits(&self) -> ResourceLimits {
        self.scopes.effective_limits()
    }

    pub(crate) fn iteration_limit(&self) -> u32 {
        self.effective_limits()
            .iteration_limit
            .unwrap_or(DEFAULT_ITERATION_LIMIT)
    }

    // ------------------------------------------------------------------
    // Cooperative guards
    // ------------------------------------------------------------------

    /// Enter one recursion level. Returns false (and emits a fatal signal)
    /// past the limit; the caller must then return its input unchanged.
    pub(crate) fn enter(&mut self) -> bool {
        self.depth += 1;
        let limit = self
            .effective_limits()
            .recursion_limit
            .unwrap_or(DEFAULT_RECURSION_LIMIT);
        if self.depth > limit {
            self.signal(Signal::Fatal(EngineError::RecursionLimit(limit)));
            false
        } else {
            true
        }
    }

    pub(crate) fn leave(&mut self) {
        debug_assert!(self.depth > 0);
        self.depth -= 1;
    }

    /// Check the soft memory mark; emits a warning when crossed.
    pub(crate) fn check_memory(&self) {
        if let Some(low_water) = self.effective_limits().memory_low_water_nodes {
            let nodes = self.ctx.stats().nodes_created;
            if nodes > low_water {
                self.warn(Warning::MemoryLowWater { nodes, low_water });
            }
        }
    }

    /// True if the hard time budget for the current top-level operation has
    /// elapsed.
    pub(crate) fn out_of_time(&self) -> bool {
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    /// Arm the deadline from the innermost time limit. Called on entry to a
    /// top-level operation; nested calls keep the outer deadline.
    pub(crate) fn arm_deadline(&mut self) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        if let Some(ms) = self.effective_limits().time_limit_ms {
            self.deadline = Some(Instant::now() + std::time::Duration::from_millis(ms));
            return true;
        }
        false
    }

    pub(crate) fn disarm_deadline(&mut self) {
        self.deadline = None;
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Canonical form. Idempotent: the canonical form of a canonical
    /// expression is itself (same `ExprId`).
    pub fn canonical(&mut self, id: ExprId) -> ExprId {
        canonical::canonical(self, id)
    }

    /// Exact simplification with the standard rule set.
    pub fn simplify(&mut self, id: ExprId) -> ExprId {
        simplify::simplify(self, id, None)
    }

    /// Exact simplification with caller-supplied rules appended.
    pub fn simplify_with(&mut self, id: ExprId, rules: &RuleSet) -> ExprId {
        simplify::simplify(self, id, Some(rules))
    }

    /// Exact symbolic evaluation. No floating point on this path.
    pub fn evaluate(&mut self, id: ExprId) -> ExprId {
        evaluate::evaluate(self, id)
    }

    /// Numeric evaluation governed by the numeric mode and precision.
    pub fn n(&mut self, id: ExprId) -> ExprId {
        evaluate::n_evaluate(self, id)
    }

    /// Sign of an expression.
    pub fn sgn(&mut self, id: ExprId) -> Sgn {
        sign::sgn(self, id)
    }

    /// Total order over canonical expressions (commutative sort key).
    pub fn compare(&self, a: ExprId, b: ExprId) -> Ordering {
        order::compare(self, a, b)
    }

    /// Structural equality.
    pub fn is_same(&self, a: ExprId, b: ExprId) -> bool {
        self.ctx.is_same(a, b)
    }

    /// Mathematical equality: the difference N-evaluates to (approximately)
    /// zero, with structural equality as fallback.
    pub fn is_equal(&mut self, a: ExprId, b: ExprId) -> bool {
        if self.ctx.is_same(a, b) {
            return true;
        }
        let neg_b = self.ctx.call("Negate", vec![b]);
        let diff = self.ctx.call("Add", vec![a, neg_b]);
        let evaluated = self.n(diff);
        if let Expr::Number(n) = self.ctx.get(evaluated) {
            match n {
                NumericValue::Complex(c) => c.norm() < self.tolerance,
                other => {
                    let f = other.to_f64();
                    f.is_finite() && f.abs() < self.tolerance
                }
            }
        } else {
            false
        }
    }

    /// Validity: no error markers anywhere, and every canonical
    /// function head resolves to a known definition.
    pub fn is_valid(&self, id: ExprId) -> bool {
        if !has_no_errors(&self.ctx, id) {
            return false;
        }
        if !self.ctx.is_canonical(id) {
            return true;
        }
        let mut ok = true;
        self.ctx.walk(id, &mut |n| {
            if let Some(name) = self.ctx.head_name(n) {
                if self.function_def(name).is_none() {
                    ok = false;
                }
            }
        });
        ok
    }

    /// Box a symbol's value for exact evaluation, if it substitutes eagerly.
    pub(crate) fn symbol_value_expr(&mut self, name: &str) -> Option<ExprId> {
        let def = self.symbol_def(name)?;
        if def.hold {
            return None;
        }
        match def.value? {
            SymbolValue::Literal(v) => Some(self.ctx.number(v)),
            SymbolValue::Expression(e) => Some(e),
            // Precision-dependent values stay symbolic on the exact path.
            SymbolValue::PrecisionFn(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_change_unbinds() {
        let mut ng = ComputeEngine::empty();
        let n = ng.ctx.num(2);
        ng.ctx.cache_value(n, NumericValue::int(2));
        ng.set_precision(50);
        assert!(ng.ctx.cached_value(n).is_none());
    }

    #[test]
    fn test_assume_and_lookup() {
        let mut ng = ComputeEngine::empty();
        let x = ng.ctx.sym("x");
        let zero = ng.ctx.num(0);
        let gt = ng.ctx.call("Greater", vec![x, zero]);
        ng.assume(gt, true);

        let x2 = ng.ctx.sym("x");
        let zero2 = ng.ctx.num(0);
        let gt2 = ng.ctx.call("Greater", vec![x2, zero2]);
        assert_eq!(ng.assumption_for(gt2), Some(true));
    }

    #[test]
    fn test_scope_masking_functions() {
        let mut ng = ComputeEngine::empty();
        ng.declare_function(FunctionDef::new("F", 1000));
        ng.push_scope();
        ng.declare_function(FunctionDef::new("F", 2000));
        assert_eq!(ng.function_def("F").unwrap().complexity, 2000);
        ng.pop_scope();
        assert_eq!(ng.function_def("F").unwrap().complexity, 1000);
    }

    #[test]
    fn test_signal_handler_receives_warnings() {
        use std::cell::Cell;
        use std::rc::Rc;
        let count = Rc::new(Cell::new(0));
        let mut ng = ComputeEngine::empty();
        let c = count.clone();
        ng.on_signal(move |_| c.set(c.get() + 1));
        ng.warn(Warning::IterationLimit { limit: 3 });
        assert_eq!(count.get(), 1);
    }
}
