//! Function and symbol definitions.
//!
//! Behavior varies per head through a definition record holding optional
//! handler closures. Dispatch is an explicit lookup-then-call through the
//! scope stack; the engine core never embeds library-specific logic.

use crate::domain::Domain;
use crate::engine::ComputeEngine;
use ce_ast::{ExprId, NumericValue, Sgn};
use std::rc::Rc;

// ============================================================================
// Handler slots
// ============================================================================

/// Custom canonical-form constructor. The result is trusted to be canonical.
pub type CanonicalHandler = Rc<dyn Fn(&mut ComputeEngine, &[ExprId]) -> ExprId>;

/// Simplification step for one node; `None` means no change.
pub type SimplifyHandler = Rc<dyn Fn(&mut ComputeEngine, &[ExprId]) -> Option<ExprId>>;

/// Numeric (N) evaluation; may use floating point, bignum and complex
/// arithmetic. `None` means the node stays symbolic.
pub type NumericHandler = Rc<dyn Fn(&mut ComputeEngine, &[ExprId]) -> Option<ExprId>>;

/// Sign of an application given its operands.
pub type SignHandler = Rc<dyn Fn(&mut ComputeEngine, &[ExprId]) -> Sgn>;

/// Compilation to a target form. Reserved slot; no built-in fills it.
pub type CompileHandler = Rc<dyn Fn(&ComputeEngine, &[ExprId]) -> Option<String>>;

/// Exact symbolic evaluation: either a native handler or a template
/// expression with positional wildcards (`_1`, `_2`, `_`, `__`, `_#`)
/// substituted before evaluation.
#[derive(Clone)]
pub enum EvalHandler {
    Fn(Rc<dyn Fn(&mut ComputeEngine, &[ExprId]) -> Option<ExprId>>),
    Template(ExprId),
}

// ============================================================================
// Flags and policies
// ============================================================================

/// Algebraic properties of a function head.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FunctionFlags {
    pub commutative: bool,
    pub associative: bool,
    pub idempotent: bool,
    pub involution: bool,
    pub threadable: bool,
    /// Pure: the value depends only on the operands; results may be cached.
    pub pure_fn: bool,
    /// Inert: simplify replaces the node by its first operand.
    pub inert: bool,
    /// Scoped: entering the node pushes a scope (binds local symbols).
    pub scoped: bool,
}

/// Which operand positions are exempt from automatic evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HoldPolicy {
    #[default]
    None,
    All,
    First,
    Rest,
    Last,
    Most,
}

impl HoldPolicy {
    /// Is the operand at `index` (0-based, of `arity` operands) held?
    pub fn holds(self, index: usize, arity: usize) -> bool {
        match self {
            HoldPolicy::None => false,
            HoldPolicy::All => true,
            HoldPolicy::First => index == 0,
            HoldPolicy::Rest => index > 0,
            HoldPolicy::Last => arity > 0 && index == arity - 1,
            HoldPolicy::Most => arity > 0 && index < arity - 1,
        }
    }
}

/// Argument and result domains of a function head.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    /// Required positional argument domains.
    pub args: Vec<Domain>,
    /// Domain accepted for any further arguments; `None` means the
    /// signature is fixed-arity.
    pub rest: Option<Domain>,
    pub result: Domain,
}

impl Signature {
    pub fn variadic(domain: Domain, result: Domain) -> Self {
        Self {
            args: Vec::new(),
            rest: Some(domain),
            result,
        }
    }

    pub fn fixed(args: Vec<Domain>, result: Domain) -> Self {
        Self {
            args,
            rest: None,
            result,
        }
    }
}

// ============================================================================
// Function definition
// ============================================================================

/// Everything the engine knows about a function head.
#[derive(Clone)]
pub struct FunctionDef {
    pub name: String,
    pub flags: FunctionFlags,
    /// Sort/cost band used for commutative ordering and the rewrite cost
    /// heuristic. Additive heads sit in the 1000s, multiplicative in the
    /// 2000s, powers/roots in the 3000s, exponential/logarithmic in the
    /// 4000s, trigonometric in the 5000s, big operators in the 6000s.
    pub complexity: u32,
    pub hold: HoldPolicy,
    pub signature: Signature,
    pub canonical: Option<CanonicalHandler>,
    pub simplify: Option<SimplifyHandler>,
    pub evaluate: Option<EvalHandler>,
    pub numeric_eval: Option<NumericHandler>,
    pub sgn: Option<SignHandler>,
    /// Reserved; always `None` in the standard library.
    pub compile: Option<CompileHandler>,
}

impl FunctionDef {
    /// A definition with no flags, no handlers and an `Anything*` signature.
    pub fn new(name: &str, complexity: u32) -> Self {
        Self {
            name: name.to_string(),
            flags: FunctionFlags::default(),
            complexity,
            hold: HoldPolicy::None,
            signature: Signature::variadic(Domain::Anything, Domain::Anything),
            canonical: None,
            simplify: None,
            evaluate: None,
            numeric_eval: None,
            sgn: None,
            compile: None,
        }
    }
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("flags", &self.flags)
            .field("complexity", &self.complexity)
            .field("hold", &self.hold)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Symbol definition
// ============================================================================

/// The value bound to a symbol.
#[derive(Clone)]
pub enum SymbolValue {
    Literal(NumericValue),
    Expression(ExprId),
    /// Value depends on the requested precision (e.g. π).
    PrecisionFn(Rc<dyn Fn(u32) -> NumericValue>),
}

/// Boolean assumption flags, settable independently of a concrete value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssumptionFlags {
    pub is_integer: Option<bool>,
    pub is_rational: Option<bool>,
    pub is_real: Option<bool>,
    pub is_positive: Option<bool>,
    pub is_negative: Option<bool>,
    pub is_nonzero: Option<bool>,
}

/// Everything the engine knows about a symbol.
#[derive(Clone)]
pub struct SymbolDef {
    pub domain: Domain,
    pub value: Option<SymbolValue>,
    pub constant: bool,
    /// Held symbols substitute at evaluation time only, never eagerly.
    pub hold: bool,
    pub assumptions: AssumptionFlags,
}

impl SymbolDef {
    pub fn variable(domain: Domain) -> Self {
        Self {
            domain,
            value: None,
            constant: false,
            hold: false,
            assumptions: AssumptionFlags::default(),
        }
    }

    pub fn constant_value(domain: Domain, value: SymbolValue) -> Self {
        Self {
            domain,
            value: Some(value),
            constant: true,
            hold: true,
            assumptions: AssumptionFlags::default(),
        }
    }
}

impl std::fmt::Debug for SymbolDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolDef")
            .field("domain", &self.domain)
            .field("constant", &self.constant)
            .field("hold", &self.hold)
            .field("assumptions", &self.assumptions)
            .finish_non_exhaustive()
    }
}
