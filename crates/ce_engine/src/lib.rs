//! Canonicalization, pattern rewriting and evaluation over boxed
//! expressions.

pub mod canonical;
pub mod definitions;
pub mod domain;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod library;
pub mod order;
pub mod pattern;
pub mod rules;
pub mod scope;
pub mod sign;
pub mod simplify;

pub use definitions::{
    AssumptionFlags, EvalHandler, FunctionDef, FunctionFlags, HoldPolicy, Signature, SymbolDef,
    SymbolValue,
};
pub use domain::{Domain, Variance};
pub use engine::{ComputeEngine, NumericMode};
pub use error::{EngineError, Signal, Warning};
pub use pattern::{match_pattern, substitute, substitute_positional, Bindings, WildcardKind};
pub use rules::{replace, ReplaceOptions, Rule, RuleSet};
pub use scope::{ResourceLimits, Scope};
