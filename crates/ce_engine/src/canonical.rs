//! Canonical-form construction.
//!
//! The pipeline for a function application:
//! 1. canonicalize every operand, skipping held positions
//! 2. normalize placeholders: splice `Sequence` operands, drop `Nothing`
//! 3. flatten nested same-head operands when the head is associative
//! 4. delegate to the definition's custom `canonical` handler if present
//!    (its result is trusted to be canonical)
//! 5. otherwise apply the generic structural rules: involution,
//!    idempotence, commutative sort
//! 6. validate operands against the signature, wrapping mismatches in
//!    error markers instead of throwing
//!
//! Canonicalization is idempotent and cached: an already-canonical node
//! returns itself, reference-identical.

use crate::definitions::HoldPolicy;
use crate::domain::{Domain, Variance};
use crate::engine::ComputeEngine;
use crate::order;
use ce_ast::{error_with, has_no_errors, Context, ErrorCode, Expr, ExprId, NumericValue};

/// Canonical form of an expression.
pub fn canonical(ng: &mut ComputeEngine, id: ExprId) -> ExprId {
    if let Some(c) = ng.ctx.cached_canonical(id) {
        return c;
    }
    if !ng.enter() {
        ng.leave();
        return id;
    }
    let result = match ng.ctx.get(id).clone() {
        Expr::Number(_) | Expr::Symbol(_) | Expr::Str(_) => id,
        Expr::Dict(entries) => {
            let mut changed = false;
            let new_entries: Vec<(String, ExprId)> = entries
                .iter()
                .map(|(k, v)| {
                    let nv = canonical(ng, *v);
                    changed |= nv != *v;
                    (k.clone(), nv)
                })
                .collect();
            if changed {
                ng.ctx.push(Expr::Dict(new_entries))
            } else {
                id
            }
        }
        Expr::Function(head, args) => canonical_function(ng, id, head, &args),
    };
    ng.leave();
    ng.ctx.mark_canonical(result);
    if result != id {
        ng.ctx.cache_canonical(id, result);
    }
    ng.check_memory();
    result
}

fn canonical_function(ng: &mut ComputeEngine, id: ExprId, head: ExprId, args: &[ExprId]) -> ExprId {
    // An expression head (e.g. InverseFunction(Sin)) is canonicalized itself;
    // a symbol head resolves through the scope stack.
    let (new_head, name) = match ng.ctx.symbol_name(head) {
        Some(n) => (head, Some(n.to_string())),
        None => (canonical(ng, head), None),
    };
    let def = name.as_deref().and_then(|n| ng.function_def(n));
    let hold = def.as_ref().map(|d| d.hold).unwrap_or(HoldPolicy::None);

    // 1. Operands, respecting hold positions.
    let arity = args.len();
    let mut operands: Vec<ExprId> = Vec::with_capacity(arity);
    for (i, &arg) in args.iter().enumerate() {
        if hold.holds(i, arity) {
            operands.push(arg);
        } else {
            operands.push(canonical(ng, arg));
        }
    }

    // 2. Placeholder normalization: splice sequences, drop Nothing.
    // A Sequence node itself keeps its operands (they are flattened below).
    let is_sequence_head = name.as_deref() == Some("Sequence");
    let mut spliced: Vec<ExprId> = Vec::with_capacity(operands.len());
    for op in operands {
        if ng.ctx.is_symbol(op, "Nothing") {
            continue;
        }
        if !is_sequence_head {
            if let Some(inner) = ng.ctx.args_of(op, "Sequence") {
                spliced.extend_from_slice(inner);
                continue;
            }
        }
        spliced.push(op);
    }

    // 3. Associative flatten.
    if def.as_ref().map(|d| d.flags.associative).unwrap_or(false) {
        let n = name.as_deref().unwrap_or_default();
        let mut flat = Vec::with_capacity(spliced.len());
        for op in spliced {
            match ng.ctx.args_of(op, n) {
                Some(inner) => flat.extend_from_slice(inner),
                None => flat.push(op),
            }
        }
        spliced = flat;
    }

    let Some(def) = def else {
        return rebuild(ng, id, head, new_head, args, spliced);
    };

    // 4. Custom canonical handler: trusted to produce canonical output.
    if let Some(handler) = def.canonical.clone() {
        return handler(ng, &spliced);
    }

    // 5. Generic structural rules.
    if def.flags.involution && spliced.len() == 1 {
        if let Some(inner) = ng.ctx.args_of(spliced[0], &def.name) {
            if inner.len() == 1 {
                return inner[0];
            }
        }
    }
    if def.flags.idempotent && spliced.len() == 1 {
        if ng.ctx.args_of(spliced[0], &def.name).is_some() {
            return spliced[0];
        }
    }
    if def.flags.commutative {
        sort_commutative(ng, &mut spliced);
    }

    // 6. Signature validation.
    let validated = validate_signature(ng, &def.signature, spliced);
    rebuild(ng, id, head, new_head, args, validated)
}

fn rebuild(
    ng: &mut ComputeEngine,
    id: ExprId,
    old_head: ExprId,
    new_head: ExprId,
    old_args: &[ExprId],
    new_args: Vec<ExprId>,
) -> ExprId {
    if new_head == old_head && new_args.as_slice() == old_args {
        id
    } else {
        ng.ctx.apply(new_head, new_args)
    }
}

/// Stable commutative sort by the engine's total order.
pub fn sort_commutative(ng: &ComputeEngine, args: &mut [ExprId]) {
    // The borrow of `ng` is immutable here; ordering never mutates.
    let snapshot: Vec<ExprId> = args.to_vec();
    let mut indexed: Vec<usize> = (0..snapshot.len()).collect();
    indexed.sort_by(|&i, &j| order::compare(ng, snapshot[i], snapshot[j]));
    for (slot, src) in indexed.into_iter().enumerate() {
        args[slot] = snapshot[src];
    }
}

/// Check operands against a signature, replacing mismatches with typed
/// error markers. The resulting list is well-formed and inspectable.
pub fn validate_signature(
    ng: &mut ComputeEngine,
    signature: &crate::definitions::Signature,
    args: Vec<ExprId>,
) -> Vec<ExprId> {
    let required = signature.args.len();
    let mut out: Vec<ExprId> = Vec::with_capacity(args.len().max(required));

    for (i, arg) in args.iter().enumerate() {
        let expected = if i < required {
            Some(&signature.args[i])
        } else {
            signature.rest.as_ref()
        };
        let Some(expected) = expected else {
            out.push(error_with(&mut ng.ctx, ErrorCode::UnexpectedArgument, *arg));
            continue;
        };
        if !has_no_errors(&ng.ctx, *arg) {
            // Already invalid; don't pile markers on markers.
            out.push(*arg);
            continue;
        }
        let inferred = infer_domain(ng, *arg);
        let known = !matches!(inferred, Domain::Anything);
        if known && !inferred.is_compatible(expected, Variance::Covariant) {
            out.push(error_with(&mut ng.ctx, ErrorCode::IncompatibleDomain, *arg));
        } else {
            out.push(*arg);
        }
    }

    for _ in args.len()..required {
        let marker = ce_ast::error(&mut ng.ctx, ErrorCode::Missing);
        out.push(marker);
    }
    out
}

/// Best-effort domain of an expression, used by signature validation.
/// `Anything` means "not known" and is never flagged as incompatible.
pub fn infer_domain(ng: &ComputeEngine, id: ExprId) -> Domain {
    match ng.ctx.get(id) {
        Expr::Number(n) => match n {
            NumericValue::Rational(r) if r.is_integer() => Domain::Integer,
            NumericValue::Rational(_) => Domain::RationalNumber,
            NumericValue::Machine(_) | NumericValue::Decimal(_) => Domain::RealNumber,
            NumericValue::Complex(_) => Domain::ComplexNumber,
        },
        Expr::Symbol(s) => {
            let name = ng.ctx.sym_name(*s);
            match name {
                "True" | "False" => Domain::Boolean,
                "Nothing" => Domain::NothingDomain,
                _ => ng
                    .symbol_def(name)
                    .map(|d| d.domain)
                    .unwrap_or(Domain::Anything),
            }
        }
        Expr::Str(_) => Domain::StringDomain,
        Expr::Function(head, _) => match ng.ctx.symbol_name(*head) {
            Some(name) => ng
                .function_def(name)
                .map(|d| d.signature.result.clone())
                .unwrap_or(Domain::Anything),
            None => Domain::Anything,
        },
        Expr::Dict(_) => Domain::Anything,
    }
}

/// Shared "apply associative operator" construction: flattens immediately
/// instead of nesting, used by the parser for multiplication variants and
/// by handlers that build n-ary nodes.
pub fn apply_associative(ctx: &mut Context, head: &str, operands: Vec<ExprId>) -> ExprId {
    let mut flat = Vec::with_capacity(operands.len());
    for op in operands {
        match ctx.args_of(op, head) {
            Some(inner) => flat.extend_from_slice(inner),
            None => flat.push(op),
        }
    }
    ctx.call(head, flat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{FunctionDef, FunctionFlags, Signature};

    fn engine_with(defs: Vec<FunctionDef>) -> ComputeEngine {
        let mut ng = ComputeEngine::empty();
        for d in defs {
            ng.declare_function(d);
        }
        ng
    }

    fn assoc_comm(name: &str, complexity: u32) -> FunctionDef {
        FunctionDef {
            flags: FunctionFlags {
                associative: true,
                commutative: true,
                ..Default::default()
            },
            ..FunctionDef::new(name, complexity)
        }
    }

    #[test]
    fn test_idempotent_accessor() {
        let mut ng = engine_with(vec![assoc_comm("Add", 1000)]);
        let a = ng.ctx.num(1);
        let b = ng.ctx.sym("x");
        let sum = ng.ctx.call("Add", vec![b, a]);
        let c1 = canonical(&mut ng, sum);
        let c2 = canonical(&mut ng, c1);
        assert_eq!(c1, c2, "canonical must be idempotent (same ExprId)");
    }

    #[test]
    fn test_associative_flatten() {
        let mut ng = engine_with(vec![assoc_comm("Add", 1000)]);
        let a = ng.ctx.num(1);
        let b = ng.ctx.num(2);
        let c = ng.ctx.num(3);
        let inner = ng.ctx.call("Add", vec![b, c]);
        let outer = ng.ctx.call("Add", vec![a, inner]);
        let canon = canonical(&mut ng, outer);
        assert_eq!(ng.ctx.args_of(canon, "Add").map(|x| x.len()), Some(3));
    }

    #[test]
    fn test_commutative_sort_numbers_keep_order() {
        let mut ng = engine_with(vec![assoc_comm("Add", 1000)]);
        let a = ng.ctx.num(7);
        let b = ng.ctx.num(2);
        let c = ng.ctx.num(5);
        let sum = ng.ctx.call("Add", vec![a, b, c]);
        let canon = canonical(&mut ng, sum);
        let args = ng.ctx.args_of(canon, "Add").unwrap().to_vec();
        let vals: Vec<i64> = args.iter().map(|x| ng.ctx.as_integer(*x).unwrap()).collect();
        assert_eq!(vals, vec![7, 2, 5]);
    }

    #[test]
    fn test_commutative_sort_number_first() {
        let mut ng = engine_with(vec![assoc_comm("Multiply", 2000)]);
        let x = ng.ctx.sym("x");
        let two = ng.ctx.num(2);
        let mul = ng.ctx.call("Multiply", vec![x, two]);
        let canon = canonical(&mut ng, mul);
        let args = ng.ctx.args_of(canon, "Multiply").unwrap();
        assert!(ng.ctx.numeric_value(args[0]).is_some());
        assert_eq!(ng.ctx.symbol_name(args[1]), Some("x"));
    }

    #[test]
    fn test_involution() {
        let mut ng = engine_with(vec![{
            FunctionDef {
                flags: FunctionFlags {
                    involution: true,
                    ..Default::default()
                },
                ..FunctionDef::new("Negate", 1100)
            }
        }]);
        let x = ng.ctx.sym("x");
        let neg = ng.ctx.call("Negate", vec![x]);
        let negneg = ng.ctx.call("Negate", vec![neg]);
        let canon = canonical(&mut ng, negneg);
        assert!(ng.ctx.is_same(canon, x));
    }

    #[test]
    fn test_idempotence_flag() {
        let mut ng = engine_with(vec![{
            FunctionDef {
                flags: FunctionFlags {
                    idempotent: true,
                    ..Default::default()
                },
                ..FunctionDef::new("Abs", 1200)
            }
        }]);
        let x = ng.ctx.sym("x");
        let abs = ng.ctx.call("Abs", vec![x]);
        let absabs = ng.ctx.call("Abs", vec![abs]);
        let canon = canonical(&mut ng, absabs);
        assert!(ng.ctx.is_same(canon, abs));
    }

    #[test]
    fn test_nothing_dropped_and_sequence_spliced() {
        let mut ng = engine_with(vec![assoc_comm("Add", 1000)]);
        let a = ng.ctx.num(1);
        let nothing = ng.ctx.sym("Nothing");
        let b = ng.ctx.num(2);
        let c = ng.ctx.num(3);
        let seq = ng.ctx.call("Sequence", vec![b, c]);
        let sum = ng.ctx.call("Add", vec![a, nothing, seq]);
        let canon = canonical(&mut ng, sum);
        assert_eq!(ng.ctx.args_of(canon, "Add").map(|x| x.len()), Some(3));
    }

    #[test]
    fn test_too_many_arguments_marked() {
        let mut ng = ComputeEngine::empty();
        ng.declare_function(FunctionDef {
            signature: Signature::fixed(vec![Domain::Number], Domain::Number),
            ..FunctionDef::new("Sin", 5000)
        });
        let x = ng.ctx.sym("x");
        let y = ng.ctx.sym("y");
        let call = ng.ctx.call("Sin", vec![x, y]);
        let canon = canonical(&mut ng, call);
        assert!(!has_no_errors(&ng.ctx, canon));
        // Well-formed: still a Sin application with two operands.
        assert_eq!(ng.ctx.args_of(canon, "Sin").map(|a| a.len()), Some(2));
    }

    #[test]
    fn test_missing_argument_marked() {
        let mut ng = ComputeEngine::empty();
        ng.declare_function(FunctionDef {
            signature: Signature::fixed(vec![Domain::Number], Domain::Number),
            ..FunctionDef::new("Sin", 5000)
        });
        let call = ng.ctx.call("Sin", vec![]);
        let canon = canonical(&mut ng, call);
        assert!(!has_no_errors(&ng.ctx, canon));
    }

    #[test]
    fn test_incompatible_domain_marked() {
        let mut ng = ComputeEngine::empty();
        ng.declare_function(FunctionDef {
            signature: Signature::fixed(vec![Domain::Number], Domain::Number),
            ..FunctionDef::new("Sin", 5000)
        });
        let s = ng.ctx.str("not a number");
        let call = ng.ctx.call("Sin", vec![s]);
        let canon = canonical(&mut ng, call);
        assert!(!has_no_errors(&ng.ctx, canon));
    }

    #[test]
    fn test_unknown_domain_not_flagged() {
        let mut ng = ComputeEngine::empty();
        ng.declare_function(FunctionDef {
            signature: Signature::fixed(vec![Domain::Number], Domain::Number),
            ..FunctionDef::new("Sin", 5000)
        });
        let x = ng.ctx.sym("x"); // no declared domain
        let call = ng.ctx.call("Sin", vec![x]);
        let canon = canonical(&mut ng, call);
        assert!(has_no_errors(&ng.ctx, canon));
    }

    #[test]
    fn test_hold_positions_not_canonicalized() {
        let mut ng = ComputeEngine::empty();
        ng.declare_function(assoc_comm("Add", 1000));
        ng.declare_function(FunctionDef {
            hold: HoldPolicy::All,
            ..FunctionDef::new("Hold", 800)
        });
        let x = ng.ctx.sym("x");
        let two = ng.ctx.num(2);
        // Hold(Add(x, 2)): the inner Add must keep its written order.
        let sum = ng.ctx.call("Add", vec![x, two]);
        let held = ng.ctx.call("Hold", vec![sum]);
        let canon = canonical(&mut ng, held);
        let inner = ng.ctx.args_of(canon, "Hold").unwrap()[0];
        let inner_args = ng.ctx.args_of(inner, "Add").unwrap();
        assert_eq!(ng.ctx.symbol_name(inner_args[0]), Some("x"));
    }
}
