//! Exact and numeric evaluation pipelines.
//!
//! `evaluate` is exact: it recursively evaluates non-held operands and
//! invokes the definition's `evaluate` handler, which may be a native
//! closure or a template expression substituted positionally (`_1`, `_2`,
//! `_`, `__`, `_#`). Bignum/rational exactness is preserved; no floating
//! point on this path.
//!
//! `n_evaluate` performs the same resolution but invokes the `N` handler,
//! permitting float/bignum/complex arithmetic under the engine's numeric
//! mode and precision. A missing N handler falls back to `evaluate`. Mode
//! policy is applied afterward: a complex literal under a mode that forbids
//! complex loses its imaginary part, a bignum literal under machine mode is
//! converted to a machine float.

use crate::canonical::canonical;
use crate::definitions::{EvalHandler, SymbolValue};
use crate::engine::{ComputeEngine, NumericMode};
use crate::pattern::substitute_positional;
use ce_ast::{Expr, ExprId, NumericValue};

/// Exact symbolic evaluation. Invalid trees are returned unchanged.
pub fn evaluate(ng: &mut ComputeEngine, id: ExprId) -> ExprId {
    let id = canonical(ng, id);
    if !ng.is_valid(id) {
        return id;
    }
    eval_rec(ng, id)
}

fn eval_rec(ng: &mut ComputeEngine, id: ExprId) -> ExprId {
    if !ng.enter() {
        ng.leave();
        return id;
    }
    let result = eval_rec_guarded(ng, id);
    ng.leave();
    result
}

fn eval_rec_guarded(ng: &mut ComputeEngine, id: ExprId) -> ExprId {
    match ng.ctx.get(id).clone() {
        Expr::Symbol(s) => {
            let name = ng.ctx.sym_name(s).to_string();
            match ng.symbol_value_expr(&name) {
                Some(value) if value != id => eval_rec(ng, value),
                _ => id,
            }
        }
        Expr::Function(head, args) => {
            // Lambda application: the head is itself a Lambda expression.
            if let Some(lambda_body) = ng.ctx.args_of(head, "Lambda").map(|a| a.to_vec()) {
                if let Some(&body) = lambda_body.first() {
                    let evaluated: Vec<ExprId> =
                        args.iter().map(|a| eval_rec(ng, *a)).collect();
                    let substituted = substitute_positional(&mut ng.ctx, body, &evaluated);
                    return eval_rec(ng, substituted);
                }
            }

            let Some(name) = ng.ctx.symbol_name(head).map(str::to_string) else {
                return id;
            };
            let def = ng.function_def(&name);
            let hold = def.as_ref().map(|d| d.hold).unwrap_or_default();

            let arity = args.len();
            let mut changed = false;
            let mut operands = Vec::with_capacity(arity);
            for (i, &arg) in args.iter().enumerate() {
                if hold.holds(i, arity) {
                    operands.push(arg);
                } else {
                    let e = eval_rec(ng, arg);
                    changed |= e != arg;
                    operands.push(e);
                }
            }

            if let Some(def) = def {
                match def.evaluate.clone() {
                    Some(EvalHandler::Fn(handler)) => {
                        if let Some(out) = handler(ng, &operands) {
                            return out;
                        }
                    }
                    Some(EvalHandler::Template(template)) => {
                        let substituted =
                            substitute_positional(&mut ng.ctx, template, &operands);
                        return eval_rec(ng, substituted);
                    }
                    None => {}
                }
            }

            if changed {
                let rebuilt = ng.ctx.apply(head, operands);
                canonical(ng, rebuilt)
            } else {
                id
            }
        }
        _ => id,
    }
}

// ============================================================================
// Numeric (N) evaluation
// ============================================================================

/// Numeric evaluation under the engine's numeric mode and precision.
/// Invalid trees are returned unchanged.
pub fn n_evaluate(ng: &mut ComputeEngine, id: ExprId) -> ExprId {
    let id = canonical(ng, id);
    if !ng.is_valid(id) {
        return id;
    }
    if let Some(cached) = ng.ctx.cached_value(id).cloned() {
        return ng.ctx.number(cached);
    }
    let result = n_rec(ng, id);
    if let Expr::Number(v) = ng.ctx.get(result) {
        let adjusted = apply_mode_policy(ng.numeric_mode(), v.clone());
        let out = ng.ctx.number(adjusted.clone());
        ng.ctx.cache_value(id, adjusted);
        return out;
    }
    result
}

fn n_rec(ng: &mut ComputeEngine, id: ExprId) -> ExprId {
    if !ng.enter() {
        ng.leave();
        return id;
    }
    let result = n_rec_guarded(ng, id);
    ng.leave();
    result
}

fn n_rec_guarded(ng: &mut ComputeEngine, id: ExprId) -> ExprId {
    match ng.ctx.get(id).clone() {
        Expr::Number(v) => {
            let adjusted = apply_mode_policy(ng.numeric_mode(), v.clone());
            if adjusted == v {
                id
            } else {
                ng.ctx.number(adjusted)
            }
        }
        Expr::Symbol(s) => {
            let name = ng.ctx.sym_name(s).to_string();
            let Some(def) = ng.symbol_def(&name) else {
                return id;
            };
            match def.value {
                Some(SymbolValue::Literal(v)) => {
                    let adjusted = apply_mode_policy(ng.numeric_mode(), v);
                    ng.ctx.number(adjusted)
                }
                Some(SymbolValue::PrecisionFn(f)) => {
                    let v = f(ng.precision());
                    let adjusted = apply_mode_policy(ng.numeric_mode(), v);
                    ng.ctx.number(adjusted)
                }
                Some(SymbolValue::Expression(e)) => n_rec(ng, e),
                None => id,
            }
        }
        Expr::Function(head, args) => {
            if let Some(lambda_body) = ng.ctx.args_of(head, "Lambda").map(|a| a.to_vec()) {
                if let Some(&body) = lambda_body.first() {
                    let evaluated: Vec<ExprId> = args.iter().map(|a| n_rec(ng, *a)).collect();
                    let substituted = substitute_positional(&mut ng.ctx, body, &evaluated);
                    return n_rec(ng, substituted);
                }
            }

            let Some(name) = ng.ctx.symbol_name(head).map(str::to_string) else {
                return id;
            };
            let def = ng.function_def(&name);
            let hold = def.as_ref().map(|d| d.hold).unwrap_or_default();

            let arity = args.len();
            let mut changed = false;
            let mut operands = Vec::with_capacity(arity);
            for (i, &arg) in args.iter().enumerate() {
                if hold.holds(i, arity) {
                    operands.push(arg);
                } else {
                    let e = n_rec(ng, arg);
                    changed |= e != arg;
                    operands.push(e);
                }
            }

            if let Some(def) = def {
                if let Some(handler) = def.numeric_eval.clone() {
                    if let Some(out) = handler(ng, &operands) {
                        return out;
                    }
                }
                // Fall back to the exact handler when N is absent.
                match def.evaluate.clone() {
                    Some(EvalHandler::Fn(handler)) => {
                        if let Some(out) = handler(ng, &operands) {
                            return out;
                        }
                    }
                    Some(EvalHandler::Template(template)) => {
                        let substituted =
                            substitute_positional(&mut ng.ctx, template, &operands);
                        return n_rec(ng, substituted);
                    }
                    None => {}
                }
            }

            if changed {
                ng.ctx.apply(head, operands)
            } else {
                id
            }
        }
        _ => id,
    }
}

/// Down-conversion policy for numeric-mode violations. A policy decision,
/// not an error.
fn apply_mode_policy(mode: NumericMode, v: NumericValue) -> NumericValue {
    match mode {
        NumericMode::Auto | NumericMode::Complex => v,
        NumericMode::Bignum => v.discard_imaginary(),
        NumericMode::Machine => v.discard_imaginary().to_machine(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{FunctionDef, SymbolDef};
    use crate::domain::Domain;
    use num_complex::Complex64;
    use std::rc::Rc;

    #[test]
    fn test_template_evaluation() {
        let mut ng = ComputeEngine::empty();
        // Square via template: Square(_1) evaluates as Multiply(_1, _1)
        let p1a = ng.ctx.sym("_1");
        let p1b = ng.ctx.sym("_1");
        let template = ng.ctx.call("Multiply", vec![p1a, p1b]);
        ng.declare_function(FunctionDef {
            evaluate: Some(EvalHandler::Template(template)),
            ..FunctionDef::new("Square", 3000)
        });

        let x = ng.ctx.sym("x");
        let sq = ng.ctx.call("Square", vec![x]);
        let out = evaluate(&mut ng, sq);
        assert_eq!(ng.ctx.head_name(out), Some("Multiply"));
    }

    #[test]
    fn test_lambda_application() {
        let mut ng = ComputeEngine::new();
        // (Lambda(Power(_1, 2)))(x) -> Power(x, 2)
        let p1 = ng.ctx.sym("_1");
        let two = ng.ctx.num(2);
        let body = ng.ctx.call("Power", vec![p1, two]);
        let lambda = ng.ctx.call("Lambda", vec![body]);
        let x = ng.ctx.sym("x");
        let app = ng.ctx.apply(lambda, vec![x]);
        let out = evaluate(&mut ng, app);
        let args = ng.ctx.args_of(out, "Power").unwrap();
        assert!(ng.ctx.is_same(args[0], x));
    }

    #[test]
    fn test_symbol_value_substitution() {
        let mut ng = ComputeEngine::empty();
        let mut def = SymbolDef::variable(Domain::Integer);
        def.value = Some(SymbolValue::Literal(NumericValue::int(3)));
        ng.declare_symbol("n", def);
        let n = ng.ctx.sym("n");
        let out = evaluate(&mut ng, n);
        assert_eq!(ng.ctx.as_integer(out), Some(3));
    }

    #[test]
    fn test_held_symbol_not_substituted_eagerly() {
        let mut ng = ComputeEngine::empty();
        let mut def = SymbolDef::variable(Domain::RealNumber);
        def.value = Some(SymbolValue::Literal(NumericValue::Machine(3.14)));
        def.hold = true;
        ng.declare_symbol("c", def);
        let c = ng.ctx.sym("c");
        let out = evaluate(&mut ng, c);
        assert_eq!(ng.ctx.symbol_name(out), Some("c"));
    }

    #[test]
    fn test_precision_fn_stays_symbolic_in_evaluate() {
        let mut ng = ComputeEngine::empty();
        let mut def = SymbolDef::variable(Domain::RealNumber);
        def.value = Some(SymbolValue::PrecisionFn(Rc::new(|_| {
            NumericValue::Machine(std::f64::consts::PI)
        })));
        ng.declare_symbol("Pi", def);
        let pi = ng.ctx.sym("Pi");
        let out = evaluate(&mut ng, pi);
        assert_eq!(ng.ctx.symbol_name(out), Some("Pi"));
        // N resolves it
        let n = n_evaluate(&mut ng, pi);
        assert!(ng.ctx.numeric_value(n).is_some());
    }

    #[test]
    fn test_machine_mode_downconverts_complex() {
        let mut ng = ComputeEngine::empty();
        ng.set_numeric_mode(NumericMode::Machine);
        let c = ng
            .ctx
            .number(NumericValue::Complex(Complex64::new(2.5, 1.0)));
        let out = n_evaluate(&mut ng, c);
        assert_eq!(
            ng.ctx.numeric_value(out),
            Some(&NumericValue::Machine(2.5))
        );
    }

    #[test]
    fn test_value_cache_filled_once() {
        let mut ng = ComputeEngine::empty();
        let n = ng.ctx.num(5);
        let _ = n_evaluate(&mut ng, n);
        assert!(ng.ctx.cached_value(n).is_some());
    }
}
