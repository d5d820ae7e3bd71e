//! Structural sign computation.
//!
//! Known sign is −1/0/+1; `Unknown` means unresolved-but-possibly-any real
//! sign; `NotApplicable` means the value never has a real sign (complex,
//! NaN, division by zero). Composed structurally for Negate, Multiply,
//! Add, Divide, Square, Abs and Sqrt; other heads consult their
//! definition's sign handler, then fall back to the numeric value's sign.

use crate::engine::ComputeEngine;
use ce_ast::{Expr, ExprId, Sgn};

/// Sign of an expression.
pub fn sgn(ng: &mut ComputeEngine, id: ExprId) -> Sgn {
    match ng.ctx.get(id).clone() {
        Expr::Number(v) => v.sgn(),
        Expr::Symbol(s) => {
            let name = ng.ctx.sym_name(s).to_string();
            symbol_sign(ng, &name)
        }
        Expr::Function(head, args) => {
            let Some(name) = ng.ctx.symbol_name(head).map(str::to_string) else {
                return Sgn::Unknown;
            };
            match name.as_str() {
                "Negate" if args.len() == 1 => flip(sgn(ng, args[0])),
                "Multiply" => product_sign(ng, &args),
                "Add" => sum_sign(ng, &args),
                "Divide" if args.len() == 2 => {
                    let den = sgn(ng, args[1]);
                    if den == Sgn::Zero {
                        return Sgn::NotApplicable;
                    }
                    product_of(sgn(ng, args[0]), den)
                }
                "Square" if args.len() == 1 => match sgn(ng, args[0]) {
                    Sgn::Negative | Sgn::Positive => Sgn::Positive,
                    Sgn::Zero => Sgn::Zero,
                    Sgn::Unknown => Sgn::Unknown,
                    Sgn::NotApplicable => Sgn::NotApplicable,
                },
                "Abs" if args.len() == 1 => match sgn(ng, args[0]) {
                    Sgn::Negative | Sgn::Positive => Sgn::Positive,
                    Sgn::Zero => Sgn::Zero,
                    _ => Sgn::Unknown,
                },
                "Sqrt" if args.len() == 1 => match sgn(ng, args[0]) {
                    Sgn::Positive => Sgn::Positive,
                    Sgn::Zero => Sgn::Zero,
                    Sgn::Negative => Sgn::NotApplicable,
                    other => other,
                },
                _ => {
                    if let Some(def) = ng.function_def(&name) {
                        if let Some(handler) = def.sgn.clone() {
                            return handler(ng, &args);
                        }
                    }
                    numeric_fallback(ng, id)
                }
            }
        }
        _ => Sgn::NotApplicable,
    }
}

fn symbol_sign(ng: &mut ComputeEngine, name: &str) -> Sgn {
    let Some(def) = ng.symbol_def(name) else {
        return Sgn::Unknown;
    };
    match (def.assumptions.is_positive, def.assumptions.is_negative) {
        (Some(true), _) => return Sgn::Positive,
        (_, Some(true)) => return Sgn::Negative,
        _ => {}
    }
    use crate::definitions::SymbolValue;
    match def.value {
        Some(SymbolValue::Literal(v)) => v.sgn(),
        Some(SymbolValue::PrecisionFn(f)) => f(ng.precision()).sgn(),
        Some(SymbolValue::Expression(e)) => sgn(ng, e),
        None => Sgn::Unknown,
    }
}

fn flip(s: Sgn) -> Sgn {
    match s {
        Sgn::Negative => Sgn::Positive,
        Sgn::Positive => Sgn::Negative,
        other => other,
    }
}

fn product_of(a: Sgn, b: Sgn) -> Sgn {
    use Sgn::*;
    match (a, b) {
        (NotApplicable, _) | (_, NotApplicable) => NotApplicable,
        (Zero, _) | (_, Zero) => Zero,
        (Unknown, _) | (_, Unknown) => Unknown,
        (Negative, Negative) | (Positive, Positive) => Positive,
        _ => Negative,
    }
}

fn product_sign(ng: &mut ComputeEngine, args: &[ExprId]) -> Sgn {
    let mut acc = Sgn::Positive;
    for &arg in args {
        acc = product_of(acc, sgn(ng, arg));
        if acc == Sgn::NotApplicable || acc == Sgn::Zero {
            return acc;
        }
    }
    acc
}

fn sum_sign(ng: &mut ComputeEngine, args: &[ExprId]) -> Sgn {
    let mut has_pos = false;
    let mut has_neg = false;
    for &arg in args {
        match sgn(ng, arg) {
            Sgn::Positive => has_pos = true,
            Sgn::Negative => has_neg = true,
            Sgn::Zero => {}
            Sgn::Unknown => return Sgn::Unknown,
            Sgn::NotApplicable => return Sgn::NotApplicable,
        }
        if has_pos && has_neg {
            return Sgn::Unknown;
        }
    }
    if has_pos {
        Sgn::Positive
    } else if has_neg {
        Sgn::Negative
    } else {
        Sgn::Zero
    }
}

fn numeric_fallback(ng: &mut ComputeEngine, id: ExprId) -> Sgn {
    let evaluated = crate::evaluate::n_evaluate(ng, id);
    match ng.ctx.get(evaluated) {
        Expr::Number(v) => v.sgn(),
        _ => Sgn::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::SymbolDef;
    use crate::domain::Domain;

    #[test]
    fn test_number_signs() {
        let mut ng = ComputeEngine::empty();
        let pos = ng.ctx.num(3);
        let zero = ng.ctx.num(0);
        let neg = ng.ctx.rational(-1, 2);
        assert_eq!(sgn(&mut ng, pos), Sgn::Positive);
        assert_eq!(sgn(&mut ng, zero), Sgn::Zero);
        assert_eq!(sgn(&mut ng, neg), Sgn::Negative);
    }

    #[test]
    fn test_negate_flips() {
        let mut ng = ComputeEngine::empty();
        let three = ng.ctx.num(3);
        let neg = ng.ctx.call("Negate", vec![three]);
        assert_eq!(sgn(&mut ng, neg), Sgn::Negative);
    }

    #[test]
    fn test_product_parity() {
        let mut ng = ComputeEngine::empty();
        let a = ng.ctx.num(-2);
        let b = ng.ctx.num(-3);
        let c = ng.ctx.num(5);
        let m = ng.ctx.call("Multiply", vec![a, b, c]);
        assert_eq!(sgn(&mut ng, m), Sgn::Positive);
    }

    #[test]
    fn test_unknown_symbol_propagates() {
        let mut ng = ComputeEngine::empty();
        let x = ng.ctx.sym("x");
        let two = ng.ctx.num(2);
        let m = ng.ctx.call("Multiply", vec![two, x]);
        assert_eq!(sgn(&mut ng, m), Sgn::Unknown);
    }

    #[test]
    fn test_assumed_positive_symbol() {
        let mut ng = ComputeEngine::empty();
        let mut def = SymbolDef::variable(Domain::RealNumber);
        def.assumptions.is_positive = Some(true);
        ng.declare_symbol("x", def);
        let x = ng.ctx.sym("x");
        let sq = ng.ctx.call("Square", vec![x]);
        assert_eq!(sgn(&mut ng, x), Sgn::Positive);
        assert_eq!(sgn(&mut ng, sq), Sgn::Positive);
    }

    #[test]
    fn test_division_by_zero_has_no_sign() {
        let mut ng = ComputeEngine::empty();
        let one = ng.ctx.num(1);
        let zero = ng.ctx.num(0);
        let d = ng.ctx.call("Divide", vec![one, zero]);
        assert_eq!(sgn(&mut ng, d), Sgn::NotApplicable);
    }

    #[test]
    fn test_sqrt_of_negative_not_real() {
        let mut ng = ComputeEngine::empty();
        let neg = ng.ctx.num(-4);
        let s = ng.ctx.call("Sqrt", vec![neg]);
        assert_eq!(sgn(&mut ng, s), Sgn::NotApplicable);
    }

    #[test]
    fn test_mixed_sum_unknown() {
        let mut ng = ComputeEngine::empty();
        let a = ng.ctx.num(1);
        let b = ng.ctx.num(-1);
        let s = ng.ctx.call("Add", vec![a, b]);
        assert_eq!(sgn(&mut ng, s), Sgn::Unknown);
    }
}
