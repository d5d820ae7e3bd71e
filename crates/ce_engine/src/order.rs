//! Total order over canonical expressions.
//!
//! The primary key is the complexity band of the head's definition, then
//! structure: operand count, pairwise recursive order, head name. This is a
//! strict weak ordering; commutative-argument sorting uses it with a stable
//! sort, so two calls on the same list always produce the same result.
//!
//! Numeric literals form one equivalence class: `7 + 2 + 5` keeps its
//! written operand order under canonical sorting. Everything else
//! tie-breaks structurally.

use crate::engine::ComputeEngine;
use ce_ast::{Expr, ExprId};
use std::cmp::Ordering;

/// Band for heads with no resolvable definition.
const UNKNOWN_FUNCTION_BAND: u32 = 9000;
const EXPRESSION_HEAD_BAND: u32 = 9100;

fn band(ng: &ComputeEngine, id: ExprId) -> u32 {
    match ng.ctx.get(id) {
        Expr::Number(_) => 100,
        Expr::Symbol(_) => 200,
        Expr::Str(_) => 300,
        Expr::Function(head, _) => match ng.ctx.symbol_name(*head) {
            Some(name) => ng
                .function_def(name)
                .map(|d| d.complexity)
                .unwrap_or(UNKNOWN_FUNCTION_BAND),
            None => EXPRESSION_HEAD_BAND,
        },
        Expr::Dict(_) => 9500,
    }
}

/// Compare two expressions for commutative sorting.
pub fn compare(ng: &ComputeEngine, a: ExprId, b: ExprId) -> Ordering {
    let band_a = band(ng, a);
    let band_b = band(ng, b);
    if band_a != band_b {
        return band_a.cmp(&band_b);
    }

    match (ng.ctx.get(a), ng.ctx.get(b)) {
        // One equivalence class; stable sort preserves written order.
        (Expr::Number(_), Expr::Number(_)) => Ordering::Equal,
        (Expr::Symbol(s1), Expr::Symbol(s2)) => {
            ng.ctx.sym_name(*s1).cmp(ng.ctx.sym_name(*s2))
        }
        (Expr::Str(s1), Expr::Str(s2)) => s1.cmp(s2),
        (Expr::Function(h1, args1), Expr::Function(h2, args2)) => {
            match args1.len().cmp(&args2.len()) {
                Ordering::Equal => {}
                ord => return ord,
            }
            for (x, y) in args1.iter().zip(args2.iter()) {
                match compare(ng, *x, *y) {
                    Ordering::Equal => continue,
                    ord => return ord,
                }
            }
            // Same band, same shape: head name decides.
            match (ng.ctx.symbol_name(*h1), ng.ctx.symbol_name(*h2)) {
                (Some(n1), Some(n2)) => n1.cmp(n2),
                _ => compare(ng, *h1, *h2),
            }
        }
        (Expr::Dict(d1), Expr::Dict(d2)) => d1.len().cmp(&d2.len()),
        _ => Ordering::Equal,
    }
}

/// Complexity-weighted node count, the cost measure for the rewrite
/// acceptance heuristic.
pub fn cost(ng: &ComputeEngine, id: ExprId) -> u64 {
    match ng.ctx.get(id) {
        Expr::Function(head, args) => {
            let weight = 1 + (band(ng, id) / 1000) as u64;
            weight
                + cost(ng, *head)
                + args.iter().map(|a| cost(ng, *a)).sum::<u64>()
        }
        Expr::Dict(entries) => {
            1 + entries.iter().map(|(_, v)| cost(ng, *v)).sum::<u64>()
        }
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_before_symbols() {
        let mut ng = ComputeEngine::empty();
        let two = ng.ctx.num(2);
        let x = ng.ctx.sym("x");
        assert_eq!(compare(&ng, two, x), Ordering::Less);
        assert_eq!(compare(&ng, x, two), Ordering::Greater);
    }

    #[test]
    fn test_numbers_are_one_class() {
        let mut ng = ComputeEngine::empty();
        let seven = ng.ctx.num(7);
        let two = ng.ctx.num(2);
        assert_eq!(compare(&ng, seven, two), Ordering::Equal);
    }

    #[test]
    fn test_symbols_by_name() {
        let mut ng = ComputeEngine::empty();
        let x = ng.ctx.sym("x");
        let y = ng.ctx.sym("y");
        assert_eq!(compare(&ng, x, y), Ordering::Less);
    }

    #[test]
    fn test_band_orders_heads() {
        use crate::definitions::FunctionDef;
        let mut ng = ComputeEngine::empty();
        ng.declare_function(FunctionDef::new("Add", 1000));
        ng.declare_function(FunctionDef::new("Sin", 5000));
        let x = ng.ctx.sym("x");
        let y = ng.ctx.sym("y");
        let add = ng.ctx.call("Add", vec![x, y]);
        let x2 = ng.ctx.sym("x");
        let sin = ng.ctx.call("Sin", vec![x2]);
        assert_eq!(compare(&ng, add, sin), Ordering::Less);
    }

    #[test]
    fn test_cost_weights_by_band() {
        use crate::definitions::FunctionDef;
        let mut ng = ComputeEngine::empty();
        ng.declare_function(FunctionDef::new("Add", 1000));
        ng.declare_function(FunctionDef::new("Sin", 5000));
        let x = ng.ctx.sym("x");
        let y = ng.ctx.sym("y");
        let add = ng.ctx.call("Add", vec![x, y]);
        let x2 = ng.ctx.sym("x");
        let sin = ng.ctx.call("Sin", vec![x2]);
        assert!(cost(&ng, sin) > cost(&ng, x2));
        assert!(cost(&ng, add) < cost(&ng, sin) + 2);
    }
}
