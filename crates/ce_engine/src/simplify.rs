//! Exact simplification.
//!
//! Structural phase first: simplify non-held operands, collapse inert heads
//! to their first operand, invoke per-definition `simplify` handlers. Then
//! the rewrite loop applies the standard rule set (plus any caller-supplied
//! rules) to a fixpoint or the iteration cap, accepting a rewrite only when
//! its complexity-weighted cost stays within `COST_RATIO` of the previous
//! form — slightly larger intermediate shapes are tolerated (one expansion
//! step before a cancellation), runaway growth is not.
//!
//! No floating-point arithmetic happens on this path; handlers fold exact
//! integers and rationals only.

use crate::canonical::canonical;
use crate::engine::ComputeEngine;
use crate::error::Warning;
use crate::order::cost;
use crate::rules::{replace, ReplaceOptions, RuleSet};
use ce_ast::{Expr, ExprId};
use tracing::debug;

/// A rewrite is accepted when `cost(new) <= COST_RATIO * cost(old)`.
const COST_RATIO: f64 = 1.7;

/// Simplify an expression. Invalid trees are returned unchanged.
pub fn simplify(ng: &mut ComputeEngine, id: ExprId, extra: Option<&RuleSet>) -> ExprId {
    let id = canonical(ng, id);
    if !ng.is_valid(id) {
        return id;
    }
    let armed = ng.arm_deadline();
    let result = simplify_inner(ng, id, extra);
    if armed {
        ng.disarm_deadline();
    }
    result
}

fn simplify_inner(ng: &mut ComputeEngine, id: ExprId, extra: Option<&RuleSet>) -> ExprId {
    let mut current = simplify_node(ng, id);

    let rules = match (ng.standard_rules(), extra) {
        (Some(std), Some(extra)) => std.extended(extra),
        (Some(std), None) => (*std).clone(),
        (None, Some(extra)) => extra.clone(),
        (None, None) => return current,
    };

    let limit = ng.iteration_limit();
    let single_pass = ReplaceOptions {
        recursive: true,
        once: false,
        iteration_limit: 1,
    };

    let mut iterations = 0;
    loop {
        if iterations >= limit {
            ng.warn(Warning::IterationLimit { limit });
            break;
        }
        if ng.out_of_time() {
            ng.warn(Warning::TimeBudget {
                elapsed_ms: ng.effective_limits().time_limit_ms.unwrap_or(0),
            });
            break;
        }
        iterations += 1;

        let before = cost(ng, current);
        let Some(rewritten) = replace(ng, current, &rules, &single_pass) else {
            break;
        };
        let candidate = canonical(ng, rewritten);
        let candidate = simplify_node(ng, candidate);
        let after = cost(ng, candidate);
        if after as f64 > before as f64 * COST_RATIO {
            debug!(before, after, "rewrite rejected by cost heuristic");
            break;
        }
        if ng.ctx.is_same(candidate, current) {
            break;
        }
        current = candidate;
    }
    current
}

/// Structural simplification of one node: operands, inert collapse,
/// definition handler.
fn simplify_node(ng: &mut ComputeEngine, id: ExprId) -> ExprId {
    if !ng.enter() {
        ng.leave();
        return id;
    }
    let result = simplify_node_guarded(ng, id);
    ng.leave();
    result
}

fn simplify_node_guarded(ng: &mut ComputeEngine, id: ExprId) -> ExprId {
    let Expr::Function(head, args) = ng.ctx.get(id).clone() else {
        return id;
    };
    let Some(name) = ng.ctx.symbol_name(head).map(str::to_string) else {
        return id;
    };
    let Some(def) = ng.function_def(&name) else {
        return id;
    };

    // Operands, respecting hold positions.
    let arity = args.len();
    let mut changed = false;
    let mut operands = Vec::with_capacity(arity);
    for (i, &arg) in args.iter().enumerate() {
        if def.hold.holds(i, arity) {
            operands.push(arg);
        } else {
            let s = simplify_node(ng, arg);
            changed |= s != arg;
            operands.push(s);
        }
    }

    // Inert heads disappear in favor of their first operand.
    if def.flags.inert {
        return operands.first().copied().unwrap_or(id);
    }

    let node = if changed {
        let rebuilt = ng.ctx.apply(head, operands.clone());
        canonical(ng, rebuilt)
    } else {
        id
    };

    if let Some(handler) = def.simplify.clone() {
        let node_args = match ng.ctx.get(node) {
            Expr::Function(_, a) => a.clone(),
            _ => return node,
        };
        if let Some(simplified) = handler(ng, &node_args) {
            return canonical(ng, simplified);
        }
    }
    node
}
