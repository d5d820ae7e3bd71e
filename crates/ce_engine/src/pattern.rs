//! One-directional structural pattern matching and substitution.
//!
//! Wildcards are symbols with a reserved `_` prefix:
//! - `_name` matches exactly one subexpression and binds it
//! - `__name` matches one or more operands in sequence
//! - `___name` matches zero or more operands in sequence
//!
//! A repeated capture name must match structurally-equal subexpressions.
//! Matching never partially binds: the result is either a full bindings map
//! or `None`.
//!
//! Positional substitution (`_1`, `_2`, `_`, `__`, `_#`) for lambda-style
//! handler templates lives here too; it is a substitution-map construction
//! step, not lexical capture.

use ce_ast::{Context, Expr, ExprId};
use rustc_hash::FxHashMap;

/// Wildcard capture bindings. Sequence captures bind to a `Sequence` node.
pub type Bindings = FxHashMap<String, ExprId>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildcardKind {
    /// `_name`: exactly one.
    Single,
    /// `__name`: one or more.
    Sequence,
    /// `___name`: zero or more.
    OptSequence,
}

/// Classify a symbol name as a wildcard, returning the capture name
/// (possibly empty for anonymous wildcards).
pub fn wildcard_kind(name: &str) -> Option<(WildcardKind, &str)> {
    if let Some(rest) = name.strip_prefix("___") {
        Some((WildcardKind::OptSequence, rest))
    } else if let Some(rest) = name.strip_prefix("__") {
        Some((WildcardKind::Sequence, rest))
    } else if let Some(rest) = name.strip_prefix('_') {
        Some((WildcardKind::Single, rest))
    } else {
        None
    }
}

/// Match `pattern` against `target`. Returns the bindings on success
/// (empty map for a match with no named wildcards), `None` on mismatch.
pub fn match_pattern(ctx: &mut Context, pattern: ExprId, target: ExprId) -> Option<Bindings> {
    let mut bindings = Bindings::default();
    if match_inner(ctx, pattern, target, &mut bindings) {
        Some(bindings)
    } else {
        None
    }
}

fn bind(ctx: &Context, bindings: &mut Bindings, name: &str, value: ExprId) -> bool {
    if name.is_empty() {
        return true;
    }
    if let Some(&existing) = bindings.get(name) {
        return ctx.is_same(existing, value);
    }
    bindings.insert(name.to_string(), value);
    true
}

fn match_inner(
    ctx: &mut Context,
    pattern: ExprId,
    target: ExprId,
    bindings: &mut Bindings,
) -> bool {
    // Wildcard symbol matches any single expression (a sequence wildcard
    // outside an operand list matches a sequence of one).
    if let Some(name) = ctx.symbol_name(pattern) {
        if let Some((_, capture)) = wildcard_kind(name) {
            let capture = capture.to_string();
            return bind(ctx, bindings, &capture, target);
        }
    }

    match (ctx.get(pattern).clone(), ctx.get(target).clone()) {
        (Expr::Function(ph, pargs), Expr::Function(th, targs)) => {
            // Heads: equal symbols, or a recursive match for expression heads.
            let heads_match = match (ctx.symbol_name(ph), ctx.symbol_name(th)) {
                (Some(a), Some(b)) => a == b,
                _ => match_inner(ctx, ph, th, bindings),
            };
            if !heads_match {
                return false;
            }
            match_args(ctx, &pargs, &targs, bindings)
        }
        (Expr::Number(a), Expr::Number(b)) => a == b,
        (Expr::Symbol(_), Expr::Symbol(_)) => ctx.is_same(pattern, target),
        (Expr::Str(a), Expr::Str(b)) => a == b,
        (Expr::Dict(_), Expr::Dict(_)) => ctx.is_same(pattern, target),
        _ => false,
    }
}

/// Operand-by-operand matching with sequence wildcards, trying shorter
/// captures first and backtracking on failure.
fn match_args(
    ctx: &mut Context,
    pargs: &[ExprId],
    targs: &[ExprId],
    bindings: &mut Bindings,
) -> bool {
    let Some((&first, rest)) = pargs.split_first() else {
        return targs.is_empty();
    };

    let seq = ctx
        .symbol_name(first)
        .and_then(wildcard_kind)
        .filter(|(k, _)| *k != WildcardKind::Single)
        .map(|(k, name)| (k, name.to_string()));

    match seq {
        None => {
            if targs.is_empty() {
                return false;
            }
            let checkpoint = bindings.clone();
            if match_inner(ctx, first, targs[0], bindings)
                && match_args(ctx, rest, &targs[1..], bindings)
            {
                return true;
            }
            *bindings = checkpoint;
            false
        }
        Some((kind, capture)) => {
            let min = if kind == WildcardKind::Sequence { 1 } else { 0 };
            for take in min..=targs.len() {
                let checkpoint = bindings.clone();
                let consumed = &targs[..take];
                let seq_value = if consumed.len() == 1 {
                    consumed[0]
                } else {
                    ctx.call("Sequence", consumed.to_vec())
                };
                if bind(ctx, bindings, &capture, seq_value)
                    && match_args(ctx, rest, &targs[take..], bindings)
                {
                    return true;
                }
                *bindings = checkpoint;
            }
            false
        }
    }
}

// ============================================================================
// Substitution
// ============================================================================

/// Substitute bound wildcards into a template. Sequence bindings splice
/// into operand lists.
pub fn substitute(ctx: &mut Context, template: ExprId, bindings: &Bindings) -> ExprId {
    if let Some(name) = ctx.symbol_name(template) {
        if let Some((kind, capture)) = wildcard_kind(name) {
            // Anonymous `__` refers to the whole positional tuple, stored
            // under the "_" key by `substitute_positional`.
            let key = if capture.is_empty() && kind != WildcardKind::Single {
                "_"
            } else {
                capture
            };
            if let Some(&bound) = bindings.get(key) {
                return bound;
            }
            return template;
        }
    }
    match ctx.get(template).clone() {
        Expr::Function(head, args) => {
            let new_head = substitute(ctx, head, bindings);
            let mut new_args = Vec::with_capacity(args.len());
            let mut changed = new_head != head;
            for arg in &args {
                let replaced = substitute(ctx, *arg, bindings);
                changed |= replaced != *arg;
                // A sequence capture splices in place of its wildcard.
                let was_wildcard = ctx
                    .symbol_name(*arg)
                    .and_then(wildcard_kind)
                    .map(|(k, _)| k != WildcardKind::Single)
                    .unwrap_or(false);
                if was_wildcard {
                    if let Some(seq) = ctx.args_of(replaced, "Sequence") {
                        new_args.extend_from_slice(seq);
                        continue;
                    }
                }
                new_args.push(replaced);
            }
            if changed {
                ctx.apply(new_head, new_args)
            } else {
                template
            }
        }
        Expr::Dict(entries) => {
            let mut changed = false;
            let new_entries: Vec<(String, ExprId)> = entries
                .iter()
                .map(|(k, v)| {
                    let nv = substitute(ctx, *v, bindings);
                    changed |= nv != *v;
                    (k.clone(), nv)
                })
                .collect();
            if changed {
                ctx.push(Expr::Dict(new_entries))
            } else {
                template
            }
        }
        _ => template,
    }
}

/// Substitute occurrences of one expression with another, structurally.
pub fn substitute_expr(
    ctx: &mut Context,
    root: ExprId,
    target: ExprId,
    replacement: ExprId,
) -> ExprId {
    if ctx.is_same(root, target) {
        return replacement;
    }
    match ctx.get(root).clone() {
        Expr::Function(head, args) => {
            let new_head = substitute_expr(ctx, head, target, replacement);
            let mut changed = new_head != head;
            let new_args: Vec<ExprId> = args
                .iter()
                .map(|a| {
                    let n = substitute_expr(ctx, *a, target, replacement);
                    changed |= n != *a;
                    n
                })
                .collect();
            if changed {
                ctx.apply(new_head, new_args)
            } else {
                root
            }
        }
        Expr::Dict(entries) => {
            let mut changed = false;
            let new_entries: Vec<(String, ExprId)> = entries
                .iter()
                .map(|(k, v)| {
                    let n = substitute_expr(ctx, *v, target, replacement);
                    changed |= n != *v;
                    (k.clone(), n)
                })
                .collect();
            if changed {
                ctx.push(Expr::Dict(new_entries))
            } else {
                root
            }
        }
        _ => root,
    }
}

/// Build the positional substitution map for a handler template and apply
/// it: `_1`, `_2`, … bind operands, `_` the first operand, `__` the whole
/// tuple as a `Sequence`, `_#` the operand count.
pub fn substitute_positional(ctx: &mut Context, template: ExprId, args: &[ExprId]) -> ExprId {
    let mut bindings = Bindings::default();
    for (i, arg) in args.iter().enumerate() {
        bindings.insert((i + 1).to_string(), *arg);
    }
    if let Some(first) = args.first() {
        bindings.insert(String::new(), *first);
    }
    let tuple = ctx.call("Sequence", args.to_vec());
    bindings.insert("_".to_string(), tuple);
    let count = ctx.num(args.len() as i64);
    bindings.insert("#".to_string(), count);
    substitute(ctx, template, &bindings)
}
