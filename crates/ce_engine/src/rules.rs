//! Rule-based rewriting.
//!
//! A rule is a compiled pattern/replacement pair with an optional priority
//! and side-condition over wildcard bindings. A rule set is an ordered
//! collection; `replace` walks the target innermost-first, trying rules in
//! set order at every position, and distinguishes "no rule matched"
//! (`None`) from "rewrote to something structurally identical".

use crate::engine::ComputeEngine;
use crate::pattern::{match_pattern, substitute, Bindings};
use ce_ast::{Context, Expr, ExprId};
use std::rc::Rc;
use tracing::trace;

/// Side-condition predicate over the bindings of a successful match.
pub type RuleCondition = Rc<dyn Fn(&Context, &Bindings) -> bool>;

/// A compiled rewrite rule.
#[derive(Clone)]
pub struct Rule {
    pub name: String,
    pub pattern: ExprId,
    pub replacement: ExprId,
    pub priority: i32,
    pub condition: Option<RuleCondition>,
}

impl Rule {
    pub fn new(name: &str, pattern: ExprId, replacement: ExprId) -> Self {
        Self {
            name: name.to_string(),
            pattern,
            replacement,
            priority: 0,
            condition: None,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_condition(mut self, condition: RuleCondition) -> Self {
        self.condition = Some(condition);
        self
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Ordered rule collection. Higher priority first, insertion order as the
/// tie-break.
#[derive(Debug, Default, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: Rule) {
        let pos = self
            .rules
            .iter()
            .position(|r| r.priority < rule.priority)
            .unwrap_or(self.rules.len());
        self.rules.insert(pos, rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Concatenation for caller-supplied extensions of a standard set.
    pub fn extended(&self, extra: &RuleSet) -> RuleSet {
        let mut out = self.clone();
        for r in extra.rules.clone() {
            out.push(r);
        }
        out
    }
}

/// Options for `replace`.
#[derive(Debug, Clone, Copy)]
pub struct ReplaceOptions {
    /// Also try every subexpression, innermost-first.
    pub recursive: bool,
    /// Stop after the first successful rewrite anywhere in the tree.
    pub once: bool,
    /// Cap on full passes over the tree.
    pub iteration_limit: u32,
}

impl Default for ReplaceOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            once: false,
            iteration_limit: 16,
        }
    }
}

/// Apply a rule set. Returns `None` if no rule ever matched.
pub fn replace(
    ng: &mut ComputeEngine,
    id: ExprId,
    rules: &RuleSet,
    options: &ReplaceOptions,
) -> Option<ExprId> {
    let mut current = id;
    let mut any = false;
    for _pass in 0..options.iteration_limit.max(1) {
        let (next, rewrote) = rewrite_pass(ng, current, rules, options.recursive, options.once);
        if !rewrote {
            break;
        }
        any = true;
        current = next;
        if options.once || ng.out_of_time() {
            break;
        }
    }
    any.then_some(current)
}

/// One pass: innermost-first, first matching rule wins at each position.
fn rewrite_pass(
    ng: &mut ComputeEngine,
    id: ExprId,
    rules: &RuleSet,
    recursive: bool,
    once: bool,
) -> (ExprId, bool) {
    let mut rewrote = false;

    // Children first so inner redexes are reduced before outer ones.
    let rebuilt = if recursive {
        match ng.ctx.get(id).clone() {
            Expr::Function(head, args) => {
                let mut changed = false;
                let mut new_args = Vec::with_capacity(args.len());
                for arg in &args {
                    if once && rewrote {
                        new_args.push(*arg);
                        continue;
                    }
                    let (n, r) = rewrite_pass(ng, *arg, rules, true, once);
                    changed |= n != *arg;
                    rewrote |= r;
                    new_args.push(n);
                }
                if changed {
                    ng.ctx.apply(head, new_args)
                } else {
                    id
                }
            }
            _ => id,
        }
    } else {
        id
    };

    if once && rewrote {
        return (rebuilt, true);
    }

    for rule in rules.rules() {
        if let Some(bindings) = match_pattern(&mut ng.ctx, rule.pattern, rebuilt) {
            if let Some(cond) = &rule.condition {
                if !cond(&ng.ctx, &bindings) {
                    continue;
                }
            }
            let replaced = substitute(&mut ng.ctx, rule.replacement, &bindings);
            trace!(rule = %rule.name, "rewrite applied");
            return (replaced, true);
        }
    }

    (rebuilt, rewrote)
}
