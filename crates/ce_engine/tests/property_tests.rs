//! Property tests for ordering totality, canonical idempotence and
//! determinism.

use ce_ast::{from_mathjson, to_mathjson, ExprId};
use ce_engine::ComputeEngine;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::cmp::Ordering;

/// A small generator of MathJSON trees over the standard heads.
fn arb_mathjson() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        (-50i64..50).prop_map(|n| json!(n)),
        prop_oneof![Just("x"), Just("y"), Just("z"), Just("Pi")]
            .prop_map(|s| json!(s)),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 2..4)
                .prop_map(|args| head_with("Add", args)),
            prop::collection::vec(inner.clone(), 2..4)
                .prop_map(|args| head_with("Multiply", args)),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| json!(["Divide", a, b])),
            inner.clone().prop_map(|a| json!(["Negate", a])),
            inner.prop_map(|a| json!(["Sin", a])),
        ]
    })
}

fn head_with(head: &str, args: Vec<Value>) -> Value {
    let mut items = vec![json!(head)];
    items.extend(args);
    Value::Array(items)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_canonical_idempotent(v in arb_mathjson()) {
        let mut ng = ComputeEngine::new();
        let id = from_mathjson(&mut ng.ctx, &v);
        let c1 = ng.canonical(id);
        let c2 = ng.canonical(c1);
        prop_assert_eq!(c1, c2, "canonical of canonical must be reference-identical");
    }

    #[test]
    fn prop_canonical_deterministic(v in arb_mathjson()) {
        let mut ng1 = ComputeEngine::new();
        let a = from_mathjson(&mut ng1.ctx, &v);
        let ca = ng1.canonical(a);
        let mut ng2 = ComputeEngine::new();
        let b = from_mathjson(&mut ng2.ctx, &v);
        let cb = ng2.canonical(b);
        prop_assert_eq!(
            to_mathjson(&ng1.ctx, ca),
            to_mathjson(&ng2.ctx, cb),
            "same input and configuration must canonicalize identically"
        );
    }

    #[test]
    fn prop_simplify_deterministic(v in arb_mathjson()) {
        let mut ng1 = ComputeEngine::new();
        let a = from_mathjson(&mut ng1.ctx, &v);
        let sa = ng1.simplify(a);
        let mut ng2 = ComputeEngine::new();
        let b = from_mathjson(&mut ng2.ctx, &v);
        let sb = ng2.simplify(b);
        prop_assert_eq!(to_mathjson(&ng1.ctx, sa), to_mathjson(&ng2.ctx, sb));
    }

    #[test]
    fn prop_order_antisymmetric(a in arb_mathjson(), b in arb_mathjson()) {
        let mut ng = ComputeEngine::new();
        let x = from_mathjson(&mut ng.ctx, &a);
        let y = from_mathjson(&mut ng.ctx, &b);
        let x = ng.canonical(x);
        let y = ng.canonical(y);
        let xy = ng.compare(x, y);
        let yx = ng.compare(y, x);
        prop_assert_eq!(xy, yx.reverse(), "compare must be antisymmetric");
    }

    #[test]
    fn prop_order_transitive(a in arb_mathjson(), b in arb_mathjson(), c in arb_mathjson()) {
        let mut ng = ComputeEngine::new();
        let mut ids: Vec<ExprId> = [a, b, c]
            .iter()
            .map(|v| from_mathjson(&mut ng.ctx, v))
            .collect();
        for id in ids.iter_mut() {
            *id = ng.canonical(*id);
        }
        let (x, y, z) = (ids[0], ids[1], ids[2]);
        if ng.compare(x, y) != Ordering::Greater && ng.compare(y, z) != Ordering::Greater {
            prop_assert_ne!(
                ng.compare(x, z),
                Ordering::Greater,
                "x <= y <= z implies x <= z"
            );
        }
    }

    #[test]
    fn prop_sort_stable_under_resort(v in prop::collection::vec(arb_mathjson(), 2..6)) {
        let mut ng = ComputeEngine::new();
        let mut ids: Vec<ExprId> = v
            .iter()
            .map(|x| {
                let id = from_mathjson(&mut ng.ctx, x);
                ng.canonical(id)
            })
            .collect();
        ce_engine::canonical::sort_commutative(&ng, &mut ids);
        let once = ids.clone();
        ce_engine::canonical::sort_commutative(&ng, &mut ids);
        prop_assert_eq!(once, ids, "sorting an already-sorted list must not move anything");
    }
}
