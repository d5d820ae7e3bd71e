//! Parse error containment: parsing any truncated or malformed input never
//! panics, and malformed input yields an invalid tree with at least one
//! error marker, never a thrown error.

use ce_ast::{has_no_errors, is_error, Context, ExprId};
use ce_engine::ComputeEngine;
use ce_parser::parse_latex;
use proptest::prelude::*;

fn count_errors(ctx: &Context, id: ExprId) -> usize {
    let mut n = 0;
    ctx.walk(id, &mut |e| {
        if is_error(ctx, e) {
            n += 1;
        }
    });
    n
}

#[test]
fn test_truncated_inputs_contained() {
    let cases = [
        "\\frac{1}",
        "\\frac{1}{",
        "\\sqrt{",
        "\\sqrt[3]{8",
        "(1 + 2",
        "|x",
        "1 +",
        "\\lceil x",
        "2 ^",
        "\\sum_{i=1}^",
    ];
    for input in cases {
        let mut ng = ComputeEngine::new();
        let id = parse_latex(&mut ng, input);
        assert!(
            !has_no_errors(&ng.ctx, id),
            "malformed input {:?} must carry an error marker",
            input
        );
        assert!(!ng.is_valid(id));
    }
}

#[test]
fn test_unknown_commands_reported_distinctly() {
    let mut ng = ComputeEngine::new();
    let id = parse_latex(&mut ng, "\\blorp");
    let mut codes = Vec::new();
    ng.ctx.walk(id, &mut |e| {
        if let Some(code) = ce_ast::error_code(&ng.ctx, e) {
            codes.push(code);
        }
    });
    assert_eq!(codes, vec![ce_ast::ErrorCode::UnexpectedCommand]);

    let mut ng2 = ComputeEngine::new();
    let id2 = parse_latex(&mut ng2, "1 2 ,");
    let mut codes2 = Vec::new();
    ng2.ctx.walk(id2, &mut |e| {
        if let Some(code) = ce_ast::error_code(&ng2.ctx, e) {
            codes2.push(code);
        }
    });
    assert_eq!(codes2, vec![ce_ast::ErrorCode::UnexpectedToken]);
}

#[test]
fn test_partial_parse_preserved_in_sequence() {
    let mut ng = ComputeEngine::new();
    let id = parse_latex(&mut ng, "1 + 2 \\oops");
    // The valid prefix is preserved, not discarded.
    let args = ng.ctx.args_of(id, "Sequence").expect("Sequence wrapper");
    let prefix = args[0];
    let simplified = ng.simplify(prefix);
    assert_eq!(ng.ctx.as_integer(simplified), Some(3));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Arbitrary ASCII soup never panics and always yields a tree.
    #[test]
    fn prop_parse_never_panics(input in "[ -~]{0,40}") {
        let mut ng = ComputeEngine::new();
        let _ = parse_latex(&mut ng, &input);
    }

    /// Truncating a valid expression never panics and the result is a
    /// tree (valid or error-carrying, but always well-formed).
    #[test]
    fn prop_truncation_contained(cut in 0usize..30) {
        let input = "\\frac{\\pi}{2} + \\sqrt{12} \\cdot x";
        let truncated: String = input.chars().take(cut).collect();
        let mut ng = ComputeEngine::new();
        let id = parse_latex(&mut ng, &truncated);
        // Walking the whole tree exercises well-formedness.
        let _ = count_errors(&ng.ctx, id);
    }
}
