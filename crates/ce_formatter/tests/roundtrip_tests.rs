//! Round-trip property: serialize(parse(x)) must re-parse to an expression
//! mathematically equal to the original.

use ce_engine::ComputeEngine;
use ce_formatter::serialize_latex;
use ce_parser::parse_latex;

fn roundtrip_equal(input: &str) {
    let mut ng = ComputeEngine::new();
    let first = parse_latex(&mut ng, input);
    let first = ng.canonical(first);
    let rendered = serialize_latex(&ng.ctx, first);
    let second = parse_latex(&mut ng, &rendered);
    let second = ng.canonical(second);
    assert!(
        ng.is_equal(first, second),
        "round trip changed value: {:?} -> {:?} (from {})",
        first,
        second,
        rendered
    );
}

#[test]
fn test_roundtrip_numbers() {
    roundtrip_equal("42");
    roundtrip_equal("0.25");
    roundtrip_equal("\\frac{3}{4}");
}

#[test]
fn test_roundtrip_sums_products() {
    roundtrip_equal("1 + 2x");
    roundtrip_equal("2 \\cdot 3 \\cdot 7");
    roundtrip_equal("x - 3");
}

#[test]
fn test_roundtrip_fractions_roots() {
    roundtrip_equal("\\frac{\\pi}{2}");
    roundtrip_equal("\\sqrt{12}");
    roundtrip_equal("\\sqrt[3]{8}");
}

#[test]
fn test_roundtrip_trig() {
    roundtrip_equal("\\sin(\\frac{\\pi}{2})");
    roundtrip_equal("\\cos(0)");
}

#[test]
fn test_roundtrip_powers() {
    roundtrip_equal("2^{10}");
    roundtrip_equal("2^3^4");
}

#[test]
fn test_serialized_form_reparses_after_simplify() {
    let mut ng = ComputeEngine::new();
    let id = parse_latex(&mut ng, "\\sqrt{12}");
    let simplified = ng.simplify(id);
    let rendered = serialize_latex(&ng.ctx, simplified);
    let back = parse_latex(&mut ng, &rendered);
    assert!(ng.is_equal(simplified, back));
}
