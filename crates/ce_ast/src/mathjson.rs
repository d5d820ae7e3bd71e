//! MathJSON interchange.
//!
//! The canonical serialization of expressions: a function application is a
//! JSON array `[head, ...operands]`, a symbol is a bare JSON string, a string
//! literal is a JSON string delimited by single quotes, and numbers use JSON
//! numbers where they fit and `{"num": "..."}` otherwise. Objects with
//! `fn`/`sym`/`str`/`num`/`dict` keys carry optional `latex`/`wikidata`
//! metadata.
//!
//! Round-trip contract: reading back a serialized tree reproduces an
//! equivalent (not necessarily identical) expression — e.g. a non-integer
//! rational serializes as `["Rational", n, d]`, which reads back as a
//! `Rational` application that canonicalization folds to a literal again.

use crate::expression::{Context, Expr, ExprId, Meta};
use crate::numeric::{BigDecimal, NumericValue};
use num_bigint::BigInt;
use num_complex::Complex64;
use num_rational::BigRational;
use num_traits::ToPrimitive;
use serde_json::{json, Map, Value};
use std::str::FromStr;

// ============================================================================
// Serialization
// ============================================================================

/// Serialize an expression to a MathJSON value.
pub fn to_mathjson(ctx: &Context, id: ExprId) -> Value {
    let core = match ctx.get(id) {
        Expr::Number(n) => number_to_json(n),
        Expr::Symbol(s) => Value::String(ctx.sym_name(*s).to_string()),
        Expr::Str(s) => Value::String(format!("'{}'", s)),
        Expr::Function(head, args) => {
            let mut items = Vec::with_capacity(args.len() + 1);
            items.push(to_mathjson(ctx, *head));
            items.extend(args.iter().map(|a| to_mathjson(ctx, *a)));
            Value::Array(items)
        }
        Expr::Dict(entries) => {
            let mut map = Map::new();
            for (k, v) in entries {
                map.insert(k.clone(), to_mathjson(ctx, *v));
            }
            json!({ "dict": Value::Object(map) })
        }
    };

    // Attach metadata, if any, by promoting to the object form.
    match ctx.meta(id) {
        None => core,
        Some(meta) => {
            let mut map = Map::new();
            let key = match ctx.get(id) {
                Expr::Number(_) => "num",
                Expr::Symbol(_) => "sym",
                Expr::Str(_) => "str",
                Expr::Function(..) => "fn",
                Expr::Dict(_) => "dict",
            };
            map.insert(key.to_string(), core);
            if let Some(latex) = &meta.latex {
                map.insert("latex".to_string(), Value::String(latex.clone()));
            }
            if let Some(wikidata) = &meta.wikidata {
                map.insert("wikidata".to_string(), Value::String(wikidata.clone()));
            }
            Value::Object(map)
        }
    }
}

fn number_to_json(n: &NumericValue) -> Value {
    match n {
        NumericValue::Machine(f) => {
            if f.is_nan() {
                json!({ "num": "NaN" })
            } else if f.is_infinite() {
                json!({ "num": if *f > 0.0 { "+Infinity" } else { "-Infinity" } })
            } else {
                json!(f)
            }
        }
        NumericValue::Decimal(d) => json!({ "num": d.to_string() }),
        NumericValue::Rational(r) => {
            if r.is_integer() {
                match r.to_integer().to_i64() {
                    Some(i) => json!(i),
                    None => json!({ "num": r.numer().to_string() }),
                }
            } else {
                json!([
                    "Rational",
                    rational_part(r.numer()),
                    rational_part(r.denom())
                ])
            }
        }
        NumericValue::Complex(c) => json!(["Complex", c.re, c.im]),
    }
}

fn rational_part(n: &BigInt) -> Value {
    match n.to_i64() {
        Some(i) => json!(i),
        None => json!({ "num": n.to_string() }),
    }
}

// ============================================================================
// Deserialization (boxing)
// ============================================================================

/// Box a MathJSON value into the arena. Never fails: unrecognized shapes
/// become string literals so the result is always a well-formed tree.
pub fn from_mathjson(ctx: &mut Context, value: &Value) -> ExprId {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                ctx.num(i)
            } else {
                ctx.number(NumericValue::Machine(n.as_f64().unwrap_or(f64::NAN)))
            }
        }
        Value::String(s) => box_string(ctx, s),
        Value::Array(items) => {
            if items.is_empty() {
                return ctx.str("");
            }
            let head = from_mathjson(ctx, &items[0]);
            let args = items[1..].iter().map(|v| from_mathjson(ctx, v)).collect();
            ctx.apply(head, args)
        }
        Value::Object(map) => box_object(ctx, map),
        Value::Bool(b) => ctx.sym(if *b { "True" } else { "False" }),
        Value::Null => ctx.sym("Nothing"),
    }
}

fn box_string(ctx: &mut Context, s: &str) -> ExprId {
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        ctx.str(&s[1..s.len() - 1])
    } else {
        ctx.sym(s)
    }
}

fn box_object(ctx: &mut Context, map: &Map<String, Value>) -> ExprId {
    let id = if let Some(num) = map.get("num") {
        let text = match num {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        ctx.number(parse_num_literal(&text))
    } else if let Some(Value::String(sym)) = map.get("sym") {
        ctx.sym(sym)
    } else if let Some(Value::String(s)) = map.get("str") {
        ctx.str(s)
    } else if let Some(func) = map.get("fn") {
        from_mathjson(ctx, func)
    } else if let Some(Value::Object(dict)) = map.get("dict") {
        let entries = dict
            .iter()
            .map(|(k, v)| {
                let vid = from_mathjson(ctx, v);
                (k.clone(), vid)
            })
            .collect();
        ctx.push(Expr::Dict(entries))
    } else {
        // Unknown object shape: keep it inspectable rather than failing.
        return ctx.str(&Value::Object(map.clone()).to_string());
    };

    let latex = map.get("latex").and_then(Value::as_str).map(String::from);
    let wikidata = map
        .get("wikidata")
        .and_then(Value::as_str)
        .map(String::from);
    if latex.is_some() || wikidata.is_some() {
        ctx.set_meta(id, Meta { latex, wikidata });
    }
    id
}

/// Parse a `{"num": "..."}` literal: NaN, signed infinities, integers and
/// decimal strings. Trailing `n`/`d` markers from older dialects are
/// tolerated and stripped.
fn parse_num_literal(text: &str) -> NumericValue {
    let t = text.trim().trim_end_matches(['n', 'd']);
    match t {
        "NaN" => return NumericValue::Machine(f64::NAN),
        "+Infinity" | "Infinity" => return NumericValue::Machine(f64::INFINITY),
        "-Infinity" => return NumericValue::Machine(f64::NEG_INFINITY),
        _ => {}
    }
    if let Ok(i) = BigInt::from_str(t) {
        return NumericValue::Rational(BigRational::from_integer(i));
    }
    if let Some(dot) = t.find('.') {
        let (int_part, frac_part) = (&t[..dot], &t[dot + 1..]);
        if let (Ok(mantissa), true) = (
            BigInt::from_str(&format!("{}{}", int_part, frac_part)),
            frac_part.chars().all(|c| c.is_ascii_digit()),
        ) {
            return NumericValue::Decimal(BigDecimal::new(mantissa, frac_part.len() as u32));
        }
    }
    NumericValue::Machine(t.parse::<f64>().unwrap_or(f64::NAN))
}

/// Convenience: box a complex literal.
pub fn complex(ctx: &mut Context, re: f64, im: f64) -> ExprId {
    ctx.number(NumericValue::Complex(Complex64::new(re, im)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_roundtrip() {
        let mut ctx = Context::new();
        let id = ctx.num(42);
        let j = to_mathjson(&ctx, id);
        assert_eq!(j, json!(42));
        let back = from_mathjson(&mut ctx, &j);
        assert!(ctx.is_same(id, back));
    }

    #[test]
    fn test_symbol_vs_string() {
        let mut ctx = Context::new();
        let sym = from_mathjson(&mut ctx, &json!("x"));
        assert_eq!(ctx.symbol_name(sym), Some("x"));
        let s = from_mathjson(&mut ctx, &json!("'hello'"));
        assert!(matches!(ctx.get(s), Expr::Str(v) if v == "hello"));
    }

    #[test]
    fn test_function_roundtrip() {
        let mut ctx = Context::new();
        let j = json!(["Divide", "Pi", 2]);
        let id = from_mathjson(&mut ctx, &j);
        assert_eq!(to_mathjson(&ctx, id), j);
    }

    #[test]
    fn test_rational_shorthand() {
        let mut ctx = Context::new();
        let id = ctx.rational(1, 2);
        assert_eq!(to_mathjson(&ctx, id), json!(["Rational", 1, 2]));
    }

    #[test]
    fn test_num_object_bigint() {
        let mut ctx = Context::new();
        let j = json!({ "num": "123456789012345678901234567890" });
        let id = from_mathjson(&mut ctx, &j);
        assert_eq!(to_mathjson(&ctx, id), j);
    }

    #[test]
    fn test_decimal_literal() {
        let mut ctx = Context::new();
        let id = from_mathjson(&mut ctx, &json!({ "num": "3.14" }));
        assert!(matches!(
            ctx.get(id),
            Expr::Number(NumericValue::Decimal(_))
        ));
    }

    #[test]
    fn test_nan_literal() {
        let mut ctx = Context::new();
        let id = from_mathjson(&mut ctx, &json!({ "num": "NaN" }));
        assert!(matches!(ctx.get(id), Expr::Number(NumericValue::Machine(f)) if f.is_nan()));
    }

    #[test]
    fn test_metadata_carried() {
        let mut ctx = Context::new();
        let j = json!({ "sym": "Pi", "latex": "\\pi", "wikidata": "Q167" });
        let id = from_mathjson(&mut ctx, &j);
        assert_eq!(ctx.symbol_name(id), Some("Pi"));
        let meta = ctx.meta(id).unwrap();
        assert_eq!(meta.latex.as_deref(), Some("\\pi"));
        let out = to_mathjson(&ctx, id);
        assert_eq!(out["wikidata"], json!("Q167"));
    }

    #[test]
    fn test_dict_ordered() {
        let mut ctx = Context::new();
        let j = json!({ "dict": { "a": 1, "b": ["Add", "x", 1] } });
        let id = from_mathjson(&mut ctx, &j);
        assert!(matches!(ctx.get(id), Expr::Dict(entries) if entries.len() == 2));
    }
}
