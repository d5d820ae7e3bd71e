//! LaTeX serialization of boxed expressions.
//!
//! Inverse of the parser (not a strict round-trip: notation is normalized,
//! but the output always re-parses to an equivalent expression). The
//! composition rules:
//!
//! - Add walks operands left to right, choosing `+`, an invisible plus for
//!   small mixed-number rationals (`1\frac{1}{2}`), or subtraction when a
//!   term carries a negative sign.
//! - Multiply first extracts numerator/denominator factors (negative
//!   exponents and non-unit rational denominators move below the bar) and
//!   defers to fraction rendering when any denominator factor exists;
//!   remaining factors join with an explicit `\cdot` only where
//!   juxtaposition would be ambiguous. A factor that is itself a
//!   fractional power renders as an n-th root.
//! - Power special-cases negative, reciprocal and fractional exponents
//!   into fractions or radicals instead of literal exponents.

use crate::style::{BoundsStyle, FractionStyle, RootStyle, SerializeStyle};
use ce_ast::{Context, Expr, ExprId, NumericValue};
use ce_parser::{default_dictionary, Dictionary};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed};

/// Serialize with the default dictionary and style.
pub fn serialize_latex(ctx: &Context, id: ExprId) -> String {
    let dict = default_dictionary();
    LatexSerializer::new(ctx, &dict).serialize(id)
}

#[derive(Clone)]
pub struct LatexSerializer<'a> {
    ctx: &'a Context,
    dict: &'a Dictionary,
    pub style: SerializeStyle,
    /// Wildcard name rendered as a bound variable (big-operator bodies).
    placeholder: Option<(String, String)>,
}

impl<'a> LatexSerializer<'a> {
    pub fn new(ctx: &'a Context, dict: &'a Dictionary) -> Self {
        Self {
            ctx,
            dict,
            style: SerializeStyle::default(),
            placeholder: None,
        }
    }

    pub fn with_style(mut self, style: SerializeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn serialize(&self, id: ExprId) -> String {
        self.expr(id, 0)
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    fn expr(&self, id: ExprId, level: u32) -> String {
        match self.ctx.get(id) {
            Expr::Number(v) => self.number(v, level),
            Expr::Symbol(s) => self.symbol(self.ctx.sym_name(*s)),
            Expr::Str(s) => format!("\\text{{{}}}", s),
            Expr::Dict(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, self.expr(*v, level + 1)))
                    .collect();
                format!("\\{{{}\\}}", parts.join(", "))
            }
            Expr::Function(head, args) => {
                let Some(name) = self.ctx.symbol_name(*head) else {
                    let h = self.expr(*head, level + 1);
                    let rendered: Vec<String> =
                        args.iter().map(|a| self.expr(*a, level + 1)).collect();
                    return format!("({})({})", h, rendered.join(", "));
                };
                self.application(name, args, level)
            }
        }
    }

    fn application(&self, name: &str, args: &[ExprId], level: u32) -> String {
        match name {
            "Add" => self.add(args, level),
            "Multiply" => self.multiply(args, level),
            "Negate" if args.len() == 1 => {
                format!("-{}", self.wrapped_operand(args[0], level))
            }
            "Subtract" if args.len() == 2 => {
                let lhs = self.expr(args[0], level);
                let rhs = self.wrapped_operand(args[1], level);
                format!("{} - {}", lhs, rhs)
            }
            "Divide" if args.len() == 2 => self.divide(args[0], args[1], level),
            "Rational" if args.len() == 2 => match self.rational_view_args(args) {
                Some(r) => self.rational(&r, level),
                None => {
                    let n = self.expr(args[0], level + 1);
                    let d = self.expr(args[1], level + 1);
                    self.fraction_parts(&n, &d, level)
                }
            },
            "Power" if args.len() == 2 => self.power(args[0], args[1], level),
            "Sqrt" if args.len() == 1 => {
                format!("\\sqrt{{{}}}", self.expr(args[0], level + 1))
            }
            "Root" if args.len() == 2 => self.root(args[0], args[1], level),
            "Abs" if args.len() == 1 => format!("|{}|", self.expr(args[0], level + 1)),
            "Ceiling" if args.len() == 1 => {
                format!("\\lceil {} \\rceil", self.expr(args[0], level + 1))
            }
            "Floor" if args.len() == 1 => {
                format!("\\lfloor {} \\rfloor", self.expr(args[0], level + 1))
            }
            "Factorial" if args.len() == 1 => {
                format!("{}!", self.wrapped_operand(args[0], level))
            }
            "Sum" => self.big_operator("\\sum", args, level),
            "Product" => self.big_operator("\\prod", args, level),
            "PartialDerivative" => self.derivative(args, level),
            "Sequence" => {
                let parts: Vec<String> = args.iter().map(|a| self.expr(*a, level)).collect();
                parts.join(", ")
            }
            "Equal" | "NotEqual" | "Less" | "Greater" | "LessEqual" | "GreaterEqual"
                if args.len() == 2 =>
            {
                let op = self.dict.command_for_head(name).unwrap_or("=");
                format!(
                    "{} {} {}",
                    self.expr(args[0], level + 1),
                    op,
                    self.expr(args[1], level + 1)
                )
            }
            _ => {
                let rendered: Vec<String> =
                    args.iter().map(|a| self.expr(*a, level + 1)).collect();
                match self.dict.command_for_head(name) {
                    Some(cmd) => format!("{}({})", cmd, rendered.join(", ")),
                    None => format!("\\operatorname{{{}}}({})", name, rendered.join(", ")),
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Leaves
    // ------------------------------------------------------------------

    fn symbol(&self, name: &str) -> String {
        if let Some((wildcard, rendered)) = &self.placeholder {
            if name == wildcard {
                return rendered.clone();
            }
        }
        if let Some(cmd) = self.dict.command_for_head(name) {
            return cmd.to_string();
        }
        if name.len() == 1 && name.chars().all(|c| c.is_ascii_alphabetic()) {
            name.to_string()
        } else {
            format!("\\mathrm{{{}}}", name)
        }
    }

    /// Rational value of a node: a literal, or a `Rational(n, d)`
    /// application with literal integer parts.
    fn rational_view(&self, id: ExprId) -> Option<BigRational> {
        if let Some(NumericValue::Rational(r)) = self.ctx.numeric_value(id) {
            return Some(r.clone());
        }
        let args = self.ctx.args_of(id, "Rational")?;
        self.rational_view_args(args)
    }

    fn rational_view_args(&self, args: &[ExprId]) -> Option<BigRational> {
        if args.len() != 2 {
            return None;
        }
        let n = self.ctx.numeric_value(args[0])?.as_rational()?.clone();
        let d = self.ctx.numeric_value(args[1])?.as_rational()?.clone();
        if !n.is_integer() || !d.is_integer() || d == BigRational::from_integer(BigInt::from(0)) {
            return None;
        }
        Some(n / d)
    }

    fn number(&self, v: &NumericValue, level: u32) -> String {
        match v {
            NumericValue::Rational(r) => self.rational(r, level),
            NumericValue::Machine(f) => {
                if f.is_nan() {
                    "\\operatorname{NaN}".to_string()
                } else if f.is_infinite() {
                    if *f > 0.0 {
                        "\\infty".to_string()
                    } else {
                        "-\\infty".to_string()
                    }
                } else {
                    format!("{}", f)
                }
            }
            NumericValue::Decimal(d) => d.to_string(),
            NumericValue::Complex(c) => {
                if c.im == 0.0 {
                    format!("{}", c.re)
                } else if c.re == 0.0 {
                    format!("{}i", c.im)
                } else if c.im < 0.0 {
                    format!("{}{}i", c.re, c.im)
                } else {
                    format!("{}+{}i", c.re, c.im)
                }
            }
        }
    }

    /// Negative sign stays outside the fraction: -1/2 is `-\frac{1}{2}`.
    fn rational(&self, r: &BigRational, level: u32) -> String {
        if r.is_integer() {
            return r.numer().to_string();
        }
        let (sign, abs) = if r.is_negative() {
            ("-", -r.clone())
        } else {
            ("", r.clone())
        };
        let rendered =
            self.fraction_parts(&abs.numer().to_string(), &abs.denom().to_string(), level);
        format!("{}{}", sign, rendered)
    }

    // ------------------------------------------------------------------
    // Composition rules
    // ------------------------------------------------------------------

    /// Operand wrapped in parentheses when it would capture its neighbors.
    fn wrapped_operand(&self, id: ExprId, level: u32) -> String {
        let needs_parens = matches!(
            self.ctx.head_name(id),
            Some("Add") | Some("Subtract") | Some("Negate")
        ) || matches!(self.ctx.numeric_value(id), Some(v) if v.sgn() == ce_ast::Sgn::Negative);
        let rendered = self.expr(id, level + 1);
        if needs_parens {
            format!("({})", rendered)
        } else {
            rendered
        }
    }

    fn add(&self, args: &[ExprId], level: u32) -> String {
        let mut out = String::new();
        let mut prev: Option<ExprId> = None;
        for (i, &arg) in args.iter().enumerate() {
            if i == 0 {
                out.push_str(&self.expr(arg, level));
                prev = Some(arg);
                continue;
            }
            if let Some(positive) = self.negative_term(arg, level) {
                out.push_str(" - ");
                out.push_str(&positive);
            } else if self.is_mixed_number_tail(prev, arg) {
                // Invisible plus: 1 + 1/2 renders as the mixed number 1\frac{1}{2}.
                out.push_str(&self.expr(arg, level));
            } else {
                out.push_str(" + ");
                out.push_str(&self.expr(arg, level));
            }
            prev = Some(arg);
        }
        out
    }

    /// Positive rendering of a term that carries a negative sign, if any.
    fn negative_term(&self, id: ExprId, level: u32) -> Option<String> {
        if let Some(v) = self.ctx.numeric_value(id) {
            if let NumericValue::Rational(r) = v {
                if r.is_negative() {
                    return Some(self.rational(&-r.clone(), level));
                }
            }
            return None;
        }
        if let Some(inner) = self.ctx.args_of(id, "Negate") {
            if inner.len() == 1 {
                return Some(self.wrapped_operand(inner[0], level));
            }
        }
        // Multiply with a negative leading rational coefficient.
        if let Some(factors) = self.ctx.args_of(id, "Multiply") {
            if let Some(NumericValue::Rational(r)) =
                factors.first().and_then(|f| self.ctx.numeric_value(*f))
            {
                if r.is_negative() {
                    let coeff = -r.clone();
                    let rest: Vec<String> = factors[1..]
                        .iter()
                        .map(|f| self.wrapped_operand(*f, level))
                        .collect();
                    let rest = rest.join("");
                    if coeff.is_one() {
                        return Some(rest);
                    }
                    return Some(format!("{}\\cdot {}", self.rational(&coeff, level), rest));
                }
            }
        }
        None
    }

    /// `1\frac{1}{2}`: previous term a positive integer, this one a proper
    /// positive fraction.
    fn is_mixed_number_tail(&self, prev: Option<ExprId>, current: ExprId) -> bool {
        let Some(prev) = prev else { return false };
        let prev_int = matches!(
            self.rational_view(prev),
            Some(r) if r.is_integer() && !r.is_negative()
        );
        let current_proper = matches!(
            self.rational_view(current),
            Some(r) if !r.is_integer() && !r.is_negative() && r.abs() < BigRational::one()
        );
        prev_int && current_proper
    }

    fn multiply(&self, args: &[ExprId], level: u32) -> String {
        let mut numerator: Vec<String> = Vec::new();
        let mut denominator: Vec<String> = Vec::new();
        let mut negative = false;

        for &arg in args {
            match self.ctx.get(arg) {
                Expr::Number(NumericValue::Rational(r)) => {
                    let mut r = r.clone();
                    if r.is_negative() {
                        negative = !negative;
                        r = -r;
                    }
                    if r.is_integer() {
                        numerator.push(r.numer().to_string());
                        continue;
                    }
                    if !r.numer().is_one() {
                        numerator.push(r.numer().to_string());
                    }
                    denominator.push(r.denom().to_string());
                }
                _ => {
                    // Rational(n, d) shorthand contributes like a literal.
                    if let Some(parts) = self.ctx.args_of(arg, "Rational") {
                        if parts.len() == 2 {
                            let n = self.expr(parts[0], level + 1);
                            if n != "1" {
                                numerator.push(n);
                            }
                            denominator.push(self.expr(parts[1], level + 1));
                            continue;
                        }
                    }
                    // A negative exponent moves the factor below the bar.
                    if let Some(pow) = self.ctx.args_of(arg, "Power") {
                        if pow.len() == 2 {
                            if let Some(e) = self.rational_view(pow[1]) {
                                if e.is_negative() {
                                    denominator
                                        .push(self.positive_power(pow[0], &-e.clone(), level));
                                    continue;
                                }
                                if !e.is_integer() {
                                    numerator.push(self.fractional_power(pow[0], &e, level));
                                    continue;
                                }
                            }
                        }
                    }
                    numerator.push(self.mul_operand(arg, level));
                }
            }
        }

        let num = join_factors(&numerator);
        if denominator.is_empty() {
            return format!("{}{}", if negative { "-" } else { "" }, num);
        }
        let den = join_factors(&denominator);
        let num = if num.is_empty() { "1".to_string() } else { num };
        format!(
            "{}{}",
            if negative { "-" } else { "" },
            self.fraction_parts(&num, &den, level)
        )
    }

    fn mul_operand(&self, id: ExprId, level: u32) -> String {
        let needs_parens = matches!(
            self.ctx.head_name(id),
            Some("Add") | Some("Subtract") | Some("Negate")
        );
        let rendered = self.expr(id, level + 1);
        if needs_parens {
            format!("({})", rendered)
        } else {
            rendered
        }
    }

    fn divide(&self, num: ExprId, den: ExprId, level: u32) -> String {
        // The sign of the numerator stays outside the bar.
        if let Some(inner) = self.ctx.args_of(num, "Negate") {
            if inner.len() == 1 {
                let n = self.expr(inner[0], level + 1);
                let d = self.expr(den, level + 1);
                return format!("-{}", self.fraction_parts(&n, &d, level));
            }
        }
        if let Some(NumericValue::Rational(r)) = self.ctx.numeric_value(num) {
            if r.is_negative() {
                let n = self.rational(&-r.clone(), level + 1);
                let d = self.expr(den, level + 1);
                return format!("-{}", self.fraction_parts(&n, &d, level));
            }
        }
        let n = self.expr(num, level + 1);
        let d = self.expr(den, level + 1);
        self.fraction_parts(&n, &d, level)
    }

    fn fraction_parts(&self, num: &str, den: &str, level: u32) -> String {
        match (self.style.fraction)(level) {
            FractionStyle::Frac => format!("\\frac{{{}}}{{{}}}", num, den),
            FractionStyle::Solidus => format!("{}/{}", num, den),
            FractionStyle::Reciprocal => format!("{}\\cdot {{{}}}^{{-1}}", num, den),
        }
    }

    fn power(&self, base: ExprId, exp: ExprId, level: u32) -> String {
        if let Some(e) = self.rational_view(exp) {
            if e.is_negative() {
                let inner = self.positive_power(base, &-e.clone(), level);
                return self.fraction_parts("1", &inner, level);
            }
            if !e.is_integer() {
                return self.fractional_power(base, &e, level);
            }
        }
        let b = self.mul_operand(base, level);
        let x = self.expr(exp, level + 1);
        format!("{{{}}}^{{{}}}", b, x)
    }

    /// base^e with e a positive rational; exponent 1 collapses.
    fn positive_power(&self, base: ExprId, e: &BigRational, level: u32) -> String {
        if e.is_one() {
            return self.mul_operand(base, level);
        }
        if !e.is_integer() {
            return self.fractional_power(base, e, level);
        }
        let b = self.mul_operand(base, level);
        format!("{{{}}}^{{{}}}", b, e.numer())
    }

    /// Fractional powers as radicals (per root style): x^(p/q) is
    /// `\sqrt[q]{x^p}`.
    fn fractional_power(&self, base: ExprId, e: &BigRational, level: u32) -> String {
        if (self.style.root)(level) == RootStyle::Exponent {
            let b = self.mul_operand(base, level);
            let frac = self.rational(e, level + 1);
            return format!("{{{}}}^{{{}}}", b, frac);
        }
        let p = e.numer();
        let q = e.denom();
        let radicand = if p.is_one() {
            self.expr(base, level + 1)
        } else {
            let b = self.mul_operand(base, level);
            format!("{{{}}}^{{{}}}", b, p)
        };
        if *q == BigInt::from(2) {
            format!("\\sqrt{{{}}}", radicand)
        } else {
            format!("\\sqrt[{}]{{{}}}", q, radicand)
        }
    }

    fn root(&self, base: ExprId, degree: ExprId, level: u32) -> String {
        let b = self.expr(base, level + 1);
        match self.ctx.as_integer(degree) {
            Some(2) => format!("\\sqrt{{{}}}", b),
            _ => format!("\\sqrt[{}]{{{}}}", self.expr(degree, level + 1), b),
        }
    }

    // ------------------------------------------------------------------
    // Big operators and derivatives
    // ------------------------------------------------------------------

    fn big_operator(&self, command: &str, args: &[ExprId], level: u32) -> String {
        let (body, bounds) = match args {
            [b, t] => (*b, Some(*t)),
            [b] => (*b, None),
            _ => return command.to_string(),
        };
        let body_expr = self
            .ctx
            .args_of(body, "Lambda")
            .and_then(|a| a.first().copied())
            .unwrap_or(body);

        let mut sub = String::new();
        let mut sup = String::new();
        let mut index_str: Option<String> = None;
        if let Some(bounds) = bounds {
            if let Some(tuple) = self.ctx.args_of(bounds, "Tuple") {
                if tuple.len() == 3 {
                    let idx = self.expr(tuple[0], level + 1);
                    let lower_missing = self.ctx.is_symbol(tuple[1], "Nothing");
                    let upper_missing = self.ctx.is_symbol(tuple[2], "Nothing");
                    sub = if lower_missing {
                        idx.clone()
                    } else {
                        format!("{}={}", idx, self.expr(tuple[1], level + 1))
                    };
                    if !upper_missing {
                        sup = self.expr(tuple[2], level + 1);
                    }
                    index_str = Some(idx);
                }
            } else if !self.ctx.is_symbol(bounds, "Nothing") {
                sub = self.expr(bounds, level + 1);
            }
        }

        let body_serializer = LatexSerializer {
            placeholder: index_str.map(|idx| ("_1".to_string(), idx)),
            ..self.clone()
        };
        let body_str = body_serializer.expr(body_expr, level + 1);

        if (self.style.bounds)(level) == BoundsStyle::None {
            return format!("{} {}", command, body_str);
        }
        let mut out = command.to_string();
        if !sub.is_empty() {
            out.push_str(&format!("_{{{}}}", sub));
        }
        if !sup.is_empty() {
            out.push_str(&format!("^{{{}}}", sup));
        }
        out.push(' ');
        out.push_str(&body_str);
        out
    }

    fn derivative(&self, args: &[ExprId], level: u32) -> String {
        let [body, vars, order] = args else {
            let rendered: Vec<String> = args.iter().map(|a| self.expr(*a, level + 1)).collect();
            return format!("\\operatorname{{PartialDerivative}}({})", rendered.join(", "));
        };
        let vars: Vec<ExprId> = self
            .ctx
            .args_of(*vars, "Tuple")
            .map(|a| a.to_vec())
            .unwrap_or_else(|| vec![*vars]);
        let order = self.ctx.as_integer(*order).unwrap_or(1);
        let marker = if vars.len() > 1 { "\\partial" } else { "d" };
        let sup = if order > 1 {
            format!("^{}", order)
        } else {
            String::new()
        };
        let mut den = String::new();
        for v in &vars {
            den.push_str(marker);
            den.push_str(&self.expr(*v, level + 1));
            if vars.len() == 1 && order > 1 {
                den.push_str(&format!("^{}", order));
            }
        }
        format!(
            "\\frac{{{}{}}}{{{}}} {}",
            marker,
            sup,
            den,
            self.expr(*body, level + 1)
        )
    }
}

fn join_factors(parts: &[String]) -> String {
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            let next_starts_digit = part
                .chars()
                .next()
                .map(|c| c.is_ascii_digit() || c == '.')
                .unwrap_or(false);
            if next_starts_digit {
                out.push_str("\\cdot ");
            }
        }
        out.push_str(part);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ce_ast::from_mathjson;
    use ce_engine::ComputeEngine;
    use serde_json::json;

    fn render(json: serde_json::Value) -> String {
        let mut ng = ComputeEngine::new();
        let id = from_mathjson(&mut ng.ctx, &json);
        serialize_latex(&ng.ctx, id)
    }

    #[test]
    fn test_serialize_rational_multiple() {
        // ["Multiply", 2, ["Rational", 1, 3]] renders as one fraction
        assert_eq!(
            render(json!(["Multiply", 2, ["Rational", 1, 3]])),
            "\\frac{2}{3}"
        );
    }

    #[test]
    fn test_serialize_divide() {
        assert_eq!(render(json!(["Divide", "Pi", 2])), "\\frac{\\pi}{2}");
    }

    #[test]
    fn test_serialize_negative_numerator() {
        assert_eq!(
            render(json!(["Divide", ["Negate", "x"], "n"])),
            "-\\frac{x}{n}"
        );
    }

    #[test]
    fn test_serialize_add_with_negative_term() {
        assert_eq!(render(json!(["Add", "x", ["Negate", "y"]])), "x - y");
        assert_eq!(render(json!(["Add", "x", -3])), "x - 3");
    }

    #[test]
    fn test_serialize_mixed_number_invisible_plus() {
        assert_eq!(
            render(json!(["Add", 1, ["Rational", 1, 2]])),
            "1\\frac{1}{2}"
        );
    }

    #[test]
    fn test_serialize_negative_rational_sign_outside() {
        assert_eq!(render(json!(["Rational", -1, 2])), "-\\frac{1}{2}");
    }

    #[test]
    fn test_serialize_multiply_juxtaposition() {
        assert_eq!(render(json!(["Multiply", 2, "x"])), "2x");
        assert_eq!(render(json!(["Multiply", 2, 3])), "2\\cdot 3");
    }

    #[test]
    fn test_serialize_negative_exponent_as_fraction() {
        assert_eq!(
            render(json!(["Multiply", "a", ["Power", "b", -1]])),
            "\\frac{a}{b}"
        );
        assert_eq!(
            render(json!(["Power", "x", -2])),
            "\\frac{1}{{x}^{2}}"
        );
    }

    #[test]
    fn test_serialize_fractional_power_as_root() {
        assert_eq!(render(json!(["Power", "x", ["Rational", 1, 2]])), "\\sqrt{x}");
        assert_eq!(
            render(json!(["Power", "x", ["Rational", 2, 3]])),
            "\\sqrt[3]{{x}^{2}}"
        );
    }

    #[test]
    fn test_serialize_sqrt_and_root() {
        assert_eq!(render(json!(["Sqrt", 12])), "\\sqrt{12}");
        assert_eq!(render(json!(["Root", 8, 3])), "\\sqrt[3]{8}");
    }

    #[test]
    fn test_serialize_trig() {
        assert_eq!(render(json!(["Sin", "x"])), "\\sin(x)");
    }

    #[test]
    fn test_serialize_symbols() {
        assert_eq!(render(json!("Pi")), "\\pi");
        assert_eq!(render(json!("ExponentialE")), "e");
        assert_eq!(render(json!("theta")), "\\mathrm{theta}");
    }

    #[test]
    fn test_serialize_relational() {
        assert_eq!(render(json!(["Equal", "x", 1])), "x = 1");
    }

    #[test]
    fn test_serialize_paren_wrapping() {
        assert_eq!(
            render(json!(["Multiply", 2, ["Add", "x", 1]])),
            "2(x + 1)"
        );
    }

    #[test]
    fn test_inline_style_solidus() {
        let mut ng = ComputeEngine::new();
        let id = from_mathjson(&mut ng.ctx, &json!(["Add", "a", ["Divide", "x", "y"]]));
        let dict = default_dictionary();
        let out = LatexSerializer::new(&ng.ctx, &dict)
            .with_style(SerializeStyle::inline())
            .serialize(id);
        assert_eq!(out, "a + x/y");
    }

    #[test]
    fn test_serialize_sum_with_bounds() {
        let mut ng = ComputeEngine::new();
        let id = ce_parser::parse_latex(&mut ng, "\\sum_{i=1}^{4} i");
        let out = serialize_latex(&ng.ctx, id);
        assert_eq!(out, "\\sum_{i=1}^{4} i");
    }

    #[test]
    fn test_serialize_derivative() {
        let mut ng = ComputeEngine::new();
        let id = ce_parser::parse_latex(&mut ng, "\\frac{d}{dx} y");
        assert_eq!(serialize_latex(&ng.ctx, id), "\\frac{d}{dx} y");
    }
}
