//! Dictionary-driven precedence-climbing LaTeX parser.
//!
//! The parser consumes the token stream positionally: parse a primary, then
//! loop consuming infix/postfix operators whose precedence clears the
//! caller's minimum, recursing with the minimum adjusted per associativity.
//! Juxtaposition is an invisible multiplication at the multiplicative band.
//!
//! Errors never abort the parse: missing arguments, unterminated delimiters
//! and unknown tokens become typed in-tree error markers, and a top-level
//! leftover wraps the already-parsed prefix in a `Sequence` alongside the
//! error.

use crate::dictionary::{
    Associativity, DictEntry, Dictionary, EntryKind, BIG_OP_BODY_PREC, INVISIBLE_MULTIPLY_PREC,
};
use crate::tokenizer::{is_command, tokenize, CLOSE_GROUP, OPEN_GROUP};
use ce_ast::{error_with, ErrorCode, ExprId, Meta, NumericValue};
use ce_engine::canonical::apply_associative;
use ce_engine::pattern::substitute_expr;
use ce_engine::{ComputeEngine, Domain, SymbolDef};
use num_bigint::BigInt;
use num_rational::BigRational;

pub struct LatexParser<'a> {
    tokens: Vec<String>,
    pos: usize,
    pub engine: &'a mut ComputeEngine,
    pub dict: &'a Dictionary,
}

/// Parse a LaTeX string with the default dictionary. Always returns a tree.
pub fn parse_latex(engine: &mut ComputeEngine, input: &str) -> ExprId {
    let dict = crate::dictionary::default_dictionary();
    parse_latex_with(engine, &dict, input)
}

/// Parse with a caller-extended dictionary.
pub fn parse_latex_with(engine: &mut ComputeEngine, dict: &Dictionary, input: &str) -> ExprId {
    let mut parser = LatexParser {
        tokens: tokenize(input),
        pos: 0,
        engine,
        dict,
    };

    let mut expr = match parser.parse_expression(0) {
        Some(e) => e,
        None => match parser.next() {
            Some(tok) => parser.unknown_token_error(&tok),
            None => parser.engine.ctx.sym("Nothing"),
        },
    };

    // One more infix continuation before giving up on leftovers.
    if !parser.at_end() {
        expr = parser.continue_expression(expr, 0);
    }
    if !parser.at_end() {
        let tok = parser.next().expect("not at end");
        let err = parser.unknown_token_error(&tok);
        expr = parser.engine.ctx.call("Sequence", vec![expr, err]);
    }

    parser.engine.ctx.set_meta(
        expr,
        Meta {
            latex: Some(input.to_string()),
            wikidata: None,
        },
    );
    expr
}

impl<'a> LatexParser<'a> {
    // ------------------------------------------------------------------
    // Token stream access
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn next(&mut self) -> Option<String> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Consume the expected token, true on success.
    fn expect(&mut self, token: &str) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unknown_token_error(&mut self, token: &str) -> ExprId {
        let code = if is_command(token) {
            ErrorCode::UnexpectedCommand
        } else {
            ErrorCode::UnexpectedToken
        };
        let culprit = self.engine.ctx.str(token);
        error_with(&mut self.engine.ctx, code, culprit)
    }

    fn missing(&mut self) -> ExprId {
        ce_ast::error(&mut self.engine.ctx, ErrorCode::Missing)
    }

    // ------------------------------------------------------------------
    // Expression parsing
    // ------------------------------------------------------------------

    pub fn parse_expression(&mut self, min_prec: u16) -> Option<ExprId> {
        let lhs = self.parse_primary()?;
        Some(self.continue_expression(lhs, min_prec))
    }

    /// The operator loop: consume infix/postfix/juxtaposition while the
    /// precedence clears `min_prec`.
    fn continue_expression(&mut self, mut lhs: ExprId, min_prec: u16) -> ExprId {
        loop {
            let Some(tok) = self.peek() else { break };
            let tok = tok.to_string();

            if let Some(entry) = self.dict.infix(&tok).cloned() {
                let EntryKind::Infix { precedence, assoc } = entry.kind else {
                    unreachable!()
                };
                if precedence >= min_prec {
                    self.next();
                    let next_min = match assoc {
                        Associativity::Right => precedence,
                        _ => precedence + 1,
                    };
                    let rhs = match self.parse_expression(next_min) {
                        Some(r) => r,
                        None => self.missing(),
                    };
                    lhs = self.build_infix(&entry, lhs, rhs);
                    continue;
                }
            }

            if let Some(entry) = self.dict.postfix(&tok).cloned() {
                let EntryKind::Postfix { precedence } = entry.kind else {
                    unreachable!()
                };
                if precedence >= min_prec {
                    self.next();
                    lhs = self.engine.ctx.call(entry.head, vec![lhs]);
                    continue;
                }
            }

            // Invisible multiplication by juxtaposition: `2x`, `2\sin x`.
            if INVISIBLE_MULTIPLY_PREC >= min_prec && self.starts_primary(&tok) {
                let Some(rhs) = self.parse_expression(INVISIBLE_MULTIPLY_PREC + 1) else {
                    break;
                };
                lhs = apply_associative(&mut self.engine.ctx, "Multiply", vec![lhs, rhs]);
                continue;
            }

            break;
        }
        lhs
    }

    fn build_infix(&mut self, entry: &DictEntry, lhs: ExprId, rhs: ExprId) -> ExprId {
        match entry.head {
            // Associative heads flatten immediately instead of nesting.
            "Add" | "Multiply" => {
                apply_associative(&mut self.engine.ctx, entry.head, vec![lhs, rhs])
            }
            head => self.engine.ctx.call(head, vec![lhs, rhs]),
        }
    }

    /// Does this token start a primary (for juxtaposition)? Prefix
    /// operators deliberately do not: `a - b` is never a product.
    fn starts_primary(&self, token: &str) -> bool {
        if token == OPEN_GROUP || token == "(" {
            return true;
        }
        if starts_number(token) {
            return true;
        }
        if token.len() == 1 && token.chars().all(|c| c.is_ascii_alphabetic()) {
            return true;
        }
        self.dict
            .entries(token)
            .iter()
            .any(|e| match e.kind {
                EntryKind::Function | EntryKind::Symbol | EntryKind::Environment => true,
                EntryKind::Matchfix { .. } => token != "|",
                _ => false,
            })
    }

    // ------------------------------------------------------------------
    // Primaries
    // ------------------------------------------------------------------

    fn parse_primary(&mut self) -> Option<ExprId> {
        let tok = self.peek()?.to_string();

        // Number literal
        if starts_number(&tok) {
            self.next();
            return Some(self.number_literal(&tok));
        }

        // Brace group
        if tok == OPEN_GROUP {
            self.next();
            let inner = match self.parse_expression(0) {
                Some(e) => e,
                None => self.missing(),
            };
            if !self.expect(CLOSE_GROUP) {
                return Some(error_with(
                    &mut self.engine.ctx,
                    ErrorCode::UnterminatedDelimiter,
                    inner,
                ));
            }
            return Some(inner);
        }

        // Letters bound in an enclosing scope shadow dictionary constants:
        // inside `\sum_{i=...}`, `i` is the index, not the imaginary unit.
        if tok.len() == 1
            && tok.chars().all(|c| c.is_ascii_alphabetic())
            && self.engine.symbol_def(&tok).is_some()
        {
            self.next();
            return Some(self.engine.ctx.sym(&tok));
        }

        if let Some(entry) = self.dict.prefix(&tok).cloned() {
            self.next();
            return Some(self.parse_dictionary_construct(&entry));
        }

        // Plain letter symbol
        if tok.len() == 1 && tok.chars().all(|c| c.is_ascii_alphabetic()) {
            self.next();
            return Some(self.engine.ctx.sym(&tok));
        }

        // Unknown token: embed a typed error and keep going.
        self.next();
        Some(self.unknown_token_error(&tok))
    }

    fn parse_dictionary_construct(&mut self, entry: &DictEntry) -> ExprId {
        if let Some(custom) = entry.parse {
            return custom(self, entry);
        }
        match entry.kind {
            EntryKind::Prefix { precedence } => {
                let operand = match self.parse_expression(precedence) {
                    Some(e) => e,
                    None => self.missing(),
                };
                if entry.head == "Identity" {
                    operand
                } else {
                    self.engine.ctx.call(entry.head, vec![operand])
                }
            }
            EntryKind::Matchfix { close } => {
                let inner = match self.parse_expression(0) {
                    Some(e) => e,
                    None => self.missing(),
                };
                if !self.expect(close) {
                    return error_with(
                        &mut self.engine.ctx,
                        ErrorCode::UnterminatedDelimiter,
                        inner,
                    );
                }
                if entry.head == "Delimiter" {
                    inner
                } else {
                    self.engine.ctx.call(entry.head, vec![inner])
                }
            }
            EntryKind::Function => self.parse_function_call(entry.head),
            EntryKind::Symbol => self.engine.ctx.sym(entry.head),
            EntryKind::Environment => {
                let name = self.environment_name().unwrap_or_default();
                let culprit = self.engine.ctx.str(&format!("\\begin{{{}}}", name));
                error_with(&mut self.engine.ctx, ErrorCode::UnexpectedCommand, culprit)
            }
            EntryKind::Infix { .. } | EntryKind::Postfix { .. } => {
                // An infix-only token in primary position is missing its
                // left operand.
                self.missing()
            }
        }
    }

    /// `\sin(x)`, `\sin{x}` or `\sin x` — the argument binds tightly.
    fn parse_function_call(&mut self, head: &str) -> ExprId {
        if self.expect("(") {
            let inner = match self.parse_expression(0) {
                Some(e) => e,
                None => self.missing(),
            };
            if !self.expect(")") {
                let wrapped =
                    error_with(&mut self.engine.ctx, ErrorCode::UnterminatedDelimiter, inner);
                return self.engine.ctx.call(head, vec![wrapped]);
            }
            return self.engine.ctx.call(head, vec![inner]);
        }
        let arg = if self.peek() == Some(OPEN_GROUP) {
            self.parse_primary().unwrap_or_else(|| self.missing())
        } else {
            // Tight binding: `\sin x \cos y` is a product of two calls.
            match self.parse_expression(INVISIBLE_MULTIPLY_PREC + 1) {
                Some(e) => e,
                None => self.missing(),
            }
        };
        self.engine.ctx.call(head, vec![arg])
    }

    fn number_literal(&mut self, text: &str) -> ExprId {
        let (int_part, frac_part) = match text.find('.') {
            Some(dot) => (&text[..dot], &text[dot + 1..]),
            None => (text, ""),
        };
        let value = decimal_to_rational(int_part, frac_part);
        self.engine.ctx.number(NumericValue::Rational(value))
    }

    fn environment_name(&mut self) -> Option<String> {
        if !self.expect(OPEN_GROUP) {
            return None;
        }
        let mut name = String::new();
        while let Some(tok) = self.peek() {
            if tok == CLOSE_GROUP {
                self.next();
                return Some(name);
            }
            name.push_str(tok);
            self.next();
        }
        Some(name)
    }

    // ------------------------------------------------------------------
    // Groups and scripts
    // ------------------------------------------------------------------

    /// A required `{...}` group; a bare primary is tolerated (`\sqrt2`),
    /// anything else yields a `missing` marker.
    fn parse_required_group(&mut self) -> ExprId {
        if self.expect(OPEN_GROUP) {
            let inner = match self.parse_expression(0) {
                Some(e) => e,
                None => self.missing(),
            };
            if !self.expect(CLOSE_GROUP) {
                return error_with(
                    &mut self.engine.ctx,
                    ErrorCode::UnterminatedDelimiter,
                    inner,
                );
            }
            return inner;
        }
        match self.parse_primary() {
            Some(e) => e,
            None => self.missing(),
        }
    }

    /// A subscript/superscript body: `{...}` or a single primary.
    fn parse_script(&mut self) -> ExprId {
        self.parse_required_group()
    }
}

fn starts_number(token: &str) -> bool {
    token
        .chars()
        .next()
        .map(|c| c.is_ascii_digit() || c == '.')
        .unwrap_or(false)
        && token.chars().any(|c| c.is_ascii_digit())
}

/// Exact conversion of a decimal literal: for "A.B", the value is
/// (A·10^k + B) / 10^k with k = len(B).
fn decimal_to_rational(int_part: &str, frac_part: &str) -> BigRational {
    let k = frac_part.len();
    let int_val: BigInt = if int_part.is_empty() {
        BigInt::from(0)
    } else {
        int_part.parse().unwrap_or_else(|_| BigInt::from(0))
    };
    if k == 0 {
        return BigRational::from_integer(int_val);
    }
    let denominator = BigInt::from(10u8).pow(k as u32);
    let frac_val: BigInt = frac_part.parse().unwrap_or_else(|_| BigInt::from(0));
    BigRational::new(int_val * &denominator + frac_val, denominator)
}

// ============================================================================
// Custom constructs
// ============================================================================

/// `\frac{a}{b}`: Divide, unless both parts are derivative markers, in
/// which case the fraction is Leibniz notation for a partial derivative.
pub fn parse_frac(parser: &mut LatexParser<'_>, _entry: &DictEntry) -> ExprId {
    let numerator = parser.parse_required_group();
    let denominator = parser.parse_required_group();

    if let Some((vars, order)) = leibniz_parts(parser, numerator, denominator) {
        let body = match parser.parse_expression(INVISIBLE_MULTIPLY_PREC + 1) {
            Some(b) => b,
            None => parser.engine.ctx.sym("Nothing"),
        };
        let tuple = parser.engine.ctx.call("Tuple", vars);
        let order_id = parser.engine.ctx.num(order);
        return parser
            .engine
            .ctx
            .call("PartialDerivative", vec![body, tuple, order_id]);
    }

    parser
        .engine
        .ctx
        .call("Divide", vec![numerator, denominator])
}

/// Recognize `d`/`\partial` markers in a fraction. Returns the collected
/// differentiation variables and the derivative order.
///
/// The order annotated inside a numerator *product* (rather than directly
/// on the marker) is not recognized; such fractions parse as plain Divide.
fn leibniz_parts(
    parser: &mut LatexParser<'_>,
    numerator: ExprId,
    denominator: ExprId,
) -> Option<(Vec<ExprId>, i64)> {
    let ctx = &parser.engine.ctx;
    let is_marker = |id: ExprId| {
        matches!(ctx.symbol_name(id), Some("d") | Some("Partial"))
    };

    // Numerator: the marker itself, or marker^order.
    let order = if is_marker(numerator) {
        1
    } else if let Some(args) = ctx.args_of(numerator, "Power") {
        if args.len() == 2 && is_marker(args[0]) {
            ctx.as_integer(args[1])?
        } else {
            return None;
        }
    } else {
        return None;
    };

    // Denominator: a product of marker/variable pairs, e.g. Multiply(d, x)
    // or Multiply(Partial, x, Partial, y). A trailing power on a variable
    // (dx^2) is tolerated.
    let factors: Vec<ExprId> = match ctx.args_of(denominator, "Multiply") {
        Some(args) => args.to_vec(),
        None => return None,
    };
    let mut vars = Vec::new();
    let mut i = 0;
    while i < factors.len() {
        if !is_marker(factors[i]) {
            return None;
        }
        let var = factors.get(i + 1)?;
        let var = match ctx.args_of(*var, "Power") {
            Some(p) if p.len() == 2 => p[0],
            _ => *var,
        };
        if ctx.symbol_name(var).is_none() {
            return None;
        }
        vars.push(var);
        i += 2;
    }
    if vars.is_empty() {
        return None;
    }
    Some((vars, order))
}

/// `\sqrt{x}` or `\sqrt[n]{x}`. A missing base yields an error-carrying
/// node, never a failed parse.
pub fn parse_sqrt(parser: &mut LatexParser<'_>, _entry: &DictEntry) -> ExprId {
    if parser.expect("[") {
        let degree = match parser.parse_expression(0) {
            Some(d) => d,
            None => parser.missing(),
        };
        if !parser.expect("]") {
            let wrapped = error_with(
                &mut parser.engine.ctx,
                ErrorCode::UnterminatedDelimiter,
                degree,
            );
            return parser.engine.ctx.call("Root", vec![wrapped]);
        }
        let base = parser.parse_required_group();
        return parser.engine.ctx.call("Root", vec![base, degree]);
    }
    let base = parser.parse_required_group();
    parser.engine.ctx.call("Sqrt", vec![base])
}

/// `\sum` / `\prod` with optional `_{...}` and `^{...}` bounds in either
/// order. The subscript may be a bound variable, an equation `i = lower`,
/// or a condition. While parsing the body the index variable is bound in a
/// fresh scope (domain Integer); afterwards its occurrences are replaced by
/// the positional wildcard `_1` and the body is wrapped in a `Lambda`, so
/// the summand can be instantiated per iteration without re-parsing.
pub fn parse_big_operator(parser: &mut LatexParser<'_>, entry: &DictEntry) -> ExprId {
    let mut subscript: Option<ExprId> = None;
    let mut superscript: Option<ExprId> = None;
    loop {
        if subscript.is_none() && parser.expect("_") {
            subscript = Some(parser.parse_script());
            continue;
        }
        if superscript.is_none() && parser.expect("^") {
            superscript = Some(parser.parse_script());
            continue;
        }
        break;
    }

    // Interpret the subscript.
    let (index, lower, condition) = match subscript {
        None => (None, None, None),
        Some(sub) => {
            if let Some(args) = parser.engine.ctx.args_of(sub, "Equal") {
                if args.len() == 2 {
                    (Some(args[0]), Some(args[1]), None)
                } else {
                    (None, None, Some(sub))
                }
            } else if parser.engine.ctx.symbol_name(sub).is_some() {
                (Some(sub), None, None)
            } else {
                (None, None, Some(sub))
            }
        }
    };

    // Constants parsed inside the subscript read back as bound letters:
    // `\sum_{i=1}` binds the letter i, not the imaginary unit.
    let index_name = index
        .and_then(|ix| parser.engine.ctx.symbol_name(ix))
        .map(|name| match name {
            "ImaginaryUnit" => "i".to_string(),
            "ExponentialE" => "e".to_string(),
            other => other.to_string(),
        });

    // Body, with the index bound in a fresh scope.
    let body = {
        if let Some(name) = &index_name {
            parser.engine.push_scope();
            parser
                .engine
                .declare_symbol(name, SymbolDef::variable(Domain::Integer));
        }
        let body = match parser.parse_expression(BIG_OP_BODY_PREC) {
            Some(b) => b,
            None => parser.missing(),
        };
        if index_name.is_some() {
            parser.engine.pop_scope();
        }
        body
    };

    // Lambda-wrap: index occurrences become the positional wildcard.
    let (lambda, bounds) = if let Some(name) = &index_name {
        let index_sym = parser.engine.ctx.sym(name);
        let wildcard = parser.engine.ctx.sym("_1");
        let rewritten = substitute_expr(&mut parser.engine.ctx, body, index_sym, wildcard);
        let lambda = parser.engine.ctx.call("Lambda", vec![rewritten]);
        let lower = lower.unwrap_or_else(|| parser.engine.ctx.sym("Nothing"));
        let upper = superscript.unwrap_or_else(|| parser.engine.ctx.sym("Nothing"));
        let bounds = parser.engine.ctx.call("Tuple", vec![index_sym, lower, upper]);
        (lambda, bounds)
    } else {
        let lambda = parser.engine.ctx.call("Lambda", vec![body]);
        let bounds = match condition {
            Some(c) => c,
            None => parser.engine.ctx.sym("Nothing"),
        };
        (lambda, bounds)
    };

    parser.engine.ctx.call(entry.head, vec![lambda, bounds])
}

/// `\begin{...}`: no environments are registered by default; produce a
/// typed error naming the environment.
pub fn parse_environment(parser: &mut LatexParser<'_>, _entry: &DictEntry) -> ExprId {
    let name = parser.environment_name().unwrap_or_default();
    let culprit = parser.engine.ctx.str(&format!("\\begin{{{}}}", name));
    error_with(&mut parser.engine.ctx, ErrorCode::UnexpectedCommand, culprit)
}
