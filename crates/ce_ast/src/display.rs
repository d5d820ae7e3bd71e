//! Plain-text rendering for diagnostics and test assertions.
//!
//! Infix output for the arithmetic heads, `Head(a, b)` for everything else.
//! This is not the LaTeX serializer; it exists so engine tests can assert on
//! a stable, readable form.

use crate::expression::{Context, Expr, ExprId};
use std::fmt;

/// Borrowing wrapper implementing `Display` for one expression.
pub struct DisplayExpr<'a> {
    pub context: &'a Context,
    pub id: ExprId,
}

fn precedence(ctx: &Context, id: ExprId) -> u8 {
    match ctx.head_name(id) {
        Some("Add") | Some("Subtract") => 1,
        Some("Multiply") | Some("Divide") => 2,
        Some("Negate") => 3,
        Some("Power") => 4,
        _ => 5,
    }
}

fn write_operand(
    f: &mut fmt::Formatter<'_>,
    ctx: &Context,
    id: ExprId,
    parent_prec: u8,
) -> fmt::Result {
    if precedence(ctx, id) < parent_prec {
        write!(f, "({})", DisplayExpr { context: ctx, id })
    } else {
        write!(f, "{}", DisplayExpr { context: ctx, id })
    }
}

fn write_infix(
    f: &mut fmt::Formatter<'_>,
    ctx: &Context,
    args: &[ExprId],
    op: &str,
    prec: u8,
) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", op)?;
        }
        write_operand(f, ctx, *arg, prec)?;
    }
    Ok(())
}

impl fmt::Display for DisplayExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctx = self.context;
        match ctx.get(self.id) {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Symbol(s) => write!(f, "{}", ctx.sym_name(*s)),
            Expr::Str(s) => write!(f, "'{}'", s),
            Expr::Dict(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, DisplayExpr { context: ctx, id: *v })?;
                }
                write!(f, "}}")
            }
            Expr::Function(head, args) => {
                match ctx.symbol_name(*head) {
                    Some("Add") => write_infix(f, ctx, args, "+", 1),
                    Some("Subtract") if args.len() == 2 => {
                        write_operand(f, ctx, args[0], 1)?;
                        write!(f, " - ")?;
                        // Right side needs parens at equal precedence
                        if precedence(ctx, args[1]) <= 1 {
                            write!(f, "({})", DisplayExpr { context: ctx, id: args[1] })
                        } else {
                            write!(f, "{}", DisplayExpr { context: ctx, id: args[1] })
                        }
                    }
                    Some("Multiply") => write_infix(f, ctx, args, "*", 2),
                    Some("Divide") if args.len() == 2 => {
                        write_operand(f, ctx, args[0], 2)?;
                        write!(f, " / ")?;
                        if precedence(ctx, args[1]) <= 2 {
                            write!(f, "({})", DisplayExpr { context: ctx, id: args[1] })
                        } else {
                            write!(f, "{}", DisplayExpr { context: ctx, id: args[1] })
                        }
                    }
                    Some("Negate") if args.len() == 1 => {
                        write!(f, "-")?;
                        write_operand(f, ctx, args[0], 3)
                    }
                    Some("Power") if args.len() == 2 => {
                        write_operand(f, ctx, args[0], 5)?;
                        write!(f, "^")?;
                        write_operand(f, ctx, args[1], 5)
                    }
                    Some(name) => {
                        write!(f, "{}(", name)?;
                        for (i, arg) in args.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", DisplayExpr { context: ctx, id: *arg })?;
                        }
                        write!(f, ")")
                    }
                    None => {
                        // Expression head, e.g. InverseFunction(Sin)(x)
                        write!(f, "({})(", DisplayExpr { context: ctx, id: *head })?;
                        for (i, arg) in args.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", DisplayExpr { context: ctx, id: *arg })?;
                        }
                        write!(f, ")")
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show(ctx: &Context, id: ExprId) -> String {
        format!("{}", DisplayExpr { context: ctx, id })
    }

    #[test]
    fn test_display_infix() {
        let mut ctx = Context::new();
        let one = ctx.num(1);
        let x = ctx.sym("x");
        let two = ctx.num(2);
        let mul = ctx.call("Multiply", vec![x, two]);
        let e = ctx.call("Add", vec![one, mul]);
        assert_eq!(show(&ctx, e), "1 + x * 2");
    }

    #[test]
    fn test_display_parens() {
        let mut ctx = Context::new();
        let a = ctx.sym("a");
        let b = ctx.sym("b");
        let sum = ctx.call("Add", vec![a, b]);
        let two = ctx.num(2);
        let e = ctx.call("Power", vec![sum, two]);
        assert_eq!(show(&ctx, e), "(a + b)^2");
    }

    #[test]
    fn test_display_function() {
        let mut ctx = Context::new();
        let x = ctx.sym("x");
        let e = ctx.call("Sin", vec![x]);
        assert_eq!(show(&ctx, e), "Sin(x)");
    }

    #[test]
    fn test_display_expression_head() {
        let mut ctx = Context::new();
        let sin = ctx.sym("Sin");
        let inv = ctx.call("InverseFunction", vec![sin]);
        let x = ctx.sym("x");
        let e = ctx.apply(inv, vec![x]);
        assert_eq!(show(&ctx, e), "(InverseFunction(Sin))(x)");
    }
}
