//! In-tree error markers.
//!
//! Errors discovered while parsing or canonicalizing are embedded in the
//! expression tree as `Error`-headed nodes, never thrown. A tree containing
//! any marker is invalid; downstream operations treat invalid trees as
//! identity.
//!
//! Shape: `["Error", "'code'", culprit?]` where the code is a string literal
//! and the optional culprit is the offending fragment.

use crate::expression::{Context, Expr, ExprId};

/// Head name used for error markers.
pub const ERROR_HEAD: &str = "Error";

/// Error marker codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Token that no dictionary entry recognizes.
    UnexpectedToken,
    /// Unknown LaTeX command (token starting with the escape marker).
    UnexpectedCommand,
    /// Required argument absent.
    Missing,
    /// Matchfix construct without its closing delimiter.
    UnterminatedDelimiter,
    /// More operands than the signature allows.
    UnexpectedArgument,
    /// Operand domain fails the signature check.
    IncompatibleDomain,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::UnexpectedToken => "unexpected-token",
            ErrorCode::UnexpectedCommand => "unexpected-command",
            ErrorCode::Missing => "missing",
            ErrorCode::UnterminatedDelimiter => "unterminated-delimiter",
            ErrorCode::UnexpectedArgument => "unexpected-argument",
            ErrorCode::IncompatibleDomain => "incompatible-domain",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "unexpected-token" => ErrorCode::UnexpectedToken,
            "unexpected-command" => ErrorCode::UnexpectedCommand,
            "missing" => ErrorCode::Missing,
            "unterminated-delimiter" => ErrorCode::UnterminatedDelimiter,
            "unexpected-argument" => ErrorCode::UnexpectedArgument,
            "incompatible-domain" => ErrorCode::IncompatibleDomain,
            _ => return None,
        })
    }
}

/// Build an error marker node without a culprit.
pub fn error(ctx: &mut Context, code: ErrorCode) -> ExprId {
    let code_str = ctx.str(code.as_str());
    ctx.call(ERROR_HEAD, vec![code_str])
}

/// Build an error marker node wrapping the offending fragment.
pub fn error_with(ctx: &mut Context, code: ErrorCode, culprit: ExprId) -> ExprId {
    let code_str = ctx.str(code.as_str());
    ctx.call(ERROR_HEAD, vec![code_str, culprit])
}

/// True if the node itself is an error marker.
pub fn is_error(ctx: &Context, id: ExprId) -> bool {
    ctx.head_name(id) == Some(ERROR_HEAD)
}

/// Error code carried by a marker node.
pub fn error_code(ctx: &Context, id: ExprId) -> Option<ErrorCode> {
    let args = ctx.args_of(id, ERROR_HEAD)?;
    match ctx.get(*args.first()?) {
        Expr::Str(s) => ErrorCode::parse(s),
        _ => None,
    }
}

/// True if no error marker appears anywhere in the subtree.
///
/// This is the structural half of validity; whether a canonical head
/// resolves to a definition is checked by the engine.
pub fn has_no_errors(ctx: &Context, id: ExprId) -> bool {
    let mut ok = true;
    ctx.walk(id, &mut |n| {
        if is_error(ctx, n) {
            ok = false;
        }
    });
    ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_marker_shape() {
        let mut ctx = Context::new();
        let e = error(&mut ctx, ErrorCode::Missing);
        assert!(is_error(&ctx, e));
        assert_eq!(error_code(&ctx, e), Some(ErrorCode::Missing));
    }

    #[test]
    fn test_error_invalidates_ancestors() {
        let mut ctx = Context::new();
        let x = ctx.sym("x");
        let e = error(&mut ctx, ErrorCode::UnexpectedToken);
        let sum = ctx.call("Add", vec![x, e]);
        assert!(!has_no_errors(&ctx, sum));
        assert!(has_no_errors(&ctx, x));
    }

    #[test]
    fn test_culprit_preserved() {
        let mut ctx = Context::new();
        let bad = ctx.str("\\oops");
        let e = error_with(&mut ctx, ErrorCode::UnexpectedCommand, bad);
        let args = ctx.args_of(e, ERROR_HEAD).unwrap();
        assert_eq!(args.len(), 2);
    }
}
