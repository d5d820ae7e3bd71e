//! Boxed expression core: arena, numeric kinds, MathJSON.

pub mod display;
pub mod error;
pub mod expression;
pub mod mathjson;
pub mod numeric;
pub mod symbol;

pub use display::DisplayExpr;
pub use error::{
    error, error_code, error_with, has_no_errors, is_error, ErrorCode, ERROR_HEAD,
};
pub use expression::{Context, ContextStats, Expr, ExprId, Meta};
pub use mathjson::{from_mathjson, to_mathjson};
pub use numeric::{BigDecimal, NumericValue, Sgn};
pub use symbol::{SymbolId, SymbolTable};
