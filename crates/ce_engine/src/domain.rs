//! Domains: a mini type-lattice of mathematical sets.
//!
//! Domains are first-class: every `Domain` converts to and from an expression
//! whose head is a domain constructor (`Union`, `Interval`, `Range`, `Maybe`,
//! `Sequence`, `Function`), so signature information can travel inside trees.
//! The compatibility relation below is what signature validation uses.

use ce_ast::{Context, Expr, ExprId};
use std::fmt;

/// A mathematical set used as an operand or result type.
#[derive(Debug, Clone, PartialEq)]
pub enum Domain {
    /// Top: compatible with everything.
    Anything,
    /// The singleton domain of the `Nothing` placeholder.
    NothingDomain,
    /// Bottom: no value inhabits it.
    Void,
    Boolean,
    StringDomain,
    Number,
    ComplexNumber,
    RealNumber,
    RationalNumber,
    Integer,
    /// Function with argument domains and a result domain.
    Function(Vec<Domain>, Box<Domain>),
    /// Any member domain matches.
    Union(Vec<Domain>),
    /// Real interval [lo, hi].
    Interval(f64, f64),
    /// Integer range lo..=hi.
    Range(i64, i64),
    /// The domain, or `Nothing`.
    Maybe(Box<Domain>),
    /// One or more values of the domain.
    Sequence(Box<Domain>),
}

/// Direction of a compatibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variance {
    /// `lhs` must be a subdomain of `rhs`.
    Covariant,
    /// `rhs` must be a subdomain of `lhs`.
    Contravariant,
    /// Either direction suffices.
    Bivariant,
    /// The domains must be equal.
    Invariant,
}

impl Domain {
    /// Is `self` a subdomain of `other`?
    pub fn is_subdomain_of(&self, other: &Domain) -> bool {
        use Domain::*;
        if self == other || matches!(other, Anything) {
            return true;
        }
        match (self, other) {
            (Void, _) => true,
            (_, Union(members)) => members.iter().any(|m| self.is_subdomain_of(m)),
            (Union(members), _) => members.iter().all(|m| m.is_subdomain_of(other)),
            (_, Maybe(inner)) => {
                matches!(self, NothingDomain) || self.is_subdomain_of(inner)
            }
            (Maybe(inner), _) => inner.is_subdomain_of(other),
            (Sequence(a), Sequence(b)) => a.is_subdomain_of(b),
            (a, Sequence(b)) => a.is_subdomain_of(b),
            // Numeric tower
            (Integer, RationalNumber | RealNumber | ComplexNumber | Number) => true,
            (RationalNumber, RealNumber | ComplexNumber | Number) => true,
            (RealNumber, ComplexNumber | Number) => true,
            (ComplexNumber, Number) => true,
            (Range(..), Integer | RationalNumber | RealNumber | ComplexNumber | Number) => true,
            (Range(a1, b1), Range(a2, b2)) => a2 <= a1 && b1 <= b2,
            (Interval(..), RealNumber | ComplexNumber | Number) => true,
            (Interval(a1, b1), Interval(a2, b2)) => a2 <= a1 && b1 <= b2,
            // Functions: contravariant in arguments, covariant in result
            (Function(args1, res1), Function(args2, res2)) => {
                args1.len() == args2.len()
                    && res1.is_subdomain_of(res2)
                    && args1
                        .iter()
                        .zip(args2.iter())
                        .all(|(a1, a2)| a2.is_subdomain_of(a1))
            }
            _ => false,
        }
    }

    /// Compatibility under the given variance, used for signature checks.
    pub fn is_compatible(&self, other: &Domain, variance: Variance) -> bool {
        match variance {
            Variance::Covariant => self.is_subdomain_of(other),
            Variance::Contravariant => other.is_subdomain_of(self),
            Variance::Bivariant => {
                self.is_subdomain_of(other) || other.is_subdomain_of(self)
            }
            Variance::Invariant => self == other,
        }
    }

    /// Build the expression form of this domain.
    pub fn to_expr(&self, ctx: &mut Context) -> ExprId {
        use Domain::*;
        match self {
            Anything => ctx.sym("Anything"),
            NothingDomain => ctx.sym("NothingDomain"),
            Void => ctx.sym("Void"),
            Boolean => ctx.sym("Boolean"),
            StringDomain => ctx.sym("String"),
            Number => ctx.sym("Number"),
            ComplexNumber => ctx.sym("ComplexNumber"),
            RealNumber => ctx.sym("RealNumber"),
            RationalNumber => ctx.sym("RationalNumber"),
            Integer => ctx.sym("Integer"),
            Function(args, res) => {
                let mut ids: Vec<ExprId> = args.iter().map(|d| d.to_expr(ctx)).collect();
                ids.push(res.to_expr(ctx));
                ctx.call("Function", ids)
            }
            Union(members) => {
                let ids = members.iter().map(|d| d.to_expr(ctx)).collect();
                ctx.call("Union", ids)
            }
            Interval(lo, hi) => {
                let lo = ctx.number(ce_ast::NumericValue::Machine(*lo));
                let hi = ctx.number(ce_ast::NumericValue::Machine(*hi));
                ctx.call("Interval", vec![lo, hi])
            }
            Range(lo, hi) => {
                let lo = ctx.num(*lo);
                let hi = ctx.num(*hi);
                ctx.call("Range", vec![lo, hi])
            }
            Maybe(inner) => {
                let i = inner.to_expr(ctx);
                ctx.call("Maybe", vec![i])
            }
            Sequence(inner) => {
                let i = inner.to_expr(ctx);
                ctx.call("Sequence", vec![i])
            }
        }
    }

    /// Read a domain back from its expression form.
    pub fn from_expr(ctx: &Context, id: ExprId) -> Option<Domain> {
        if let Some(name) = ctx.symbol_name(id) {
            return Some(match name {
                "Anything" => Domain::Anything,
                "NothingDomain" => Domain::NothingDomain,
                "Void" => Domain::Void,
                "Boolean" => Domain::Boolean,
                "String" => Domain::StringDomain,
                "Number" => Domain::Number,
                "ComplexNumber" => Domain::ComplexNumber,
                "RealNumber" => Domain::RealNumber,
                "RationalNumber" => Domain::RationalNumber,
                "Integer" => Domain::Integer,
                _ => return None,
            });
        }
        let (head, args) = match ctx.get(id) {
            Expr::Function(h, a) => (ctx.symbol_name(*h)?, a),
            _ => return None,
        };
        match head {
            "Function" if !args.is_empty() => {
                let mut domains: Vec<Domain> = args
                    .iter()
                    .map(|a| Domain::from_expr(ctx, *a))
                    .collect::<Option<_>>()?;
                let res = domains.pop()?;
                Some(Domain::Function(domains, Box::new(res)))
            }
            "Union" => Some(Domain::Union(
                args.iter()
                    .map(|a| Domain::from_expr(ctx, *a))
                    .collect::<Option<_>>()?,
            )),
            "Interval" if args.len() == 2 => {
                let lo = ctx.numeric_value(args[0])?.to_f64();
                let hi = ctx.numeric_value(args[1])?.to_f64();
                Some(Domain::Interval(lo, hi))
            }
            "Range" if args.len() == 2 => {
                Some(Domain::Range(ctx.as_integer(args[0])?, ctx.as_integer(args[1])?))
            }
            "Maybe" if args.len() == 1 => {
                Some(Domain::Maybe(Box::new(Domain::from_expr(ctx, args[0])?)))
            }
            "Sequence" if args.len() == 1 => Some(Domain::Sequence(Box::new(
                Domain::from_expr(ctx, args[0])?,
            ))),
            _ => None,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_tower() {
        assert!(Domain::Integer.is_subdomain_of(&Domain::RealNumber));
        assert!(Domain::RationalNumber.is_subdomain_of(&Domain::Number));
        assert!(!Domain::RealNumber.is_subdomain_of(&Domain::Integer));
    }

    #[test]
    fn test_union_membership() {
        let u = Domain::Union(vec![Domain::Integer, Domain::Boolean]);
        assert!(Domain::Integer.is_subdomain_of(&u));
        assert!(!Domain::RealNumber.is_subdomain_of(&u));
    }

    #[test]
    fn test_maybe_accepts_nothing() {
        let m = Domain::Maybe(Box::new(Domain::Integer));
        assert!(Domain::NothingDomain.is_subdomain_of(&m));
        assert!(Domain::Integer.is_subdomain_of(&m));
    }

    #[test]
    fn test_range_within_integer() {
        assert!(Domain::Range(1, 10).is_subdomain_of(&Domain::Integer));
        assert!(Domain::Range(2, 5).is_subdomain_of(&Domain::Range(1, 10)));
        assert!(!Domain::Range(0, 5).is_subdomain_of(&Domain::Range(1, 10)));
    }

    #[test]
    fn test_function_variance() {
        // (Real -> Integer) <: (Integer -> Real): contravariant args, covariant result
        let f1 = Domain::Function(vec![Domain::RealNumber], Box::new(Domain::Integer));
        let f2 = Domain::Function(vec![Domain::Integer], Box::new(Domain::RealNumber));
        assert!(f1.is_subdomain_of(&f2));
        assert!(!f2.is_subdomain_of(&f1));
    }

    #[test]
    fn test_variance_modes() {
        use Variance::*;
        assert!(Domain::Integer.is_compatible(&Domain::RealNumber, Covariant));
        assert!(Domain::RealNumber.is_compatible(&Domain::Integer, Contravariant));
        assert!(Domain::Integer.is_compatible(&Domain::RealNumber, Bivariant));
        assert!(!Domain::Integer.is_compatible(&Domain::RealNumber, Invariant));
    }

    #[test]
    fn test_expr_roundtrip() {
        let mut ctx = Context::new();
        let d = Domain::Union(vec![
            Domain::Integer,
            Domain::Maybe(Box::new(Domain::Boolean)),
        ]);
        let id = d.to_expr(&mut ctx);
        assert_eq!(Domain::from_expr(&ctx, id), Some(d));
    }
}
