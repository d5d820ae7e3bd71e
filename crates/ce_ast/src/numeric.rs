//! Numeric kinds for expression literals.
//!
//! A literal holds exactly one representation at a time: machine float,
//! arbitrary-precision decimal, exact rational, or complex. The engine picks
//! the representation when boxing and may down-convert when the numeric mode
//! forbids a kind.
//!
//! The decimal kind is a thin scaled-integer wrapper over `num-bigint`:
//! `mantissa * 10^-scale` with a digit budget. Transcendental operations on
//! decimals route through f64 — the bignum transcendental primitives are an
//! external concern and this surface only carries what the N handlers need.

use num_bigint::{BigInt, Sign as BigSign};
use num_complex::Complex64;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;

// ============================================================================
// BigDecimal
// ============================================================================

/// Arbitrary-precision decimal: `mantissa * 10^-scale`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigDecimal {
    mantissa: BigInt,
    scale: u32,
}

impl BigDecimal {
    pub fn new(mantissa: BigInt, scale: u32) -> Self {
        Self { mantissa, scale }.normalized()
    }

    pub fn from_integer(n: BigInt) -> Self {
        Self {
            mantissa: n,
            scale: 0,
        }
    }

    /// Convert a rational to a decimal with `digits` significant digits.
    /// Exact when the denominator divides a power of ten, rounded otherwise.
    pub fn from_rational(r: &BigRational, digits: u32) -> Self {
        let scale = digits;
        let pow = BigInt::from(10u8).pow(scale);
        let scaled = r.numer() * &pow;
        // Round half away from zero
        let (mut q, rem) = scaled.div_rem(r.denom());
        let twice = rem.abs() * BigInt::from(2u8);
        if twice >= r.denom().abs() {
            if scaled.sign() == BigSign::Minus {
                q -= 1;
            } else {
                q += 1;
            }
        }
        Self { mantissa: q, scale }.normalized()
    }

    pub fn from_f64(x: f64, digits: u32) -> Option<Self> {
        if !x.is_finite() {
            return None;
        }
        BigRational::from_float(x).map(|r| Self::from_rational(&r, digits))
    }

    /// π computed by the Machin formula to `digits` significant digits.
    pub fn pi(digits: u32) -> Self {
        // Work with guard digits, then truncate.
        let scale = digits + 10;
        let unit = BigInt::from(10u8).pow(scale);
        // pi = 16·atan(1/5) − 4·atan(1/239)
        let pi_scaled = 16 * atan_inv_scaled(5, &unit) - 4 * atan_inv_scaled(239, &unit);
        Self {
            mantissa: pi_scaled / BigInt::from(10u8).pow(10),
            scale: digits,
        }
        .normalized()
    }

    /// Euler's number to `digits` significant digits, by the factorial
    /// series.
    pub fn e(digits: u32) -> Self {
        let scale = digits + 10;
        let unit = BigInt::from(10u8).pow(scale);
        let mut term = unit.clone();
        let mut total = unit;
        let mut k = BigInt::from(1u8);
        while !term.is_zero() {
            term = &term / &k;
            total += &term;
            k += 1;
        }
        Self {
            mantissa: total / BigInt::from(10u8).pow(10),
            scale: digits,
        }
        .normalized()
    }

    fn normalized(mut self) -> Self {
        let ten = BigInt::from(10u8);
        while self.scale > 0 && (&self.mantissa % &ten).is_zero() {
            self.mantissa /= &ten;
            self.scale -= 1;
        }
        self
    }

    pub fn to_rational(&self) -> BigRational {
        BigRational::new(self.mantissa.clone(), BigInt::from(10u8).pow(self.scale))
    }

    pub fn to_f64(&self) -> f64 {
        self.to_rational().to_f64().unwrap_or(f64::NAN)
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa.sign() == BigSign::Minus
    }

    pub fn neg(&self) -> Self {
        Self {
            mantissa: -self.mantissa.clone(),
            scale: self.scale,
        }
    }

    pub fn add(&self, rhs: &Self) -> Self {
        let (a, b, scale) = align(self, rhs);
        Self {
            mantissa: a + b,
            scale,
        }
        .normalized()
    }

    pub fn mul(&self, rhs: &Self) -> Self {
        Self {
            mantissa: &self.mantissa * &rhs.mantissa,
            scale: self.scale + rhs.scale,
        }
        .normalized()
    }

    pub fn cmp_value(&self, rhs: &Self) -> Ordering {
        let (a, b, _) = align(self, rhs);
        a.cmp(&b)
    }
}

fn align(a: &BigDecimal, b: &BigDecimal) -> (BigInt, BigInt, u32) {
    let scale = a.scale.max(b.scale);
    let am = &a.mantissa * BigInt::from(10u8).pow(scale - a.scale);
    let bm = &b.mantissa * BigInt::from(10u8).pow(scale - b.scale);
    (am, bm, scale)
}

/// atan(1/x) scaled by `unit`, by the alternating Gregory series.
fn atan_inv_scaled(x: u32, unit: &BigInt) -> BigInt {
    let x = BigInt::from(x);
    let x2 = &x * &x;
    let mut term = unit / &x;
    let mut total = term.clone();
    let mut n = BigInt::from(1u8);
    let two = BigInt::from(2u8);
    let mut subtract = true;
    loop {
        term = &term / &x2;
        if term.is_zero() {
            break;
        }
        n += &two;
        let contrib = &term / &n;
        if subtract {
            total -= &contrib;
        } else {
            total += &contrib;
        }
        subtract = !subtract;
    }
    total
}

impl fmt::Display for BigDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.mantissa);
        }
        let neg = self.is_negative();
        let digits = self.mantissa.abs().to_string();
        let scale = self.scale as usize;
        let (int_part, frac_part) = if digits.len() > scale {
            let split = digits.len() - scale;
            (digits[..split].to_string(), digits[split..].to_string())
        } else {
            ("0".to_string(), format!("{:0>width$}", digits, width = scale))
        };
        write!(f, "{}{}.{}", if neg { "-" } else { "" }, int_part, frac_part)
    }
}

// ============================================================================
// NumericValue
// ============================================================================

/// Sign of a numeric value.
///
/// `Unknown` means the sign cannot be resolved yet (symbolic inputs);
/// `NotApplicable` means the value never has a real sign (complex, NaN).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sgn {
    Negative,
    Zero,
    Positive,
    Unknown,
    NotApplicable,
}

/// A numeric literal. Exactly one representation is populated.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericValue {
    /// Machine float (IEEE 754 double). NaN is a legitimate value here.
    Machine(f64),
    /// Arbitrary-precision decimal.
    Decimal(BigDecimal),
    /// Exact rational (covers exact integers).
    Rational(BigRational),
    /// Complex with machine-float parts.
    Complex(Complex64),
}

impl NumericValue {
    pub fn int(n: i64) -> Self {
        NumericValue::Rational(BigRational::from_integer(BigInt::from(n)))
    }

    pub fn rational(n: i64, d: i64) -> Self {
        NumericValue::Rational(BigRational::new(BigInt::from(n), BigInt::from(d)))
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, NumericValue::Rational(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, NumericValue::Rational(r) if r.is_integer())
    }

    pub fn is_zero(&self) -> bool {
        match self {
            NumericValue::Machine(f) => *f == 0.0,
            NumericValue::Decimal(d) => d.is_zero(),
            NumericValue::Rational(r) => r.is_zero(),
            NumericValue::Complex(c) => c.re == 0.0 && c.im == 0.0,
        }
    }

    pub fn is_one(&self) -> bool {
        matches!(self, NumericValue::Rational(r) if r.is_integer() && r.to_integer() == BigInt::from(1))
            || matches!(self, NumericValue::Machine(f) if *f == 1.0)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            NumericValue::Rational(r) if r.is_integer() => r.to_integer().to_i64(),
            _ => None,
        }
    }

    pub fn as_rational(&self) -> Option<&BigRational> {
        match self {
            NumericValue::Rational(r) => Some(r),
            _ => None,
        }
    }

    /// Machine-float view of the value. Complex values map to NaN unless the
    /// imaginary part is exactly zero.
    pub fn to_f64(&self) -> f64 {
        match self {
            NumericValue::Machine(f) => *f,
            NumericValue::Decimal(d) => d.to_f64(),
            NumericValue::Rational(r) => r.to_f64().unwrap_or(f64::NAN),
            NumericValue::Complex(c) => {
                if c.im == 0.0 {
                    c.re
                } else {
                    f64::NAN
                }
            }
        }
    }

    pub fn sgn(&self) -> Sgn {
        match self {
            NumericValue::Machine(f) => {
                if f.is_nan() {
                    Sgn::NotApplicable
                } else if *f == 0.0 {
                    Sgn::Zero
                } else if *f > 0.0 {
                    Sgn::Positive
                } else {
                    Sgn::Negative
                }
            }
            NumericValue::Decimal(d) => {
                if d.is_zero() {
                    Sgn::Zero
                } else if d.is_negative() {
                    Sgn::Negative
                } else {
                    Sgn::Positive
                }
            }
            NumericValue::Rational(r) => {
                if r.is_zero() {
                    Sgn::Zero
                } else if r.is_negative() {
                    Sgn::Negative
                } else {
                    Sgn::Positive
                }
            }
            NumericValue::Complex(c) => {
                if c.im == 0.0 {
                    NumericValue::Machine(c.re).sgn()
                } else {
                    Sgn::NotApplicable
                }
            }
        }
    }

    pub fn neg(&self) -> Self {
        match self {
            NumericValue::Machine(f) => NumericValue::Machine(-f),
            NumericValue::Decimal(d) => NumericValue::Decimal(d.neg()),
            NumericValue::Rational(r) => NumericValue::Rational(-r.clone()),
            NumericValue::Complex(c) => NumericValue::Complex(-c),
        }
    }

    /// Add, widening to the least exact representation involved.
    pub fn add(&self, rhs: &Self) -> Self {
        use NumericValue::*;
        match (self, rhs) {
            (Rational(a), Rational(b)) => Rational(a + b),
            (Decimal(a), Decimal(b)) => Decimal(a.add(b)),
            (Decimal(a), Rational(b)) | (Rational(b), Decimal(a)) => {
                Decimal(a.add(&BigDecimal::from_rational(b, a.scale.max(20))))
            }
            (Complex(a), Complex(b)) => Complex(a + b),
            (Complex(a), b) | (b, Complex(a)) => Complex(a + Complex64::new(b.to_f64(), 0.0)),
            (a, b) => Machine(a.to_f64() + b.to_f64()),
        }
    }

    /// Multiply, widening like `add`.
    pub fn mul(&self, rhs: &Self) -> Self {
        use NumericValue::*;
        match (self, rhs) {
            (Rational(a), Rational(b)) => Rational(a * b),
            (Decimal(a), Decimal(b)) => Decimal(a.mul(b)),
            (Decimal(a), Rational(b)) | (Rational(b), Decimal(a)) => {
                Decimal(a.mul(&BigDecimal::from_rational(b, a.scale.max(20))))
            }
            (Complex(a), Complex(b)) => Complex(a * b),
            (Complex(a), b) | (b, Complex(a)) => Complex(a * Complex64::new(b.to_f64(), 0.0)),
            (a, b) => Machine(a.to_f64() * b.to_f64()),
        }
    }

    /// Value comparison. `None` when either side has no real ordering
    /// (complex with nonzero imaginary part, NaN).
    pub fn compare(&self, rhs: &Self) -> Option<Ordering> {
        use NumericValue::*;
        match (self, rhs) {
            (Rational(a), Rational(b)) => Some(a.cmp(b)),
            (Decimal(a), Decimal(b)) => Some(a.cmp_value(b)),
            (Complex(a), _) if a.im != 0.0 => None,
            (_, Complex(b)) if b.im != 0.0 => None,
            (a, b) => a.to_f64().partial_cmp(&b.to_f64()),
        }
    }

    /// Down-convert a complex value to its real part (numeric-mode policy).
    pub fn discard_imaginary(&self) -> Self {
        match self {
            NumericValue::Complex(c) => NumericValue::Machine(c.re),
            other => other.clone(),
        }
    }

    /// Down-convert a decimal value to a machine float (numeric-mode policy).
    pub fn to_machine(&self) -> Self {
        match self {
            NumericValue::Complex(_) => self.clone(),
            other => NumericValue::Machine(other.to_f64()),
        }
    }
}

impl fmt::Display for NumericValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericValue::Machine(v) => write!(f, "{}", v),
            NumericValue::Decimal(d) => write!(f, "{}", d),
            NumericValue::Rational(r) => {
                if r.is_integer() {
                    write!(f, "{}", r.numer())
                } else {
                    write!(f, "{}/{}", r.numer(), r.denom())
                }
            }
            NumericValue::Complex(c) => {
                if c.im == 0.0 {
                    write!(f, "{}", c.re)
                } else if c.re == 0.0 {
                    write!(f, "{}i", c.im)
                } else if c.im < 0.0 {
                    write!(f, "{}{}i", c.re, c.im)
                } else {
                    write!(f, "{}+{}i", c.re, c.im)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_from_rational_exact() {
        let half = BigRational::new(BigInt::from(1), BigInt::from(2));
        let d = BigDecimal::from_rational(&half, 10);
        assert_eq!(d.to_string(), "0.5");
    }

    #[test]
    fn test_decimal_rounding() {
        let third = BigRational::new(BigInt::from(1), BigInt::from(3));
        let d = BigDecimal::from_rational(&third, 5);
        assert_eq!(d.to_string(), "0.33333");
    }

    #[test]
    fn test_decimal_pi() {
        let pi = BigDecimal::pi(20);
        let s = pi.to_string();
        assert!(s.starts_with("3.1415926535897932384"), "got {}", s);
    }

    #[test]
    fn test_decimal_arith() {
        let a = BigDecimal::new(BigInt::from(15), 1); // 1.5
        let b = BigDecimal::new(BigInt::from(25), 1); // 2.5
        assert_eq!(a.add(&b).to_string(), "4");
        assert_eq!(a.mul(&b).to_string(), "3.75");
    }

    #[test]
    fn test_exact_sum_stays_exact() {
        let a = NumericValue::rational(1, 3);
        let b = NumericValue::rational(1, 6);
        let sum = a.add(&b);
        assert_eq!(sum, NumericValue::rational(1, 2));
        assert!(sum.is_exact());
    }

    #[test]
    fn test_machine_widening() {
        let a = NumericValue::int(2);
        let b = NumericValue::Machine(0.5);
        assert_eq!(a.mul(&b), NumericValue::Machine(1.0));
    }

    #[test]
    fn test_complex_sign_not_applicable() {
        let c = NumericValue::Complex(Complex64::new(1.0, 2.0));
        assert_eq!(c.sgn(), Sgn::NotApplicable);
        assert_eq!(c.compare(&NumericValue::int(0)), None);
    }

    #[test]
    fn test_nan_is_a_value() {
        let nan = NumericValue::Machine(f64::NAN);
        assert_eq!(nan.sgn(), Sgn::NotApplicable);
        // NaN propagates like any number
        assert!(matches!(nan.add(&NumericValue::int(1)), NumericValue::Machine(f) if f.is_nan()));
    }

    #[test]
    fn test_discard_imaginary() {
        let c = NumericValue::Complex(Complex64::new(3.0, 4.0));
        assert_eq!(c.discard_imaginary(), NumericValue::Machine(3.0));
    }
}
