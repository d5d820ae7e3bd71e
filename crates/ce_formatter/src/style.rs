//! Style policy for serialization.
//!
//! Rendering of fractions, roots and powers is controlled by pluggable
//! style functions keyed on the nesting level: the level increments when
//! entering an operand position and is left unchanged for constructs that
//! should not visually nest (Add, Multiply). A deeply nested fraction can
//! thus degrade to an inline solidus.

/// How to render a quotient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FractionStyle {
    /// `\frac{a}{b}`
    Frac,
    /// `a/b`
    Solidus,
    /// `a b^{-1}`
    Reciprocal,
}

/// How to render a fractional power.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootStyle {
    /// `\sqrt[n]{x}`
    Radical,
    /// `x^{1/n}`
    Exponent,
}

/// How to render big-operator bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsStyle {
    /// `\sum_{i=1}^{n}`
    SubSup,
    /// `\sum` (bounds omitted)
    None,
}

/// Style functions, each keyed on the nesting level.
#[derive(Clone, Copy)]
pub struct SerializeStyle {
    pub fraction: fn(level: u32) -> FractionStyle,
    pub root: fn(level: u32) -> RootStyle,
    pub bounds: fn(level: u32) -> BoundsStyle,
}

impl Default for SerializeStyle {
    fn default() -> Self {
        Self {
            fraction: |_| FractionStyle::Frac,
            root: |_| RootStyle::Radical,
            bounds: |_| BoundsStyle::SubSup,
        }
    }
}

impl SerializeStyle {
    /// Inline style: solidus fractions below the top level.
    pub fn inline() -> Self {
        Self {
            fraction: |level| {
                if level == 0 {
                    FractionStyle::Frac
                } else {
                    FractionStyle::Solidus
                }
            },
            ..Self::default()
        }
    }
}

impl std::fmt::Debug for SerializeStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializeStyle").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_style_is_frac_everywhere() {
        let s = SerializeStyle::default();
        assert_eq!((s.fraction)(0), FractionStyle::Frac);
        assert_eq!((s.fraction)(5), FractionStyle::Frac);
    }

    #[test]
    fn test_inline_style_degrades_with_level() {
        let s = SerializeStyle::inline();
        assert_eq!((s.fraction)(0), FractionStyle::Frac);
        assert_eq!((s.fraction)(2), FractionStyle::Solidus);
    }
}
