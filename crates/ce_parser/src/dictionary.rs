//! The parser dictionary.
//!
//! An indexed table mapping trigger tokens to entries. Each entry names the
//! head it builds and, for operators, its precedence and associativity.
//! Custom constructs (fractions, roots, big operators, environments) carry
//! a `parse` callback invoked with the parser positioned after the trigger.

use crate::parser::LatexParser;
use ce_ast::ExprId;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
    /// Chains are ambiguous (`a = b = c` is not re-grouped).
    Non,
    /// Fully associative; operands collect into one n-ary application.
    Both,
}

/// What kind of construct a trigger introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Prefix { precedence: u16 },
    Infix { precedence: u16, assoc: Associativity },
    Postfix { precedence: u16 },
    /// Delimiter pair; `close` is the matching closing token.
    Matchfix { close: &'static str },
    /// Named function expecting an argument (`\sin x`, `\sin(x)`).
    Function,
    /// Bare symbol or constant.
    Symbol,
    /// `\begin{...}` construct.
    Environment,
}

/// Custom parse callback. The parser is positioned just after the trigger
/// token; the callback returns a complete (possibly error-carrying) node.
pub type CustomParser = fn(&mut LatexParser<'_>, &DictEntry) -> ExprId;

#[derive(Clone)]
pub struct DictEntry {
    /// Trigger token sequence; entries are indexed by the first token and
    /// longer sequences win over shorter ones.
    pub trigger: &'static [&'static str],
    pub kind: EntryKind,
    /// Head (or symbol name) this entry builds.
    pub head: &'static str,
    pub parse: Option<CustomParser>,
    /// Command emitted when serializing this head, where it differs from
    /// the trigger.
    pub serialize: Option<&'static str>,
}

impl DictEntry {
    fn op(trigger: &'static [&'static str], kind: EntryKind, head: &'static str) -> Self {
        Self {
            trigger,
            kind,
            head,
            parse: None,
            serialize: None,
        }
    }
}

impl std::fmt::Debug for DictEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictEntry")
            .field("trigger", &self.trigger)
            .field("kind", &self.kind)
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

/// Token-indexed entry table.
#[derive(Debug, Default)]
pub struct Dictionary {
    by_first_token: FxHashMap<&'static str, Vec<DictEntry>>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: DictEntry) {
        let first = entry.trigger.first().copied().unwrap_or_default();
        let slot = self.by_first_token.entry(first).or_default();
        // Longer trigger sequences are tried first.
        let pos = slot
            .iter()
            .position(|e| e.trigger.len() < entry.trigger.len())
            .unwrap_or(slot.len());
        slot.insert(pos, entry);
    }

    pub fn entries(&self, token: &str) -> &[DictEntry] {
        self.by_first_token
            .get(token)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First entry for `token` matching the predicate.
    pub fn find(&self, token: &str, pred: impl Fn(&DictEntry) -> bool) -> Option<&DictEntry> {
        self.entries(token).iter().find(|e| pred(e))
    }

    pub fn infix(&self, token: &str) -> Option<&DictEntry> {
        self.find(token, |e| matches!(e.kind, EntryKind::Infix { .. }))
    }

    pub fn postfix(&self, token: &str) -> Option<&DictEntry> {
        self.find(token, |e| matches!(e.kind, EntryKind::Postfix { .. }))
    }

    pub fn prefix(&self, token: &str) -> Option<&DictEntry> {
        self.find(token, |e| {
            matches!(
                e.kind,
                EntryKind::Prefix { .. }
                    | EntryKind::Matchfix { .. }
                    | EntryKind::Function
                    | EntryKind::Symbol
                    | EntryKind::Environment
            )
        })
    }

    /// Serialization command registered for a head name.
    pub fn command_for_head(&self, head: &str) -> Option<&'static str> {
        for entries in self.by_first_token.values() {
            for e in entries {
                if e.head == head {
                    if let Some(s) = e.serialize {
                        return Some(s);
                    }
                    if let Some(first) = e.trigger.first() {
                        return Some(first);
                    }
                }
            }
        }
        None
    }
}

// Operator precedence bands (loosest binds last).
pub const RELATIONAL_PREC: u16 = 260;
pub const ADDITIVE_PREC: u16 = 275;
pub const MULTIPLICATIVE_PREC: u16 = 390;
/// Juxtaposition ("invisible multiply") binds like explicit multiplication.
pub const INVISIBLE_MULTIPLY_PREC: u16 = 390;
pub const DIVISION_PREC: u16 = 660;
pub const POWER_PREC: u16 = 720;
pub const POSTFIX_PREC: u16 = 810;
/// Big operators take their body at just above additive precedence.
pub const BIG_OP_BODY_PREC: u16 = 276;

/// The default LaTeX dictionary.
pub fn default_dictionary() -> Dictionary {
    use crate::parser::{parse_big_operator, parse_environment, parse_frac, parse_sqrt};
    use Associativity::*;
    use EntryKind::*;

    let mut dict = Dictionary::new();

    // Relational
    for (tok, head) in [
        ("=", "Equal"),
        ("<", "Less"),
        (">", "Greater"),
        ("\\leq", "LessEqual"),
        ("\\geq", "GreaterEqual"),
        ("\\neq", "NotEqual"),
    ] {
        dict.add(DictEntry::op(
            Box::leak(Box::new([tok])),
            Infix {
                precedence: RELATIONAL_PREC,
                assoc: Non,
            },
            head,
        ));
    }

    // Additive
    dict.add(DictEntry::op(
        &["+"],
        Infix {
            precedence: ADDITIVE_PREC,
            assoc: Both,
        },
        "Add",
    ));
    dict.add(DictEntry::op(
        &["-"],
        Infix {
            precedence: ADDITIVE_PREC,
            assoc: Left,
        },
        "Subtract",
    ));
    dict.add(DictEntry::op(
        &["-"],
        Prefix {
            precedence: ADDITIVE_PREC + 1,
        },
        "Negate",
    ));
    dict.add(DictEntry::op(
        &["+"],
        Prefix {
            precedence: ADDITIVE_PREC + 1,
        },
        "Identity",
    ));

    // Multiplicative variants all reduce to the same associative Multiply.
    for tok in ["\\times", "\\cdot", "*"] {
        dict.add(DictEntry {
            serialize: Some("\\cdot"),
            ..DictEntry::op(
                Box::leak(Box::new([tok])),
                Infix {
                    precedence: MULTIPLICATIVE_PREC,
                    assoc: Both,
                },
                "Multiply",
            )
        });
    }
    dict.add(DictEntry::op(
        &["/"],
        Infix {
            precedence: DIVISION_PREC,
            assoc: Left,
        },
        "Divide",
    ));

    // Power
    dict.add(DictEntry::op(
        &["^"],
        Infix {
            precedence: POWER_PREC,
            assoc: Right,
        },
        "Power",
    ));

    // Postfix
    dict.add(DictEntry::op(
        &["!"],
        Postfix {
            precedence: POSTFIX_PREC,
        },
        "Factorial",
    ));

    // Matchfix
    dict.add(DictEntry::op(&["("], Matchfix { close: ")" }, "Delimiter"));
    dict.add(DictEntry::op(&["|"], Matchfix { close: "|" }, "Abs"));
    dict.add(DictEntry::op(
        &["\\lceil"],
        Matchfix { close: "\\rceil" },
        "Ceiling",
    ));
    dict.add(DictEntry::op(
        &["\\lfloor"],
        Matchfix { close: "\\rfloor" },
        "Floor",
    ));

    // Custom constructs
    dict.add(DictEntry {
        parse: Some(parse_frac),
        ..DictEntry::op(&["\\frac"], Function, "Divide")
    });
    dict.add(DictEntry {
        parse: Some(parse_sqrt),
        ..DictEntry::op(&["\\sqrt"], Function, "Sqrt")
    });
    dict.add(DictEntry {
        parse: Some(parse_big_operator),
        ..DictEntry::op(&["\\sum"], Function, "Sum")
    });
    dict.add(DictEntry {
        parse: Some(parse_big_operator),
        ..DictEntry::op(&["\\prod"], Function, "Product")
    });
    dict.add(DictEntry {
        parse: Some(parse_environment),
        ..DictEntry::op(&["\\begin"], Environment, "Environment")
    });

    // Named functions
    for (tok, head) in [
        ("\\sin", "Sin"),
        ("\\cos", "Cos"),
        ("\\tan", "Tan"),
        ("\\sec", "Sec"),
        ("\\csc", "Csc"),
        ("\\cot", "Cot"),
        ("\\arcsin", "Arcsin"),
        ("\\arccos", "Arccos"),
        ("\\arctan", "Arctan"),
        ("\\ln", "Ln"),
        ("\\log", "Log"),
        ("\\exp", "Exp"),
    ] {
        dict.add(DictEntry::op(
            Box::leak(Box::new([tok])),
            Function,
            head,
        ));
    }

    // Symbols / constants
    for (tok, head) in [
        ("\\pi", "Pi"),
        ("e", "ExponentialE"),
        ("i", "ImaginaryUnit"),
        ("\\infty", "PositiveInfinity"),
        ("\\partial", "Partial"),
    ] {
        dict.add(DictEntry::op(
            Box::leak(Box::new([tok])),
            Symbol,
            head,
        ));
    }

    dict
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infix_lookup() {
        let dict = default_dictionary();
        let plus = dict.infix("+").unwrap();
        assert_eq!(plus.head, "Add");
        assert!(matches!(
            plus.kind,
            EntryKind::Infix {
                precedence: ADDITIVE_PREC,
                ..
            }
        ));
    }

    #[test]
    fn test_minus_is_both_infix_and_prefix() {
        let dict = default_dictionary();
        assert!(dict.infix("-").is_some());
        assert!(dict
            .find("-", |e| matches!(e.kind, EntryKind::Prefix { .. }))
            .is_some());
    }

    #[test]
    fn test_multiplication_variants_share_head() {
        let dict = default_dictionary();
        for tok in ["\\times", "\\cdot", "*"] {
            assert_eq!(dict.infix(tok).unwrap().head, "Multiply");
        }
    }

    #[test]
    fn test_serialize_command_for_head() {
        let dict = default_dictionary();
        assert_eq!(dict.command_for_head("Multiply"), Some("\\cdot"));
        assert_eq!(dict.command_for_head("Sin"), Some("\\sin"));
    }

    #[test]
    fn test_matchfix_close_token() {
        let dict = default_dictionary();
        let paren = dict
            .find("(", |e| matches!(e.kind, EntryKind::Matchfix { .. }))
            .unwrap();
        assert!(matches!(paren.kind, EntryKind::Matchfix { close: ")" }));
    }
}
