//! LaTeX parsing: tokenizer and dictionary-driven precedence climbing.

pub mod dictionary;
pub mod parser;
pub mod tokenizer;

pub use dictionary::{default_dictionary, Associativity, DictEntry, Dictionary, EntryKind};
pub use parser::{parse_latex, parse_latex_with, LatexParser};
pub use tokenizer::{is_command, tokenize, CLOSE_GROUP, OPEN_GROUP};
