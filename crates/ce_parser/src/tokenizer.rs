//! LaTeX tokenizer.
//!
//! Produces an ordered sequence of opaque string tokens. Conventions:
//! - commands keep their escape marker: `\frac`, `\pi`
//! - brace groups become the grouping markers `<{>` and `<}>`
//! - digit runs (with an optional decimal point) form one number token
//! - every other letter or symbol is a single-character token
//!
//! The parser consumes this sequence positionally and never re-tokenizes.

use nom::{
    bytes::complete::take_while1,
    character::complete::{anychar, char},
    IResult,
};

/// Grouping marker for `{`.
pub const OPEN_GROUP: &str = "<{>";
/// Grouping marker for `}`.
pub const CLOSE_GROUP: &str = "<}>";

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn is_digit_or_dot(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

/// A `\command` or a single-character control symbol like `\{`.
fn command(input: &str) -> IResult<&str, String> {
    let (input, _) = char('\\')(input)?;
    if let Ok((rest, name)) = take_while1::<_, _, nom::error::Error<&str>>(is_alpha)(input) {
        return Ok((rest, format!("\\{}", name)));
    }
    let (rest, c) = anychar(input)?;
    Ok((rest, format!("\\{}", c)))
}

/// A digit run with at most one decimal point: `123`, `3.14`, `.5`.
fn number(input: &str) -> IResult<&str, String> {
    let (rest, text) = take_while1(is_digit_or_dot)(input)?;
    // A bare "." is punctuation, not a number.
    if text.chars().all(|c| c == '.') {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        )));
    }
    // Only the first dot belongs to the literal; "1.2.3" splits.
    if let Some(second_dot) = find_second_dot(text) {
        let (keep, _) = text.split_at(second_dot);
        let consumed = keep.len();
        return Ok((&input[consumed..], keep.to_string()));
    }
    Ok((rest, text.to_string()))
}

fn find_second_dot(text: &str) -> Option<usize> {
    let mut seen = false;
    for (i, c) in text.char_indices() {
        if c == '.' {
            if seen {
                return Some(i);
            }
            seen = true;
        }
    }
    None
}

/// Tokenize a LaTeX string. Whitespace separates tokens and is otherwise
/// dropped; unknown characters still become (single-character) tokens so
/// the parser can embed a typed error for them.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = input.trim_start();
    while !rest.is_empty() {
        if let Ok((r, tok)) = command(rest) {
            tokens.push(tok);
            rest = r.trim_start();
            continue;
        }
        if let Ok((r, tok)) = number(rest) {
            tokens.push(tok);
            rest = r.trim_start();
            continue;
        }
        let c = rest.chars().next().expect("non-empty");
        match c {
            '{' => tokens.push(OPEN_GROUP.to_string()),
            '}' => tokens.push(CLOSE_GROUP.to_string()),
            _ => tokens.push(c.to_string()),
        }
        rest = rest[c.len_utf8()..].trim_start();
    }
    tokens
}

/// Does a token denote a command (starts with the escape marker)?
pub fn is_command(token: &str) -> bool {
    token.starts_with('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_frac() {
        assert_eq!(
            tokenize("\\frac{1}{2}"),
            vec!["\\frac", "<{>", "1", "<}>", "<{>", "2", "<}>"]
        );
    }

    #[test]
    fn test_tokenize_letters_singly() {
        assert_eq!(tokenize("xy"), vec!["x", "y"]);
        assert_eq!(tokenize("2x"), vec!["2", "x"]);
    }

    #[test]
    fn test_tokenize_decimal() {
        assert_eq!(tokenize("3.14"), vec!["3.14"]);
        assert_eq!(tokenize(".5"), vec![".5"]);
    }

    #[test]
    fn test_tokenize_operators() {
        assert_eq!(tokenize("a + b^2"), vec!["a", "+", "b", "^", "2"]);
    }

    #[test]
    fn test_tokenize_control_symbol() {
        assert_eq!(tokenize("\\{x\\}"), vec!["\\{", "x", "\\}"]);
    }

    #[test]
    fn test_whitespace_dropped() {
        assert_eq!(tokenize("  1  +  2  "), vec!["1", "+", "2"]);
    }

    #[test]
    fn test_is_command() {
        assert!(is_command("\\sum"));
        assert!(!is_command("x"));
        assert!(!is_command(OPEN_GROUP));
    }
}
