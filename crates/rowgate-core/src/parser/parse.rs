//! Entry points, limits and source normalization

use super::convert::Converter;
use crate::ast::nodes::Expr;
use thiserror::Error;

/// Parse error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Unsupported construct: {0}")]
    Unsupported(String),

    #[error("Empty expression")]
    Empty,

    #[error("Expression is longer than {max} characters")]
    TooLong { max: usize },

    #[error("Expression nesting exceeds depth {max}")]
    TooDeep { max: usize },
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Bounds applied to untrusted expression text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    /// Maximum expression length in characters
    pub max_length: usize,
    /// Maximum bracket nesting and maximum depth of the lowered tree
    pub max_depth: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self {
            max_length: 4096,
            max_depth: 64,
        }
    }
}

/// Parse a condition with the default limits
pub fn parse(source: &str) -> ParseResult<Expr> {
    parse_with_limits(source, ParseLimits::default())
}

/// Parse a condition, rejecting input outside `limits` before it reaches the grammar
pub fn parse_with_limits(source: &str, limits: ParseLimits) -> ParseResult<Expr> {
    if source.chars().count() > limits.max_length {
        return Err(ParseError::TooLong {
            max: limits.max_length,
        });
    }
    if source.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let normalized = normalize(source, limits.max_depth)?;
    let parsed =
        cel_parser::parse(&normalized).map_err(|e| ParseError::Syntax(e.to_string()))?;
    Converter::new(limits.max_depth).convert(&parsed)
}

/// Rewrite the `a not in b` spelling to `a in !b`, which the converter lowers
/// to `NotIn`, and bound bracket nesting. String literals pass through untouched.
fn normalize(source: &str, max_depth: usize) -> ParseResult<String> {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len() + 2);
    let mut depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                let end = string_end(&chars, i, has_raw_prefix(&out));
                out.extend(&chars[i..end]);
                i = end;
            }
            '(' | '[' | '{' => {
                depth += 1;
                if depth > max_depth {
                    return Err(ParseError::TooDeep { max: max_depth });
                }
                out.push(c);
                i += 1;
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                out.push(c);
                i += 1;
            }
            c if is_word_char(c) => {
                let start = i;
                while i < chars.len() && is_word_char(chars[i]) {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if word == "not" && !out.trim_end().ends_with('.') {
                    if let Some(next) = keyword_in_at(&chars, i) {
                        out.push_str("in !");
                        i = next;
                        continue;
                    }
                }
                out.push_str(&word);
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    Ok(out)
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

// r'..', rb'..' and br'..' do not treat backslash as an escape
fn has_raw_prefix(out: &str) -> bool {
    let prefix: String = out
        .chars()
        .rev()
        .take_while(|c| is_word_char(*c))
        .collect::<String>()
        .to_ascii_lowercase();
    matches!(prefix.as_str(), "r" | "rb" | "br")
}

/// Index just past the literal opening at `start`, or the end of input when unterminated
fn string_end(chars: &[char], start: usize, raw: bool) -> usize {
    let quote = chars[start];
    let triple = chars.get(start + 1) == Some(&quote) && chars.get(start + 2) == Some(&quote);
    let width = if triple { 3 } else { 1 };

    let mut j = start + width;
    while j < chars.len() {
        if !raw && chars[j] == '\\' {
            j += 2;
            continue;
        }
        if (0..width).all(|k| chars.get(j + k) == Some(&quote)) {
            return j + width;
        }
        j += 1;
    }
    chars.len()
}

/// After `not`, whitespace then the keyword `in`; returns the index past `in`
fn keyword_in_at(chars: &[char], from: usize) -> Option<usize> {
    let mut j = from;
    while j < chars.len() && chars[j].is_whitespace() {
        j += 1;
    }
    if j == from || chars.get(j) != Some(&'i') || chars.get(j + 1) != Some(&'n') {
        return None;
    }
    match chars.get(j + 2) {
        Some(c) if is_word_char(*c) => None,
        _ => Some(j + 2),
    }
}
