//! Pattern tokenizer.
//!
//! Splits a route pattern like `/browse/<int:id>/` into an ordered sequence
//! of [`Token`]s. Parsing is purely textual, has no side effects and is safe
//! to repeat; all failures are construction-time [`BindError`]s.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::BindError;

/// Grammar for one placeholder, anchored at the current parse position:
/// an optional literal run, then `<`, an optional `converter(args):`
/// prefix, the variable name, and `>`.
static RULE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \A
        (?P<static>[^<]*)                         # literal rule data
        <
        (?:
            (?P<converter>[a-zA-Z_][a-zA-Z0-9_]*) # converter name
            (?:\((?P<args>[^\)]*)\))?             # converter arguments
            :                                     # variable delimiter
        )?
        (?P<variable>[a-zA-Z][a-zA-Z0-9_]*)       # variable name
        >
    ",
    )
    .expect("rule grammar regex is valid")
});

/// One parsed element of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Verbatim text, matched and emitted as-is (regex-escaped for matching).
    Literal(String),
    /// A typed placeholder.
    Variable {
        /// Converter name; `"default"` when the placeholder omitted it.
        converter: String,
        /// Raw argument string from the parentheses, passed through to the
        /// converter's constructor untouched.
        args: Option<String>,
        /// The capture name. Unique within one pattern.
        name: String,
    },
}

/// Tokenize a route pattern (leading slash included, trailing slash already
/// stripped by the caller).
///
/// A run of trailing text containing no further angle-bracket syntax is
/// returned as a final [`Token::Literal`].
///
/// # Errors
///
/// - [`BindError::DuplicateVariable`] if a variable name recurs.
/// - [`BindError::MalformedPattern`] if trailing text still contains an
///   unmatched `<` or `>`.
pub fn parse_pattern(rule: &str) -> Result<Vec<Token>, BindError> {
    let mut tokens = Vec::new();
    let mut used_names: HashSet<&str> = HashSet::new();
    let mut pos = 0;

    while pos < rule.len() {
        let Some(caps) = RULE_RE.captures(&rule[pos..]) else {
            break;
        };
        if let Some(m) = caps.name("static") {
            if !m.as_str().is_empty() {
                tokens.push(Token::Literal(m.as_str().to_owned()));
            }
        }
        let name = caps.name("variable").map_or("", |m| m.as_str());
        if !used_names.insert(name) {
            return Err(BindError::DuplicateVariable {
                rule: rule.to_owned(),
                name: name.to_owned(),
            });
        }
        tokens.push(Token::Variable {
            converter: caps
                .name("converter")
                .map_or_else(|| "default".to_owned(), |m| m.as_str().to_owned()),
            args: caps.name("args").map(|m| m.as_str().to_owned()),
            name: name.to_owned(),
        });
        pos += caps.get(0).map_or(rule.len(), |m| m.end());
    }

    if pos < rule.len() {
        let remaining = &rule[pos..];
        if remaining.contains('<') || remaining.contains('>') {
            return Err(BindError::MalformedPattern {
                rule: rule.to_owned(),
            });
        }
        tokens.push(Token::Literal(remaining.to_owned()));
    }

    Ok(tokens)
}
