//! Converters — bidirectional text/value codecs.
//!
//! A [`Converter`] contributes the regex fragment a variable placeholder
//! matches with, decodes the captured text into a [`UrlValue`] and encodes a
//! value back into path text. Converters are instantiated per placeholder
//! with a small argument string and captured by the owning rule at bind
//! time.

use std::collections::HashMap;
use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::arguments::{ArgSpec, Arguments};
use crate::registry::FromArgs;
use crate::{BindError, ValidationError};

/// Everything except ASCII alphanumerics and `_` `.` `-` is escaped when a
/// value is encoded back into path text.
const PATH_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-');

/// A decoded path variable.
///
/// Type-erased so the same mapping type can carry the output of any
/// converter; custom converters pick whichever variant fits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UrlValue {
    /// An integer, as decoded by the `int` converter.
    Int(i64),
    /// Raw text, as decoded by the `default`/`string` converter.
    Text(String),
}

impl UrlValue {
    /// Returns the integer value, if this is an `Int`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// Returns the text, if this is a `Text`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Int(_) => None,
            Self::Text(v) => Some(v.as_str()),
        }
    }
}

impl fmt::Display for UrlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for UrlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for UrlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for UrlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Mapping of variable name to decoded value, as returned by a match and as
/// supplied to a build.
pub type UrlValues = HashMap<String, UrlValue>;

/// A bidirectional text/value codec for one placeholder.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync`: a bound rule captures its
/// converter instances and the map is read concurrently.
pub trait Converter: Send + Sync + fmt::Debug {
    /// Regex fragment this placeholder matches with. Embedded in a named
    /// capture group inside an anchored pattern; must not contain anchors
    /// or capture groups of its own.
    fn pattern_fragment(&self) -> &str;

    /// Decode a captured segment.
    ///
    /// # Errors
    ///
    /// [`ValidationError`] rejects the segment; the owning rule then falls
    /// through to the next candidate instead of failing the dispatch.
    fn parse(&self, text: &str) -> Result<UrlValue, ValidationError>;

    /// Encode a value back into path text.
    ///
    /// # Errors
    ///
    /// [`ValidationError`] aborts the current rule's build attempt; the map
    /// then tries the next candidate rule.
    fn format(&self, value: &UrlValue) -> Result<String, ValidationError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// StringConverter — `default` / `string`
// ═══════════════════════════════════════════════════════════════════════════════

/// The `default`/`string` converter: one-or-more non-`/` characters, or any
/// non-empty text when `allow_slash=true`.
///
/// Arguments: `minlength` (0 = unbounded), `maxlength` (-1 = unbounded),
/// `allow_slash`. Length bounds count characters and are checked on decode
/// only.
#[derive(Debug, Clone)]
pub struct StringConverter {
    minlength: Option<i64>,
    maxlength: Option<i64>,
    allow_slash: bool,
}

impl StringConverter {
    const SPECS: &'static [ArgSpec] = &[
        ArgSpec::int("minlength", 0),
        ArgSpec::int("maxlength", -1),
        ArgSpec::bool("allow_slash", false),
    ];
}

impl FromArgs for StringConverter {
    fn from_args(args: Option<&str>) -> Result<Self, BindError> {
        let args = Arguments::parse(args, Self::SPECS)?;
        Ok(Self {
            minlength: match args.int("minlength") {
                0 => None,
                v => Some(v),
            },
            maxlength: match args.int("maxlength") {
                -1 => None,
                v => Some(v),
            },
            allow_slash: args.flag("allow_slash"),
        })
    }
}

impl Converter for StringConverter {
    fn pattern_fragment(&self) -> &str {
        if self.allow_slash {
            ".+?"
        } else {
            "[^/]+"
        }
    }

    fn parse(&self, text: &str) -> Result<UrlValue, ValidationError> {
        let len = text.chars().count() as i64;
        if self.minlength.is_some_and(|min| len < min)
            || self.maxlength.is_some_and(|max| len > max)
        {
            return Err(ValidationError);
        }
        Ok(UrlValue::Text(text.to_owned()))
    }

    fn format(&self, value: &UrlValue) -> Result<String, ValidationError> {
        let text = value.to_string();
        Ok(utf8_percent_encode(&text, PATH_ESCAPE).to_string())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// IntConverter — `int`
// ═══════════════════════════════════════════════════════════════════════════════

/// The `int` converter: one-or-more digits decoded to an `i64`.
///
/// Arguments: `fixed_digits` (-1 = off) requires the captured text to be
/// exactly that many characters, checked before the numeric parse; `min`
/// (0 = unbounded) and `max` (-1 = unbounded) bound the parsed value.
///
/// Encoding stringifies the integer with no padding; callers wanting
/// fixed-digit output must supply a pre-padded text value through a rule
/// whose converter accepts it.
#[derive(Debug, Clone)]
pub struct IntConverter {
    fixed_digits: Option<i64>,
    min: Option<i64>,
    max: Option<i64>,
}

impl IntConverter {
    const SPECS: &'static [ArgSpec] = &[
        ArgSpec::int("fixed_digits", -1),
        ArgSpec::int("min", 0),
        ArgSpec::int("max", -1),
    ];
}

impl FromArgs for IntConverter {
    fn from_args(args: Option<&str>) -> Result<Self, BindError> {
        let args = Arguments::parse(args, Self::SPECS)?;
        Ok(Self {
            fixed_digits: match args.int("fixed_digits") {
                -1 => None,
                v => Some(v),
            },
            min: match args.int("min") {
                0 => None,
                v => Some(v),
            },
            max: match args.int("max") {
                -1 => None,
                v => Some(v),
            },
        })
    }
}

impl Converter for IntConverter {
    fn pattern_fragment(&self) -> &str {
        r"\d+"
    }

    fn parse(&self, text: &str) -> Result<UrlValue, ValidationError> {
        if self
            .fixed_digits
            .is_some_and(|width| text.chars().count() as i64 != width)
        {
            return Err(ValidationError);
        }
        // Overflowing or non-ASCII digit runs fail the parse and skip the
        // rule instead of aborting the dispatch.
        let value: i64 = text.parse().map_err(|_| ValidationError)?;
        if self.min.is_some_and(|min| value < min) || self.max.is_some_and(|max| value > max) {
            return Err(ValidationError);
        }
        Ok(UrlValue::Int(value))
    }

    fn format(&self, value: &UrlValue) -> Result<String, ValidationError> {
        match value {
            UrlValue::Int(v) => Ok(v.to_string()),
            UrlValue::Text(text) => text
                .parse::<i64>()
                .map(|v| v.to_string())
                .map_err(|_| ValidationError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_default_fragment_excludes_slash() {
        let conv = StringConverter::from_args(None).unwrap();
        assert_eq!(conv.pattern_fragment(), "[^/]+");
    }

    #[test]
    fn string_allow_slash_fragment() {
        let conv = StringConverter::from_args(Some("allow_slash=true")).unwrap();
        assert_eq!(conv.pattern_fragment(), ".+?");
    }

    #[test]
    fn string_length_bounds_checked_on_parse() {
        let conv = StringConverter::from_args(Some("minlength=3,maxlength=5")).unwrap();
        assert_eq!(conv.parse("abc"), Ok(UrlValue::Text("abc".into())));
        assert_eq!(conv.parse("ab"), Err(ValidationError));
        assert_eq!(conv.parse("toolong"), Err(ValidationError));
    }

    #[test]
    fn string_length_counts_chars_not_bytes() {
        let conv = StringConverter::from_args(Some("maxlength=2")).unwrap();
        assert_eq!(conv.parse("äö"), Ok(UrlValue::Text("äö".into())));
    }

    #[test]
    fn string_format_percent_encodes() {
        let conv = StringConverter::from_args(None).unwrap();
        assert_eq!(
            conv.format(&UrlValue::Text("hello world/x".into())),
            Ok("hello%20world%2Fx".into())
        );
        assert_eq!(conv.format(&UrlValue::Text("a_b.c-d".into())), Ok("a_b.c-d".into()));
    }

    #[test]
    fn string_format_stringifies_integers() {
        let conv = StringConverter::from_args(None).unwrap();
        assert_eq!(conv.format(&UrlValue::Int(42)), Ok("42".into()));
    }

    #[test]
    fn int_parses_digits() {
        let conv = IntConverter::from_args(None).unwrap();
        assert_eq!(conv.parse("42"), Ok(UrlValue::Int(42)));
    }

    #[test]
    fn int_overflow_is_validation_error() {
        let conv = IntConverter::from_args(None).unwrap();
        assert_eq!(conv.parse("99999999999999999999999"), Err(ValidationError));
    }

    #[test]
    fn int_fixed_digits_checked_before_parse() {
        let conv = IntConverter::from_args(Some("fixed_digits=4")).unwrap();
        assert_eq!(conv.parse("2026"), Ok(UrlValue::Int(2026)));
        assert_eq!(conv.parse("026"), Err(ValidationError));
        assert_eq!(conv.parse("02026"), Err(ValidationError));
    }

    #[test]
    fn int_bounds_checked_after_parse() {
        let conv = IntConverter::from_args(Some("min=10,max=20")).unwrap();
        assert_eq!(conv.parse("10"), Ok(UrlValue::Int(10)));
        assert_eq!(conv.parse("9"), Err(ValidationError));
        assert_eq!(conv.parse("21"), Err(ValidationError));
    }

    #[test]
    fn int_min_zero_means_unbounded() {
        let conv = IntConverter::from_args(Some("min=0")).unwrap();
        assert_eq!(conv.parse("0"), Ok(UrlValue::Int(0)));
    }

    #[test]
    fn int_format_accepts_digit_text() {
        let conv = IntConverter::from_args(None).unwrap();
        assert_eq!(conv.format(&UrlValue::Int(7)), Ok("7".into()));
        assert_eq!(conv.format(&UrlValue::Text("7".into())), Ok("7".into()));
        assert_eq!(conv.format(&UrlValue::Text("seven".into())), Err(ValidationError));
    }

    #[test]
    fn unknown_argument_is_a_bind_error() {
        assert_eq!(
            IntConverter::from_args(Some("digits=4")).unwrap_err(),
            BindError::UnknownArgument { key: "digits".into() }
        );
    }
}
