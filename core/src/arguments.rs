//! Converter argument tokenizer.
//!
//! Converters are configured through a small `key=value,key=value` string
//! taken verbatim from the pattern, e.g. `<int(fixed_digits=4):year>`. Each
//! converter declares its keys with typed defaults; unknown keys are a hard
//! construction error.

use std::collections::HashMap;

use crate::BindError;

/// A typed converter argument value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgValue {
    /// A signed integer argument.
    Int(i64),
    /// A boolean argument; the textual form accepts case-insensitive
    /// `true`/`false`.
    Bool(bool),
}

/// Declaration of one accepted argument key with its default.
#[derive(Debug, Clone, Copy)]
pub struct ArgSpec {
    /// The accepted key.
    pub key: &'static str,
    /// Value used when the argument string does not mention the key. Also
    /// fixes the expected type of the textual value.
    pub default: ArgValue,
}

impl ArgSpec {
    /// Declare an integer argument.
    #[must_use]
    pub const fn int(key: &'static str, default: i64) -> Self {
        Self {
            key,
            default: ArgValue::Int(default),
        }
    }

    /// Declare a boolean argument.
    #[must_use]
    pub const fn bool(key: &'static str, default: bool) -> Self {
        Self {
            key,
            default: ArgValue::Bool(default),
        }
    }
}

/// Parsed converter arguments: declared defaults overlaid with the values
/// from the argument string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arguments {
    values: HashMap<&'static str, ArgValue>,
}

impl Arguments {
    /// Tokenize `raw` against the declared `specs`.
    ///
    /// Splits on `,`; every piece must be `key=value`. Keys and values are
    /// trimmed. Parsed values win over defaults; defaults only fill keys the
    /// string does not mention.
    ///
    /// # Errors
    ///
    /// - [`BindError::UnknownArgument`] for a key outside `specs`.
    /// - [`BindError::InvalidArgument`] for a piece without `=` or a value
    ///   that does not parse as the declared type.
    pub fn parse(raw: Option<&str>, specs: &[ArgSpec]) -> Result<Self, BindError> {
        let mut values: HashMap<&'static str, ArgValue> =
            specs.iter().map(|spec| (spec.key, spec.default)).collect();

        let raw = raw.unwrap_or("").trim();
        if raw.is_empty() {
            return Ok(Self { values });
        }

        for piece in raw.split(',') {
            let Some((key, text)) = piece.split_once('=') else {
                return Err(BindError::InvalidArgument {
                    key: piece.trim().to_owned(),
                    value: String::new(),
                    expected: "a key=value pair",
                });
            };
            let key = key.trim();
            let text = text.trim();
            let Some(spec) = specs.iter().find(|spec| spec.key == key) else {
                return Err(BindError::UnknownArgument {
                    key: key.to_owned(),
                });
            };
            let value = match spec.default {
                ArgValue::Int(_) => {
                    text.parse::<i64>()
                        .map(ArgValue::Int)
                        .map_err(|_| BindError::InvalidArgument {
                            key: key.to_owned(),
                            value: text.to_owned(),
                            expected: "an integer",
                        })?
                }
                ArgValue::Bool(_) => {
                    if text.eq_ignore_ascii_case("true") {
                        ArgValue::Bool(true)
                    } else if text.eq_ignore_ascii_case("false") {
                        ArgValue::Bool(false)
                    } else {
                        return Err(BindError::InvalidArgument {
                            key: key.to_owned(),
                            value: text.to_owned(),
                            expected: "true or false",
                        });
                    }
                }
            };
            values.insert(spec.key, value);
        }

        Ok(Self { values })
    }

    /// The integer value for `key`. Returns `0` for undeclared keys;
    /// converters only ask for keys they declared.
    #[must_use]
    pub fn int(&self, key: &str) -> i64 {
        match self.values.get(key) {
            Some(ArgValue::Int(v)) => *v,
            _ => 0,
        }
    }

    /// The boolean value for `key`. Returns `false` for undeclared keys.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(ArgValue::Bool(true)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECS: &[ArgSpec] = &[
        ArgSpec::int("minlength", 0),
        ArgSpec::int("maxlength", -1),
        ArgSpec::bool("allow_slash", false),
    ];

    #[test]
    fn defaults_fill_missing_keys() {
        let args = Arguments::parse(None, SPECS).unwrap();
        assert_eq!(args.int("minlength"), 0);
        assert_eq!(args.int("maxlength"), -1);
        assert!(!args.flag("allow_slash"));
    }

    #[test]
    fn parsed_values_win_over_defaults() {
        let args = Arguments::parse(Some("maxlength=20, allow_slash=true"), SPECS).unwrap();
        assert_eq!(args.int("minlength"), 0);
        assert_eq!(args.int("maxlength"), 20);
        assert!(args.flag("allow_slash"));
    }

    #[test]
    fn keys_and_values_are_trimmed() {
        let args = Arguments::parse(Some(" minlength = 3 "), SPECS).unwrap();
        assert_eq!(args.int("minlength"), 3);
    }

    #[test]
    fn bool_is_case_insensitive() {
        let args = Arguments::parse(Some("allow_slash=TRUE"), SPECS).unwrap();
        assert!(args.flag("allow_slash"));
        let args = Arguments::parse(Some("allow_slash=False"), SPECS).unwrap();
        assert!(!args.flag("allow_slash"));
    }

    #[test]
    fn unknown_key_is_fatal() {
        assert_eq!(
            Arguments::parse(Some("length=3"), SPECS),
            Err(BindError::UnknownArgument {
                key: "length".into()
            })
        );
    }

    #[test]
    fn non_integer_value_rejected() {
        assert!(matches!(
            Arguments::parse(Some("minlength=soon"), SPECS),
            Err(BindError::InvalidArgument { expected: "an integer", .. })
        ));
    }

    #[test]
    fn bare_word_rejected() {
        assert!(matches!(
            Arguments::parse(Some("allow_slash"), SPECS),
            Err(BindError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn negative_integers_accepted() {
        let args = Arguments::parse(Some("maxlength=-1"), SPECS).unwrap();
        assert_eq!(args.int("maxlength"), -1);
    }
}
