//! routemap - an extensible bidirectional URL dispatch engine
//!
//! Compiles declarative route patterns (literal segments interleaved with
//! typed variable placeholders, optionally scoped to a subdomain) into
//! anchored matchers, resolves a request path plus subdomain to an endpoint
//! and a mapping of decoded variables, and performs the inverse: given an
//! endpoint and a set of values, produces a concrete URL.
//!
//! # Architecture
//!
//! - [`parse_pattern`] — tokenizes a pattern string into literal and
//!   variable [`Token`]s
//! - [`Converter`] — named, pluggable bidirectional text/value codec;
//!   built-ins are registered in a [`ConverterRegistry`]
//! - [`Rule`] — owns one pattern, compiles it into a matcher plus a
//!   replayable build trace, and carries a specificity score
//! - [`Map`] — owns the bound rules, keeps them sorted most-specific-first,
//!   and exposes [`match_path`](Map::match_path) and [`build`](Map::build)
//!
//! # Map creation
//!
//! ```
//! use routemap::{Map, MapOptions, Rule};
//!
//! let mut options = MapOptions::default();
//! options.server_name = "example.com".into();
//!
//! let map = Map::new(
//!     vec![
//!         // Static URLs
//!         Rule::new("/", "static/index"),
//!         Rule::new("/about", "static/about"),
//!         Rule::new("/help", "static/help"),
//!         // Knowledge base
//!         Rule::new("/", "kb/index").subdomain("kb"),
//!         Rule::new("/browse/", "kb/browse").subdomain("kb"),
//!         Rule::new("/browse/<int:id>/", "kb/browse").subdomain("kb"),
//!         Rule::new("/browse/<int:id>/<int:page>", "kb/browse").subdomain("kb"),
//!     ],
//!     options,
//! )?;
//! # let _ = map;
//! # Ok::<(), routemap::BindError>(())
//! ```
//!
//! # URL matching
//!
//! ```
//! # use routemap::{Map, MapOptions, Rule, MatchError, UrlValue};
//! # let mut options = MapOptions::default();
//! # options.server_name = "example.com".into();
//! # let map = Map::new(
//! #     vec![
//! #         Rule::new("/", "static/index"),
//! #         Rule::new("/about", "static/about"),
//! #         Rule::new("/browse/<int:id>/", "kb/browse").subdomain("kb"),
//! #     ],
//! #     options,
//! # ).unwrap();
//! let (endpoint, values) = map.match_path("/browse/42/", "/", Some("kb"))?;
//! assert_eq!(endpoint, "kb/browse");
//! assert_eq!(values["id"], UrlValue::Int(42));
//!
//! // A folder-like rule requested without the trailing slash redirects.
//! let err = map.match_path("/browse/42", "/", Some("kb")).unwrap_err();
//! assert_eq!(
//!     err,
//!     MatchError::Redirect { url: "http://kb.example.com/browse/42/".into() }
//! );
//!
//! // No rule at all is a terminal outcome, not a panic.
//! let err = map.match_path("/missing", "/", None).unwrap_err();
//! assert_eq!(err, MatchError::NotFound { path: "/missing".into() });
//! # Ok::<(), routemap::MatchError>(())
//! ```
//!
//! # URL building
//!
//! ```
//! # use routemap::{Map, MapOptions, Rule, UrlValues};
//! # let mut options = MapOptions::default();
//! # options.server_name = "example.com".into();
//! # let map = Map::new(
//! #     vec![
//! #         Rule::new("/", "static/index"),
//! #         Rule::new("/about", "static/about"),
//! #         Rule::new("/browse/", "kb/browse").subdomain("kb"),
//! #         Rule::new("/browse/<int:id>/", "kb/browse").subdomain("kb"),
//! #     ],
//! #     options,
//! # ).unwrap();
//! let mut values = UrlValues::new();
//! values.insert("id".into(), 42.into());
//!
//! // The requested subdomain defaults to "www"; the matching rule lives on
//! // "kb", so the result is an absolute URL.
//! assert_eq!(
//!     map.build("kb/browse", &values, "/", None, false)?,
//!     "http://kb.example.com/browse/42/"
//! );
//!
//! // Candidate selection needs the exact variable set: no values picks the
//! // variable-free rule registered under the same endpoint.
//! assert_eq!(
//!     map.build("kb/browse", &UrlValues::new(), "/", None, false)?,
//!     "http://kb.example.com/browse/"
//! );
//!
//! // Same subdomain: script-relative.
//! assert_eq!(map.build("static/about", &UrlValues::new(), "/", None, false)?, "/about");
//!
//! // Forced external URLs carry scheme, subdomain and server name.
//! assert_eq!(
//!     map.build("static/index", &UrlValues::new(), "/", None, true)?,
//!     "http://www.example.com/"
//! );
//! # Ok::<(), routemap::BuildError>(())
//! ```

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod arguments;
mod convert;
mod map;
mod parse;
mod registry;
mod rule;

#[cfg(feature = "config")]
mod config;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

pub use arguments::{ArgSpec, ArgValue, Arguments};
pub use convert::{Converter, IntConverter, StringConverter, UrlValue, UrlValues};
pub use map::{Map, MapOptions};
pub use parse::{parse_pattern, Token};
pub use registry::{ConverterFactory, ConverterRegistry, FromArgs};
pub use rule::{Rule, RuleMatch};

#[cfg(feature = "config")]
pub use config::{MapConfig, RuleConfig};

/// Commonly used types, for glob import.
pub mod prelude {
    pub use crate::{
        BindError,
        BuildError,
        Converter,
        ConverterRegistry,
        FromArgs,
        Map,
        MapOptions,
        MatchError,
        Rule,
        RuleMatch,
        UrlValue,
        UrlValues,
        ValidationError,
        ALL_SUBDOMAINS,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Wildcard subdomain: a rule bound to it matches any subdomain.
///
/// Wildcard rules always rank below every subdomain-scoped rule, regardless
/// of how many variables they carry.
pub const ALL_SUBDOMAINS: &str = "ALL";

// ═══════════════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors from rule parsing and binding.
///
/// These indicate a programmer or configuration error. They are raised at
/// map construction time, never during dispatch: fix the rule set and
/// rebuild the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// The pattern does not start with a leading `/`.
    NoLeadingSlash {
        /// The offending pattern.
        rule: String,
    },
    /// The pattern still contains a stray `<` or `>` after the last
    /// recognized placeholder.
    MalformedPattern {
        /// The offending pattern.
        rule: String,
    },
    /// The same variable name appears twice within one pattern.
    DuplicateVariable {
        /// The offending pattern.
        rule: String,
        /// The repeated variable name.
        name: String,
    },
    /// The rule was already bound to a map.
    AlreadyBound {
        /// The pattern of the rebound rule.
        rule: String,
    },
    /// A placeholder names a converter that is not registered.
    UnknownConverter {
        /// The unregistered converter name.
        name: String,
        /// Converter names that are registered.
        available: Vec<String>,
    },
    /// A converter argument key is not declared by the converter.
    UnknownArgument {
        /// The undeclared key.
        key: String,
    },
    /// A converter argument value does not have the declared type, or an
    /// argument piece is not of the form `key=value`.
    InvalidArgument {
        /// The key (or the whole malformed piece).
        key: String,
        /// The rejected value text.
        value: String,
        /// What the tokenizer expected instead.
        expected: &'static str,
    },
    /// The assembled matcher failed to compile.
    RegexSyntax {
        /// The pattern whose matcher failed.
        rule: String,
        /// The underlying regex error message.
        source: String,
    },
}

impl std::fmt::Display for BindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoLeadingSlash { rule } => {
                write!(f, "url rule \"{rule}\" must start with a leading slash")
            }
            Self::MalformedPattern { rule } => {
                write!(f, "malformed url rule \"{rule}\"")
            }
            Self::DuplicateVariable { rule, name } => {
                write!(f, "variable name \"{name}\" used twice in rule \"{rule}\"")
            }
            Self::AlreadyBound { rule } => {
                write!(f, "url rule \"{rule}\" is already bound to a map")
            }
            Self::UnknownConverter { name, available } => {
                write!(f, "unknown converter \"{name}\"")?;
                if available.is_empty() {
                    write!(f, " (no converters are registered)")
                } else {
                    write!(f, " (registered: {})", available.join(", "))
                }
            }
            Self::UnknownArgument { key } => {
                write!(f, "unknown converter argument \"{key}\"")
            }
            Self::InvalidArgument {
                key,
                value,
                expected,
            } => {
                write!(
                    f,
                    "invalid value \"{value}\" for converter argument \"{key}\", expected {expected}"
                )
            }
            Self::RegexSyntax { rule, source } => {
                write!(f, "rule \"{rule}\" compiled to an invalid matcher: {source}")
            }
        }
    }
}

impl std::error::Error for BindError {}

/// A converter rejected a captured segment or a supplied value.
///
/// Always recoverable: during dispatch it causes the current rule to be
/// skipped and the next candidate to be tried, never an aborted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationError;

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "value failed converter validation")
    }
}

impl std::error::Error for ValidationError {}

/// Terminal outcomes of [`Map::match_path`].
///
/// Both variants are structured results for the transport layer to act on,
/// not programming errors: `Redirect` must be translated into an actual
/// redirect response, `NotFound` into a 404.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// A folder-like rule matched, but the request is missing its trailing
    /// slash. The payload is the fully qualified destination URL.
    Redirect {
        /// Absolute destination URL, trailing slash included.
        url: String,
    },
    /// No rule matched the path.
    NotFound {
        /// The decoded path that failed to match.
        path: String,
    },
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redirect { url } => write!(f, "redirect to {url}"),
            Self::NotFound { path } => write!(f, "no rule matched \"{path}\""),
        }
    }
}

impl std::error::Error for MatchError {}

/// Terminal outcome of [`Map::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// No rule is registered under the endpoint, or no registered rule both
    /// requires exactly the supplied variable set and builds successfully.
    NotFound {
        /// The endpoint, rendered with `Debug`.
        endpoint: String,
        /// Sorted keys of the supplied values.
        values: Vec<String>,
    },
}

impl std::fmt::Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { endpoint, values } => {
                if values.is_empty() {
                    write!(f, "no rule builds endpoint {endpoint} without arguments")
                } else {
                    write!(
                        f,
                        "no rule builds endpoint {endpoint} with arguments {}",
                        values.join(", ")
                    )
                }
            }
        }
    }
}

impl std::error::Error for BuildError {}
