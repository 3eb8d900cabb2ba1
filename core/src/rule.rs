//! Rules — one URL pattern each.
//!
//! A rule is created standalone, then bound exactly once by the map that
//! owns it. Binding resolves table defaults (subdomain, slash strictness),
//! instantiates one converter per placeholder, compiles the anchored
//! matcher and records the build trace replayed by [`Rule::build`].

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fmt::Write as _;

use regex::Regex;

use crate::convert::{Converter, UrlValues};
use crate::map::MapOptions;
use crate::parse::{parse_pattern, Token};
use crate::registry::ConverterRegistry;
use crate::{BindError, ALL_SUBDOMAINS};

/// Three-way outcome of matching one rule against a combined key.
///
/// `NeedsSlash` is distinct from both success and failure: the rule would
/// match if the request carried its trailing slash, and the map converts it
/// into a redirect instead of trying further rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleMatch {
    /// The rule matched; decoded variables attached.
    Matched(UrlValues),
    /// Folder-like rule with strict slashes, requested without the
    /// trailing slash.
    NeedsSlash,
    /// The rule does not apply; the caller tries the next one.
    NoMatch,
}

/// One replayable build step.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TraceStep {
    Literal(String),
    Variable(String),
}

/// State derived at bind time.
#[derive(Debug)]
struct Compiled {
    is_leaf: bool,
    strict_slashes: bool,
    subdomain: String,
    regex: Regex,
    trace: Vec<TraceStep>,
    converters: HashMap<String, Box<dyn Converter>>,
    arguments: BTreeSet<String>,
}

/// One URL pattern mapped to an opaque endpoint.
///
/// The endpoint type `E` is caller-defined; the engine only clones,
/// compares and debug-renders it.
///
/// # Example
///
/// ```
/// use routemap::Rule;
///
/// let rule = Rule::new("/browse/<int:id>/", "kb/browse")
///     .subdomain("kb")
///     .strict_slashes(true);
/// assert_eq!(rule.pattern(), "/browse/<int:id>/");
/// ```
pub struct Rule<E> {
    pattern: String,
    endpoint: E,
    subdomain: Option<String>,
    strict_slashes: Option<bool>,
    compiled: Option<Compiled>,
}

impl<E> Rule<E> {
    /// Create an unbound rule. The pattern must start with `/`; a trailing
    /// `/` marks the rule as folder-like (non-leaf). Validation happens at
    /// bind time, when the rule is added to a map.
    #[must_use]
    pub fn new(pattern: impl Into<String>, endpoint: E) -> Self {
        Self {
            pattern: pattern.into(),
            endpoint,
            subdomain: None,
            strict_slashes: None,
            compiled: None,
        }
    }

    /// Scope the rule to a subdomain; [`ALL_SUBDOMAINS`] matches any.
    /// Unset rules inherit the map's default subdomain.
    #[must_use]
    pub fn subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    /// Override the map-wide strict-slashes default for this rule.
    #[must_use]
    pub fn strict_slashes(mut self, strict: bool) -> Self {
        self.strict_slashes = Some(strict);
        self
    }

    /// The raw pattern text.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The endpoint this rule maps to.
    #[must_use]
    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// Whether the rule has been bound to a map.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.compiled.is_some()
    }

    /// The variable names this rule requires, sorted. Empty before binding.
    #[must_use]
    pub fn arguments(&self) -> Vec<&str> {
        match &self.compiled {
            Some(c) => c.arguments.iter().map(String::as_str).collect(),
            None => Vec::new(),
        }
    }

    /// Resolve defaults and compile the pattern into the anchored matcher
    /// and the build trace. Called exactly once, by
    /// [`Map::add_rule`](crate::Map::add_rule).
    pub(crate) fn bind(
        &mut self,
        options: &MapOptions,
        registry: &ConverterRegistry,
    ) -> Result<(), BindError> {
        if self.compiled.is_some() {
            return Err(BindError::AlreadyBound {
                rule: self.pattern.clone(),
            });
        }
        if !self.pattern.starts_with('/') {
            return Err(BindError::NoLeadingSlash {
                rule: self.pattern.clone(),
            });
        }

        let is_leaf = !self.pattern.ends_with('/');
        let body = self.pattern.trim_end_matches('/');
        let strict_slashes = self.strict_slashes.unwrap_or(options.strict_slashes);
        let subdomain = self
            .subdomain
            .clone()
            .unwrap_or_else(|| options.default_subdomain.clone());

        let mut pattern = String::from("^<");
        if subdomain == ALL_SUBDOMAINS {
            pattern.push_str("[^>]*");
        } else {
            pattern.push_str(&regex::escape(&subdomain));
        }
        pattern.push('>');

        let mut trace = Vec::new();
        let mut converters: HashMap<String, Box<dyn Converter>> = HashMap::new();
        let mut arguments = BTreeSet::new();
        for token in parse_pattern(body)? {
            match token {
                Token::Literal(text) => {
                    pattern.push_str(&regex::escape(&text));
                    trace.push(TraceStep::Literal(text));
                }
                Token::Variable {
                    converter,
                    args,
                    name,
                } => {
                    let instance = registry.instantiate(&converter, args.as_deref())?;
                    let _ = write!(pattern, "(?P<{name}>{})", instance.pattern_fragment());
                    converters.insert(name.clone(), instance);
                    arguments.insert(name.clone());
                    trace.push(TraceStep::Variable(name));
                }
            }
        }
        if !is_leaf {
            trace.push(TraceStep::Literal("/".into()));
            pattern.push_str("(?P<__suffix__>/?)");
        }
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| BindError::RegexSyntax {
            rule: self.pattern.clone(),
            source: e.to_string(),
        })?;

        self.compiled = Some(Compiled {
            is_leaf,
            strict_slashes,
            subdomain,
            regex,
            trace,
            converters,
            arguments,
        });
        Ok(())
    }

    /// Match this rule against a combined key of the form
    /// `"<subdomain>/path"`, as assembled by the map.
    ///
    /// Unbound rules never match.
    #[must_use]
    pub fn match_key(&self, key: &str) -> RuleMatch {
        let Some(c) = &self.compiled else {
            return RuleMatch::NoMatch;
        };
        let Some(caps) = c.regex.captures(key) else {
            return RuleMatch::NoMatch;
        };

        // Folder-like part of the url without a trailing slash, with strict
        // slashes enabled: tell the map to redirect instead of matching.
        if c.strict_slashes
            && !c.is_leaf
            && caps.name("__suffix__").map_or(true, |m| m.as_str().is_empty())
        {
            return RuleMatch::NeedsSlash;
        }

        let mut values = UrlValues::with_capacity(c.arguments.len());
        for name in &c.arguments {
            let (Some(segment), Some(converter)) = (caps.name(name), c.converters.get(name))
            else {
                return RuleMatch::NoMatch;
            };
            match converter.parse(segment.as_str()) {
                Ok(value) => {
                    values.insert(name.clone(), value);
                }
                Err(_) => return RuleMatch::NoMatch,
            }
        }
        RuleMatch::Matched(values)
    }

    /// Assemble the relative path for this rule by replaying the build
    /// trace. Returns `None` when a value is missing or a converter rejects
    /// it; the map then tries the next candidate.
    #[must_use]
    pub fn build(&self, values: &UrlValues) -> Option<String> {
        let c = self.compiled.as_ref()?;
        let mut out = String::new();
        for step in &c.trace {
            match step {
                TraceStep::Literal(text) => out.push_str(text),
                TraceStep::Variable(name) => {
                    let value = values.get(name)?;
                    let converter = c.converters.get(name)?;
                    out.push_str(&converter.format(value).ok()?);
                }
            }
        }
        Some(out)
    }

    /// Specificity score: the number of required variables, with wildcard
    /// subdomain rules pushed below every subdomain-scoped rule.
    pub(crate) fn specificity(&self) -> i64 {
        match &self.compiled {
            Some(c) => {
                let score = c.arguments.len() as i64;
                if c.subdomain == ALL_SUBDOMAINS {
                    score - i64::MAX
                } else {
                    score
                }
            }
            None => 0,
        }
    }

    /// The subdomain resolved at bind time.
    pub(crate) fn bound_subdomain(&self) -> Option<&str> {
        self.compiled.as_ref().map(|c| c.subdomain.as_str())
    }

    /// Whether the supplied value keys are exactly this rule's required
    /// variable set.
    pub(crate) fn matches_argument_set(&self, values: &UrlValues) -> bool {
        match &self.compiled {
            Some(c) => {
                c.arguments.len() == values.len()
                    && values.keys().all(|key| c.arguments.contains(key.as_str()))
            }
            None => false,
        }
    }
}

impl<E> fmt::Display for Rule<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

impl<E: fmt::Debug> fmt::Debug for Rule<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(c) = &self.compiled else {
            return write!(f, "<Rule {} (unbound)>", self.pattern);
        };
        let mut rendered = String::new();
        for step in &c.trace {
            match step {
                TraceStep::Literal(text) => rendered.push_str(text),
                TraceStep::Variable(name) => {
                    let _ = write!(rendered, "<{name}>");
                }
            }
        }
        write!(f, "<Rule {rendered} -> {:?}>", self.endpoint)
    }
}
