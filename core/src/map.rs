//! Map — the route table.
//!
//! Owns the bound rules, keeps them stable-sorted most-specific-first and
//! drives dispatch in both directions. Rules may only be added, never
//! removed or mutated; `add_rule` takes `&mut self` while `match_path` and
//! `build` take `&self`, so a frozen map is safe for concurrent reads.

use std::borrow::Borrow;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use log::debug;

use crate::convert::UrlValues;
use crate::registry::{ConverterRegistry, FromArgs};
use crate::rule::{Rule, RuleMatch};
use crate::{BindError, BuildError, MatchError};

/// Map-wide defaults inherited by rules at bind time and used to compose
/// absolute URLs.
#[derive(Debug, Clone)]
pub struct MapOptions {
    /// Hostname of the server excluding subdomains but with the TLD.
    /// Internationalized names must be supplied in punycode.
    pub server_name: String,
    /// Subdomain assumed for rules and requests that do not name one.
    pub default_subdomain: String,
    /// URL scheme, e.g. `"http"` or `"https"`.
    pub url_scheme: String,
    /// Charset of the URL text. Informational: the engine always produces
    /// UTF-8.
    pub charset: String,
    /// Whether folder-like rules redirect requests missing their trailing
    /// slash. Rules may override per-rule.
    pub strict_slashes: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            server_name: String::new(),
            default_subdomain: "www".into(),
            url_scheme: "http".into(),
            charset: "utf-8".into(),
            strict_slashes: true,
        }
    }
}

/// The route table: a collection of bound rules with bidirectional
/// dispatch.
///
/// See the [crate docs](crate) for a full example.
pub struct Map<E> {
    options: MapOptions,
    converters: ConverterRegistry,
    /// All rules, stable-sorted by descending specificity. Registration
    /// order is the tie-break.
    rules: Vec<Arc<Rule<E>>>,
    /// Rules per endpoint, in registration order.
    by_endpoint: HashMap<E, Vec<Arc<Rule<E>>>>,
}

impl<E> Map<E>
where
    E: Clone + Eq + Hash + fmt::Debug,
{
    /// Create a map from an initial rule list, binding every rule.
    ///
    /// # Errors
    ///
    /// The first [`BindError`] of any rule that fails to bind.
    pub fn new(rules: Vec<Rule<E>>, options: MapOptions) -> Result<Self, BindError> {
        let mut map = Self::with_options(options);
        for rule in rules {
            map.add_rule(rule)?;
        }
        Ok(map)
    }

    /// An empty map with the built-in converters registered.
    #[must_use]
    pub fn with_options(options: MapOptions) -> Self {
        Self {
            options,
            converters: ConverterRegistry::default(),
            rules: Vec::new(),
            by_endpoint: HashMap::new(),
        }
    }

    /// The map-wide defaults.
    #[must_use]
    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the map has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Register converter `C` under `name` for rules bound after this
    /// call. Re-registering replaces the factory; rules bound earlier keep
    /// the converter instances they captured.
    pub fn register_converter<C: FromArgs>(&mut self, name: impl Into<String>) {
        self.converters.register::<C>(name);
    }

    /// Bind `rule` and insert it into the dispatch order.
    ///
    /// The rule list is re-sorted (stably, by descending specificity) after
    /// every addition, so the map is always ready for dispatch.
    ///
    /// # Errors
    ///
    /// Any [`BindError`] from parsing or compiling the rule, including
    /// [`BindError::AlreadyBound`] for a rule bound elsewhere.
    pub fn add_rule(&mut self, mut rule: Rule<E>) -> Result<(), BindError> {
        rule.bind(&self.options, &self.converters)?;
        debug!("bound {rule:?} with specificity {}", rule.specificity());
        let rule = Arc::new(rule);
        self.by_endpoint
            .entry(rule.endpoint().clone())
            .or_default()
            .push(Arc::clone(&rule));
        self.rules.push(rule);
        self.rules.sort_by_key(|rule| Reverse(rule.specificity()));
        Ok(())
    }

    /// Match a request path against the rules, most specific first.
    ///
    /// `path_info` is raw request bytes; invalid UTF-8 sequences are
    /// dropped, not fatal. `subdomain` defaults to the map's default
    /// subdomain, `script_name` is normalized to end with `/`.
    ///
    /// # Errors
    ///
    /// - [`MatchError::Redirect`] when a folder-like rule with strict
    ///   slashes matched a request missing its trailing slash. The payload
    ///   is the absolute destination URL.
    /// - [`MatchError::NotFound`] when no rule matched.
    pub fn match_path(
        &self,
        path_info: impl AsRef<[u8]>,
        script_name: &str,
        subdomain: Option<&str>,
    ) -> Result<(E, UrlValues), MatchError> {
        let path = decode_dropping_invalid(path_info.as_ref());
        let subdomain = subdomain.unwrap_or(&self.options.default_subdomain);
        let script_name = normalize_script_name(script_name);
        let key = format!("<{subdomain}>/{}", path.trim_start_matches('/'));

        for rule in &self.rules {
            match rule.match_key(&key) {
                RuleMatch::Matched(values) => {
                    debug!("\"{path}\" matched {rule:?}");
                    return Ok((rule.endpoint().clone(), values));
                }
                RuleMatch::NeedsSlash => {
                    let url = format!(
                        "{}://{}{}{}/{}/",
                        self.options.url_scheme,
                        host_prefix(subdomain),
                        self.options.server_name,
                        strip_trailing_slash(&script_name),
                        path.trim_start_matches('/'),
                    );
                    debug!("\"{path}\" redirects to {url}");
                    return Err(MatchError::Redirect { url });
                }
                RuleMatch::NoMatch => {}
            }
        }
        Err(MatchError::NotFound { path })
    }

    /// Build a URL for `endpoint` from exactly the values its rule
    /// requires.
    ///
    /// Candidates registered under the endpoint are scanned in registration
    /// order; the first whose required variable set equals the key set of
    /// `values` and whose converters accept every value wins. The result is
    /// script-relative when the selected rule lives on the requested
    /// subdomain and `force_external` is false, absolute otherwise.
    ///
    /// # Errors
    ///
    /// [`BuildError::NotFound`] when no rule is registered under the
    /// endpoint, or none satisfies the variable set and builds.
    pub fn build<Q>(
        &self,
        endpoint: &Q,
        values: &UrlValues,
        script_name: &str,
        subdomain: Option<&str>,
        force_external: bool,
    ) -> Result<String, BuildError>
    where
        E: Borrow<Q>,
        Q: Eq + Hash + fmt::Debug + ?Sized,
    {
        let subdomain = subdomain.unwrap_or(&self.options.default_subdomain);
        let script_name = normalize_script_name(script_name);

        let not_found = || {
            let mut keys: Vec<String> = values.keys().cloned().collect();
            keys.sort();
            BuildError::NotFound {
                endpoint: format!("{endpoint:?}"),
                values: keys,
            }
        };

        let Some(candidates) = self.by_endpoint.get(endpoint) else {
            return Err(not_found());
        };

        for rule in candidates {
            if !rule.matches_argument_set(values) {
                continue;
            }
            let Some(rel) = rule.build(values) else {
                continue;
            };
            let rule_subdomain = rule.bound_subdomain().unwrap_or("");
            let url = if !force_external && rule_subdomain == subdomain {
                format!("{script_name}{}", rel.trim_start_matches('/'))
            } else {
                format!(
                    "{}://{}{}{}/{}",
                    self.options.url_scheme,
                    host_prefix(rule_subdomain),
                    self.options.server_name,
                    strip_trailing_slash(&script_name),
                    rel.trim_start_matches('/'),
                )
            };
            debug!("built {url} from {rule:?}");
            return Ok(url);
        }
        Err(not_found())
    }
}

impl<E: fmt::Debug> fmt::Debug for Map<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Map")
            .field("options", &self.options)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

fn normalize_script_name(script_name: &str) -> String {
    if script_name.ends_with('/') {
        script_name.to_owned()
    } else {
        format!("{script_name}/")
    }
}

fn strip_trailing_slash(script_name: &str) -> &str {
    script_name.strip_suffix('/').unwrap_or(script_name)
}

fn host_prefix(subdomain: &str) -> String {
    if subdomain.is_empty() {
        String::new()
    } else {
        format!("{subdomain}.")
    }
}

/// Decode request bytes as UTF-8, dropping invalid sequences.
fn decode_dropping_invalid(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(text) => {
                out.push_str(text);
                return out;
            }
            Err(err) => {
                if let Ok(valid) = std::str::from_utf8(&bytes[..err.valid_up_to()]) {
                    out.push_str(valid);
                }
                match err.error_len() {
                    Some(skip) => bytes = &bytes[err.valid_up_to() + skip..],
                    None => return out,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{UrlValue, ValidationError};

    fn example_map() -> Map<&'static str> {
        let mut options = MapOptions::default();
        options.server_name = "example.com".into();
        Map::new(
            vec![
                Rule::new("/", "index"),
                Rule::new("/browse/<int:id>", "browse"),
            ],
            options,
        )
        .unwrap()
    }

    #[test]
    fn more_specific_rules_are_tried_first() {
        let mut map = example_map();
        // Registered later, but two variables outrank one.
        map.add_rule(Rule::new("/browse/<int:id>", "late")).unwrap();
        map.add_rule(Rule::new("/<section>/<int:id>", "generic"))
            .unwrap();
        let (endpoint, _) = map.match_path("/browse/7", "/", None).unwrap();
        assert_eq!(endpoint, "generic");
    }

    #[test]
    fn invalid_utf8_is_dropped_not_fatal() {
        let map = example_map();
        let (endpoint, values) = map.match_path(b"/browse/4\xff2", "/", None).unwrap();
        assert_eq!(endpoint, "browse");
        assert_eq!(values["id"], UrlValue::Int(42));
    }

    #[test]
    fn decode_keeps_text_after_invalid_sequences() {
        assert_eq!(decode_dropping_invalid(b"caf\xc3\xa9"), "café");
        assert_eq!(decode_dropping_invalid(b"a\xffb\xfe"), "ab");
        assert_eq!(decode_dropping_invalid(b"tail\xc3"), "tail");
    }

    #[test]
    fn script_name_is_normalized() {
        let map = example_map();
        let mut values = UrlValues::new();
        values.insert("id".into(), UrlValue::Int(3));
        assert_eq!(
            map.build("browse", &values, "/app", None, false).unwrap(),
            "/app/browse/3"
        );
    }

    #[test]
    fn custom_converters_apply_to_later_rules() {
        #[derive(Debug)]
        struct UpperConverter;

        impl crate::Converter for UpperConverter {
            fn pattern_fragment(&self) -> &str {
                "[a-z]+"
            }
            fn parse(&self, text: &str) -> Result<UrlValue, ValidationError> {
                Ok(UrlValue::Text(text.to_uppercase()))
            }
            fn format(&self, value: &UrlValue) -> Result<String, ValidationError> {
                Ok(value.to_string().to_lowercase())
            }
        }

        impl FromArgs for UpperConverter {
            fn from_args(_args: Option<&str>) -> Result<Self, BindError> {
                Ok(UpperConverter)
            }
        }

        let mut map = example_map();
        map.register_converter::<UpperConverter>("upper");
        map.add_rule(Rule::new("/shout/<upper:word>", "shout")).unwrap();
        let (_, values) = map.match_path("/shout/hey", "/", None).unwrap();
        assert_eq!(values["word"], UrlValue::Text("HEY".into()));
    }

    #[test]
    fn unknown_converter_in_rule_is_fatal() {
        let mut map = example_map();
        let err = map.add_rule(Rule::new("/x/<uuid:id>", "x")).unwrap_err();
        assert!(matches!(err, BindError::UnknownConverter { .. }));
    }
}
