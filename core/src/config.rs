//! Declarative map construction from serde-deserializable config.
//!
//! Available behind the `config` feature. The shape is format-agnostic;
//! pair it with `serde_json`, `serde_yaml` or any other serde format
//! crate:
//!
//! ```yaml
//! server_name: example.com
//! rules:
//!   - pattern: /
//!     endpoint: index
//!   - pattern: /browse/<int:id>/
//!     endpoint: browse
//!     subdomain: kb
//! ```

use serde::Deserialize;

use crate::{BindError, Map, MapOptions, Rule};

/// A whole route table as declarative data.
#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    pub server_name: String,
    #[serde(default = "default_subdomain")]
    pub default_subdomain: String,
    #[serde(default = "default_scheme")]
    pub url_scheme: String,
    #[serde(default = "default_charset")]
    pub charset: String,
    #[serde(default = "default_strict_slashes")]
    pub strict_slashes: bool,
    pub rules: Vec<RuleConfig>,
}

/// One rule entry. Endpoints are plain strings in config-driven maps.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    pub pattern: String,
    pub endpoint: String,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub strict_slashes: Option<bool>,
}

fn default_subdomain() -> String {
    "www".into()
}

fn default_scheme() -> String {
    "http".into()
}

fn default_charset() -> String {
    "utf-8".into()
}

fn default_strict_slashes() -> bool {
    true
}

impl MapConfig {
    /// Bind every configured rule into a [`Map`].
    ///
    /// # Errors
    ///
    /// The first [`BindError`] of any rule that fails to bind.
    pub fn into_map(self) -> Result<Map<String>, BindError> {
        let options = MapOptions {
            server_name: self.server_name,
            default_subdomain: self.default_subdomain,
            url_scheme: self.url_scheme,
            charset: self.charset,
            strict_slashes: self.strict_slashes,
        };
        let mut map = Map::with_options(options);
        for entry in self.rules {
            let mut rule = Rule::new(entry.pattern, entry.endpoint);
            if let Some(subdomain) = entry.subdomain {
                rule = rule.subdomain(subdomain);
            }
            if let Some(strict) = entry.strict_slashes {
                rule = rule.strict_slashes(strict);
            }
            map.add_rule(rule)?;
        }
        Ok(map)
    }
}
