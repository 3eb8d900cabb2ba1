//! Converter registry: name → type-erased factory.
//!
//! Each converter type registers through [`FromArgs`]. At registration time
//! the concrete type is monomorphized into a closure and erased behind
//! `Arc<dyn Fn>`: early type erasure at registration, late invocation at
//! rule bind time.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::convert::{Converter, IntConverter, StringConverter};
use crate::BindError;

/// Type-erased converter constructor: raw argument string in, boxed
/// converter out.
pub type ConverterFactory =
    Arc<dyn Fn(Option<&str>) -> Result<Box<dyn Converter>, BindError> + Send + Sync>;

/// Converter types constructible from a pattern's argument string.
///
/// # Example
///
/// ```
/// use routemap::{BindError, Converter, ConverterRegistry, FromArgs, UrlValue, ValidationError};
///
/// #[derive(Debug)]
/// struct AnyConverter;
///
/// impl Converter for AnyConverter {
///     fn pattern_fragment(&self) -> &str { "[^/]+" }
///     fn parse(&self, text: &str) -> Result<UrlValue, ValidationError> {
///         Ok(UrlValue::Text(text.to_owned()))
///     }
///     fn format(&self, value: &UrlValue) -> Result<String, ValidationError> {
///         Ok(value.to_string())
///     }
/// }
///
/// impl FromArgs for AnyConverter {
///     fn from_args(_args: Option<&str>) -> Result<Self, BindError> {
///         Ok(AnyConverter)
///     }
/// }
///
/// let mut registry = ConverterRegistry::default();
/// registry.register::<AnyConverter>("any");
/// assert!(registry.contains("any"));
/// ```
pub trait FromArgs: Converter + Sized + 'static {
    /// Construct the converter from the raw argument string of one
    /// placeholder, `None` when the placeholder had no parentheses.
    ///
    /// # Errors
    ///
    /// [`BindError::UnknownArgument`] / [`BindError::InvalidArgument`] for
    /// argument strings the converter does not accept.
    fn from_args(args: Option<&str>) -> Result<Self, BindError>;
}

/// Mapping from converter name to factory.
///
/// The default registry carries the built-ins `default`, `string` and
/// `int`. Additional names may be registered before any rule using them is
/// bound; re-registering an existing name is allowed and the last writer
/// wins, but rules bound earlier keep the instances they captured.
#[derive(Clone)]
pub struct ConverterRegistry {
    factories: HashMap<String, ConverterFactory>,
}

impl ConverterRegistry {
    /// An empty registry without the built-in converters.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register `C` under `name`, replacing any previous registration.
    pub fn register<C: FromArgs>(&mut self, name: impl Into<String>) {
        self.factories.insert(
            name.into(),
            Arc::new(|args| C::from_args(args).map(|conv| Box::new(conv) as Box<dyn Converter>)),
        );
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered converter names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Construct a converter instance for one placeholder.
    ///
    /// # Errors
    ///
    /// [`BindError::UnknownConverter`] if `name` is not registered, or the
    /// factory's own argument errors.
    pub fn instantiate(
        &self,
        name: &str,
        args: Option<&str>,
    ) -> Result<Box<dyn Converter>, BindError> {
        match self.factories.get(name) {
            Some(factory) => factory(args),
            None => Err(BindError::UnknownConverter {
                name: name.to_owned(),
                available: self.names(),
            }),
        }
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register::<StringConverter>("default");
        registry.register::<StringConverter>("string");
        registry.register::<IntConverter>("int");
        registry
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{UrlValue, ValidationError};

    #[derive(Debug)]
    struct HexConverter;

    impl Converter for HexConverter {
        fn pattern_fragment(&self) -> &str {
            "[0-9a-f]+"
        }

        fn parse(&self, text: &str) -> Result<UrlValue, ValidationError> {
            i64::from_str_radix(text, 16)
                .map(UrlValue::Int)
                .map_err(|_| ValidationError)
        }

        fn format(&self, value: &UrlValue) -> Result<String, ValidationError> {
            match value {
                UrlValue::Int(v) => Ok(format!("{v:x}")),
                UrlValue::Text(_) => Err(ValidationError),
            }
        }
    }

    impl FromArgs for HexConverter {
        fn from_args(_args: Option<&str>) -> Result<Self, BindError> {
            Ok(HexConverter)
        }
    }

    #[test]
    fn builtins_registered_by_default() {
        let registry = ConverterRegistry::default();
        assert_eq!(registry.names(), vec!["default", "int", "string"]);
    }

    #[test]
    fn instantiate_passes_arguments_through() {
        let registry = ConverterRegistry::default();
        let conv = registry.instantiate("int", Some("min=3")).unwrap();
        assert_eq!(conv.parse("2"), Err(ValidationError));
        assert_eq!(conv.parse("3"), Ok(UrlValue::Int(3)));
    }

    #[test]
    fn unknown_name_lists_registered() {
        let registry = ConverterRegistry::default();
        assert_eq!(
            registry.instantiate("uuid", None).unwrap_err(),
            BindError::UnknownConverter {
                name: "uuid".into(),
                available: vec!["default".into(), "int".into(), "string".into()],
            }
        );
    }

    #[test]
    fn custom_converter_roundtrip() {
        let mut registry = ConverterRegistry::default();
        registry.register::<HexConverter>("hex");
        let conv = registry.instantiate("hex", None).unwrap();
        assert_eq!(conv.parse("2a"), Ok(UrlValue::Int(42)));
        assert_eq!(conv.format(&UrlValue::Int(42)), Ok("2a".into()));
    }

    #[test]
    fn reregistration_last_writer_wins() {
        let mut registry = ConverterRegistry::default();
        registry.register::<HexConverter>("int");
        let conv = registry.instantiate("int", None).unwrap();
        assert_eq!(conv.parse("ff"), Ok(UrlValue::Int(255)));
    }
}
