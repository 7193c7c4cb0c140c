//! Model catalogs.
//!
//! A catalog turns a model name into a [`Model`]. Names may carry inline
//! options after the first `?`, encoded like a URL query string:
//!
//! ```text
//! gpt-4o?temperature=0.7&max_tokens=1000&stream=true
//! ```
//!
//! Option values are typed from their literal form: `true`/`false` become
//! booleans, integer literals become integers, other numeric literals become
//! floats, and everything else stays a string.
//!
//! # Implementations
//!
//! | Catalog | Unknown names |
//! |---------|---------------|
//! | [`StaticModelCatalog`] | rejected with [`CatalogError::UnknownModel`] |
//! | [`FallbackModelCatalog`] | accepted with every capability (gateways, routers) |
//! | [`RemoteModelCatalog`] | rejected; the table is fetched lazily on first access |

mod remote;
mod static_catalog;

pub use remote::{CatalogFetcher, HttpCatalogFetcher, RemoteModelCatalog};
pub use static_catalog::{FallbackModelCatalog, StaticModelCatalog};

use crate::capability::Capability;
use crate::error::{CatalogError, ModelError};
use crate::model::{GENERIC_FAMILY, Model};
use crate::options::Options;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Resolves model names to [`Model`] instances.
#[async_trait]
pub trait ModelCatalog: Send + Sync + 'static {
    /// Returns the model for `name`, with inline options parsed into
    /// [`Model::options`].
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownModel`] if no entry matches and the
    /// catalog does not accept arbitrary names.
    async fn model(&self, name: &str) -> Result<Model, CatalogError>;

    /// Returns the known entries, keyed by name pattern.
    async fn models(&self) -> Result<Vec<(String, CatalogEntry)>, CatalogError>;
}

/// A catalog row: the family a model belongs to and what it can do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Model family used by transports and converters to recognise the model.
    #[serde(default = "default_family")]
    pub family: String,
    /// Advertised capabilities.
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

fn default_family() -> String {
    GENERIC_FAMILY.to_string()
}

impl CatalogEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(family: impl Into<String>, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            family: family.into(),
            capabilities: capabilities.into_iter().collect(),
        }
    }

    /// Builds a model from this entry.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyName`] if `name` is empty.
    pub fn to_model(&self, name: &str, options: Options) -> Result<Model, ModelError> {
        Ok(Model::new(name, self.capabilities.iter().copied())?
            .with_family(self.family.clone())
            .with_options(options))
    }
}

/// Splits a model name into its base name and inline options.
///
/// # Errors
///
/// Returns [`ModelError::EmptyName`] if the base name is empty, or
/// [`ModelError::InvalidOption`] if an option has an empty key.
///
/// # Example
///
/// ```
/// use lodestar_models::catalog::parse_model_name;
///
/// let (name, options) = parse_model_name("gpt-4o?temperature=0.7&max_tokens=1000").unwrap();
/// assert_eq!(name, "gpt-4o");
/// assert_eq!(options.get("temperature").and_then(|v| v.as_f64()), Some(0.7));
/// assert_eq!(options.get("max_tokens").and_then(|v| v.as_i64()), Some(1000));
/// ```
pub fn parse_model_name(name: &str) -> Result<(String, Options), ModelError> {
    let (base, query) = match name.split_once('?') {
        Some((base, query)) => (base.trim(), Some(query)),
        None => (name.trim(), None),
    };

    if base.is_empty() {
        return Err(ModelError::EmptyName);
    }

    let mut options = Options::new();
    if let Some(query) = query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            if key.is_empty() {
                return Err(ModelError::InvalidOption {
                    name: name.to_string(),
                    key: key.into_owned(),
                });
            }
            options.insert(key.into_owned(), infer_literal(&value));
        }
    }

    Ok((base.to_string(), options))
}

/// Types an option literal.
fn infer_literal(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Ok(int) = raw.parse::<i64>() {
        return Value::Number(int.into());
    }

    // Only plain numeric literals; "inf"/"NaN" stay strings.
    let numeric = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    if numeric
        && let Ok(float) = raw.parse::<f64>()
        && let Some(number) = Number::from_f64(float)
    {
        return Value::Number(number);
    }

    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn literals_are_typed() {
        assert_eq!(infer_literal("true"), json!(true));
        assert_eq!(infer_literal("false"), json!(false));
        assert_eq!(infer_literal("42"), json!(42));
        assert_eq!(infer_literal("-3"), json!(-3));
        assert_eq!(infer_literal("0.5"), json!(0.5));
        assert_eq!(infer_literal("1e3"), json!(1000.0));
        assert_eq!(infer_literal("auto"), json!("auto"));
        assert_eq!(infer_literal("NaN"), json!("NaN"));
        assert_eq!(infer_literal(""), json!(""));
    }

    #[test]
    fn name_without_query_has_no_options() {
        let (name, options) = parse_model_name("claude-3-haiku").unwrap();
        assert_eq!(name, "claude-3-haiku");
        assert!(options.is_empty());
    }

    #[test]
    fn only_first_question_mark_splits() {
        let (name, options) = parse_model_name("m?q=what?").unwrap();
        assert_eq!(name, "m");
        assert_eq!(options.get("q"), Some(&json!("what?")));
    }

    #[test]
    fn percent_encoded_values_are_decoded() {
        let (_, options) = parse_model_name("m?stop=%0A%0A&user=a%20b").unwrap();
        assert_eq!(options.get("stop"), Some(&json!("\n\n")));
        assert_eq!(options.get("user"), Some(&json!("a b")));
    }

    #[test]
    fn empty_base_name_is_rejected() {
        assert!(matches!(parse_model_name("?temperature=1"), Err(ModelError::EmptyName)));
        assert!(matches!(parse_model_name("  "), Err(ModelError::EmptyName)));
    }

    #[test]
    fn empty_option_key_is_rejected() {
        assert!(matches!(
            parse_model_name("m?=1"),
            Err(ModelError::InvalidOption { .. })
        ));
    }
}
