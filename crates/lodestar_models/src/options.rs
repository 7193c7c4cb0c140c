//! Invocation options.

use crate::tool::Tool;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An ordered map of invocation options.
///
/// Keys are free-form so provider-specific settings pass through untouched.
/// The keys the runtime itself understands have constants and typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(Map<String, Value>);

impl Options {
    /// Requests a streamed result (`bool`).
    pub const STREAM: &'static str = "stream";
    /// Tool descriptors offered to the model.
    pub const TOOLS: &'static str = "tools";
    /// Structured output constraint (a JSON schema or a provider envelope).
    pub const RESPONSE_FORMAT: &'static str = "response_format";
    /// Enables response caching under this key (non-empty string).
    pub const PROMPT_CACHE_KEY: &'static str = "prompt_cache_key";
    /// Provider task selector, forwarded as-is.
    pub const TASK: &'static str = "task";

    /// Creates an empty option map.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Inserts an option, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Removes an option, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    /// Returns an option by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns whether an option is set.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the number of options.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether no options are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the options in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the options, returning the underlying JSON object.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Returns these options layered over `base`.
    ///
    /// Keys present in `self` win; keys only present in `base` are kept.
    #[must_use]
    pub fn merged_over(&self, base: &Options) -> Options {
        let mut merged = base.0.clone();
        for (key, value) in &self.0 {
            merged.insert(key.clone(), value.clone());
        }
        Self(merged)
    }

    /// Returns whether a streamed result was requested.
    #[must_use]
    pub fn stream(&self) -> bool {
        self.get(Self::STREAM)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Returns the prompt cache key if it is a non-empty string.
    #[must_use]
    pub fn prompt_cache_key(&self) -> Option<&str> {
        self.get(Self::PROMPT_CACHE_KEY)
            .and_then(Value::as_str)
            .filter(|key| !key.is_empty())
    }

    /// Returns the structured output constraint, if any.
    #[must_use]
    pub fn response_format(&self) -> Option<&Value> {
        self.get(Self::RESPONSE_FORMAT)
    }

    /// Returns the provider task selector, if any.
    #[must_use]
    pub fn task(&self) -> Option<&str> {
        self.get(Self::TASK).and_then(Value::as_str)
    }

    /// Stores tool descriptors under [`Options::TOOLS`].
    ///
    /// # Errors
    ///
    /// Returns an error if a tool cannot be serialized.
    pub fn set_tools(&mut self, tools: &[Tool]) -> Result<(), serde_json::Error> {
        self.0
            .insert(Self::TOOLS.to_string(), serde_json::to_value(tools)?);
        Ok(())
    }

    /// Decodes the tool descriptors stored under [`Options::TOOLS`].
    ///
    /// # Errors
    ///
    /// Returns an error if the stored value is not a list of tool descriptors.
    pub fn tools(&self) -> Result<Option<Vec<Tool>>, serde_json::Error> {
        self.get(Self::TOOLS)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
    }
}

impl From<Map<String, Value>> for Options {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl IntoIterator for Options {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
