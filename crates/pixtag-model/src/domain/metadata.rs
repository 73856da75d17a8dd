use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata record attached to a stored image.
///
/// Keys are dynamic: the tagger owns `predictions`, `predictionN` and `predictionN_percentage`,
/// every other key belongs to whoever wrote it and must survive a tagging run untouched.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(pub BTreeMap<String, Value>);

impl Metadata {
    /// Create an empty record.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns `true` if no keys are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Insert or overwrite a key.
    ///
    /// Returns `self` for chaining.
    pub fn insert<K, V>(&mut self, key: K, val: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.0.insert(key.into(), val.into());
        self
    }

    /// Get the value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Iterate through all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge a fragment into this record.
    ///
    /// Keys present in `fragment` overwrite identically named keys; all other keys pass through unchanged.
    /// Nested values are replaced as a whole, never merged recursively.
    ///
    /// # Examples
    /// ```
    /// use pixtag_model::Metadata;
    ///
    /// let mut current = Metadata::new();
    /// current.insert("owner", "alice").insert("prediction1", "tabby");
    ///
    /// let mut fragment = Metadata::new();
    /// fragment.insert("prediction1", "chihuahua");
    ///
    /// let merged = current.merged(&fragment);
    /// assert_eq!(merged.get("owner").unwrap(), "alice");
    /// assert_eq!(merged.get("prediction1").unwrap(), "chihuahua");
    /// ```
    pub fn merged(&self, fragment: &Metadata) -> Metadata {
        let mut out = self.0.clone();
        out.extend(fragment.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Metadata(out)
    }

    /// Convert into a JSON object.
    pub fn into_json(self) -> Value {
        Value::Object(self.0.into_iter().collect())
    }
}

impl From<Map<String, Value>> for Metadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map.into_iter().collect())
    }
}
