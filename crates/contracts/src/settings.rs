//! Settings - loosely typed handler / collector configuration
//!
//! Values may be given natively (`interval = 10`) or string-encoded
//! (`interval = "10"`, `collector_blacklist = '["a", "b"]'`). Accessors return
//! `Ok(None)` for a missing key and a validation error for a malformed value,
//! leaving the fallback decision to the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::ContractError;

/// Key/value settings map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(HashMap<String, Value>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Integer value; floats with no fractional part are accepted
    pub fn int(&self, key: &str) -> Result<Option<i64>, ContractError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| malformed(key, "an integer", value))
    }

    /// Floating point value
    pub fn float(&self, key: &str) -> Result<Option<f64>, ContractError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed.map(Some).ok_or_else(|| malformed(key, "a number", value))
    }

    /// String value; numbers and booleans are rendered as text
    pub fn string(&self, key: &str) -> Result<Option<String>, ContractError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(malformed(key, "a string", other)),
        }
    }

    /// List of strings, native or JSON-encoded
    pub fn string_list(&self, key: &str) -> Result<Option<Vec<String>>, ContractError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let decoded = decode_embedded(value);
        let Value::Array(items) = &decoded else {
            return Err(malformed(key, "a list of strings", value));
        };
        items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(malformed(key, "a list of strings", value)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    /// String to string map, native or JSON-encoded
    pub fn string_map(&self, key: &str) -> Result<Option<HashMap<String, String>>, ContractError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let decoded = decode_embedded(value);
        let Value::Object(entries) = &decoded else {
            return Err(malformed(key, "a map of strings", value));
        };
        entries
            .iter()
            .map(|(name, item)| match item {
                Value::String(s) => Ok((name.clone(), s.clone())),
                Value::Number(n) => Ok((name.clone(), n.to_string())),
                _ => Err(malformed(key, "a map of strings", value)),
            })
            .collect::<Result<HashMap<_, _>, _>>()
            .map(Some)
    }
}

impl FromIterator<(String, Value)> for Settings {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Lists and maps may be written as a JSON document inside a string
fn decode_embedded(value: &Value) -> Value {
    match value {
        Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| value.clone()),
        _ => value.clone(),
    }
}

fn malformed(key: &str, expected: &str, value: &Value) -> ContractError {
    ContractError::config_validation(key, format!("expected {expected}, got {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_int_native_and_string() {
        let settings = Settings::new()
            .with("interval", 10)
            .with("max_buffer_size", "250")
            .with("whole_float", 3.0);

        assert_eq!(settings.int("interval").unwrap(), Some(10));
        assert_eq!(settings.int("max_buffer_size").unwrap(), Some(250));
        assert_eq!(settings.int("whole_float").unwrap(), Some(3));
        assert_eq!(settings.int("missing").unwrap(), None);
    }

    #[test]
    fn test_int_malformed() {
        let settings = Settings::new().with("interval", "ten").with("ratio", 1.5);
        assert!(settings.int("interval").is_err());
        assert!(settings.int("ratio").is_err());
    }

    #[test]
    fn test_float() {
        let settings = Settings::new().with("timeout", 2.5).with("as_text", "0.25");
        assert_eq!(settings.float("timeout").unwrap(), Some(2.5));
        assert_eq!(settings.float("as_text").unwrap(), Some(0.25));
        assert!(Settings::new()
            .with("timeout", json!([1]))
            .float("timeout")
            .is_err());
    }

    #[test]
    fn test_string_list_native_and_encoded() {
        let settings = Settings::new()
            .with("native", json!(["TestCollector1", "TestCollector2"]))
            .with("encoded", "[\"TestCollector1\", \"TestCollector2\"]");

        let expected = vec!["TestCollector1".to_string(), "TestCollector2".to_string()];
        assert_eq!(settings.string_list("native").unwrap(), Some(expected.clone()));
        assert_eq!(settings.string_list("encoded").unwrap(), Some(expected));
    }

    #[test]
    fn test_string_list_malformed() {
        let settings = Settings::new()
            .with("not_a_list", "plain")
            .with("mixed", json!(["a", 1]));
        assert!(settings.string_list("not_a_list").is_err());
        assert!(settings.string_list("mixed").is_err());
    }

    #[test]
    fn test_string_map_encoded() {
        let settings = Settings::new().with(
            "default_dimensions",
            "{ \"test\" : \"updated value\", \"runtimeenv\": \"dev\", \"region\":\"uswest1-devc\"}",
        );
        let dims = settings.string_map("default_dimensions").unwrap().unwrap();
        assert_eq!(dims.len(), 3);
        assert_eq!(dims["test"], "updated value");
    }

    #[test]
    fn test_deserialize_from_toml_table() {
        let settings: Settings = toml::from_str(
            r#"
interval = 5
collector_whitelist = ["cpu", "memory"]
[default_dimensions]
env = "prod"
"#,
        )
        .unwrap();

        assert_eq!(settings.int("interval").unwrap(), Some(5));
        assert_eq!(settings.string_list("collector_whitelist").unwrap().unwrap().len(), 2);
        assert_eq!(
            settings.string_map("default_dimensions").unwrap().unwrap()["env"],
            "prod"
        );
    }
}
