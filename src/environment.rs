use std::collections::HashMap;

/// Read-only, string-keyed property source consulted during resolution.
///
/// Supplies the exclusion-list property and feature-flag overrides. The
/// environment is built by the host before resolution starts and passed
/// explicitly; resolution never reads ambient process state.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    properties: HashMap<String, String>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a property value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Set a property value (builder style).
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Get a raw property value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Get a boolean flag, falling back to `default` when the property is
    /// absent or not a recognizable boolean.
    pub fn get_flag(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => true,
                "false" | "no" | "off" | "0" => false,
                _ => default,
            },
            None => default,
        }
    }

    /// Get a comma-separated list property. Entries are trimmed; empty
    /// entries are dropped. An absent property yields an empty list.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(String::from)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Number of properties set.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Check if the environment has no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            properties: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
