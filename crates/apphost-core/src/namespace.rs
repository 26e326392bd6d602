//! Shared namespace: a tree of JSON values addressed by dotted paths.
//!
//! The host seeds `config` and `plugin.<name>`; plugins may publish any
//! other data. Executable capabilities (calls, hooks, filters, routes) live
//! in their own typed registries, not here.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::AppError;

/// Hierarchical key/value store addressed by dotted paths (`a.b.c`).
///
/// Reading a path that was never written yields `None`, never an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    root: Map<String, Value>,
}

impl Namespace {
    /// Creates an empty namespace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value stored at `path`, if any.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = split(path);
        let mut current = self.root.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Deserializes the value at `path`. Absent paths yield `Ok(None)`.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, AppError> {
        match self.get(path) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Returns the value at `path`, failing when it is absent.
    pub fn require(&self, path: &str) -> Result<&Value, AppError> {
        self.get(path)
            .ok_or_else(|| AppError::not_found(format!("Namespace path '{path}' is not set")))
    }

    /// Returns whether a value is stored at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Stores `value` at `path`, creating intermediate mappings as needed.
    ///
    /// An intermediate segment holding a non-mapping value is replaced by an
    /// empty mapping. An empty path is ignored.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        let segments: Vec<&str> = split(path).collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut current = &mut self.root;
        for segment in parents {
            let slot = current
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            current = match slot {
                Value::Object(map) => map,
                _ => return,
            };
        }

        current.insert((*last).to_string(), value.into());
    }

    /// Returns the child keys of the mapping at `path`.
    ///
    /// An empty path lists the top-level keys.
    pub fn keys(&self, path: &str) -> Vec<String> {
        let map = if split(path).next().is_none() {
            Some(&self.root)
        } else {
            self.get(path).and_then(Value::as_object)
        };
        map.map(|m| m.keys().cloned().collect()).unwrap_or_default()
    }

    /// Returns the whole namespace as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('.').filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_path_reads_none() {
        let ns = Namespace::new();
        assert!(ns.get("config.port").is_none());
        assert!(ns.get("").is_none());
        assert!(!ns.contains("anything"));
    }

    #[test]
    fn test_set_creates_intermediate_mappings() {
        let mut ns = Namespace::new();
        ns.set("config.mysql.host", "localhost");

        assert_eq!(ns.get("config.mysql.host"), Some(&json!("localhost")));
        assert!(ns.get("config.mysql").unwrap().is_object());
        assert_eq!(ns.keys("config"), vec!["mysql".to_string()]);
    }

    #[test]
    fn test_set_replaces_scalar_intermediate() {
        let mut ns = Namespace::new();
        ns.set("locals", 1);
        ns.set("locals.title", "Home");

        assert_eq!(ns.get("locals.title"), Some(&json!("Home")));
    }

    #[test]
    fn test_reading_through_scalar_is_none() {
        let mut ns = Namespace::new();
        ns.set("config.port", 3000);
        assert!(ns.get("config.port.value").is_none());
    }

    #[test]
    fn test_get_as_and_require() {
        let mut ns = Namespace::new();
        ns.set("config.port", 8080);

        let port: Option<u16> = ns.get_as("config.port").unwrap();
        assert_eq!(port, Some(8080));

        let missing: Option<u16> = ns.get_as("config.missing").unwrap();
        assert!(missing.is_none());

        let wrong: Result<Option<String>, _> = ns.get_as("config.port");
        assert!(wrong.is_err());

        assert!(ns.require("config.port").is_ok());
        assert_eq!(
            ns.require("nope").unwrap_err().kind,
            crate::error::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_empty_path_is_ignored() {
        let mut ns = Namespace::new();
        ns.set("", "value");
        ns.set("..", "value");
        assert!(ns.keys("").is_empty());
    }
}
