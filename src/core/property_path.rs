// src/core/property_path.rs

use crate::constants::PROPERTY_PATH_SEPARATOR;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::fmt;

lazy_static! {
    static ref INDEX_KEY_RE: Regex = Regex::new(r"^\d+$").unwrap();
    static ref PLAIN_KEY_RE: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$-]*$").unwrap();
}

/// Location of a node inside a configuration document, as an ordered list of keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PropertyPath(Vec<String>);

impl PropertyPath {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    /// Splits a flattened path (`provider\0stage`) back into its keys.
    pub fn from_flat(flat: &str) -> Self {
        if flat.is_empty() {
            return Self::default();
        }
        Self::new(flat.split(PROPERTY_PATH_SEPARATOR))
    }

    /// Parses a dotted path such as `provider.stage`. Keys containing dots
    /// cannot be expressed this way; use [`PropertyPath::new`] for those.
    pub fn dotted(path: &str) -> Self {
        if path.is_empty() {
            return Self::default();
        }
        Self::new(path.split('.'))
    }

    pub fn keys(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The single-string form, keys joined by the reserved separator.
    pub fn to_flat(&self) -> String {
        self.0.join(&PROPERTY_PATH_SEPARATOR.to_string())
    }

    /// `true` when `self` equals `prefix` or lies underneath it.
    pub fn is_at_or_under(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Follows the path through nested mappings and sequences.
    pub fn lookup<'v>(&self, document: &'v Value) -> Option<&'v Value> {
        self.0.iter().try_fold(document, |node, key| match node {
            Value::Object(map) => map.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Mutable variant of [`PropertyPath::lookup`].
    pub fn lookup_mut<'v>(&self, document: &'v mut Value) -> Option<&'v mut Value> {
        self.0.iter().try_fold(document, |node, key| match node {
            Value::Object(map) => map.get_mut(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            _ => None,
        })
    }

    /// Human-readable form for messages: `provider.stage`, `functions[0]`,
    /// `custom["my key"]`.
    pub fn humanize(&self) -> String {
        let mut out = String::new();
        for key in &self.0 {
            if INDEX_KEY_RE.is_match(key) {
                out.push_str(&format!("[{}]", key));
            } else if PLAIN_KEY_RE.is_match(key) {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            } else {
                out.push_str(&format!("[\"{}\"]", key.replace('"', "\\\"")));
            }
        }
        out
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.humanize())
    }
}

impl From<&str> for PropertyPath {
    fn from(dotted: &str) -> Self {
        Self::dotted(dotted)
    }
}

/// `true` when the value at `path` is set to anything other than null or `false`.
pub fn is_truthy_at(document: &Value, path: &PropertyPath) -> bool {
    match path.lookup(document) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_round_trip_preserves_dotted_keys() {
        let path = PropertyPath::new(["custom", "a.b", "c"]);
        let flat = path.to_flat();
        assert_eq!(flat, "custom\0a.b\0c");
        assert_eq!(PropertyPath::from_flat(&flat), path);
    }

    #[test]
    fn test_humanize() {
        assert_eq!(PropertyPath::dotted("provider.stage").humanize(), "provider.stage");
        assert_eq!(
            PropertyPath::new(["functions", "0", "handler"]).humanize(),
            "functions[0].handler"
        );
        assert_eq!(
            PropertyPath::new(["custom", "my key"]).humanize(),
            "custom[\"my key\"]"
        );
        assert_eq!(PropertyPath::new(["plugins", "1"]).to_string(), "plugins[1]");
    }

    #[test]
    fn test_is_at_or_under() {
        let plugins = PropertyPath::dotted("plugins");
        assert!(PropertyPath::dotted("plugins").is_at_or_under(&plugins));
        assert!(PropertyPath::new(["plugins", "0"]).is_at_or_under(&plugins));
        assert!(!PropertyPath::dotted("pluginsExtra").is_at_or_under(&plugins));
        assert!(!PropertyPath::dotted("provider").is_at_or_under(&plugins));
    }

    #[test]
    fn test_lookup_through_maps_and_sequences() {
        let document = json!({ "provider": { "name": "aws" }, "plugins": ["a", "b"] });
        assert_eq!(
            PropertyPath::dotted("provider.name").lookup(&document),
            Some(&json!("aws"))
        );
        assert_eq!(
            PropertyPath::new(["plugins", "1"]).lookup(&document),
            Some(&json!("b"))
        );
        assert_eq!(PropertyPath::dotted("provider.stage").lookup(&document), None);
        assert_eq!(PropertyPath::default().lookup(&document), Some(&document));
    }

    #[test]
    fn test_is_truthy_at() {
        let document = json!({ "a": 20210219, "b": false, "c": null, "d": "" });
        assert!(is_truthy_at(&document, &"a".into()));
        assert!(!is_truthy_at(&document, &"b".into()));
        assert!(!is_truthy_at(&document, &"c".into()));
        assert!(!is_truthy_at(&document, &"d".into()));
        assert!(!is_truthy_at(&document, &"missing".into()));
    }
}
