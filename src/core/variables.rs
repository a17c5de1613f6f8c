// src/core/variables.rs

use crate::core::property_path::PropertyPath;
use std::collections::BTreeMap;

/// Resolution state of a property that still holds a variable expression.
/// Fully resolved properties have no entry at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableStatus {
    /// Not resolved yet; `expression` is the raw value still in the document.
    Pending { expression: String },
    /// Resolution was attempted and failed.
    Errored { expression: String, error: String },
}

impl VariableStatus {
    pub fn pending(expression: impl Into<String>) -> Self {
        Self::Pending {
            expression: expression.into(),
        }
    }

    pub fn expression(&self) -> &str {
        match self {
            Self::Pending { expression } | Self::Errored { expression, .. } => expression,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Pending { .. } => None,
            Self::Errored { error, .. } => Some(error),
        }
    }
}

/// Bookkeeping of every property path still gated behind variables.
///
/// Empty means the document is fully resolved within the requested scope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VariablesMeta {
    entries: BTreeMap<PropertyPath, VariableStatus>,
}

impl VariablesMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: PropertyPath, status: VariableStatus) {
        self.entries.insert(path, status);
    }

    /// Drops the entry once its leaf holds a literal value.
    pub fn mark_resolved(&mut self, path: &PropertyPath) -> Option<VariableStatus> {
        self.entries.remove(path)
    }

    /// Attaches an error to a tracked path, keeping its expression.
    pub fn mark_errored(&mut self, path: &PropertyPath, error: impl Into<String>) {
        if let Some(status) = self.entries.get_mut(path) {
            *status = VariableStatus::Errored {
                expression: status.expression().to_string(),
                error: error.into(),
            };
        }
    }

    pub fn get(&self, path: &PropertyPath) -> Option<&VariableStatus> {
        self.entries.get(path)
    }

    pub fn has(&self, path: &PropertyPath) -> bool {
        self.entries.contains_key(path)
    }

    /// `true` if any tracked path equals `prefix` or lies underneath it.
    pub fn has_at_or_under(&self, prefix: &PropertyPath) -> bool {
        self.paths().any(|path| path.is_at_or_under(prefix))
    }

    /// The first tracked path at or under `prefix`, in path order.
    pub fn first_at_or_under(&self, prefix: &PropertyPath) -> Option<&PropertyPath> {
        self.paths().find(|path| path.is_at_or_under(prefix))
    }

    pub fn paths(&self) -> impl Iterator<Item = &PropertyPath> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PropertyPath, &VariableStatus)> {
        self.entries.iter()
    }

    /// Paths whose resolution failed, with their error messages.
    pub fn errors(&self) -> impl Iterator<Item = (&PropertyPath, &str)> {
        self.entries
            .iter()
            .filter_map(|(path, status)| status.error().map(|error| (path, error)))
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Forgets every attached error, returning those paths to pending.
    pub fn discard_errors(&mut self) {
        for status in self.entries.values_mut() {
            if let VariableStatus::Errored { expression, .. } = status {
                *status = VariableStatus::Pending {
                    expression: std::mem::take(expression),
                };
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(PropertyPath, VariableStatus)> for VariablesMeta {
    fn from_iter<T: IntoIterator<Item = (PropertyPath, VariableStatus)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> VariablesMeta {
        [
            ("provider.stage", "${opt:stage}"),
            ("plugins.0", "${self:custom.plugin}"),
            ("custom.table", "${env:TABLE}"),
        ]
        .into_iter()
        .map(|(path, expr)| (PropertyPath::dotted(path), VariableStatus::pending(expr)))
        .collect()
    }

    #[test]
    fn test_resolve_removes_entry() {
        let mut meta = meta();
        assert_eq!(meta.len(), 3);
        meta.mark_resolved(&"provider.stage".into());
        assert!(!meta.has(&"provider.stage".into()));
        assert_eq!(meta.len(), 2);
    }

    #[test]
    fn test_prefix_queries() {
        let meta = meta();
        assert!(meta.has_at_or_under(&"plugins".into()));
        assert_eq!(
            meta.first_at_or_under(&"plugins".into()),
            Some(&PropertyPath::dotted("plugins.0"))
        );
        assert!(!meta.has_at_or_under(&"functions".into()));
    }

    #[test]
    fn test_errors_and_discard() {
        let mut meta = meta();
        assert!(!meta.has_errors());

        meta.mark_errored(&"custom.table".into(), "Missing environment variable");
        assert!(meta.has_errors());
        let errors: Vec<_> = meta.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].1, "Missing environment variable");

        meta.discard_errors();
        assert!(!meta.has_errors());
        assert_eq!(
            meta.get(&"custom.table".into()),
            Some(&VariableStatus::pending("${env:TABLE}"))
        );
    }

    #[test]
    fn test_mark_errored_ignores_untracked_paths() {
        let mut meta = meta();
        meta.mark_errored(&"unknown".into(), "boom");
        assert!(!meta.has_errors());
        assert_eq!(meta.len(), 3);
    }
}
