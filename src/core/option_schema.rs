// src/core/option_schema.rs

use crate::models::{CommandSchema, OptionKind};
use std::collections::{BTreeMap, BTreeSet};

/// Arity table the argument parser works from: which names are boolean,
/// string or repeatable, and which shortcuts map to which canonical names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionSchema {
    pub boolean: BTreeSet<String>,
    pub string: BTreeSet<String>,
    pub multiple: BTreeSet<String>,
    pub alias: BTreeMap<String, String>,
}

impl OptionSchema {
    /// The schema used before any command is known. It only recognizes the
    /// global options that are safe to interpret without a command.
    pub fn base() -> Self {
        let mut schema = Self::default();
        for name in ["help", "help-interactive", "use-local-credentials", "v", "version"] {
            schema.boolean.insert(name.to_string());
        }
        for name in ["app", "config", "org", "stage"] {
            schema.string.insert(name.to_string());
        }
        schema.alias.insert("c".to_string(), "config".to_string());
        schema.alias.insert("h".to_string(), "help".to_string());
        schema
    }

    /// Derives the schema for a specific command from its declared options.
    pub fn for_command(command: &CommandSchema) -> Self {
        let mut schema = Self::default();
        for (name, def) in &command.options {
            let bucket = match def.kind {
                OptionKind::Boolean => &mut schema.boolean,
                OptionKind::Multiple => &mut schema.multiple,
                OptionKind::String => &mut schema.string,
            };
            bucket.insert(name.clone());
            if let Some(shortcut) = &def.shortcut {
                schema.alias.insert(shortcut.clone(), name.clone());
            }
        }
        schema
    }

    /// Translates a shortcut to its canonical name; other names pass through.
    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.alias.get(name).map_or(name, String::as_str)
    }

    /// The declared arity of a canonical option name, if the schema knows it.
    pub fn kind_of(&self, name: &str) -> Option<OptionKind> {
        if self.boolean.contains(name) {
            Some(OptionKind::Boolean)
        } else if self.multiple.contains(name) {
            Some(OptionKind::Multiple)
        } else if self.string.contains(name) {
            Some(OptionKind::String)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OptionDef;

    #[test]
    fn test_base_schema_knows_global_options() {
        let schema = OptionSchema::base();
        assert_eq!(schema.kind_of("help"), Some(OptionKind::Boolean));
        assert_eq!(schema.kind_of("v"), Some(OptionKind::Boolean));
        assert_eq!(schema.kind_of("stage"), Some(OptionKind::String));
        assert_eq!(schema.canonical("c"), "config");
        assert_eq!(schema.canonical("h"), "help");
        // `-v` is deliberately not an alias of `version` in the base schema.
        assert_eq!(schema.canonical("v"), "v");
        assert_eq!(schema.kind_of("force"), None);
    }

    #[test]
    fn test_command_schema_buckets_and_shortcuts() {
        let mut command = CommandSchema::default();
        command
            .options
            .insert("force".into(), OptionDef::boolean());
        command
            .options
            .insert("function".into(), OptionDef::string().with_shortcut("f"));
        command
            .options
            .insert("env".into(), OptionDef::multiple().with_shortcut("e"));

        let schema = OptionSchema::for_command(&command);
        assert_eq!(schema.kind_of("force"), Some(OptionKind::Boolean));
        assert_eq!(schema.kind_of("function"), Some(OptionKind::String));
        assert_eq!(schema.kind_of("env"), Some(OptionKind::Multiple));
        assert_eq!(schema.canonical("f"), "function");
        assert_eq!(schema.canonical("e"), "env");
    }
}
