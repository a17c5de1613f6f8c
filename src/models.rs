// src/models.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// --- COMMAND SCHEMA MODELS (registry entries, loadable from TOML/JSON) ---

/// Arity of a command-line option.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    /// A flag that never consumes the following token.
    Boolean,
    /// A repeatable option; every occurrence appends a value.
    Multiple,
    /// An option taking a single value.
    #[default]
    String,
}

/// Declaration of one option accepted by a command.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct OptionDef {
    #[serde(rename = "type", default)]
    pub kind: OptionKind,
    /// Single-character alias, e.g. `f` for `--function`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
}

impl OptionDef {
    pub fn boolean() -> Self {
        Self {
            kind: OptionKind::Boolean,
            ..Default::default()
        }
    }

    pub fn string() -> Self {
        Self::default()
    }

    pub fn multiple() -> Self {
        Self {
            kind: OptionKind::Multiple,
            ..Default::default()
        }
    }

    pub fn with_shortcut(mut self, shortcut: &str) -> Self {
        self.shortcut = Some(shortcut.to_string());
        self
    }

    pub fn with_usage(mut self, usage: &str) -> Self {
        self.usage = Some(usage.to_string());
        self
    }
}

/// A command registry entry: the options a command accepts plus its flags.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommandSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, OptionDef>,
    /// Hidden commands are omitted from general help.
    #[serde(default)]
    pub is_hidden: bool,
    /// When set on a hidden command, running it fails with this notice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_support_notice: Option<String>,
    /// Whether the command needs the service configuration loaded.
    #[serde(default)]
    pub service_dependency_mode: bool,
}

// --- PARSED INPUT MODELS ---

/// The value of a single parsed option.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    String(String),
    Multiple(Vec<String>),
}

impl OptionValue {
    /// Truthiness as the CLI understands it: `false`, `""` and `[]` are unset.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::String(value) => !value.is_empty(),
            Self::Multiple(values) => !values.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }
}

/// Options parsed from the raw tokens, plus the leftover positional words.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedOptions {
    pub options: BTreeMap<String, OptionValue>,
    /// Positional tokens in order; these are the candidate command words.
    pub positionals: Vec<String>,
}

impl ParsedOptions {
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(OptionValue::as_str)
    }

    /// Returns `true` when the option is present and truthy.
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some_and(OptionValue::is_truthy)
    }

    pub fn set(&mut self, name: impl Into<String>, value: OptionValue) {
        self.options.insert(name.into(), value);
    }

    /// The positional words joined with single spaces.
    pub fn command(&self) -> String {
        self.positionals.join(" ")
    }
}

/// Final result of command and argument resolution. Computed once per process.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedInvocation {
    /// The command words, e.g. `["deploy", "function"]`.
    pub commands: Vec<String>,
    pub options: BTreeMap<String, OptionValue>,
    pub is_help_request: bool,
}

impl ResolvedInvocation {
    pub fn command(&self) -> String {
        self.commands.join(" ")
    }

    /// The options as a [`ParsedOptions`] value, positionals included.
    pub fn parsed_options(&self) -> ParsedOptions {
        ParsedOptions {
            options: self.options.clone(),
            positionals: self.commands.clone(),
        }
    }

    pub fn is_version_request(&self) -> bool {
        self.options
            .get("version")
            .is_some_and(OptionValue::is_truthy)
    }
}
