// src/core/command_registry.rs

use crate::models::{CommandSchema, OptionDef};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error parsing TOML command registry '{path}': {source}")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Error parsing JSON command registry '{path}': {source}")]
    JsonParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported command registry format for '{path}' (expected .toml or .json).")]
    UnsupportedFormat { path: String },
}

type RegistryResult<T> = Result<T, RegistryError>;

/// All known commands keyed by their space-joined name (e.g. `"deploy function"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandSchema>,
}

impl CommandRegistry {
    /// An empty registry. Useful for tools that declare every command themselves.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in command surface of the deployment tool.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (name, schema) in builtin_commands() {
            registry.insert(name, schema);
        }
        registry
    }

    pub fn insert(&mut self, name: impl Into<String>, schema: CommandSchema) {
        self.commands.insert(name.into(), schema);
    }

    pub fn get(&self, name: &str) -> Option<&CommandSchema> {
        self.commands.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands shown in general help, in name order.
    pub fn visible(&self) -> impl Iterator<Item = (&str, &CommandSchema)> {
        self.commands
            .iter()
            .filter(|(_, schema)| !schema.is_hidden)
            .map(|(name, schema)| (name.as_str(), schema))
    }

    /// Merges entries over the existing ones; later definitions win.
    pub fn extend(&mut self, other: Self) {
        self.commands.extend(other.commands);
    }

    pub fn from_toml_str(content: &str, origin: &str) -> RegistryResult<Self> {
        let commands = toml::from_str(content).map_err(|source| RegistryError::TomlParse {
            path: origin.to_string(),
            source,
        })?;
        Ok(Self { commands })
    }

    pub fn from_json_str(content: &str, origin: &str) -> RegistryResult<Self> {
        let commands =
            serde_json::from_str(content).map_err(|source| RegistryError::JsonParse {
                path: origin.to_string(),
                source,
            })?;
        Ok(Self { commands })
    }

    /// Loads a registry file, picking the format from its extension.
    pub fn load_file(path: &Path) -> RegistryResult<Self> {
        let origin = path.display().to_string();
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content, &origin),
            Some("json") => Self::from_json_str(&content, &origin),
            _ => Err(RegistryError::UnsupportedFormat { path: origin }),
        }
    }
}

// --- BUILT-IN COMMANDS ---

/// Options every service command accepts.
fn common_service_options() -> BTreeMap<String, OptionDef> {
    let mut options = BTreeMap::new();
    options.insert(
        "help".into(),
        OptionDef::boolean()
            .with_shortcut("h")
            .with_usage("Show this message"),
    );
    options.insert(
        "version".into(),
        OptionDef::boolean()
            .with_shortcut("v")
            .with_usage("Show version info"),
    );
    options.insert(
        "verbose".into(),
        OptionDef::boolean().with_usage("Show verbose logs"),
    );
    options.insert(
        "config".into(),
        OptionDef::string()
            .with_shortcut("c")
            .with_usage("Path to the service configuration file"),
    );
    options.insert(
        "stage".into(),
        OptionDef::string()
            .with_shortcut("s")
            .with_usage("Stage of the service"),
    );
    options.insert(
        "region".into(),
        OptionDef::string()
            .with_shortcut("r")
            .with_usage("Region of the service"),
    );
    options.insert(
        "aws-profile".into(),
        OptionDef::string().with_usage("Credentials profile to use"),
    );
    options.insert("app".into(), OptionDef::string().with_usage("Dashboard app"));
    options.insert("org".into(), OptionDef::string().with_usage("Dashboard org"));
    options.insert(
        "use-local-credentials".into(),
        OptionDef::boolean().with_usage("Rely on locally resolved credentials"),
    );
    options
}

/// Options of commands that do not need a service (help and version only).
fn standalone_options() -> BTreeMap<String, OptionDef> {
    common_service_options()
        .into_iter()
        .filter(|(name, _)| name == "help" || name == "version")
        .collect()
}

fn service_command(usage: &str, extra: &[(&str, OptionDef)]) -> CommandSchema {
    let mut options = common_service_options();
    options.extend(extra.iter().map(|(name, def)| (name.to_string(), def.clone())));
    CommandSchema {
        usage: Some(usage.to_string()),
        options,
        service_dependency_mode: true,
        ..Default::default()
    }
}

fn standalone_command(usage: &str, extra: &[(&str, OptionDef)]) -> CommandSchema {
    let mut options = standalone_options();
    options.extend(extra.iter().map(|(name, def)| (name.to_string(), def.clone())));
    CommandSchema {
        usage: Some(usage.to_string()),
        options,
        ..Default::default()
    }
}

fn builtin_commands() -> Vec<(&'static str, CommandSchema)> {
    let function = || {
        OptionDef::string()
            .with_shortcut("f")
            .with_usage("Function name")
    };
    let data = || {
        OptionDef::string()
            .with_shortcut("d")
            .with_usage("Input data")
    };
    let path = || {
        OptionDef::string()
            .with_shortcut("p")
            .with_usage("Path to a JSON or YAML input file")
    };

    let mut studio = standalone_command("Develop a service interactively", &[]);
    studio.is_hidden = true;
    studio.no_support_notice =
        Some("the interactive studio was discontinued, use the web dashboard instead".to_string());

    vec![
        (
            "config credentials",
            standalone_command(
                "Configure provider credentials",
                &[
                    (
                        "provider",
                        OptionDef::string()
                            .with_shortcut("p")
                            .with_usage("Name of the provider"),
                    ),
                    (
                        "key",
                        OptionDef::string()
                            .with_shortcut("k")
                            .with_usage("Access key"),
                    ),
                    ("secret", OptionDef::string().with_usage("Secret key")),
                    (
                        "profile",
                        OptionDef::string()
                            .with_shortcut("n")
                            .with_usage("Name of the profile"),
                    ),
                    (
                        "overwrite",
                        OptionDef::boolean()
                            .with_shortcut("o")
                            .with_usage("Overwrite existing profile"),
                    ),
                ],
            ),
        ),
        (
            "create",
            standalone_command(
                "Create a new service",
                &[
                    (
                        "template",
                        OptionDef::string()
                            .with_shortcut("t")
                            .with_usage("Template for the service"),
                    ),
                    (
                        "template-url",
                        OptionDef::string()
                            .with_shortcut("u")
                            .with_usage("Template URL"),
                    ),
                    ("template-path", OptionDef::string().with_usage("Template local path")),
                    (
                        "path",
                        OptionDef::string()
                            .with_shortcut("p")
                            .with_usage("Target directory"),
                    ),
                    (
                        "name",
                        OptionDef::string()
                            .with_shortcut("n")
                            .with_usage("Name of the service"),
                    ),
                ],
            ),
        ),
        (
            "install",
            standalone_command(
                "Install a service from a repository",
                &[
                    (
                        "url",
                        OptionDef::string()
                            .with_shortcut("u")
                            .with_usage("URL of the service"),
                    ),
                    (
                        "name",
                        OptionDef::string()
                            .with_shortcut("n")
                            .with_usage("Name of the service"),
                    ),
                ],
            ),
        ),
        (
            "deploy",
            service_command(
                "Deploy a service",
                &[
                    (
                        "conceal",
                        OptionDef::boolean()
                            .with_usage("Hide secrets from the output"),
                    ),
                    (
                        "package",
                        OptionDef::string()
                            .with_shortcut("p")
                            .with_usage("Path of a deployment package"),
                    ),
                    (
                        "force",
                        OptionDef::boolean()
                            .with_usage("Forces a deployment to take place"),
                    ),
                    (
                        "enforce-hash-update",
                        OptionDef::boolean()
                            .with_usage("Enforce new function version"),
                    ),
                ],
            ),
        ),
        (
            "deploy function",
            service_command(
                "Deploy a single function from the service",
                &[
                    ("function", function()),
                    (
                        "force",
                        OptionDef::boolean()
                            .with_usage("Forces a deployment to take place"),
                    ),
                    (
                        "update-config",
                        OptionDef::boolean()
                            .with_shortcut("u")
                            .with_usage("Update function configuration only"),
                    ),
                ],
            ),
        ),
        ("deploy list", service_command("List deployed versions", &[])),
        (
            "deploy list functions",
            service_command("List all the deployed functions and their versions", &[]),
        ),
        (
            "info",
            service_command(
                "Display information about the service",
                &[(
                    "conceal",
                    OptionDef::boolean()
                        .with_usage("Hide secrets from the output"),
                )],
            ),
        ),
        (
            "invoke",
            service_command(
                "Invoke a deployed function",
                &[
                    ("function", function()),
                    (
                        "qualifier",
                        OptionDef::string()
                            .with_shortcut("q")
                            .with_usage("Version or alias"),
                    ),
                    ("path", path()),
                    (
                        "type",
                        OptionDef::string()
                            .with_shortcut("t")
                            .with_usage("Type of invocation"),
                    ),
                    (
                        "log",
                        OptionDef::boolean()
                            .with_shortcut("l")
                            .with_usage("Trigger logging data output"),
                    ),
                    ("data", data()),
                    ("raw", OptionDef::boolean().with_usage("Pass data as a raw string")),
                    ("context", OptionDef::string().with_usage("Input context")),
                ],
            ),
        ),
        (
            "invoke local",
            service_command(
                "Invoke a function locally",
                &[
                    ("function", function()),
                    ("path", path()),
                    ("data", data()),
                    ("raw", OptionDef::boolean().with_usage("Pass data as a raw string")),
                    ("context", OptionDef::string().with_usage("Input context")),
                    (
                        "env",
                        OptionDef::multiple()
                            .with_shortcut("e")
                            .with_usage("Override environment variables, e.g. -e VAR1=val1"),
                    ),
                    ("docker", OptionDef::boolean().with_usage("Invoke inside a container")),
                    (
                        "docker-arg",
                        OptionDef::multiple()
                            .with_usage("Arguments passed to the container run"),
                    ),
                ],
            ),
        ),
        (
            "logs",
            service_command(
                "Output the logs of a deployed function",
                &[
                    ("function", function()),
                    (
                        "tail",
                        OptionDef::boolean()
                            .with_shortcut("t")
                            .with_usage("Tail the log output"),
                    ),
                    (
                        "startTime",
                        OptionDef::string()
                            .with_usage("Logs before this time are not displayed"),
                    ),
                    ("filter", OptionDef::string().with_usage("A filter pattern")),
                    (
                        "interval",
                        OptionDef::string()
                            .with_shortcut("i")
                            .with_usage("Tail polling interval in milliseconds"),
                    ),
                ],
            ),
        ),
        (
            "metrics",
            service_command(
                "Show metrics for a specific function",
                &[
                    ("function", function()),
                    (
                        "startTime",
                        OptionDef::string()
                            .with_usage("Start time for the metrics retrieval"),
                    ),
                    (
                        "endTime",
                        OptionDef::string()
                            .with_usage("End time for the metrics retrieval"),
                    ),
                ],
            ),
        ),
        (
            "package",
            service_command(
                "Package a service for deployment",
                &[(
                    "package",
                    OptionDef::string()
                        .with_shortcut("p")
                        .with_usage("Output path for the package"),
                )],
            ),
        ),
        (
            "print",
            service_command(
                "Print the configuration with all variables resolved",
                &[
                    (
                        "format",
                        OptionDef::string()
                            .with_usage("Print configuration in given format"),
                    ),
                    (
                        "path",
                        OptionDef::string()
                            .with_usage("Optional period-separated path to print"),
                    ),
                    (
                        "transform",
                        OptionDef::string()
                            .with_usage("Optional transform-function to apply"),
                    ),
                ],
            ),
        ),
        ("remove", service_command("Remove the deployed service", &[])),
        (
            "rollback",
            service_command(
                "Rollback the service to a specific deployment",
                &[(
                    "timestamp",
                    OptionDef::string()
                        .with_shortcut("t")
                        .with_usage("Timestamp of the deployment"),
                )],
            ),
        ),
        (
            "rollback function",
            service_command(
                "Rollback the function to a specific version",
                &[
                    ("function", function()),
                    ("function-version", OptionDef::string().with_usage("Version of the function")),
                ],
            ),
        ),
        (
            "plugin install",
            service_command(
                "Install and add a plugin to the service",
                &[(
                    "name",
                    OptionDef::string()
                        .with_shortcut("n")
                        .with_usage("The plugin name"),
                )],
            ),
        ),
        (
            "plugin uninstall",
            service_command(
                "Uninstall and remove a plugin from the service",
                &[(
                    "name",
                    OptionDef::string()
                        .with_shortcut("n")
                        .with_usage("The plugin name"),
                )],
            ),
        ),
        ("plugin list", standalone_command("List all available plugins", &[])),
        (
            "plugin search",
            standalone_command(
                "Search for plugins",
                &[(
                    "query",
                    OptionDef::string()
                        .with_shortcut("q")
                        .with_usage("Search query"),
                )],
            ),
        ),
        ("login", standalone_command("Log in to the dashboard", &[])),
        ("logout", standalone_command("Log out of the dashboard", &[])),
        ("studio", studio),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OptionKind;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_builtin_registry_contents() {
        let registry = CommandRegistry::builtin();

        let deploy = registry.get("deploy").unwrap();
        assert!(deploy.service_dependency_mode);
        assert_eq!(deploy.options["force"].kind, OptionKind::Boolean);
        assert_eq!(deploy.options["config"].shortcut.as_deref(), Some("c"));

        let deploy_function = registry.get("deploy function").unwrap();
        assert_eq!(
            deploy_function.options["function"].shortcut.as_deref(),
            Some("f")
        );

        let credentials = registry.get("config credentials").unwrap();
        assert!(!credentials.service_dependency_mode);
        assert!(credentials.options.contains_key("help"));
        assert!(!credentials.options.contains_key("stage"));
    }

    #[test]
    fn test_hidden_commands_are_not_visible() {
        let registry = CommandRegistry::builtin();
        assert!(registry.contains("studio"));
        assert!(registry.visible().all(|(name, _)| name != "studio"));
        assert!(registry.visible().any(|(name, _)| name == "deploy"));
    }

    #[test]
    fn test_from_toml_and_extend() {
        let content = r#"
            ["offline start"]
            usage = "Simulate the platform locally"
            serviceDependencyMode = true

            ["offline start".options.port]
            type = "string"
            shortcut = "P"

            ["offline start".options.noTimeout]
            type = "boolean"
        "#;
        let extra = CommandRegistry::from_toml_str(content, "plugins.toml").unwrap();
        let mut registry = CommandRegistry::builtin();
        let before = registry.len();
        registry.extend(extra);

        assert_eq!(registry.len(), before + 1);
        let offline = registry.get("offline start").unwrap();
        assert!(offline.service_dependency_mode);
        assert_eq!(offline.options["port"].shortcut.as_deref(), Some("P"));
        assert_eq!(offline.options["noTimeout"].kind, OptionKind::Boolean);
    }

    #[test]
    fn test_load_json_file() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{ "hello": { "options": { "name": { "type": "string" } } } }"#)
            .unwrap();
        file.flush().unwrap();

        let registry = CommandRegistry::load_file(file.path()).unwrap();
        assert!(registry.contains("hello"));
        assert!(!registry.get("hello").unwrap().service_dependency_mode);
    }

    #[test]
    fn test_load_unsupported_extension() {
        let file = Builder::new().suffix(".ini").tempfile().unwrap();
        let result = CommandRegistry::load_file(file.path());
        assert!(matches!(result, Err(RegistryError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_invalid_json_reports_origin() {
        let result = CommandRegistry::from_json_str("{ not json", "inline");
        let message = result.unwrap_err().to_string();
        assert!(message.contains("inline"));
    }
}
