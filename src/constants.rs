// src/constants.rs

/// Separator used when a property path is flattened into a single string.
/// It can never appear inside a configuration key.
pub const PROPERTY_PATH_SEPARATOR: char = '\0';

/// Upper bound on command-schema re-resolution rounds before the input is
/// considered ambiguous.
pub const MAX_SCHEMA_RESOLUTION_ROUNDS: usize = 8;

/// Base name of the service configuration file looked up in the service directory.
pub const SERVICE_CONFIG_BASENAME: &str = "service";

/// Extensions tried, in order, when looking up the service configuration file.
pub const SERVICE_CONFIG_EXTENSIONS: &[&str] = &["yml", "yaml", "json", "toml"];

/// Top-level key opting the document into strict (new resolver) behavior.
pub const RESOLUTION_MODE_KEY: &str = "variablesResolutionMode";

/// Environment variable listing deprecation codes to silence (`*` silences all).
pub const DEPRECATION_DISABLE_ENV: &str = "PREFLIGHT_DEPRECATION_DISABLE";

/// Environment variable pointing at an extra command registry file.
pub const COMMANDS_PATH_ENV: &str = "PREFLIGHT_COMMANDS_PATH";

// --- Deprecation codes ---

/// Global options were passed before the command name.
pub const DEPRECATION_OPTIONS_BEFORE_COMMAND: &str = "CLI_OPTIONS_BEFORE_COMMAND";

/// The legacy variables resolver or a tolerated unresolved critical property was used.
pub const DEPRECATION_NEW_VARIABLES_RESOLVER: &str = "NEW_VARIABLES_RESOLVER";

/// Unresolved variables reported later in the run. Marked as triggered when the
/// stage deprecation already covered it.
pub const DEPRECATION_VARIABLES_ERROR_ON_UNRESOLVED: &str = "VARIABLES_ERROR_ON_UNRESOLVED";
