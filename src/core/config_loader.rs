//! # Config Loader
//!
//! Locates and reads the service configuration into a `serde_json::Value`
//! tree, whatever format it was written in. Resolution of the variables it
//! contains happens later, in the orchestrator.

use crate::core::paths::{self, PathError};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("Could not read configuration file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot parse \"{file}\": {message}")]
    Syntax { file: String, message: String },
}

/// A configuration file as read from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfiguration {
    pub path: PathBuf,
    pub document: Value,
}

/// Reads and parses the file at `path`. The root must be a mapping.
pub fn read_configuration(path: &Path) -> Result<Value, ConfigError> {
    let file = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let syntax = |message: String| ConfigError::Syntax {
        file: file.clone(),
        message,
    };

    let document: Value = match paths::config_extension(path).as_deref() {
        Some("yml" | "yaml") => {
            if content.trim().is_empty() {
                Value::Null
            } else {
                serde_yaml::from_str(&content).map_err(|e| syntax(e.to_string()))?
            }
        }
        Some("json") => serde_json::from_str(&content).map_err(|e| syntax(e.to_string()))?,
        Some("toml") => toml::from_str(&content).map_err(|e| syntax(e.to_string()))?,
        _ => return Err(syntax("unsupported file extension".to_string())),
    };

    if !document.is_object() {
        return Err(syntax("content must be an object".to_string()));
    }
    log::debug!("Loaded configuration from '{}'", path.display());
    Ok(document)
}

/// Locates the service configuration and reads it.
///
/// A syntax error does not stop a help request: the configuration is then
/// treated as absent so help can still be rendered.
pub fn load_service_configuration(
    cwd: &Path,
    explicit_path: Option<&str>,
    is_help_request: bool,
) -> Result<Option<LoadedConfiguration>, ConfigError> {
    let Some(path) = paths::locate_service_config(cwd, explicit_path)? else {
        return Ok(None);
    };

    match read_configuration(&path) {
        Ok(document) => Ok(Some(LoadedConfiguration { path, document })),
        Err(ConfigError::Syntax { file, message }) if is_help_request => {
            log::warn!(
                "Ignoring unparsable configuration '{}' for help: {}",
                file,
                message
            );
            Ok(None)
        }
        Err(error) => Err(error),
    }
}
