// src/core/paths.rs

use crate::constants::{SERVICE_CONFIG_BASENAME, SERVICE_CONFIG_EXTENSIONS};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Cannot parse \"--config\": File '{path}' not found.")]
    ConfigNotFound { path: String },
    #[error(
        "Cannot parse \"--config\": '{path}' has no supported extension (expected one of: {expected})."
    )]
    UnsupportedExtension { path: String, expected: String },
    #[error("Could not resolve path '{path}': {source}")]
    Canonicalize {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Turns the raw `--config` value into an absolute path.
///
/// `~` is expanded to the home directory and relative paths are taken from
/// `cwd`. The file must exist and carry one of the supported extensions.
pub fn expand_config_path(raw: &str, cwd: &Path) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::tilde(raw);
    let candidate = cwd.join(&*expanded);

    if !has_supported_extension(&candidate) {
        return Err(PathError::UnsupportedExtension {
            path: raw.to_string(),
            expected: SERVICE_CONFIG_EXTENSIONS.join(", "),
        });
    }
    if !candidate.is_file() {
        return Err(PathError::ConfigNotFound {
            path: candidate.display().to_string(),
        });
    }
    canonicalize(&candidate)
}

/// Finds the service configuration for this invocation.
///
/// An explicit `--config` wins. Otherwise the first existing
/// `service.{yml,yaml,json,toml}` in `cwd` is used. `None` means the command
/// runs without a service.
pub fn locate_service_config(
    cwd: &Path,
    explicit: Option<&str>,
) -> Result<Option<PathBuf>, PathError> {
    if let Some(raw) = explicit {
        return expand_config_path(raw, cwd).map(Some);
    }

    for extension in SERVICE_CONFIG_EXTENSIONS {
        let candidate = cwd.join(format!("{}.{}", SERVICE_CONFIG_BASENAME, extension));
        if candidate.is_file() {
            log::debug!("Found service configuration at '{}'", candidate.display());
            return canonicalize(&candidate).map(Some);
        }
    }
    log::debug!("No service configuration found in '{}'", cwd.display());
    Ok(None)
}

/// The lowercase extension of `path`, if it is one we can parse.
pub fn config_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .filter(|ext| SERVICE_CONFIG_EXTENSIONS.contains(&ext.as_str()))
}

fn has_supported_extension(path: &Path) -> bool {
    config_extension(path).is_some()
}

fn canonicalize(path: &Path) -> Result<PathBuf, PathError> {
    // `dunce` keeps Windows paths free of the `\\?\` prefix.
    dunce::canonicalize(path).map_err(|source| PathError::Canonicalize {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_locate_prefers_yml_over_json() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("service.json"), "{}").unwrap();
        fs::write(dir.path().join("service.yml"), "service: app").unwrap();

        let found = locate_service_config(dir.path(), None).unwrap().unwrap();
        assert_eq!(found.file_name().unwrap(), "service.yml");
    }

    #[test]
    fn test_locate_without_config_is_none() {
        let dir = tempdir().unwrap();
        assert!(locate_service_config(dir.path(), None).unwrap().is_none());
    }

    #[test]
    fn test_explicit_config_relative_to_cwd() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/custom.yaml"), "service: app").unwrap();

        let found = locate_service_config(dir.path(), Some("nested/custom.yaml"))
            .unwrap()
            .unwrap();
        assert!(found.is_absolute());
        assert_eq!(found.file_name().unwrap(), "custom.yaml");
    }

    #[test]
    fn test_explicit_config_errors() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            expand_config_path("missing.yml", dir.path()),
            Err(PathError::ConfigNotFound { .. })
        ));

        fs::write(dir.path().join("service.ini"), "").unwrap();
        assert!(matches!(
            expand_config_path("service.ini", dir.path()),
            Err(PathError::UnsupportedExtension { .. })
        ));
    }

    #[test]
    fn test_config_extension_is_case_insensitive() {
        assert_eq!(config_extension(Path::new("a/Service.YML")), Some("yml".to_string()));
        assert_eq!(config_extension(Path::new("a/service.ini")), None);
        assert_eq!(config_extension(Path::new("a/service")), None);
    }
}
