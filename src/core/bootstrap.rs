// src/core/bootstrap.rs

//! The pipeline that runs before any command: resolve the invocation, load
//! the service configuration the command depends on, and resolve the
//! variables in it far enough for the command (or its help) to proceed.

use crate::core::config_loader::{self, ConfigError};
use crate::core::deprecation::DeprecationLogger;
use crate::core::input_resolver::{InputError, InputResolver};
use crate::core::orchestrator::{
    Collaborators, ResolutionError, ResolutionOutcome, VariableOrchestrator,
};
use crate::models::ResolvedInvocation;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("Cannot run `{command}` command: {notice}")]
    CommandNotSupported { command: String, notice: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

/// Everything a command needs to start running.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Invocation {
    /// Unique id of this process run.
    pub id: Uuid,
    #[serde(flatten)]
    pub input: ResolvedInvocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,
    /// `true` only when every variable in `configuration` was resolved.
    pub is_configuration_resolved: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BootstrapOutcome {
    /// `--version` was requested; nothing else was done.
    Version,
    Ready(Box<Invocation>),
}

/// Drives one process run from raw input to a ready [`Invocation`].
#[derive(Debug)]
pub struct Bootstrap<'a> {
    resolver: &'a InputResolver<'a>,
    deprecations: &'a DeprecationLogger,
    cwd: PathBuf,
    collaborators: Option<Collaborators<'a>>,
}

impl<'a> Bootstrap<'a> {
    pub fn new(
        resolver: &'a InputResolver<'a>,
        deprecations: &'a DeprecationLogger,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self {
            resolver,
            deprecations,
            cwd: cwd.into(),
            collaborators: None,
        }
    }

    /// Enables variable resolution. Without collaborators the configuration
    /// is read but reported as unresolved.
    pub fn with_resolution(mut self, collaborators: Collaborators<'a>) -> Self {
        self.collaborators = Some(collaborators);
        self
    }

    pub fn run(&self) -> Result<BootstrapOutcome, BootstrapError> {
        // --- 1. Resolve the invocation ---
        let input = self.resolver.resolve()?.clone();
        if input.is_version_request() {
            return Ok(BootstrapOutcome::Version);
        }

        // --- 2. Refuse discontinued commands ---
        let command = input.command();
        let schema = self.resolver.registry().get(&command);
        if let Some(schema) = schema.filter(|schema| schema.is_hidden) {
            if let Some(notice) = &schema.no_support_notice {
                return Err(BootstrapError::CommandNotSupported {
                    command,
                    notice: notice.clone(),
                });
            }
        }

        let mut invocation = Invocation {
            id: Uuid::new_v4(),
            input,
            configuration_path: None,
            configuration: None,
            is_configuration_resolved: false,
        };

        // --- 3. Load the service configuration when the command depends on it ---
        // Unknown commands may come from plugins declared in the configuration.
        let needs_service = schema.is_none_or(|schema| schema.service_dependency_mode);
        if !needs_service {
            log::debug!("Command '{}' runs without a service configuration", command);
            return Ok(BootstrapOutcome::Ready(Box::new(invocation)));
        }

        let is_help_request = invocation.input.is_help_request;
        let explicit_path = invocation
            .input
            .options
            .get("config")
            .and_then(|value| value.as_str());
        let Some(loaded) =
            config_loader::load_service_configuration(&self.cwd, explicit_path, is_help_request)?
        else {
            return Ok(BootstrapOutcome::Ready(Box::new(invocation)));
        };

        // --- 4. Resolve variables ---
        let mut document = loaded.document;
        invocation.is_configuration_resolved =
            self.resolve_variables(&mut document, &loaded.path, &invocation)?;
        invocation.configuration_path = Some(loaded.path);
        invocation.configuration = Some(document);

        Ok(BootstrapOutcome::Ready(Box::new(invocation)))
    }

    /// Returns whether the document ended up fully resolved.
    fn resolve_variables(
        &self,
        document: &mut Value,
        configuration_path: &Path,
        invocation: &Invocation,
    ) -> Result<bool, BootstrapError> {
        let Some(collaborators) = self.collaborators else {
            log::debug!("No resolution engine attached, configuration left unresolved");
            return Ok(false);
        };

        let resolution = VariableOrchestrator::new(collaborators, self.deprecations)
            .with_configuration_path(configuration_path)
            .resolve(
                document,
                &invocation.input.parsed_options(),
                invocation.input.is_help_request,
            );

        match resolution.outcome {
            ResolutionOutcome::FullyResolved => Ok(true),
            ResolutionOutcome::PartiallyResolvedForHelp | ResolutionOutcome::LegacyDeferred => {
                Ok(false)
            }
            // A legacy syntax conflict stops help requests too.
            ResolutionOutcome::Aborted(error @ ResolutionError::LegacySyntaxConflict { .. }) => {
                Err(error.into())
            }
            ResolutionOutcome::Aborted(error) if invocation.input.is_help_request => {
                log::warn!("Rendering help without a resolved configuration: {}", error);
                Ok(false)
            }
            ResolutionOutcome::Aborted(error) => Err(error.into()),
        }
    }
}
