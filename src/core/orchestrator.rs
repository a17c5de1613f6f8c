// src/core/orchestrator.rs

//! Phased resolution of variable expressions in a service configuration.
//!
//! Some sources cannot run until other values are known: environment files
//! are selected by stage, and the stage itself may be a variable. Resolution
//! therefore runs as a fixed sequence of phases, each gated on the previous:
//!
//! 1. `LegacyEscape`: documents using the old interpolation marker are left alone.
//! 2. `Discovery`: every property holding an expression is tracked.
//! 3. `BootstrapCritical`: `provider.stage` and `useDotenv` are resolved
//!    without the `env` source.
//! 4. `EnvironmentLoad`: environment files are loaded for the known stage.
//! 5. `FullResolution`: `env` is enabled and the rest is resolved (only
//!    `plugins` and `provider.name` for help requests).
//!
//! Whether a failed precondition stops the run, degrades to a deprecation, or
//! is ignored is decided in one place: [`classify`].

use crate::constants::{
    DEPRECATION_NEW_VARIABLES_RESOLVER, DEPRECATION_VARIABLES_ERROR_ON_UNRESOLVED,
    RESOLUTION_MODE_KEY,
};
use crate::core::deprecation::DeprecationLogger;
use crate::core::property_path::{PropertyPath, is_truthy_at};
use crate::core::resolution::{
    EnvironmentLoader, ErrorReporter, ResolutionEngine, ResolutionPass, VariableDiscovery,
    configuration_file_name,
};
use crate::core::sources::{SourceName, SourceRegistry};
use crate::core::variables::VariablesMeta;
use crate::dev_utils::BlockTimer;
use crate::models::ParsedOptions;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error(
        "Cannot resolve {file}: \"variableSyntax\" is not supported with new variables resolver. Please drop this setting"
    )]
    LegacySyntaxConflict { file: String },

    #[error(
        "Cannot resolve {file}: \"{path}\" property is not accessible (configured behind variables which cannot be resolved at this stage)"
    )]
    InaccessibleCriticalProperty { file: String, path: PropertyPath },

    #[error("Cannot resolve {file}: variables resolution errored for {}", humanize_all(.paths))]
    SourceResolution { file: String, paths: Vec<PropertyPath> },

    #[error("Cannot resolve {file}: unresolved variables remain in {}", humanize_all(.paths))]
    UnresolvedProperties { file: String, paths: Vec<PropertyPath> },

    #[error("Variables resolution failed during {phase}: {reason}")]
    Engine { phase: Phase, reason: String },
}

fn humanize_all(paths: &[PropertyPath]) -> String {
    paths
        .iter()
        .map(|path| format!("\"{}\"", path))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Terminal state of one orchestrator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// Nothing variable-gated remains.
    FullyResolved,
    /// Enough is resolved to render help. Never execute against this document.
    PartiallyResolvedForHelp,
    /// The document opted into legacy interpolation, which runs elsewhere.
    LegacyDeferred,
    Aborted(ResolutionError),
}

impl ResolutionOutcome {
    pub fn is_fully_resolved(&self) -> bool {
        matches!(self, Self::FullyResolved)
    }

    pub fn error(&self) -> Option<&ResolutionError> {
        match self {
            Self::Aborted(error) => Some(error),
            _ => None,
        }
    }
}

/// The outcome together with what is left of the variables bookkeeping.
/// `variables_meta` is always empty after an abort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub outcome: ResolutionOutcome,
    pub variables_meta: VariablesMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    LegacyEscape,
    Discovery,
    BootstrapCritical,
    EnvironmentLoad,
    FullResolution,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LegacyEscape => "legacy escape",
            Self::Discovery => "discovery",
            Self::BootstrapCritical => "bootstrap-critical resolution",
            Self::EnvironmentLoad => "environment load",
            Self::FullResolution => "full resolution",
        };
        f.write_str(label)
    }
}

// MARK: --- CLASSIFICATION ---

/// A precondition that failed at some phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriticalCondition {
    /// Legacy marker and strict mode are both set.
    LegacyConflict,
    /// Legacy marker alone.
    LegacySyntax,
    /// The error reporter found errors it cannot recover from.
    UnrecoverableErrors,
    /// `variablesResolutionMode` is itself behind a variable.
    ResolutionModeInaccessible,
    /// The whole `provider` section is behind a variable.
    ProviderInaccessible,
    StageInaccessible,
    UseDotenvInaccessible,
    PluginsInaccessible,
    ProviderNameInaccessible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Stop and return `Aborted`.
    Fatal,
    /// Log a deprecation and continue.
    Deprecated,
    /// Continue silently.
    Ignored,
}

/// Decides what a failed precondition means for this run.
pub fn classify(condition: CriticalCondition, strict: bool, is_help_request: bool) -> Verdict {
    use CriticalCondition::*;
    match condition {
        LegacyConflict => Verdict::Fatal,
        LegacySyntax => Verdict::Deprecated,
        _ if is_help_request => Verdict::Ignored,
        StageInaccessible | UseDotenvInaccessible if !strict => Verdict::Deprecated,
        UnrecoverableErrors
        | ResolutionModeInaccessible
        | ProviderInaccessible
        | StageInaccessible
        | UseDotenvInaccessible
        | PluginsInaccessible
        | ProviderNameInaccessible => Verdict::Fatal,
    }
}

// MARK: --- GUARDS ---

fn uses_legacy_syntax(document: &Value) -> bool {
    is_truthy_at(document, &PropertyPath::dotted("provider.variableSyntax"))
}

fn is_strict(document: &Value) -> bool {
    is_truthy_at(document, &PropertyPath::new([RESOLUTION_MODE_KEY]))
}

fn stage_path() -> PropertyPath {
    PropertyPath::dotted("provider.stage")
}

fn use_dotenv_path() -> PropertyPath {
    PropertyPath::new(["useDotenv"])
}

fn plugins_path() -> PropertyPath {
    PropertyPath::new(["plugins"])
}

fn provider_name_path() -> PropertyPath {
    PropertyPath::dotted("provider.name")
}

/// Paths that must be concrete before the command surface can be computed.
fn first_required_gated(meta: &VariablesMeta) -> Option<PropertyPath> {
    meta.first_at_or_under(&plugins_path())
        .cloned()
        .or_else(|| meta.has(&provider_name_path()).then(provider_name_path))
}

// MARK: --- ORCHESTRATOR ---

/// The collaborators the phases are sequenced over.
#[derive(Debug, Clone, Copy)]
pub struct Collaborators<'a> {
    pub discovery: &'a dyn VariableDiscovery,
    pub engine: &'a dyn ResolutionEngine,
    pub reporter: &'a dyn ErrorReporter,
    pub environment: &'a dyn EnvironmentLoader,
    pub sources: &'a SourceRegistry,
}

#[derive(Debug)]
pub struct VariableOrchestrator<'a> {
    collaborators: Collaborators<'a>,
    deprecations: &'a DeprecationLogger,
    configuration_path: Option<&'a Path>,
    service_dir: &'a Path,
}

/// Mutable state threaded through the phases of one run.
#[derive(Debug)]
struct Run<'r> {
    document: &'r mut Value,
    options: &'r ParsedOptions,
    is_help_request: bool,
    strict: bool,
    variables_meta: VariablesMeta,
    fulfilled_sources: BTreeSet<SourceName>,
}

enum Transition {
    Next(Phase),
    Finish(ResolutionOutcome),
}

impl<'a> VariableOrchestrator<'a> {
    pub fn new(collaborators: Collaborators<'a>, deprecations: &'a DeprecationLogger) -> Self {
        Self {
            collaborators,
            deprecations,
            configuration_path: None,
            service_dir: Path::new("."),
        }
    }

    /// Names the configuration file in messages; its directory becomes the
    /// service directory handed to sources.
    pub fn with_configuration_path(mut self, path: &'a Path) -> Self {
        self.configuration_path = Some(path);
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            self.service_dir = parent;
        }
        self
    }

    /// Resolves `document` in place, phase by phase.
    pub fn resolve(
        &self,
        document: &mut Value,
        options: &ParsedOptions,
        is_help_request: bool,
    ) -> Resolution {
        let strict = is_strict(document);
        let mut run = Run {
            document,
            options,
            is_help_request,
            strict,
            variables_meta: VariablesMeta::new(),
            fulfilled_sources: SourceName::bootstrap_safe(),
        };

        let mut phase = Phase::LegacyEscape;
        let outcome = loop {
            log::debug!("Variables resolution: entering {} phase", phase);
            let _timer = BlockTimer::new(format!("orchestrator::{}", phase));
            let step = match phase {
                Phase::LegacyEscape => self.legacy_escape(&run),
                Phase::Discovery => self.discovery(&mut run),
                Phase::BootstrapCritical => self.bootstrap_critical(&mut run),
                Phase::EnvironmentLoad => self.environment_load(&run),
                Phase::FullResolution => self.full_resolution(&mut run),
            };
            match step {
                Ok(Transition::Next(next)) => phase = next,
                Ok(Transition::Finish(outcome)) => break outcome,
                Err(error) => {
                    log::debug!("Variables resolution aborted during {} phase: {}", phase, error);
                    break ResolutionOutcome::Aborted(error);
                }
            }
        };

        if matches!(outcome, ResolutionOutcome::Aborted(_)) {
            run.variables_meta.clear();
        }
        Resolution {
            outcome,
            variables_meta: run.variables_meta,
        }
    }

    // --- Phase A ---
    fn legacy_escape(&self, run: &Run<'_>) -> Result<Transition, ResolutionError> {
        if !uses_legacy_syntax(run.document) {
            return Ok(Transition::Next(Phase::Discovery));
        }
        let condition = if run.strict {
            CriticalCondition::LegacyConflict
        } else {
            CriticalCondition::LegacySyntax
        };
        match classify(condition, run.strict, run.is_help_request) {
            Verdict::Fatal => Err(ResolutionError::LegacySyntaxConflict { file: self.file() }),
            // `classify` never ignores the legacy marker.
            Verdict::Deprecated | Verdict::Ignored => {
                self.deprecations.log(
                    DEPRECATION_NEW_VARIABLES_RESOLVER,
                    t!("variables.deprecation.legacy_syntax"),
                );
                Ok(Transition::Finish(ResolutionOutcome::LegacyDeferred))
            }
        }
    }

    // --- Phase B ---
    fn discovery(&self, run: &mut Run<'_>) -> Result<Transition, ResolutionError> {
        run.variables_meta = self.collaborators.discovery.discover(run.document);
        if run.variables_meta.is_empty() {
            log::debug!("No variables found in configuration");
            return Ok(Transition::Finish(ResolutionOutcome::FullyResolved));
        }
        log::debug!("{} properties configured with variables", run.variables_meta.len());

        self.check_errors(run)?;
        let mode_path = PropertyPath::new([RESOLUTION_MODE_KEY]);
        if run.variables_meta.has(&mode_path) {
            self.enforce(run, CriticalCondition::ResolutionModeInaccessible, mode_path)?;
        }
        Ok(Transition::Next(Phase::BootstrapCritical))
    }

    // --- Phase C ---
    fn bootstrap_critical(&self, run: &mut Run<'_>) -> Result<Transition, ResolutionError> {
        let scope = BTreeSet::from([stage_path(), use_dotenv_path()]);
        self.run_pass(run, Some(&scope), Phase::BootstrapCritical)?;
        self.check_errors(run)?;

        let provider = PropertyPath::new(["provider"]);
        if run.variables_meta.has(&provider) {
            self.enforce(run, CriticalCondition::ProviderInaccessible, provider)?;
        }
        if run.variables_meta.has(&stage_path()) {
            self.enforce(run, CriticalCondition::StageInaccessible, stage_path())?;
        }
        if run.variables_meta.has(&use_dotenv_path()) {
            self.enforce(run, CriticalCondition::UseDotenvInaccessible, use_dotenv_path())?;
        }
        Ok(Transition::Next(Phase::EnvironmentLoad))
    }

    // --- Phase D ---
    fn environment_load(&self, run: &Run<'_>) -> Result<Transition, ResolutionError> {
        self.collaborators
            .environment
            .load(run.options, run.document)
            .map_err(|error| ResolutionError::Engine {
                phase: Phase::EnvironmentLoad,
                reason: format!("{:#}", error),
            })?;
        Ok(Transition::Next(Phase::FullResolution))
    }

    // --- Phase E ---
    fn full_resolution(&self, run: &mut Run<'_>) -> Result<Transition, ResolutionError> {
        if run.variables_meta.is_empty() {
            return Ok(Transition::Finish(ResolutionOutcome::FullyResolved));
        }

        run.fulfilled_sources.insert(SourceName::Env);
        let help_scope = BTreeSet::from([plugins_path(), provider_name_path()]);
        let scope = run.is_help_request.then_some(&help_scope);
        self.run_pass(run, scope, Phase::FullResolution)?;
        self.check_errors(run)?;

        if let Some(path) = run.variables_meta.first_at_or_under(&plugins_path()).cloned() {
            self.enforce(run, CriticalCondition::PluginsInaccessible, path)?;
        }
        if run.variables_meta.has(&provider_name_path()) {
            self.enforce(run, CriticalCondition::ProviderNameInaccessible, provider_name_path())?;
        }

        if run.variables_meta.is_empty() {
            return Ok(Transition::Finish(ResolutionOutcome::FullyResolved));
        }
        if run.is_help_request {
            // Help tolerates anything except the paths that shape the command surface.
            return match first_required_gated(&run.variables_meta) {
                None => Ok(Transition::Finish(ResolutionOutcome::PartiallyResolvedForHelp)),
                Some(path) => Err(ResolutionError::InaccessibleCriticalProperty {
                    file: self.file(),
                    path,
                }),
            };
        }
        Err(ResolutionError::UnresolvedProperties {
            file: self.file(),
            paths: run.variables_meta.paths().cloned().collect(),
        })
    }

    // --- Helpers ---

    fn run_pass(
        &self,
        run: &mut Run<'_>,
        scope: Option<&BTreeSet<PropertyPath>>,
        phase: Phase,
    ) -> Result<(), ResolutionError> {
        log::debug!(
            "Resolution pass ({}): sources {:?}, scope {:?}",
            phase,
            run.fulfilled_sources,
            scope
        );
        let pass = ResolutionPass {
            document: &mut *run.document,
            variables_meta: &mut run.variables_meta,
            sources: self.collaborators.sources,
            fulfilled_sources: &run.fulfilled_sources,
            options: run.options,
            property_paths_to_resolve: scope,
            service_dir: self.service_dir,
        };
        self.collaborators
            .engine
            .run_pass(pass)
            .map_err(|error| ResolutionError::Engine {
                phase,
                reason: format!("{:#}", error),
            })
    }

    /// Runs the error reporter. Help requests drop the error details and
    /// carry on with those paths pending.
    fn check_errors(&self, run: &mut Run<'_>) -> Result<(), ResolutionError> {
        let unrecoverable = self.collaborators.reporter.report(
            self.configuration_path,
            run.document,
            &run.variables_meta,
        );
        if !unrecoverable {
            return Ok(());
        }
        match classify(
            CriticalCondition::UnrecoverableErrors,
            run.strict,
            run.is_help_request,
        ) {
            Verdict::Fatal => Err(ResolutionError::SourceResolution {
                file: self.file(),
                paths: run.variables_meta.errors().map(|(path, _)| path.clone()).collect(),
            }),
            Verdict::Deprecated | Verdict::Ignored => {
                run.variables_meta.discard_errors();
                Ok(())
            }
        }
    }

    /// Applies the verdict for a critical path that is still gated.
    fn enforce(
        &self,
        run: &Run<'_>,
        condition: CriticalCondition,
        path: PropertyPath,
    ) -> Result<(), ResolutionError> {
        match classify(condition, run.strict, run.is_help_request) {
            Verdict::Fatal => Err(ResolutionError::InaccessibleCriticalProperty {
                file: self.file(),
                path,
            }),
            Verdict::Deprecated => {
                let message = format!(t!("variables.deprecation.inaccessible"), path = path);
                // Stage and useDotenv share the code, each gets its own notice.
                self.deprecations.log_for(
                    DEPRECATION_NEW_VARIABLES_RESOLVER,
                    &path.to_string(),
                    &message,
                );
                // The unresolved-variables notice would repeat this one.
                self.deprecations
                    .mark_triggered(DEPRECATION_VARIABLES_ERROR_ON_UNRESOLVED);
                Ok(())
            }
            Verdict::Ignored => {
                log::debug!("\"{}\" is not accessible, ignored for help", path);
                Ok(())
            }
        }
    }

    fn file(&self) -> String {
        configuration_file_name(self.configuration_path)
    }
}

// MARK: --- UNIT TESTS ---
