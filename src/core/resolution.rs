// src/core/resolution.rs

//! Seams between the orchestrator and the pieces it sequences: discovery of
//! variable expressions, the resolution engine, error reporting and the
//! environment loader. The orchestrator owns the order; these traits own the work.

use crate::core::property_path::PropertyPath;
use crate::core::sources::{SourceName, SourceRegistry};
use crate::core::variables::VariablesMeta;
use crate::models::ParsedOptions;
use anyhow::Result;
use colored::Colorize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// One invocation of the resolution engine.
///
/// The engine replaces resolved leaves in `document` with literal values,
/// removes their entries from `variables_meta`, and attaches errors to entries
/// it could not resolve. Sources outside `fulfilled_sources` must not run.
#[derive(Debug)]
pub struct ResolutionPass<'a> {
    pub document: &'a mut Value,
    pub variables_meta: &'a mut VariablesMeta,
    pub sources: &'a SourceRegistry,
    pub fulfilled_sources: &'a BTreeSet<SourceName>,
    pub options: &'a ParsedOptions,
    /// When set, only paths at or under one of these are resolved.
    pub property_paths_to_resolve: Option<&'a BTreeSet<PropertyPath>>,
    pub service_dir: &'a Path,
}

impl ResolutionPass<'_> {
    /// Whether `path` belongs to this pass's scope. Ancestors of a scoped path
    /// count too: `provider` must resolve before `provider.stage` can.
    pub fn in_scope(&self, path: &PropertyPath) -> bool {
        self.property_paths_to_resolve.is_none_or(|scope| {
            scope
                .iter()
                .any(|scoped| path.is_at_or_under(scoped) || scoped.is_at_or_under(path))
        })
    }

    /// Tracked paths this pass is expected to work on.
    pub fn paths_in_scope(&self) -> Vec<PropertyPath> {
        self.variables_meta
            .paths()
            .filter(|path| self.in_scope(path))
            .cloned()
            .collect()
    }
}

/// Finds every property still holding a variable expression.
pub trait VariableDiscovery: fmt::Debug {
    fn discover(&self, document: &Value) -> VariablesMeta;
}

/// Resolves tracked properties in place. Must not return before every leaf
/// it touched is either fully resolved or marked errored.
pub trait ResolutionEngine: fmt::Debug {
    fn run_pass(&self, pass: ResolutionPass<'_>) -> Result<()>;
}

/// Reports resolution errors to the user. Returns `true` when unrecoverable
/// errors are present.
pub trait ErrorReporter: fmt::Debug {
    fn report(
        &self,
        configuration_path: Option<&Path>,
        document: &Value,
        variables_meta: &VariablesMeta,
    ) -> bool;
}

/// Loads stage-scoped environment files into the process environment.
pub trait EnvironmentLoader: fmt::Debug {
    fn load(&self, options: &ParsedOptions, document: &Value) -> Result<()>;
}

/// Default reporter: every errored path goes to the log and to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogErrorReporter {
    pub quiet: bool,
}

impl ErrorReporter for LogErrorReporter {
    fn report(
        &self,
        configuration_path: Option<&Path>,
        _document: &Value,
        variables_meta: &VariablesMeta,
    ) -> bool {
        if !variables_meta.has_errors() {
            return false;
        }

        let file = configuration_file_name(configuration_path);
        let mut lines = Vec::new();
        for (path, error) in variables_meta.errors() {
            log::error!("Cannot resolve variable at \"{}\": {}", path, error);
            lines.push(format!(
                "  - {}",
                format_args!(t!("variables.error.line"), path = path, error = error)
            ));
        }

        if !self.quiet {
            let header = format!(t!("variables.error.header"), file = file);
            eprintln!("\n{}\n{}", header.red().bold(), lines.join("\n"));
        }
        true
    }
}

/// The file name shown in messages about a configuration file.
pub fn configuration_file_name(configuration_path: Option<&Path>) -> String {
    configuration_path
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| t!("variables.unnamed_configuration").to_string())
}

// MARK: --- TEST DOUBLES ---
