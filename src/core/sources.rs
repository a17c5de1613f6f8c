// src/core/sources.rs

use crate::models::ParsedOptions;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Names of the value sources variable expressions can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceName {
    /// Process environment, only safe once environment files are loaded.
    Env,
    /// Values read from files next to the service configuration.
    File,
    /// Command-line options.
    Opt,
    /// References to other properties of the same document.
    SelfRef,
    /// Literal `"true"`/`"false"` coercion.
    StrToBool,
}

impl SourceName {
    pub const ALL: [Self; 5] = [Self::Env, Self::File, Self::Opt, Self::SelfRef, Self::StrToBool];

    /// The identifier used inside variable expressions.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Env => "env",
            Self::File => "file",
            Self::Opt => "opt",
            Self::SelfRef => "self",
            Self::StrToBool => "strToBool",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|source| source.as_str() == name)
    }

    /// Sources with no dependency on environment-file state. These are the
    /// only ones allowed while the stage is still being determined.
    pub fn bootstrap_safe() -> BTreeSet<Self> {
        BTreeSet::from([Self::File, Self::SelfRef, Self::StrToBool])
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("Source '{source_name}' is not available at this stage.")]
    NotFulfilled { source_name: SourceName },
    #[error("No value found for '{address}' in source '{source_name}'.")]
    ValueNotFound {
        source_name: SourceName,
        address: String,
    },
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("{0}")]
    Other(String),
}

/// What a source may look at while resolving an address.
#[derive(Debug, Clone, Copy)]
pub struct SourceContext<'a> {
    pub service_dir: &'a Path,
    pub document: &'a Value,
    pub options: &'a ParsedOptions,
}

/// A named capability that turns an address into a concrete value.
pub trait Source: fmt::Debug + Send + Sync {
    fn resolve(&self, address: &str, context: &SourceContext<'_>) -> Result<Value, SourceError>;
}

/// Every source registered at startup, keyed by name.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: BTreeMap<SourceName, Box<dyn Source>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: SourceName, source: Box<dyn Source>) {
        if self.sources.insert(name, source).is_some() {
            log::debug!("Source '{}' registered twice, keeping the last one", name);
        }
    }

    pub fn with(mut self, name: SourceName, source: Box<dyn Source>) -> Self {
        self.register(name, source);
        self
    }

    pub fn get(&self, name: SourceName) -> Option<&dyn Source> {
        self.sources.get(&name).map(|source| source.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = SourceName> + '_ {
        self.sources.keys().copied()
    }

    /// Resolves through `name` only if that source is fulfilled for the pass.
    pub fn resolve_if_fulfilled(
        &self,
        name: SourceName,
        fulfilled: &BTreeSet<SourceName>,
        address: &str,
        context: &SourceContext<'_>,
    ) -> Result<Value, SourceError> {
        if !fulfilled.contains(&name) {
            return Err(SourceError::NotFulfilled { source_name: name });
        }
        let source = self.get(name).ok_or(SourceError::NotFulfilled { source_name: name })?;
        source.resolve(address, context)
    }
}
