// src/core/deprecation.rs

use crate::constants::DEPRECATION_DISABLE_ENV;
use colored::Colorize;
use std::collections::BTreeSet;
use std::env;
use std::sync::{Mutex, MutexGuard};

/// Codes that must not be reported, read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Disabled {
    #[default]
    None,
    All,
    Codes(BTreeSet<String>),
}

impl Disabled {
    fn parse(raw: &str) -> Self {
        let codes: BTreeSet<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect();
        if codes.contains("*") {
            Self::All
        } else if codes.is_empty() {
            Self::None
        } else {
            Self::Codes(codes)
        }
    }

    fn covers(&self, code: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Codes(codes) => codes.contains(code),
        }
    }
}

/// One-time deprecation notices, keyed by code.
///
/// A code is reported at most once per logger (once per subject with
/// [`DeprecationLogger::log_for`]); later calls are silently dropped. Notices go
/// to the `log` facade at warn level and to stderr.
#[derive(Debug, Default)]
pub struct DeprecationLogger {
    triggered: Mutex<BTreeSet<String>>,
    emitted: Mutex<Vec<(String, String)>>,
    disabled: Disabled,
    quiet: bool,
}

impl DeprecationLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a logger honoring `PREFLIGHT_DEPRECATION_DISABLE`.
    pub fn from_env() -> Self {
        let disabled = env::var(DEPRECATION_DISABLE_ENV)
            .map(|raw| Disabled::parse(&raw))
            .unwrap_or_default();
        Self {
            disabled,
            ..Self::default()
        }
    }

    /// A logger that records notices without printing them to stderr.
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }

    /// Reports a deprecation unless the code was already triggered or is disabled.
    /// Returns `true` when the notice was actually emitted.
    pub fn log(&self, code: &str, message: &str) -> bool {
        self.emit(code, code.to_string(), message)
    }

    /// Like [`log`](Self::log), but one notice per `subject` under the same code.
    pub fn log_for(&self, code: &str, subject: &str, message: &str) -> bool {
        self.emit(code, format!("{}:{}", code, subject), message)
    }

    fn emit(&self, code: &str, key: String, message: &str) -> bool {
        if !lock(&self.triggered).insert(key) {
            log::trace!("Deprecation {} already reported, skipping", code);
            return false;
        }
        if self.disabled.covers(code) {
            log::debug!("Deprecation {} is disabled through the environment", code);
            return false;
        }

        log::warn!("Deprecation {}: {}", code, message);
        if !self.quiet {
            let code_label = format!(t!("deprecation.code"), code = code);
            eprintln!(
                "\n{} {}\n{}\n",
                t!("deprecation.header").yellow().bold(),
                code_label.dimmed(),
                message.yellow()
            );
        }
        lock(&self.emitted).push((code.to_string(), message.to_string()));
        true
    }

    /// Marks a code as already reported so a related notice is not duplicated.
    pub fn mark_triggered(&self, code: &str) {
        lock(&self.triggered).insert(code.to_string());
    }

    pub fn is_triggered(&self, code: &str) -> bool {
        lock(&self.triggered).contains(code)
    }

    /// Codes of the notices actually emitted, in emission order.
    pub fn emitted_codes(&self) -> Vec<String> {
        lock(&self.emitted)
            .iter()
            .map(|(code, _)| code.clone())
            .collect()
    }

    /// Messages of the notices actually emitted, in emission order.
    pub fn emitted_messages(&self) -> Vec<String> {
        lock(&self.emitted)
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Deprecation bookkeeping stays usable even if a reporting thread panicked.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_emitted_once() {
        let logger = DeprecationLogger::quiet();
        assert!(logger.log("SOME_CODE", "first"));
        assert!(!logger.log("SOME_CODE", "second"));
        assert_eq!(logger.emitted_codes(), vec!["SOME_CODE"]);
    }

    #[test]
    fn test_subjects_are_reported_separately() {
        let logger = DeprecationLogger::quiet();
        assert!(logger.log_for("SOME_CODE", "a", "about a"));
        assert!(logger.log_for("SOME_CODE", "b", "about b"));
        assert!(!logger.log_for("SOME_CODE", "a", "about a again"));
        assert_eq!(logger.emitted_codes(), vec!["SOME_CODE", "SOME_CODE"]);
        assert_eq!(logger.emitted_messages(), vec!["about a", "about b"]);
    }

    #[test]
    fn test_mark_triggered_suppresses_later_notice() {
        let logger = DeprecationLogger::quiet();
        logger.mark_triggered("OTHER");
        assert!(logger.is_triggered("OTHER"));
        assert!(!logger.log("OTHER", "never shown"));
        assert!(logger.emitted_codes().is_empty());
    }

    #[test]
    fn test_disabled_codes_parsing() {
        assert_eq!(Disabled::parse(""), Disabled::None);
        assert_eq!(Disabled::parse(" * "), Disabled::All);
        let disabled = Disabled::parse("A, B");
        assert!(disabled.covers("A"));
        assert!(disabled.covers("B"));
        assert!(!disabled.covers("C"));
    }

    #[test]
    fn test_disabled_code_is_not_emitted() {
        let logger = DeprecationLogger {
            disabled: Disabled::parse("HIDDEN"),
            quiet: true,
            ..Default::default()
        };
        assert!(!logger.log("HIDDEN", "message"));
        assert!(logger.log("VISIBLE", "message"));
        assert_eq!(logger.emitted_codes(), vec!["VISIBLE"]);
    }
}
