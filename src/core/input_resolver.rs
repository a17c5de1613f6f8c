// src/core/input_resolver.rs

use crate::constants::{DEPRECATION_OPTIONS_BEFORE_COMMAND, MAX_SCHEMA_RESOLUTION_ROUNDS};
use crate::core::arg_parser::parse_args;
use crate::core::command_registry::CommandRegistry;
use crate::core::deprecation::DeprecationLogger;
use crate::core::option_schema::OptionSchema;
use crate::models::{OptionValue, ParsedOptions, ResolvedInvocation};
use std::collections::BTreeSet;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error(
        "Could not settle on a command for '{command}': command schemas kept resolving to different commands after {rounds} rounds."
    )]
    SchemaAmbiguity { command: String, rounds: usize },
}

type InputResult<T> = Result<T, InputError>;

/// Resolves the invocation once and hands out the same result afterwards.
///
/// Construct one per process run and pass it by reference to whatever needs
/// the command or options. The raw arguments never change during a run, so
/// the first result (including a failure) is final.
#[derive(Debug)]
pub struct InputResolver<'a> {
    raw_args: Vec<String>,
    registry: &'a CommandRegistry,
    deprecations: &'a DeprecationLogger,
    resolved: OnceLock<InputResult<ResolvedInvocation>>,
}

impl<'a> InputResolver<'a> {
    pub fn new(
        raw_args: Vec<String>,
        registry: &'a CommandRegistry,
        deprecations: &'a DeprecationLogger,
    ) -> Self {
        Self {
            raw_args,
            registry,
            deprecations,
            resolved: OnceLock::new(),
        }
    }

    pub fn raw_args(&self) -> &[String] {
        &self.raw_args
    }

    pub fn registry(&self) -> &'a CommandRegistry {
        self.registry
    }

    /// The resolved invocation, computed on first access.
    pub fn resolve(&self) -> InputResult<&ResolvedInvocation> {
        self.resolved
            .get_or_init(|| resolve_input(&self.raw_args, self.registry, self.deprecations))
            .as_ref()
            .map_err(Clone::clone)
    }
}

/// Turns raw tokens into a command plus typed options.
///
/// The command schema needed to parse the tokens depends on the command the
/// tokens name, so parsing starts from the base schema and re-parses with each
/// candidate command's schema until the command stops changing.
pub fn resolve_input(
    raw_args: &[String],
    registry: &CommandRegistry,
    deprecations: &DeprecationLogger,
) -> InputResult<ResolvedInvocation> {
    // --- 1. Base schema pass: only global options are understood here ---
    let mut parsed = parse_args(raw_args, &OptionSchema::base());
    let mut command = parsed.command();
    log::debug!("Provisional command from base schema: '{}'", command);

    // --- 2. Special cases not covered by command schemas ---
    if command.is_empty() {
        if parsed.is_set("v") {
            parsed.set("version", OptionValue::Bool(true));
        }
        if parsed.is_set("help") || parsed.is_set("version") {
            return Ok(into_invocation(parsed, true));
        }
    }
    if command == "help" {
        return Ok(into_invocation(parsed, true));
    }

    // --- 3. Re-parse with the candidate command's schema until it converges ---
    let mut visited = BTreeSet::new();
    while let Some(schema) = registry.get(&command) {
        if !visited.insert(command.clone()) || visited.len() > MAX_SCHEMA_RESOLUTION_ROUNDS {
            return Err(InputError::SchemaAmbiguity {
                command,
                rounds: visited.len(),
            });
        }

        let reparsed = parse_args(raw_args, &OptionSchema::for_command(schema));
        let reparsed_command = reparsed.command();
        if reparsed_command == command {
            parsed = reparsed;
            break;
        }

        // e.g. `deploy --force function -f foo`: assuming `deploy`, its schema
        // marks `--force` boolean and `deploy function` surfaces instead.
        log::debug!(
            "Command schema of '{}' resolves command '{}' instead",
            command,
            reparsed_command
        );
        command = reparsed_command;
    }

    // --- 4. Options placed before the command are tolerated but deprecated ---
    if options_precede_command(raw_args, &command) {
        deprecations.log(
            DEPRECATION_OPTIONS_BEFORE_COMMAND,
            t!("deprecation.options_before_command"),
        );
    }

    // --- 5. Help flag ---
    let is_help_request =
        (command.is_empty() && parsed.is_set("help-interactive")) || parsed.is_set("help");

    Ok(into_invocation(parsed, is_help_request))
}

/// `true` when the raw tokens do not literally start with the command words.
fn options_precede_command(raw_args: &[String], command: &str) -> bool {
    if command.is_empty() {
        return false;
    }
    let args = raw_args.join(" ");
    args != command && !args.starts_with(&format!("{} ", command))
}

fn into_invocation(parsed: ParsedOptions, is_help_request: bool) -> ResolvedInvocation {
    ResolvedInvocation {
        commands: parsed.positionals,
        options: parsed.options,
        is_help_request,
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommandSchema, OptionDef};

    fn to_cli_params(params: &[&str]) -> Vec<String> {
        params.iter().map(|s| s.to_string()).collect()
    }

    fn resolve(params: &[&str]) -> (ResolvedInvocation, DeprecationLogger) {
        let deprecations = DeprecationLogger::quiet();
        let invocation = resolve_input(
            &to_cli_params(params),
            &CommandRegistry::builtin(),
            &deprecations,
        )
        .unwrap();
        (invocation, deprecations)
    }

    #[test]
    fn test_version_without_command_is_help_request() {
        let (invocation, _) = resolve(&["--version"]);
        assert!(invocation.is_help_request);
        assert!(invocation.is_version_request());
        assert!(invocation.commands.is_empty());
    }

    #[test]
    fn test_short_v_without_command_sets_version() {
        let (invocation, _) = resolve(&["-v"]);
        assert!(invocation.is_help_request);
        assert!(invocation.is_version_request());
    }

    #[test]
    fn test_help_command_is_help_request() {
        let (invocation, _) = resolve(&["help"]);
        assert!(invocation.is_help_request);
        assert_eq!(invocation.command(), "help");

        let (invocation, _) = resolve(&["help", "--stage", "dev"]);
        assert!(invocation.is_help_request);
    }

    #[test]
    fn test_deploy_force_function_converges_on_deploy_function() {
        let (invocation, deprecations) = resolve(&["deploy", "--force", "function", "-f", "foo"]);

        assert_eq!(invocation.command(), "deploy function");
        assert_eq!(
            invocation.options.get("function"),
            Some(&OptionValue::String("foo".into()))
        );
        assert_eq!(invocation.options.get("force"), Some(&OptionValue::Bool(true)));
        assert!(!invocation.is_help_request);
        // `--force` sits between the command words, so the literal prefix check fails.
        assert_eq!(
            deprecations.emitted_codes(),
            vec![DEPRECATION_OPTIONS_BEFORE_COMMAND]
        );
    }

    #[test]
    fn test_options_before_command_emit_one_deprecation() {
        let (invocation, deprecations) = resolve(&["-v", "deploy"]);

        assert_eq!(invocation.command(), "deploy");
        assert!(invocation.is_version_request());
        assert_eq!(
            deprecations.emitted_codes(),
            vec![DEPRECATION_OPTIONS_BEFORE_COMMAND]
        );
    }

    #[test]
    fn test_options_after_command_do_not_deprecate() {
        let (invocation, deprecations) = resolve(&["deploy", "--stage", "prod", "-r", "eu-west-1"]);
        assert_eq!(invocation.command(), "deploy");
        assert_eq!(
            invocation.options.get("region"),
            Some(&OptionValue::String("eu-west-1".into()))
        );
        assert!(deprecations.emitted_codes().is_empty());
    }

    #[test]
    fn test_unknown_command_keeps_base_parse() {
        let (invocation, _) = resolve(&["offline", "start", "--port", "3000"]);
        assert_eq!(invocation.command(), "offline start");
        assert_eq!(
            invocation.options.get("port"),
            Some(&OptionValue::String("3000".into()))
        );
    }

    #[test]
    fn test_help_flag_on_command_is_help_request() {
        let (invocation, _) = resolve(&["deploy", "-h"]);
        assert!(invocation.is_help_request);
        assert_eq!(invocation.command(), "deploy");
    }

    #[test]
    fn test_help_interactive_only_counts_without_command() {
        let (invocation, _) = resolve(&["--help-interactive"]);
        assert!(invocation.is_help_request);

        let (invocation, _) = resolve(&["info", "--help-interactive"]);
        assert!(!invocation.is_help_request);
    }

    #[test]
    fn test_empty_invocation_is_not_help_request() {
        let (invocation, _) = resolve(&[]);
        assert!(!invocation.is_help_request);
        assert!(invocation.commands.is_empty());
    }

    #[test]
    fn test_schema_cycle_is_ambiguity() {
        // "a" declares `x` boolean so `b` turns positional ("a b"), while
        // "a b" declares `x` as a string that swallows `b` again ("a").
        let mut registry = CommandRegistry::empty();
        let mut a = CommandSchema::default();
        a.options.insert("x".into(), OptionDef::boolean());
        registry.insert("a", a);
        let mut ab = CommandSchema::default();
        ab.options.insert("x".into(), OptionDef::string());
        registry.insert("a b", ab);

        let deprecations = DeprecationLogger::quiet();
        let result = resolve_input(&to_cli_params(&["a", "--x", "b"]), &registry, &deprecations);

        assert!(matches!(result, Err(InputError::SchemaAmbiguity { .. })));
    }

    #[test]
    fn test_resolver_memoizes_result() {
        let registry = CommandRegistry::builtin();
        let deprecations = DeprecationLogger::quiet();
        let resolver = InputResolver::new(
            to_cli_params(&["--stage", "dev", "info"]),
            &registry,
            &deprecations,
        );

        let first = resolver.resolve().unwrap().clone();
        let second = resolver.resolve().unwrap();
        assert_eq!(&first, second);
        assert_eq!(first.command(), "info");
        // The deprecation was emitted on the first computation only.
        assert_eq!(deprecations.emitted_codes().len(), 1);
    }
}
