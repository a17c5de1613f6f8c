// src/cli/mod.rs

//! Help and version output. Parsing is not clap's job here (the command
//! decides the schema, see `core::input_resolver`), but clap still renders
//! per-command help from that schema.

use crate::core::command_registry::CommandRegistry;
use crate::models::{CommandSchema, OptionKind};
use clap::{Arg, ArgAction, Command};
use colored::Colorize;

const BINARY_NAME: &str = "preflight";

/// Replaces the semantic tags of a help template with ANSI styles, or strips
/// them when colors are off.
fn render_template(template: &str) -> String {
    let use_colors = colored::control::SHOULD_COLORIZE.should_colorize();

    let title = if use_colors { "\x1b[1;33m" } else { "" }; // Bold Yellow
    let hl = if use_colors { "\x1b[1;36m" } else { "" }; // Bold Cyan
    let cmd = if use_colors { "\x1b[36m" } else { "" }; // Cyan
    let group = if use_colors { "\x1b[1;32m" } else { "" }; // Bold Green
    let dim = if use_colors { "\x1b[2m" } else { "" };
    let reset = if use_colors { "\x1b[0m" } else { "" };

    template
        .replace("<title>", title)
        .replace("</title>", reset)
        .replace("<hl>", hl)
        .replace("</hl>", reset)
        .replace("<cmd>", cmd)
        .replace("</cmd>", reset)
        .replace("<group>", group)
        .replace("</group>", reset)
        .replace("<dim>", dim)
        .replace("</dim>", reset)
}

/// Overview of every visible command with its usage line.
pub fn render_general_help(registry: &CommandRegistry) -> String {
    let header = format!(t!("cli.help.header"), version = clap::crate_version!());
    let mut out = render_template(&header);
    out.push('\n');

    let width = registry
        .visible()
        .map(|(name, _)| name.len())
        .max()
        .unwrap_or(0);
    for (name, schema) in registry.visible() {
        let usage = schema.usage.as_deref().unwrap_or(t!("cli.help.no_usage"));
        out.push_str(&format!(
            "  {}  {}\n",
            format!("{:<width$}", name, width = width).cyan(),
            usage
        ));
    }

    out.push('\n');
    out.push_str(&render_template(t!("cli.help.footer")));
    out.push('\n');
    out
}

/// Builds a clap command mirroring `schema`, for rendering only.
pub fn command_for_schema(name: &str, schema: &CommandSchema) -> Command {
    let mut command = Command::new(format!("{} {}", BINARY_NAME, name))
        .disable_help_flag(true)
        .disable_version_flag(true);
    if let Some(usage) = &schema.usage {
        command = command.about(usage.clone());
    }

    for (option, def) in &schema.options {
        let mut arg = Arg::new(option.clone()).long(option.clone());
        arg = match def.kind {
            OptionKind::Boolean => arg.action(ArgAction::SetTrue),
            OptionKind::String => arg.action(ArgAction::Set).value_name("VALUE"),
            OptionKind::Multiple => arg.action(ArgAction::Append).value_name("VALUE"),
        };
        if let Some(short) = def.shortcut.as_deref().and_then(single_char) {
            arg = arg.short(short);
        }
        if let Some(usage) = &def.usage {
            arg = arg.help(usage.clone());
        }
        command = command.arg(arg);
    }
    command
}

/// Help for one command, or `None` when the registry does not know it.
pub fn render_command_help(registry: &CommandRegistry, name: &str) -> Option<String> {
    let schema = registry.get(name)?;
    let help = command_for_schema(name, schema).render_help();
    if colored::control::SHOULD_COLORIZE.should_colorize() {
        Some(help.ansi().to_string())
    } else {
        Some(help.to_string())
    }
}

pub fn render_version() -> String {
    format!(t!("cli.version"), version = clap::crate_version!())
}

fn single_char(shortcut: &str) -> Option<char> {
    let mut chars = shortcut.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_general_help_lists_visible_commands_only() {
        colored::control::set_override(false);
        let help = render_general_help(&CommandRegistry::builtin());
        assert!(help.contains("deploy function"));
        assert!(help.contains("config credentials"));
        assert!(!help.contains("studio"));
        assert!(!help.contains("<title>"));
    }

    #[test]
    fn test_command_help_mirrors_schema() {
        colored::control::set_override(false);
        let help = render_command_help(&CommandRegistry::builtin(), "deploy function").unwrap();
        assert!(help.contains("--function"));
        assert!(help.contains("-f"));
        assert!(help.contains("--stage"));
        assert!(help.contains("--force"));
    }

    #[test]
    fn test_command_help_for_unknown_command() {
        assert!(render_command_help(&CommandRegistry::builtin(), "offline start").is_none());
    }

    #[test]
    fn test_clap_command_is_consistent() {
        let registry = CommandRegistry::builtin();
        for (name, schema) in registry.visible() {
            command_for_schema(name, schema).debug_assert();
        }
    }

    #[test]
    fn test_version_mentions_crate_version() {
        assert!(render_version().contains(clap::crate_version!()));
    }
}
