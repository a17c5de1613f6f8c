// src/core/arg_parser.rs

use crate::core::option_schema::OptionSchema;
use crate::models::{OptionKind, OptionValue, ParsedOptions};
use std::iter::Peekable;
use std::slice::Iter;

type Tokens<'a> = Peekable<Iter<'a, String>>;

/// A schema-driven parser for raw command-line tokens.
///
/// The same token list can parse differently depending on the schema: a token
/// following `--force` is the flag's value when `force` is unknown, and a
/// positional word when the schema declares `force` boolean.
///
/// # Logic:
/// - `--` ends option parsing; everything after it is positional.
/// - `--name=value` assigns inline; `--no-name` sets a boolean to `false`.
/// - Boolean options never consume the next token.
/// - String, multiple and unknown options consume the next token unless it
///   starts with `-`. A string option without a value gets `""`, an unknown
///   one becomes `true`.
/// - `-abc` is read as `-a -b -c`; only the last letter may take a value.
#[derive(Debug, Clone, Copy)]
pub struct ArgParser<'s> {
    schema: &'s OptionSchema,
}

impl<'s> ArgParser<'s> {
    pub fn new(schema: &'s OptionSchema) -> Self {
        Self { schema }
    }

    /// Parses the raw tokens into options and positional words.
    pub fn parse(&self, args: &[String]) -> ParsedOptions {
        let mut parsed = ParsedOptions::default();
        let mut tokens = args.iter().peekable();

        while let Some(token) = tokens.next() {
            if token == "--" {
                parsed.positionals.extend(tokens.by_ref().cloned());
                break;
            }

            if let Some(body) = token.strip_prefix("--") {
                self.parse_long(body, &mut parsed, &mut tokens);
            } else if let Some(cluster) = token.strip_prefix('-').filter(|c| !c.is_empty()) {
                self.parse_short_cluster(cluster, &mut parsed, &mut tokens);
            } else {
                parsed.positionals.push(token.clone());
            }
        }

        log::trace!("Parsed {:?} into {:?}", args, parsed);
        parsed
    }

    fn parse_long(&self, body: &str, parsed: &mut ParsedOptions, tokens: &mut Tokens<'_>) {
        let (raw_name, inline) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value)),
            None => (body, None),
        };

        if inline.is_none()
            && self.schema.kind_of(self.schema.canonical(raw_name)).is_none()
            && let Some(negated) = raw_name.strip_prefix("no-")
        {
            let name = self.schema.canonical(negated);
            if matches!(self.schema.kind_of(name), None | Some(OptionKind::Boolean)) {
                parsed.set(name, OptionValue::Bool(false));
                return;
            }
        }

        let name = self.schema.canonical(raw_name).to_string();
        self.apply(&name, inline, parsed, tokens);
    }

    fn parse_short_cluster(
        &self,
        cluster: &str,
        parsed: &mut ParsedOptions,
        tokens: &mut Tokens<'_>,
    ) {
        let (letters, inline) = match cluster.split_once('=') {
            Some((letters, value)) => (letters, Some(value)),
            None => (cluster, None),
        };

        let mut chars = letters.chars().peekable();
        while let Some(letter) = chars.next() {
            let short = letter.to_string();
            let name = self.schema.canonical(&short).to_string();
            if chars.peek().is_some() {
                // Only the last letter of a cluster may take a value.
                let value = match self.schema.kind_of(&name) {
                    Some(OptionKind::String) => OptionValue::String(String::new()),
                    _ => OptionValue::Bool(true),
                };
                self.store(&name, value, parsed);
            } else {
                self.apply(&name, inline, parsed, tokens);
            }
        }
    }

    fn apply(
        &self,
        name: &str,
        inline: Option<&str>,
        parsed: &mut ParsedOptions,
        tokens: &mut Tokens<'_>,
    ) {
        let value = match self.schema.kind_of(name) {
            Some(OptionKind::Boolean) => OptionValue::Bool(inline.is_none_or(|v| v != "false")),
            Some(OptionKind::String) | Some(OptionKind::Multiple) => OptionValue::String(
                inline
                    .map(str::to_string)
                    .or_else(|| take_value(tokens))
                    .unwrap_or_default(),
            ),
            None => match inline.map(str::to_string).or_else(|| take_value(tokens)) {
                Some(value) => OptionValue::String(value),
                None => OptionValue::Bool(true),
            },
        };
        self.store(name, value, parsed);
    }

    fn store(&self, name: &str, value: OptionValue, parsed: &mut ParsedOptions) {
        if self.schema.kind_of(name) == Some(OptionKind::Multiple) {
            let item = match value {
                OptionValue::String(item) => item,
                _ => String::new(),
            };
            match parsed.options.get_mut(name) {
                Some(OptionValue::Multiple(items)) => items.push(item),
                _ => parsed.set(name, OptionValue::Multiple(vec![item])),
            }
            return;
        }

        if let Some(previous) = parsed.options.insert(name.to_string(), value) {
            log::debug!(
                "Option '--{}' given more than once, discarding earlier value {:?}",
                name,
                previous
            );
        }
    }
}

/// Consumes the next token as a value unless it looks like an option.
fn take_value(tokens: &mut Tokens<'_>) -> Option<String> {
    tokens.next_if(|next| !next.starts_with('-')).cloned()
}

/// Convenience wrapper around [`ArgParser::parse`].
pub fn parse_args(args: &[String], schema: &OptionSchema) -> ParsedOptions {
    ArgParser::new(schema).parse(args)
}

// MARK: --- UNIT TESTS ---
