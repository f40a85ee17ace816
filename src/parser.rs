use std::collections::BTreeMap;

use crate::ast::{Action, Arg};
use crate::error::ParseError;
use crate::lexer::{self, RawCommand};
use crate::value::coerce;

/// Default cap on `{ ... }` nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Deepest block nesting accepted before failing with
    /// [`ParseError::NestingTooDeep`].
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Parse a full workflow source into its top-level actions.
pub fn parse(source: &str) -> Result<Vec<Action>, ParseError> {
    parse_with(source, &ParserConfig::default())
}

pub fn parse_with(source: &str, config: &ParserConfig) -> Result<Vec<Action>, ParseError> {
    parse_block(source, 1, 0, config)
}

fn parse_block(
    text: &str,
    first_line: usize,
    depth: usize,
    config: &ParserConfig,
) -> Result<Vec<Action>, ParseError> {
    let mut actions = Vec::new();
    for raw in lexer::split_commands(text, first_line)? {
        if let Some(action) = analyze(&raw, depth, config)? {
            actions.push(action);
        }
    }
    Ok(actions)
}

/// Turn one split command line into an [`Action`].
///
/// The nested block is parsed first, then the `$name =` prefix is stripped,
/// then the remainder is tokenized. Returns `Ok(None)` when nothing is left
/// to run.
pub fn analyze(
    raw: &RawCommand,
    depth: usize,
    config: &ParserConfig,
) -> Result<Option<Action>, ParseError> {
    let children = match &raw.block {
        Some(block) => {
            if depth + 1 > config.max_depth {
                return Err(ParseError::NestingTooDeep {
                    line: block.line,
                    limit: config.max_depth,
                });
            }
            parse_block(&block.text, block.line, depth + 1, config)?
        }
        None => Vec::new(),
    };

    let (set_variable, rest) = match split_assignment(&raw.text) {
        Some((name, rest)) => (Some(name.to_string()), rest),
        None => (None, raw.text.as_str()),
    };

    let tokens = lexer::tokenize_line(rest, raw.line)?;
    let Some((head, tail)) = tokens.split_first() else {
        return match set_variable {
            Some(name) => Err(ParseError::MalformedAssignment {
                line: raw.line,
                name,
            }),
            None => Ok(None),
        };
    };

    if variable_name(head).is_some() {
        return Err(ParseError::VariableAsCommand {
            line: raw.line,
            token: head.clone(),
        });
    }

    let mut args = Vec::new();
    let mut options = BTreeMap::new();
    for token in tail {
        match token.strip_prefix("--") {
            Some(option) => {
                let (name, value) = match option.split_once('=') {
                    Some((name, value)) => (name, classify(value)),
                    None => (option, Arg::Literal(true.into())),
                };
                if name.is_empty() {
                    return Err(ParseError::EmptyOptionName {
                        line: raw.line,
                        token: token.clone(),
                    });
                }
                options.insert(name.to_string(), value);
            }
            None => args.push(classify(token)),
        }
    }

    Ok(Some(Action {
        command: head.clone(),
        args,
        options,
        set_variable,
        children,
        line: raw.line,
        next_line: raw.next_line,
    }))
}

/// `$name` stays an unresolved reference; everything else is coerced now.
fn classify(token: &str) -> Arg {
    match variable_name(token) {
        Some(name) => Arg::Var(name.to_string()),
        None => Arg::Literal(coerce(token)),
    }
}

/// Name of a `$name` token, if the whole token is a variable reference.
pub fn variable_name(token: &str) -> Option<&str> {
    let name = token.strip_prefix('$')?;
    let valid = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
    valid.then_some(name)
}

/// Split `$name = rest` into `("name", "rest")`.
fn split_assignment(text: &str) -> Option<(&str, &str)> {
    let after_sigil = text.strip_prefix('$')?;
    let name_len = after_sigil
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(after_sigil.len());
    if name_len == 0 {
        return None;
    }
    let (name, after_name) = after_sigil.split_at(name_len);
    let rest = after_name.trim_start().strip_prefix('=')?;
    Some((name, rest.trim_start()))
}
