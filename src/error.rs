use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Syntax errors. Each one aborts the whole parse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: unbalanced '}}' with no open block")]
    UnbalancedBrace { line: usize },

    #[error("line {line}: block opened here is never closed")]
    UnclosedBlock { line: usize },

    #[error("line {line}: block has no command to attach to")]
    OrphanBlock { line: usize },

    #[error("line {line}: assignment to ${name} has no command")]
    MalformedAssignment { line: usize, name: String },

    #[error("line {line}: command name cannot be a variable reference: '{token}'")]
    VariableAsCommand { line: usize, token: String },

    #[error("line {line}: option with an empty name: '{token}'")]
    EmptyOptionName { line: usize, token: String },

    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },

    #[error("line {line}: blocks nested deeper than {limit} levels")]
    NestingTooDeep { line: usize, limit: usize },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            Self::UnbalancedBrace { line }
            | Self::UnclosedBlock { line }
            | Self::OrphanBlock { line }
            | Self::MalformedAssignment { line, .. }
            | Self::VariableAsCommand { line, .. }
            | Self::EmptyOptionName { line, .. }
            | Self::UnterminatedString { line }
            | Self::NestingTooDeep { line, .. } => *line,
        }
    }
}

/// Error reported by a command implementation.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Failed(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One failed branch of an execution.
#[derive(Debug, Error)]
pub enum Failure {
    #[error("line {line}: unknown command '{command}'")]
    UnknownCommand { command: String, line: usize },

    #[error("line {line}: '{command}' failed: {source}")]
    Command {
        command: String,
        line: usize,
        #[source]
        source: CommandError,
    },

    #[error("line {line}: '{command}' panicked: {message}")]
    Panicked {
        command: String,
        line: usize,
        message: String,
    },
}

impl Failure {
    pub fn command(&self) -> &str {
        match self {
            Self::UnknownCommand { command, .. }
            | Self::Command { command, .. }
            | Self::Panicked { command, .. } => command,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Self::UnknownCommand { line, .. }
            | Self::Command { line, .. }
            | Self::Panicked { line, .. } => *line,
        }
    }
}

/// Every branch failure collected over one execution. Never empty.
#[derive(Debug)]
pub struct ExecutionError {
    pub failures: Vec<Failure>,
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} branch(es) failed", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  {}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExecutionError {}

#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("cannot serialize actions: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
