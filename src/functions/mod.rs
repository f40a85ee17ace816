use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CommandError;
use crate::outcome::Outcome;
use crate::value::Value;

/// The option bag a command receives: resolved `--name[=value]` options, plus
/// [`crate::CAPTURE_FLAG`] when the caller binds the result to a variable.
pub type Options = BTreeMap<String, Value>;

pub type CommandResult = std::result::Result<Outcome, CommandError>;

// ---------------------------------------------------------------------------
// Core trait
// ---------------------------------------------------------------------------

/// Implement this trait to make a command available to workflows.
///
/// # Calling convention
/// - `options`: resolved options, see [`Options`].
/// - `args`: resolved positional arguments, in source order. Unset
///   variables arrive as [`Value::Absent`].
///
/// Return an [`Outcome::Value`] to produce a result, or an
/// [`Outcome::Repeat`] to have the nested block run once per item.
#[async_trait]
pub trait Command: Send + Sync {
    async fn call(&self, options: Options, args: Vec<Value>) -> CommandResult;
}

/// Adapter for plain synchronous closures.
pub struct FnCommand<F>(pub F);

#[async_trait]
impl<F> Command for FnCommand<F>
where
    F: Fn(Options, Vec<Value>) -> CommandResult + Send + Sync,
{
    async fn call(&self, options: Options, args: Vec<Value>) -> CommandResult {
        (self.0)(options, args)
    }
}

/// Adapter for closures returning a future.
pub struct AsyncFnCommand<F>(pub F);

#[async_trait]
impl<F, Fut> Command for AsyncFnCommand<F>
where
    F: Fn(Options, Vec<Value>) -> Fut + Send + Sync,
    Fut: Future<Output = CommandResult> + Send,
{
    async fn call(&self, options: Options, args: Vec<Value>) -> CommandResult {
        (self.0)(options, args).await
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Command name → implementation.
#[derive(Clone, Default)]
pub struct Registry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in commands.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_all(&mut registry);
        registry
    }

    pub fn register<C: Command + 'static>(&mut self, name: &str, command: C) {
        self.commands.insert(name.to_string(), Arc::new(command));
    }

    pub fn register_fn<F>(&mut self, name: &str, f: F)
    where
        F: Fn(Options, Vec<Value>) -> CommandResult + Send + Sync + 'static,
    {
        self.register(name, FnCommand(f));
    }

    pub fn register_async<F, Fut>(&mut self, name: &str, f: F)
    where
        F: Fn(Options, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult> + Send + 'static,
    {
        self.register(name, AsyncFnCommand(f));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// Built-in commands
// Ordinary registry entries the binary installs so scripts can do real work.
// The evaluator gives them no special treatment.
// ---------------------------------------------------------------------------

pub mod each;      // each
pub mod echo;      // echo
pub mod random;    // random
pub mod readfile;  // readfile
pub mod repeat;    // repeat
pub mod sleep;     // sleep
pub mod writefile; // writefile

/// Register every built-in command.
pub fn register_all(registry: &mut Registry) {
    each::register(registry);
    echo::register(registry);
    random::register(registry);
    readfile::register(registry);
    repeat::register(registry);
    sleep::register(registry);
    writefile::register(registry);
}

/// Integer argument at `index`, or an error naming the command.
pub(crate) fn int_arg(command: &str, args: &[Value], index: usize) -> Result<i64, CommandError> {
    let value = args.get(index).ok_or_else(|| {
        CommandError::InvalidArgument(format!("{}: missing argument {}", command, index + 1))
    })?;
    value.as_int().ok_or_else(|| {
        CommandError::InvalidArgument(format!("{}: '{}' is not an integer", command, value))
    })
}

/// Text argument at `index`, or an error naming the command.
pub(crate) fn text_arg(command: &str, args: &[Value], index: usize) -> Result<String, CommandError> {
    match args.get(index) {
        Some(Value::Absent) | None => Err(CommandError::InvalidArgument(format!(
            "{}: missing argument {}",
            command,
            index + 1
        ))),
        Some(value) => Ok(value.to_string()),
    }
}
