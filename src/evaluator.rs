use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinError;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use crate::ast::{Action, Arg};
use crate::error::{ExecutionError, Failure};
use crate::functions::{Command, Options, Registry};
use crate::outcome::Outcome;
use crate::store::{MemoryStore, Store};
use crate::value::Value;
use crate::CAPTURE_FLAG;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Runs parsed actions against a command registry.
///
/// Synchronous actions run strictly in source order. An action carrying the
/// [`crate::ASYNC_OPTION`] option is dispatched without waiting: its result is
/// stored and its nested block run on an independent task, while the
/// sequence it belongs to moves on. A run finishes once the sequence and
/// every task it spawned, at any depth, have finished.
#[derive(Clone)]
pub struct Evaluator {
    registry: Arc<Registry>,
}

impl Evaluator {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Run `actions` with a fresh in-memory store.
    pub async fn run(&self, actions: &[Action]) -> Result<(), ExecutionError> {
        self.run_with_store(actions, Arc::new(MemoryStore::new())).await
    }

    /// Run `actions` against a host-supplied store.
    ///
    /// A failing synchronous action stops the sequence it belongs to, but
    /// branches already spawned are still awaited. Every failure is returned,
    /// not just the first.
    pub async fn run_with_store(
        &self,
        actions: &[Action],
        store: Arc<dyn Store>,
    ) -> Result<(), ExecutionError> {
        info!(actions = actions.len(), "execution started");
        let execution = Arc::new(Execution {
            registry: self.registry.clone(),
            store,
            tracker: TaskTracker::new(),
            failures: Mutex::new(Vec::new()),
        });

        if let Err(failure) = execution.run_block(actions).await {
            execution.record(failure);
        }

        execution.tracker.close();
        execution.tracker.wait().await;

        let failures = mem::take(&mut *execution.failures());
        info!(failures = failures.len(), "execution finished");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ExecutionError { failures })
        }
    }
}

/// State shared by the driver and every spawned branch of one run.
struct Execution {
    registry: Arc<Registry>,
    store: Arc<dyn Store>,
    tracker: TaskTracker,
    failures: Mutex<Vec<Failure>>,
}

impl Execution {
    fn failures(&self) -> std::sync::MutexGuard<'_, Vec<Failure>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, failure: Failure) {
        warn!(
            command = failure.command(),
            line = failure.line(),
            "{}",
            failure
        );
        self.failures().push(failure);
    }

    /// Run a sequence in order, stopping at the first failure.
    fn run_block<'a>(
        self: &'a Arc<Self>,
        actions: &'a [Action],
    ) -> BoxFuture<'a, Result<(), Failure>> {
        Box::pin(async move {
            for action in actions {
                self.run_action(action).await?;
            }
            Ok(())
        })
    }

    async fn run_action(self: &Arc<Self>, action: &Action) -> Result<(), Failure> {
        let args: Vec<Value> = action.args.iter().map(|arg| self.resolve(arg)).collect();
        let mut options: Options = action
            .options
            .iter()
            .map(|(name, arg)| (name.clone(), self.resolve(arg)))
            .collect();
        if action.set_variable.is_some() {
            options
                .entry(CAPTURE_FLAG.to_string())
                .or_insert(Value::Bool(true));
        }

        let Some(command) = self.registry.get(&action.command) else {
            let failure = Failure::UnknownCommand {
                command: action.command.clone(),
                line: action.line,
            };
            if action.is_async() {
                // Only the branch that would have started here fails.
                self.record(failure);
                return Ok(());
            }
            return Err(failure);
        };

        debug!(
            command = %action.command,
            line = action.line,
            is_async = action.is_async(),
            "dispatch"
        );

        if !action.is_async() {
            let outcome = self.call(action, command, options, args).await?;
            return self.settle(action, outcome).await;
        }

        let execution = Arc::clone(self);
        let action = action.clone();
        self.tracker.spawn(async move {
            let result = match execution.call(&action, command, options, args).await {
                Ok(outcome) => execution.settle(&action, outcome).await,
                Err(failure) => Err(failure),
            };
            if let Err(failure) = result {
                execution.record(failure);
            }
        });
        Ok(())
    }

    /// Invoke `command` on its own task, so a panicking implementation
    /// becomes a [`Failure::Panicked`] for this action.
    async fn call(
        &self,
        action: &Action,
        command: Arc<dyn Command>,
        options: Options,
        args: Vec<Value>,
    ) -> Result<Outcome, Failure> {
        let task = self
            .tracker
            .spawn(async move { command.call(options, args).await });
        match task.await {
            Ok(result) => result.map_err(|source| command_failure(action, source)),
            Err(error) => Err(Failure::Panicked {
                command: action.command.clone(),
                line: action.line,
                message: panic_message(error),
            }),
        }
    }

    /// Store a finished command's result and run its nested block, once, or
    /// once per item for a [`Outcome::Repeat`].
    async fn settle(self: &Arc<Self>, action: &Action, outcome: Outcome) -> Result<(), Failure> {
        match outcome {
            Outcome::Value(value) => {
                self.bind(action, value);
                self.run_block(&action.children).await
            }
            Outcome::Repeat(repeat) => {
                trace!(command = %action.command, size_hint = ?repeat.size_hint(), "repeat");
                for item in repeat.into_items() {
                    self.bind(action, item);
                    self.run_block(&action.children).await?;
                }
                Ok(())
            }
        }
    }

    fn bind(&self, action: &Action, value: Value) {
        if let Some(name) = &action.set_variable {
            trace!(variable = %name, ?value, "set");
            self.store.set(name, value);
        }
    }

    fn resolve(&self, arg: &Arg) -> Value {
        match arg {
            Arg::Literal(value) => value.clone(),
            Arg::Var(name) => self.store.get(name),
        }
    }
}

fn panic_message(error: JoinError) -> String {
    match error.try_into_panic() {
        Ok(payload) => match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => payload
                .downcast_ref::<&str>()
                .map(|message| message.to_string())
                .unwrap_or_else(|| "non-string panic payload".to_string()),
        },
        Err(error) => error.to_string(),
    }
}

fn command_failure(action: &Action, source: crate::error::CommandError) -> Failure {
    Failure::Command {
        command: action.command.clone(),
        line: action.line,
        source,
    }
}
