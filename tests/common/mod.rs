#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use wfl::{CommandError, Options, Outcome, Registry, Value};

/// One recorded invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub command: String,
    pub options: Options,
    pub args: Vec<Value>,
    pub at: Instant,
}

/// Shared log of every call made through recording commands.
#[derive(Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<Call>>>);

impl Calls {
    fn push(&self, command: &str, options: &Options, args: &[Value]) {
        self.0.lock().unwrap().push(Call {
            command: command.to_string(),
            options: options.clone(),
            args: args.to_vec(),
            at: Instant::now(),
        });
    }

    pub fn all(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn of(&self, command: &str) -> Vec<Call> {
        self.all()
            .into_iter()
            .filter(|c| c.command == command)
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.all().into_iter().map(|c| c.command).collect()
    }
}

/// Register `name` as a command that records its call and returns nothing.
pub fn record(registry: &mut Registry, calls: &Calls, name: &'static str) {
    record_returning(registry, calls, name, |_, _| Outcome::none());
}

/// Register `name` as a command that records its call and returns `f(..)`.
pub fn record_returning<F>(registry: &mut Registry, calls: &Calls, name: &'static str, f: F)
where
    F: Fn(&Options, &[Value]) -> Outcome + Send + Sync + 'static,
{
    let calls = calls.clone();
    registry.register_fn(name, move |options, args| {
        calls.push(name, &options, &args);
        Ok(f(&options, &args))
    });
}

/// Register `name` as a command that records its call, waits `millis`, then
/// returns `value`.
pub fn record_delayed(
    registry: &mut Registry,
    calls: &Calls,
    name: &'static str,
    millis: u64,
    value: Value,
) {
    let calls = calls.clone();
    registry.register_async(name, move |options, args| {
        calls.push(name, &options, &args);
        let value = value.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok::<_, CommandError>(Outcome::Value(value))
        }
    });
}

/// Register `name` as a command that records its call and fails.
pub fn record_failing(registry: &mut Registry, calls: &Calls, name: &'static str) {
    let calls = calls.clone();
    registry.register_fn(name, move |options, args| {
        calls.push(name, &options, &args);
        Err(CommandError::Failed(format!("{} exploded", name)))
    });
}

pub fn s(text: &str) -> Value {
    Value::from(text)
}

pub fn captured() -> Options {
    let mut options = Options::new();
    options.insert(wfl::CAPTURE_FLAG.to_string(), Value::Bool(true));
    options
}
