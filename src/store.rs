use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::value::Value;

/// Variable storage shared by every branch of one execution.
///
/// Hosts may plug in their own backing store. `get` on a name that was never
/// set must return [`Value::Absent`].
pub trait Store: Send + Sync {
    fn get(&self, name: &str) -> Value;
    fn set(&self, name: &str, value: Value);
}

/// The default store: a map behind one mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    variables: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every variable currently set.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.variables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn get(&self, name: &str) -> Value {
        self.lock().get(name).cloned().unwrap_or(Value::Absent)
    }

    fn set(&self, name: &str, value: Value) {
        self.lock().insert(name.to_string(), value);
    }
}
