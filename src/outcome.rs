//! What a command hands back to the evaluator.
//!
//! Most commands return a plain [`Value`]. A command that wants its nested
//! block run once per item returns a [`Repeat`] instead; the evaluator then
//! binds each item to the action's variable and runs the block for it. Any
//! command can opt into this, the evaluator never looks at command names.

use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// Per-item mapping applied before an item is bound.
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

#[derive(Debug)]
pub enum Outcome {
    Value(Value),
    Repeat(Repeat),
}

impl Outcome {
    /// No result. Stored as [`Value::Absent`] if the action captures it.
    pub fn none() -> Self {
        Outcome::Value(Value::Absent)
    }

    pub fn repeat<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value> + 'static,
        I::IntoIter: Send + 'static,
    {
        Outcome::Repeat(Repeat::new(items))
    }
}

impl From<Value> for Outcome {
    fn from(value: Value) -> Self {
        Outcome::Value(value)
    }
}

impl From<&str> for Outcome {
    fn from(s: &str) -> Self {
        Outcome::Value(s.into())
    }
}

impl From<String> for Outcome {
    fn from(s: String) -> Self {
        Outcome::Value(s.into())
    }
}

impl From<i64> for Outcome {
    fn from(n: i64) -> Self {
        Outcome::Value(n.into())
    }
}

impl From<bool> for Outcome {
    fn from(b: bool) -> Self {
        Outcome::Value(b.into())
    }
}

impl From<Repeat> for Outcome {
    fn from(repeat: Repeat) -> Self {
        Outcome::Repeat(repeat)
    }
}

/// Items to run a nested block for, produced one at a time, with an optional
/// transform. Nothing is materialized up front, so `repeat` with a huge count
/// costs only the iterations actually run.
pub struct Repeat {
    items: Box<dyn Iterator<Item = Value> + Send>,
    transform: Option<Transform>,
}

impl Repeat {
    pub fn new<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value> + 'static,
        I::IntoIter: Send + 'static,
    {
        Self {
            items: Box::new(items.into_iter().map(Into::into)),
            transform: None,
        }
    }

    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Bounds on the number of items still to come.
    pub fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }

    /// Items in order, each already passed through the transform.
    pub fn into_items(self) -> impl Iterator<Item = Value> + Send {
        let transform = self.transform;
        self.items.map(move |item| match &transform {
            Some(f) => f(item),
            None => item,
        })
    }
}

impl fmt::Debug for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repeat")
            .field("size_hint", &self.items.size_hint())
            .field("transform", &self.transform.is_some())
            .finish()
    }
}
