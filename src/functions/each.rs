//! `each`: run the nested block once for every argument.
//!
//! List arguments are flattened, so a captured list can be iterated too.
//! `--start=N` skips the first N items.
//!
//! ```text
//! $item = each "Alice" "Bob" "Charlie" {
//!     echo "hello" $item
//! }
//! ```
//!
//! Without `$name =`, the block still runs once per item but nothing is bound.
use async_trait::async_trait;

use crate::functions::{Command, CommandResult, Options, Registry};
use crate::error::CommandError;
use crate::outcome::Outcome;
use crate::value::Value;

pub struct Each;

#[async_trait]
impl Command for Each {
    async fn call(&self, options: Options, args: Vec<Value>) -> CommandResult {
        let start = match options.get("start") {
            None => 0,
            Some(value) => value
                .as_int()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| {
                    CommandError::InvalidArgument(format!(
                        "each: --start must be a non-negative integer, got '{}'",
                        value
                    ))
                })?,
        };

        let items = args.into_iter().flat_map(|arg| match arg {
            Value::List(items) => items,
            other => vec![other],
        });
        Ok(Outcome::repeat(items.skip(start)))
    }
}

pub fn register(registry: &mut Registry) {
    registry.register("each", Each);
}
