//! `sleep`: suspend for the given number of milliseconds.
//!
//! Only the branch running the command waits: with `--async`, the rest of the
//! workflow carries on and the nested block runs once the sleep finishes.
//! The result is the duration slept.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CommandError;
use crate::functions::{int_arg, Command, CommandResult, Options, Registry};
use crate::outcome::Outcome;
use crate::value::Value;

pub struct Sleep;

#[async_trait]
impl Command for Sleep {
    async fn call(&self, _options: Options, args: Vec<Value>) -> CommandResult {
        let millis = int_arg("sleep", &args, 0)?;
        let duration = u64::try_from(millis).map_err(|_| {
            CommandError::InvalidArgument(format!(
                "sleep: duration must not be negative, got {}",
                millis
            ))
        })?;

        tokio::time::sleep(Duration::from_millis(duration)).await;
        Ok(Outcome::from(millis))
    }
}

pub fn register(registry: &mut Registry) {
    registry.register("sleep", Sleep);
}
