//! `repeat`: run the nested block a fixed number of times.
//!
//! The bound variable holds the 1-based iteration number.
//!
//! ```text
//! $i = repeat 5 {
//!     echo "iteration" $i
//! }
//! ```
use async_trait::async_trait;

use crate::error::CommandError;
use crate::functions::{int_arg, Command, CommandResult, Options, Registry};
use crate::outcome::Outcome;
use crate::value::Value;

pub struct Repeat;

#[async_trait]
impl Command for Repeat {
    async fn call(&self, _options: Options, args: Vec<Value>) -> CommandResult {
        let count = int_arg("repeat", &args, 0)?;
        if count < 0 {
            return Err(CommandError::InvalidArgument(format!(
                "repeat: count must not be negative, got {}",
                count
            )));
        }
        Ok(Outcome::repeat(1..=count))
    }
}

pub fn register(registry: &mut Registry) {
    registry.register("repeat", Repeat);
}
