//! `random`: generate a random integer.
//!
//! Bounds are inclusive. With no arguments the range is `0..=i64::MAX`, with
//! one it is `0..=max`, with two it is `min..=max`.
//!
//! ```text
//! $r = random
//! $r = random 10
//! # roll a die
//! $r = random 1 6
//! ```
use async_trait::async_trait;
use rand::Rng;

use crate::error::CommandError;
use crate::functions::{int_arg, Command, CommandResult, Options, Registry};
use crate::outcome::Outcome;
use crate::value::Value;

pub struct Random;

#[async_trait]
impl Command for Random {
    async fn call(&self, _options: Options, args: Vec<Value>) -> CommandResult {
        let (min, max) = match args.len() {
            0 => (0, i64::MAX),
            1 => (0, int_arg("random", &args, 0)?),
            _ => (int_arg("random", &args, 0)?, int_arg("random", &args, 1)?),
        };

        if min > max {
            return Err(CommandError::InvalidArgument(format!(
                "random: min ({}) is greater than max ({})",
                min, max
            )));
        }

        let value = rand::thread_rng().gen_range(min..=max);
        Ok(Outcome::from(value))
    }
}

pub fn register(registry: &mut Registry) {
    registry.register("random", Random);
}
