//! `echo`: print the arguments on one line.
//!
//! Arguments are joined with a single space; unset variables print as
//! nothing. The printed line is also the result.
//!
//! ```text
//! echo "Hello, World!"
//! $line = echo "x =" $x
//! ```
use async_trait::async_trait;

use crate::functions::{Command, CommandResult, Options, Registry};
use crate::outcome::Outcome;
use crate::value::Value;

pub struct Echo;

#[async_trait]
impl Command for Echo {
    async fn call(&self, _options: Options, args: Vec<Value>) -> CommandResult {
        let line = args
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        println!("{}", line);
        Ok(Outcome::from(line))
    }
}

pub fn register(registry: &mut Registry) {
    registry.register("echo", Echo);
}
