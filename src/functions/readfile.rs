//! `readfile`: read the entire contents of a file.
//!
//! ```text
//! $contents = readfile "hello.txt"
//! ```
use async_trait::async_trait;

use crate::functions::{text_arg, Command, CommandResult, Options, Registry};
use crate::outcome::Outcome;
use crate::value::Value;

pub struct ReadFile;

#[async_trait]
impl Command for ReadFile {
    async fn call(&self, _options: Options, args: Vec<Value>) -> CommandResult {
        let path = text_arg("readfile", &args, 0)?;
        let contents = tokio::fs::read_to_string(&path).await?;
        Ok(Outcome::from(contents))
    }
}

pub fn register(registry: &mut Registry) {
    registry.register("readfile", ReadFile);
}
