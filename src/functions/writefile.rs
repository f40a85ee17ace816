//! `writefile`: write (or overwrite) a file with the given content.
//!
//! The first argument is the file path; all remaining arguments are
//! concatenated and written as the file content. `--append` adds to the end
//! of the file instead. The result is the content that was written.
//!
//! ```text
//! writefile "out.txt" "Hello, World!"
//! writefile "out.txt" "more" --append
//! ```
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::CommandError;
use crate::functions::{text_arg, Command, CommandResult, Options, Registry};
use crate::outcome::Outcome;
use crate::value::Value;

pub struct WriteFile;

#[async_trait]
impl Command for WriteFile {
    async fn call(&self, options: Options, args: Vec<Value>) -> CommandResult {
        if args.len() < 2 {
            return Err(CommandError::InvalidArgument(
                "writefile: requires a path and content".into(),
            ));
        }
        let path = text_arg("writefile", &args, 0)?;
        let content: String = args[1..].iter().map(ToString::to_string).collect();

        let append = options.get("append").and_then(Value::as_bool).unwrap_or(false);
        if append {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await?;
            file.write_all(content.as_bytes()).await?;
            file.flush().await?;
        } else {
            tokio::fs::write(&path, &content).await?;
        }
        Ok(Outcome::from(content))
    }
}

pub fn register(registry: &mut Registry) {
    registry.register("writefile", WriteFile);
}
