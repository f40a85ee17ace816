//! WFL: a small workflow command language.
//!
//! A workflow is a sequence of commands with positional arguments and
//! `--name[=value]` options. A command may capture its result
//! (`$name = command ...`), own a nested `{ ... }` block that runs after it
//! settles, and run asynchronously with `--async`.
//!
//! ```text
//! $page = fetch http://example.com --async {
//!     writefile /tmp/page.html $page
//! }
//! $item = each 1 2 3 {
//!     echo "item" $item
//! }
//! ```
//!
//! Commands are not part of the language: the host supplies them through a
//! [`Registry`], and the [`Evaluator`] only orchestrates calls.

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod loader;
pub mod outcome;
pub mod parser;
pub mod store;
pub mod value;

use std::sync::Arc;

pub use ast::{Action, Arg};
pub use error::{CommandError, Error, ExecutionError, Failure, ParseError, Result};
pub use evaluator::Evaluator;
pub use functions::{Command, CommandResult, Options, Registry};
pub use loader::load_file;
pub use outcome::{Outcome, Repeat};
pub use parser::{parse, parse_with, ParserConfig};
pub use store::{MemoryStore, Store};
pub use value::{coerce, Value};

/// Option that makes a call asynchronous. Its value is ignored.
pub const ASYNC_OPTION: &str = "async";

/// Option added to a call whose result is bound to a variable. An explicit
/// option of the same name in the source is left alone.
pub const CAPTURE_FLAG: &str = "__hasReturn";

/// Parse `source` and run it with a fresh store.
pub async fn run_source(source: &str, registry: Registry) -> Result<()> {
    let actions = parse(source)?;
    Evaluator::new(registry).run(&actions).await?;
    Ok(())
}

/// Parse `source` and run it against `store`.
pub async fn run_source_with_store(
    source: &str,
    registry: Registry,
    store: Arc<dyn Store>,
) -> Result<()> {
    let actions = parse(source)?;
    Evaluator::new(registry)
        .run_with_store(&actions, store)
        .await?;
    Ok(())
}
