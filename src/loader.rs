use std::path::Path;

use tracing::debug;

use crate::ast::Action;
use crate::error::{Error, Result};
use crate::parser::{self, ParserConfig};

/// Read a workflow file and parse it.
///
/// A file that cannot be read fails with [`Error::Io`] before any parsing.
pub async fn load_file(path: impl AsRef<Path>) -> Result<Vec<Action>> {
    load_file_with(path, &ParserConfig::default()).await
}

pub async fn load_file_with(path: impl AsRef<Path>, config: &ParserConfig) -> Result<Vec<Action>> {
    let path = path.as_ref();
    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), bytes = source.len(), "loaded workflow");
    Ok(parser::parse_with(&source, config)?)
}
