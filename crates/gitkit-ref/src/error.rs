use std::path::PathBuf;

/// Error types for reference reading.
#[derive(Debug, thiserror::Error)]
pub enum RefError {
    #[error("symbolic ref loop detected starting at {0}")]
    SymrefLoop(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("I/O error on {path}: {source}")]
    IoPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Hash(#[from] gitkit_hash::HashError),
}
