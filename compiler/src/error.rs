use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Schema(#[from] protoforge_schema::SchemaError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to write artifact for {type_name} at {path}: {source}")]
    Emit {
        type_name: String,
        path:      PathBuf,
        source:    std::io::Error,
    },

    #[error("worker thread panicked")]
    WorkerPanic,
}
