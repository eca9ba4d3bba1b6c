use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrunksyncError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("svn {operation} failed: {detail}")]
    ExecutionError { operation: String, detail: String },
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Config error: {0}")]
    ConfigError(String),
}
