use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid overscan crop value \"{0}\"")]
    InvalidOverscan(String),

    #[error("Failed to fill template \"{template}\": {reason}")]
    Template { template: String, reason: String },

    #[error(
        "FFprobe couldn't read information about input file: \"{}\". Error message: {}",
        .path.display(),
        .message
    )]
    Probe { path: PathBuf, message: String },

    #[error("FFprobe couldn't read resolution from input file: \"{}\"", .0.display())]
    MissingResolution(PathBuf),

    #[error("Division by zero while computing {0}")]
    DivisionByZero(&'static str),

    #[error("Not implemented: {0}")]
    Unsupported(String),

    #[error("Expected exactly one frame collection, found {0}")]
    AmbiguousSequence(usize),

    #[error("Missing previously detected file: {}", .0.display())]
    MissingFrame(PathBuf),

    #[error("{tool} failed with exit code: {code:?}\nOutput:\n{output}")]
    ToolFailed {
        tool: String,
        code: Option<i32>,
        output: String,
    },
}

pub type Result<T> = std::result::Result<T, ReviewError>;
