//! Error types.
//!
//! The library stages return [`PipelineError`]; the binary boundary converts it
//! into [`AppError`], which carries the process exit code and the one-line
//! diagnostic printed to stderr.

use std::path::PathBuf;

use thiserror::Error;

/// Which pipeline stage produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Load,
    Clean,
    Detect,
    Report,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Load => "load",
            Stage::Clean => "clean",
            Stage::Detect => "detect",
            Stage::Report => "report",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Fatal errors raised by the load/clean/detect/report stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input file '{}' does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("{0}")]
    Input(String),

    #[error("CSV parse error on line {line}: {message}")]
    Csv { line: usize, message: String },

    #[error("line {line}: unparseable date '{value}' (expected YYYY-MM-DD or M/D/YYYY)")]
    MalformedDate { line: usize, value: String },

    #[error("column `{column}` has no values to compute a median from")]
    InsufficientData { column: &'static str },

    #[error("daily series of {n} point(s) has no meaningful z-score: {reason}")]
    DegenerateSeries { n: usize, reason: &'static str },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::NotFound { .. } | PipelineError::Input(_) | PipelineError::Csv { .. } => {
                Stage::Load
            }
            PipelineError::MalformedDate { .. } | PipelineError::InsufficientData { .. } => Stage::Clean,
            PipelineError::DegenerateSeries { .. } => Stage::Detect,
            PipelineError::Config(_) => Stage::Config,
            PipelineError::Io { .. } => Stage::Report,
        }
    }

    /// Process exit code: 2 for bad input/config, 3 for statistical
    /// preconditions, 4 for output failures.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::NotFound { .. }
            | PipelineError::Input(_)
            | PipelineError::Csv { .. }
            | PipelineError::MalformedDate { .. }
            | PipelineError::Config(_) => 2,
            PipelineError::InsufficientData { .. } | PipelineError::DegenerateSeries { .. } => 3,
            PipelineError::Io { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::new(err.exit_code(), format!("{} stage failed: {err}", err.stage()))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
