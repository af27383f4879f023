//! Pipeline error types.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::error_code::ErrorCode;
use super::validation::ValidationReport;

/// A located failure: what went wrong, at which stage, and how to fix it.
///
/// `path` is a JSON-pointer-like stage address such as `/stages/3` or
/// `/stages/0/branches/1/stages/2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageError {
    pub code: ErrorCode,
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl StageError {
    pub fn new(code: ErrorCode, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            path: path.into(),
            message: message.into(),
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "[{}] {}: {}", self.code, path, self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, " (hint: {hint})")?;
        }
        Ok(())
    }
}

impl std::error::Error for StageError {}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Validation rejected the chain plan before binding.
    #[error("pipeline rejected: {0}")]
    Rejected(ValidationReport),
    /// A descriptor could not bind to its input shape.
    #[error("cannot bind stage: {0}")]
    Bind(StageError),
    /// A value failed a check deferred to run time.
    #[error("runtime failure: {0}")]
    Runtime(StageError),
    #[error("invalid engine configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl PipelineError {
    /// Internal invariant violation at `path`.
    pub fn internal(path: &str, message: impl Into<String>) -> Self {
        PipelineError::Runtime(StageError::new(ErrorCode::Internal, path, message))
    }

    /// Code of the first error carried.
    pub fn code(&self) -> ErrorCode {
        match self {
            PipelineError::Rejected(report) => report
                .errors()
                .next()
                .map_or(ErrorCode::Internal, |e| e.code),
            PipelineError::Bind(e) | PipelineError::Runtime(e) => e.code,
            PipelineError::Config(_) => ErrorCode::InvalidConfig,
        }
    }

    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            PipelineError::Rejected(report) => Some(report),
            _ => None,
        }
    }

    /// The located error, when there is exactly one.
    pub fn stage_error(&self) -> Option<&StageError> {
        match self {
            PipelineError::Bind(e) | PipelineError::Runtime(e) => Some(e),
            PipelineError::Rejected(report) => report.errors().next(),
            PipelineError::Config(_) => None,
        }
    }
}

impl From<StageError> for PipelineError {
    fn from(err: StageError) -> Self {
        PipelineError::Bind(err)
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
