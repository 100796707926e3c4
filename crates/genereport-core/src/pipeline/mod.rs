//! Genetic sample pipeline.
//!
//! Pipeline: Upload → ResultFile (blob + row) → Mutation extraction → Report generation

mod extractor;
mod ingestion;
mod orchestrator;
mod parser;
mod prompt;

pub use extractor::*;
pub use ingestion::*;
pub use orchestrator::*;
pub use parser::*;
pub use prompt::*;

use genereport_llm::GenerationError;
use thiserror::Error;

use crate::db::DbError;
use crate::storage::StorageError;

/// Failure categories visible to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Misconfigured,
    Conflict,
    Validation,
    ExternalService,
    Database,
}

/// Pipeline errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("AI backend is not configured")]
    Misconfigured,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Malformed result file: {0}")]
    Parse(#[from] ParseError),

    #[error("Object storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("AI backend error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Database error: {0}")]
    Database(DbError),
}

impl From<DbError> for PipelineError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Conflict(msg) => PipelineError::Conflict(msg),
            DbError::NotFound(msg) => PipelineError::NotFound(msg),
            other => PipelineError::Database(other),
        }
    }
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::NotFound(_) => ErrorKind::NotFound,
            PipelineError::Misconfigured => ErrorKind::Misconfigured,
            PipelineError::Conflict(_) => ErrorKind::Conflict,
            PipelineError::Validation(_) | PipelineError::Parse(_) => ErrorKind::Validation,
            PipelineError::Storage(_) | PipelineError::Generation(_) => ErrorKind::ExternalService,
            PipelineError::Database(_) => ErrorKind::Database,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
