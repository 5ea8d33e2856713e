//! Pipeline error kinds.
//!
//! Shape and invariant failures always carry their structured report so the
//! correction loop (or a person) can act on them directly.

use crate::generator::GeneratorError;
use crate::validation::{ShapeReport, ValidationReport};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("rules text is empty; nothing to ground a generation on")]
    EmptyRules,

    #[error("generator did not return a configuration within {timeout:?}")]
    GenerationTimeout { timeout: Duration },

    #[error("generator did not return revised rules within {timeout:?}")]
    RevisionTimeout { timeout: Duration },

    #[error("generator output does not match the configuration schema: {report}")]
    SchemaConformance { report: ShapeReport },

    #[error("configuration violates invariants: {0}")]
    Validation(ValidationReport),

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("persistence failed at {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rules store unavailable: {0}")]
    RulesStore(String),

    #[error("generator call failed: {0}")]
    Generator(#[from] GeneratorError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Report attached to shape or invariant failures, if any.
    pub fn report(&self) -> Option<ValidationReport> {
        match self {
            PipelineError::SchemaConformance { report } => Some(report.clone().into()),
            PipelineError::Validation(report) => Some(report.clone()),
            _ => None,
        }
    }
}
