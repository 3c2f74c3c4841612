use thiserror::Error;

use crate::context::ExecutionFailure;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Completion signal of a single policy invocation. `Interrupted` is a
/// deliberate early stop of the pipeline, distinct from an ordinary
/// failure, and may carry a failure payload for the caller to render.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy execution failed: {source}")]
    Failed {
        #[source]
        source: BoxError,
    },
    #[error("policy interrupted the chain")]
    Interrupted { failure: Option<ExecutionFailure> },
}

impl PolicyError {
    pub fn failure(source: impl Into<BoxError>) -> Self {
        Self::Failed {
            source: source.into(),
        }
    }

    pub fn interrupt() -> Self {
        Self::Interrupted { failure: None }
    }

    pub fn interrupt_with(failure: ExecutionFailure) -> Self {
        Self::Interrupted {
            failure: Some(failure),
        }
    }

    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }
}

pub type PolicyResult = Result<(), PolicyError>;
