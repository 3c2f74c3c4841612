use thiserror::Error;

use policy_api::{BoxError, ExecutionFailure, ExecutionPhase};

/// Errors raised while starting a deployed context or building policy
/// instances and chains. None of these occur on the per-request hot path
/// once a chain is cached.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to load policy manifest {name}")]
    ManifestLoad { name: String },
    #[error("failed to activate policy plugin {name}: {source}")]
    ManifestActivation {
        name: String,
        #[source]
        source: BoxError,
    },
    #[error("no default policy factory found")]
    NoDefaultFactory,
    #[error("policy {name} cannot run on phase {phase}")]
    UnsupportedPhase {
        name: String,
        phase: ExecutionPhase,
    },
    #[error("invalid configuration for policy {name}: {source}")]
    InvalidConfiguration {
        name: String,
        #[source]
        source: BoxError,
    },
    #[error("policy manager is not started")]
    NotStarted,
}

/// Terminal result of one chain execution when it does not complete. An
/// interruption is a policy's deliberate stop and is reported as its own
/// kind so the caller can render the policy-produced response instead of
/// an error page.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("policy {policy} failed in chain {chain}: {source}")]
    PolicyFailed {
        chain: String,
        policy: String,
        #[source]
        source: BoxError,
    },
    #[error("chain {chain} interrupted by policy {policy}")]
    Interrupted {
        chain: String,
        policy: String,
        failure: Option<ExecutionFailure>,
    },
}

impl ChainError {
    pub fn is_interruption(&self) -> bool {
        matches!(self, Self::Interrupted { .. })
    }

    pub fn policy(&self) -> &str {
        match self {
            Self::PolicyFailed { policy, .. } | Self::Interrupted { policy, .. } => policy,
        }
    }

    pub fn failure(&self) -> Option<&ExecutionFailure> {
        match self {
            Self::Interrupted { failure, .. } => failure.as_ref(),
            Self::PolicyFailed { .. } => None,
        }
    }
}
