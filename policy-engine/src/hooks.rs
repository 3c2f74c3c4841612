use policy_api::{BoxError, ExecutionContext, ExecutionPhase, PolicyError};
use tracing::debug;

/// Which phase family a hook observes: plain request/response execution or
/// message-level execution.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HookFamily {
    Policy,
    Message,
}

impl HookFamily {
    pub fn of(phase: ExecutionPhase) -> Self {
        if phase.is_message() {
            Self::Message
        } else {
            Self::Policy
        }
    }
}

/// Cross-cutting instrumentation invoked immediately before and after each
/// policy execution. Hooks are observability, not control flow: the chain
/// logs and discards hook errors, and a hook must never mutate policy
/// semantics.
pub trait ChainHook: Send + Sync {
    fn family(&self) -> HookFamily;

    fn pre(
        &self,
        policy_id: &str,
        phase: ExecutionPhase,
        ctx: &ExecutionContext,
    ) -> Result<(), BoxError>;

    fn post(
        &self,
        policy_id: &str,
        phase: ExecutionPhase,
        ctx: &ExecutionContext,
        error: Option<&PolicyError>,
    ) -> Result<(), BoxError>;
}

/// Tracing instrumentation for request/response policy executions.
pub struct TracingPolicyHook;

impl ChainHook for TracingPolicyHook {
    fn family(&self) -> HookFamily {
        HookFamily::Policy
    }

    fn pre(
        &self,
        policy_id: &str,
        phase: ExecutionPhase,
        _ctx: &ExecutionContext,
    ) -> Result<(), BoxError> {
        debug!(policy = %policy_id, phase = %phase, "policy execution starting");
        Ok(())
    }

    fn post(
        &self,
        policy_id: &str,
        phase: ExecutionPhase,
        _ctx: &ExecutionContext,
        error: Option<&PolicyError>,
    ) -> Result<(), BoxError> {
        match error {
            None => debug!(policy = %policy_id, phase = %phase, "policy execution completed"),
            Some(err) => {
                debug!(policy = %policy_id, phase = %phase, error = %err, "policy execution ended")
            }
        }
        Ok(())
    }
}

/// Tracing instrumentation for message-level policy executions.
pub struct TracingMessageHook;

impl ChainHook for TracingMessageHook {
    fn family(&self) -> HookFamily {
        HookFamily::Message
    }

    fn pre(
        &self,
        policy_id: &str,
        phase: ExecutionPhase,
        _ctx: &ExecutionContext,
    ) -> Result<(), BoxError> {
        debug!(policy = %policy_id, phase = %phase, "message policy execution starting");
        Ok(())
    }

    fn post(
        &self,
        policy_id: &str,
        phase: ExecutionPhase,
        _ctx: &ExecutionContext,
        error: Option<&PolicyError>,
    ) -> Result<(), BoxError> {
        match error {
            None => {
                debug!(policy = %policy_id, phase = %phase, "message policy execution completed")
            }
            Some(err) => {
                debug!(policy = %policy_id, phase = %phase, error = %err, "message policy execution ended")
            }
        }
        Ok(())
    }
}
