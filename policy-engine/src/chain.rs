use std::sync::Arc;

use tracing::{debug, warn};

use policy_api::{ExecutionContext, ExecutionPhase, Policy, PolicyError, PolicyResult};

use crate::errors::ChainError;
use crate::hooks::{ChainHook, HookFamily};

/// Ordered, immutable composition of policies for one flow and phase.
///
/// The chain object holds no per-request state: it is built once, cached,
/// and executed concurrently by every in-flight request matching its flow.
/// Execution is strictly sequential and stops at the first policy that
/// fails or interrupts.
pub struct PolicyChain {
    id: String,
    phase: ExecutionPhase,
    policies: Vec<Arc<dyn Policy>>,
    hooks: Vec<Arc<dyn ChainHook>>,
}

impl PolicyChain {
    pub fn new(id: impl Into<String>, phase: ExecutionPhase, policies: Vec<Arc<dyn Policy>>) -> Self {
        Self {
            id: id.into(),
            phase,
            policies,
            hooks: Vec::new(),
        }
    }

    /// Attaches the hooks matching this chain's phase family. Must be
    /// called before the chain is published to a cache; the chain is never
    /// mutated afterwards.
    pub fn add_hooks(&mut self, hooks: impl IntoIterator<Item = Arc<dyn ChainHook>>) {
        let family = HookFamily::of(self.phase);
        self.hooks
            .extend(hooks.into_iter().filter(|hook| hook.family() == family));
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> ExecutionPhase {
        self.phase
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Runs every policy in order for one request. Policy i+1 never starts
    /// before policy i's completion has been observed; the first failure or
    /// interruption aborts the remainder and becomes the chain result.
    pub async fn execute(&self, ctx: &mut ExecutionContext) -> Result<(), ChainError> {
        debug!(
            chain = %self.id,
            phase = %self.phase,
            policies = self.policies.len(),
            "executing policy chain"
        );

        for policy in &self.policies {
            self.hooks_pre(policy.id(), ctx);
            let result = self.dispatch(policy.as_ref(), ctx).await;
            self.hooks_post(policy.id(), ctx, result.as_ref().err());

            if let Err(err) = result {
                return Err(self.chain_error(policy.id(), err));
            }
        }

        Ok(())
    }

    async fn dispatch(&self, policy: &dyn Policy, ctx: &mut ExecutionContext) -> PolicyResult {
        match self.phase {
            ExecutionPhase::Request => policy.on_request(ctx).await,
            ExecutionPhase::Response => policy.on_response(ctx).await,
            ExecutionPhase::MessageRequest => policy.on_message_request(ctx).await,
            ExecutionPhase::MessageResponse => policy.on_message_response(ctx).await,
        }
    }

    fn chain_error(&self, policy_id: &str, err: PolicyError) -> ChainError {
        match err {
            PolicyError::Interrupted { failure } => ChainError::Interrupted {
                chain: self.id.clone(),
                policy: policy_id.to_string(),
                failure,
            },
            failed => ChainError::PolicyFailed {
                chain: self.id.clone(),
                policy: policy_id.to_string(),
                source: Box::new(failed),
            },
        }
    }

    fn hooks_pre(&self, policy_id: &str, ctx: &ExecutionContext) {
        for hook in &self.hooks {
            if let Err(err) = hook.pre(policy_id, self.phase, ctx) {
                warn!(chain = %self.id, policy = %policy_id, error = %err, "pre hook failed");
            }
        }
    }

    fn hooks_post(&self, policy_id: &str, ctx: &ExecutionContext, error: Option<&PolicyError>) {
        for hook in &self.hooks {
            if let Err(err) = hook.post(policy_id, self.phase, ctx, error) {
                warn!(chain = %self.id, policy = %policy_id, error = %err, "post hook failed");
            }
        }
    }
}

impl std::fmt::Debug for PolicyChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyChain")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("policies", &self.policies.len())
            .finish()
    }
}
