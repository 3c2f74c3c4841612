use std::sync::Arc;

use async_trait::async_trait;

use policy_api::{
    ConditionEvaluator, ExecutionContext, Policy, PolicyError, PolicyResult,
};

/// Decorator gating a wrapped policy's request/response behavior on a
/// boolean expression. A blank or absent condition always delegates and
/// never consults the evaluator.
///
/// Message-phase calls complete immediately without evaluating anything:
/// message-level conditional gating is owned by the message pipeline, not
/// by this wrapper.
pub struct ConditionalPolicy {
    policy: Arc<dyn Policy>,
    condition: Option<String>,
    evaluator: Arc<dyn ConditionEvaluator>,
}

impl ConditionalPolicy {
    pub fn new(
        policy: Arc<dyn Policy>,
        condition: Option<String>,
        evaluator: Arc<dyn ConditionEvaluator>,
    ) -> Self {
        Self {
            policy,
            condition,
            evaluator,
        }
    }

    fn condition(&self) -> Option<&str> {
        self.condition
            .as_deref()
            .map(str::trim)
            .filter(|condition| !condition.is_empty())
    }

    async fn matches(&self, condition: &str, ctx: &ExecutionContext) -> Result<bool, PolicyError> {
        self.evaluator
            .eval(condition, ctx)
            .await
            .map_err(PolicyError::failure)
    }
}

#[async_trait]
impl Policy for ConditionalPolicy {
    /// Delegates to the wrapped policy so instrumentation attributes the
    /// call to the real policy, not the wrapper.
    fn id(&self) -> &str {
        self.policy.id()
    }

    async fn on_request(&self, ctx: &mut ExecutionContext) -> PolicyResult {
        match self.condition() {
            None => self.policy.on_request(ctx).await,
            Some(condition) => {
                if self.matches(condition, ctx).await? {
                    self.policy.on_request(ctx).await
                } else {
                    Ok(())
                }
            }
        }
    }

    async fn on_response(&self, ctx: &mut ExecutionContext) -> PolicyResult {
        match self.condition() {
            None => self.policy.on_response(ctx).await,
            Some(condition) => {
                if self.matches(condition, ctx).await? {
                    self.policy.on_response(ctx).await
                } else {
                    Ok(())
                }
            }
        }
    }

    async fn on_message_request(&self, _ctx: &mut ExecutionContext) -> PolicyResult {
        Ok(())
    }

    async fn on_message_response(&self, _ctx: &mut ExecutionContext) -> PolicyResult {
        Ok(())
    }
}
