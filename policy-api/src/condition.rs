use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::errors::BoxError;

/// Expression-language collaborator used for conditional step gating.
/// Evaluation is asynchronous and must not block the calling task.
#[async_trait]
pub trait ConditionEvaluator: Send + Sync {
    async fn eval(&self, expression: &str, ctx: &ExecutionContext) -> Result<bool, BoxError>;
}
