use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::errors::PolicyResult;

/// A pluggable behavior unit invoked at specific execution phases.
///
/// Instances are shared across concurrent requests once built: they must be
/// stateless or internally synchronized, and every phase method must return
/// promptly without blocking the calling task. Per-request state belongs in
/// the [`ExecutionContext`], never in the policy itself.
///
/// Each phase method defaults to completing successfully, so a policy only
/// implements the phases it participates in.
#[async_trait]
pub trait Policy: Send + Sync {
    fn id(&self) -> &str;

    async fn on_request(&self, _ctx: &mut ExecutionContext) -> PolicyResult {
        Ok(())
    }

    async fn on_response(&self, _ctx: &mut ExecutionContext) -> PolicyResult {
        Ok(())
    }

    async fn on_message_request(&self, _ctx: &mut ExecutionContext) -> PolicyResult {
        Ok(())
    }

    async fn on_message_response(&self, _ctx: &mut ExecutionContext) -> PolicyResult {
        Ok(())
    }
}

impl std::fmt::Debug for dyn Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Policy({})", self.id())
    }
}

/// Legacy policy dialect: plain request/response streams only. The engine
/// adapts these behind [`Policy`] for the non-message phases and refuses to
/// build them for message phases.
#[async_trait]
pub trait LegacyPolicy: Send + Sync {
    fn id(&self) -> &str;

    async fn on_request(&self, _ctx: &mut ExecutionContext) -> PolicyResult {
        Ok(())
    }

    async fn on_response(&self, _ctx: &mut ExecutionContext) -> PolicyResult {
        Ok(())
    }
}

impl std::fmt::Debug for dyn LegacyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LegacyPolicy({})", self.id())
    }
}
