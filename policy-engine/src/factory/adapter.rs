use std::sync::Arc;

use async_trait::async_trait;

use policy_api::{ExecutionContext, LegacyPolicy, Policy, PolicyResult, StreamKind};

/// Exposes a legacy policy behind the modern capability set for the one
/// stream it was built for. The factory never routes message phases here,
/// so those methods complete immediately.
pub struct PolicyAdapter {
    policy: Arc<dyn LegacyPolicy>,
    stream: StreamKind,
}

impl PolicyAdapter {
    pub fn new(policy: Arc<dyn LegacyPolicy>, stream: StreamKind) -> Self {
        Self { policy, stream }
    }

    pub fn stream(&self) -> StreamKind {
        self.stream
    }
}

#[async_trait]
impl Policy for PolicyAdapter {
    fn id(&self) -> &str {
        self.policy.id()
    }

    async fn on_request(&self, ctx: &mut ExecutionContext) -> PolicyResult {
        match self.stream {
            StreamKind::Request => self.policy.on_request(ctx).await,
            StreamKind::Response => Ok(()),
        }
    }

    async fn on_response(&self, ctx: &mut ExecutionContext) -> PolicyResult {
        match self.stream {
            StreamKind::Response => self.policy.on_response(ctx).await,
            StreamKind::Request => Ok(()),
        }
    }
}
