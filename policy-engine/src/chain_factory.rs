use std::sync::Arc;

use tracing::debug;

use policy_api::{ExecutionPhase, Flow};

use crate::cache::TtiCache;
use crate::chain::PolicyChain;
use crate::config::ChainCacheConfig;
use crate::errors::EngineError;
use crate::hooks::{ChainHook, TracingMessageHook, TracingPolicyHook};
use crate::manager::PolicyManager;
use crate::metadata::{PolicyMetadata, EXECUTION_MODE_ATTRIBUTE};

/// Builds and caches the ordered policy chain for a (flow, phase) pair.
///
/// One factory per deployed context: its cache dies with the context on
/// undeploy, so sharing it across contexts would leak chains referencing a
/// torn-down policy set.
pub struct PolicyChainFactory {
    policy_manager: Arc<PolicyManager>,
    chains: TtiCache<String, Arc<PolicyChain>>,
    hooks: Vec<Arc<dyn ChainHook>>,
}

impl PolicyChainFactory {
    pub fn new(policy_manager: Arc<PolicyManager>) -> Self {
        Self::with_config(policy_manager, &ChainCacheConfig::default())
    }

    pub fn with_config(policy_manager: Arc<PolicyManager>, config: &ChainCacheConfig) -> Self {
        Self {
            policy_manager,
            chains: TtiCache::new(config.max_entries, config.time_to_idle()),
            hooks: Vec::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: impl IntoIterator<Item = Arc<dyn ChainHook>>) -> Self {
        self.hooks.extend(hooks);
        self
    }

    /// Adds the built-in tracing instrumentation for both phase families.
    pub fn with_tracing(self) -> Self {
        self.with_hooks([
            Arc::new(TracingPolicyHook) as Arc<dyn ChainHook>,
            Arc::new(TracingMessageHook) as Arc<dyn ChainHook>,
        ])
    }

    pub fn cached_chains(&self) -> usize {
        self.chains.len()
    }

    /// Returns the chain for `(flow, phase)`, building it on first use.
    /// Disabled steps are filtered; a step whose policy is unknown is
    /// dropped from the chain; any other build error aborts the build and
    /// is not cached.
    pub fn create(
        &self,
        flow_chain_id: &str,
        flow: &Flow,
        phase: ExecutionPhase,
    ) -> Result<Arc<PolicyChain>, EngineError> {
        let key = format!("{}-{}", flow.hash(), phase.as_str());
        self.chains
            .get_or_try_insert_with(key, || self.build(flow_chain_id, flow, phase))
    }

    fn build(
        &self,
        flow_chain_id: &str,
        flow: &Flow,
        phase: ExecutionPhase,
    ) -> Result<Arc<PolicyChain>, EngineError> {
        let steps = if phase.is_request_family() {
            &flow.pre
        } else {
            &flow.post
        };

        let mut policies = Vec::new();
        for step in steps.iter().filter(|step| step.enabled) {
            let mut metadata = PolicyMetadata::from_step(step);
            metadata.set_attribute(
                EXECUTION_MODE_ATTRIBUTE,
                if phase.is_message() { "message" } else { "http" },
            );

            match self.policy_manager.create(phase, &metadata)? {
                Some(policy) => policies.push(policy),
                None => {
                    debug!(policy = %step.policy, "policy not resolved, step skipped");
                }
            }
        }

        let mut chain = PolicyChain::new(chain_id(flow_chain_id, flow), phase, policies);
        chain.add_hooks(self.hooks.iter().cloned());

        debug!(
            chain = %chain.id(),
            phase = %phase,
            policies = chain.len(),
            "policy chain built"
        );
        Ok(Arc::new(chain))
    }
}

/// Human-diagnosable chain id: the flow-chain id plus the flow's name, or
/// its methods and path when the flow is anonymous.
fn chain_id(flow_chain_id: &str, flow: &Flow) -> String {
    let label = match flow.name.as_deref().map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => name.to_string(),
        None => format!(
            "{}{}",
            flow.methods.join(""),
            flow.path.as_deref().unwrap_or("")
        ),
    };
    format!("{}-{}", flow_chain_id, label.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::PolicyChainFactory;
    use crate::config::ChainCacheConfig;
    use crate::errors::EngineError;
    use crate::factory::{DefaultPolicyFactory, PolicyFactory, PolicyFactoryManager};
    use crate::manager::PolicyManager;
    use crate::registry::StaticManifestRegistry;
    use async_trait::async_trait;
    use policy_api::{
        BoxError, ConditionEvaluator, ExecutionContext, ExecutionPhase, Flow, LegacyPolicy,
        Policy, PolicyManifest, PolicyResult, Step, StreamKind,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct AlwaysTrue;

    #[async_trait]
    impl ConditionEvaluator for AlwaysTrue {
        async fn eval(&self, _expression: &str, _ctx: &ExecutionContext) -> Result<bool, BoxError> {
            Ok(true)
        }
    }

    struct Noop {
        id: String,
    }

    #[async_trait]
    impl Policy for Noop {
        fn id(&self) -> &str {
            &self.id
        }

        async fn on_request(&self, _ctx: &mut ExecutionContext) -> PolicyResult {
            Ok(())
        }
    }

    struct NoopLegacy;

    #[async_trait]
    impl LegacyPolicy for NoopLegacy {
        fn id(&self) -> &str {
            "legacy"
        }
    }

    fn manager_with(names: &[&str], builds: Arc<AtomicUsize>) -> Arc<PolicyManager> {
        let mut registry = StaticManifestRegistry::new();
        for name in names {
            let owned = name.to_string();
            let builds = builds.clone();
            registry.register(PolicyManifest::modern(*name, move |_| {
                builds.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(Noop { id: owned.clone() }) as Arc<dyn Policy>)
            }));
        }
        registry.register(PolicyManifest::legacy(
            "legacy-only",
            [StreamKind::Request],
            |_| Ok(Arc::new(NoopLegacy) as Arc<dyn LegacyPolicy>),
        ));

        let factory_manager = Arc::new(
            PolicyFactoryManager::new(vec![Arc::new(DefaultPolicyFactory::new(Arc::new(
                AlwaysTrue,
            ))) as Arc<dyn PolicyFactory>])
            .expect("manager builds"),
        );

        let mut dependencies: Vec<String> = names.iter().map(|name| name.to_string()).collect();
        dependencies.push("legacy-only".to_string());
        let manager = PolicyManager::new(
            "api-1",
            Arc::new(registry),
            factory_manager,
            dependencies,
        );
        manager.start().expect("start succeeds");
        Arc::new(manager)
    }

    fn flow() -> Flow {
        let mut flow = Flow::named("checkout");
        flow.pre.push(Step::new("rate-limit"));
        flow.pre.push(Step::new("transform").disabled());
        flow.pre.push(Step::new("unknown-policy"));
        flow.post.push(Step::new("transform"));
        flow
    }

    #[test]
    fn request_phase_selects_enabled_pre_steps() {
        let builds = Arc::new(AtomicUsize::new(0));
        let factory =
            PolicyChainFactory::new(manager_with(&["rate-limit", "transform"], builds));

        let chain = factory
            .create("api-1", &flow(), ExecutionPhase::Request)
            .expect("chain builds");

        // Disabled step filtered, unknown policy dropped.
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.id(), "api-1-checkout");
    }

    #[test]
    fn response_phase_selects_post_steps() {
        let builds = Arc::new(AtomicUsize::new(0));
        let factory =
            PolicyChainFactory::new(manager_with(&["rate-limit", "transform"], builds));

        let chain = factory
            .create("api-1", &flow(), ExecutionPhase::Response)
            .expect("chain builds");
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn chains_are_memoized_per_flow_and_phase() {
        let builds = Arc::new(AtomicUsize::new(0));
        let factory = PolicyChainFactory::new(manager_with(
            &["rate-limit", "transform"],
            builds.clone(),
        ));
        let flow = flow();

        let first = factory
            .create("api-1", &flow, ExecutionPhase::Request)
            .expect("chain builds");
        let second = factory
            .create("api-1", &flow, ExecutionPhase::Request)
            .expect("chain builds");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(builds.load(Ordering::SeqCst), 1);

        factory
            .create("api-1", &flow, ExecutionPhase::Response)
            .expect("chain builds");
        assert_eq!(factory.cached_chains(), 2);
    }

    #[test]
    fn anonymous_flow_id_falls_back_to_methods_and_path() {
        let builds = Arc::new(AtomicUsize::new(0));
        let factory = PolicyChainFactory::new(manager_with(&["rate-limit"], builds));

        let mut flow = Flow::new();
        flow.path = Some("/Orders".to_string());
        flow.methods = vec!["GET".to_string(), "POST".to_string()];
        flow.pre.push(Step::new("rate-limit"));

        let chain = factory
            .create("api-1", &flow, ExecutionPhase::Request)
            .expect("chain builds");
        assert_eq!(chain.id(), "api-1-getpost/orders");
    }

    #[test]
    fn build_errors_propagate_and_are_not_cached() {
        let builds = Arc::new(AtomicUsize::new(0));
        let factory = PolicyChainFactory::with_config(
            manager_with(&["rate-limit"], builds),
            &ChainCacheConfig::default(),
        );

        let mut flow = Flow::named("messages");
        flow.pre.push(Step::new("legacy-only"));

        let err = factory
            .create("api-1", &flow, ExecutionPhase::MessageRequest)
            .expect_err("legacy-only policy cannot build for message phases");
        assert!(matches!(err, EngineError::UnsupportedPhase { .. }));
        assert_eq!(factory.cached_chains(), 0);
    }

    #[test]
    fn phase_without_applicable_steps_builds_an_empty_chain() {
        let builds = Arc::new(AtomicUsize::new(0));
        let factory = PolicyChainFactory::new(manager_with(&["rate-limit"], builds));

        let mut flow = Flow::named("pre-only");
        flow.pre.push(Step::new("rate-limit"));

        let chain = factory
            .create("api-1", &flow, ExecutionPhase::Response)
            .expect("chain builds");
        assert!(chain.is_empty());
    }
}
