use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{debug, info};

use policy_api::{ExecutionPhase, Flow, ManifestResolver, Policy, PolicyManifest};

use crate::configuration::PolicyConfigurationFactory;
use crate::errors::EngineError;
use crate::factory::PolicyFactoryManager;
use crate::metadata::PolicyMetadata;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Lifecycle {
    Created,
    Started,
    Stopped,
}

/// Lifecycle-managed registry of the policy manifests one deployed context
/// depends on. `start` loads and activates every declared dependency;
/// `create` turns a (phase, metadata) pair into a runnable policy;
/// `stop` tears the context down and releases every cached handle so a
/// redeployed context starts clean.
///
/// The state machine is linear (`created → started → stopped`); `start`
/// and `stop` are no-ops outside their entry state.
pub struct PolicyManager {
    context_id: String,
    dependencies: Vec<String>,
    resolver: Arc<dyn ManifestResolver>,
    factory_manager: Arc<PolicyFactoryManager>,
    configurations: PolicyConfigurationFactory,
    manifests: ArcSwap<HashMap<String, Arc<PolicyManifest>>>,
    state: Mutex<Lifecycle>,
}

impl PolicyManager {
    pub fn new(
        context_id: impl Into<String>,
        resolver: Arc<dyn ManifestResolver>,
        factory_manager: Arc<PolicyFactoryManager>,
        dependencies: Vec<String>,
    ) -> Self {
        Self {
            context_id: context_id.into(),
            dependencies,
            resolver,
            factory_manager,
            configurations: PolicyConfigurationFactory::new(),
            manifests: ArcSwap::from_pointee(HashMap::new()),
            state: Mutex::new(Lifecycle::Created),
        }
    }

    /// Unique policy names referenced by the enabled steps of `flows`, in
    /// first-use order. The usual way to compute a context's dependency
    /// set from its deployed definition.
    pub fn flow_dependencies(flows: &[Flow]) -> Vec<String> {
        let mut names = Vec::new();
        for flow in flows.iter().filter(|flow| flow.enabled) {
            for step in flow.pre.iter().chain(flow.post.iter()) {
                if step.enabled && !names.contains(&step.policy) {
                    names.push(step.policy.clone());
                }
            }
        }
        names
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn is_started(&self) -> bool {
        *self.state.lock() == Lifecycle::Started
    }

    /// Loads the manifest of every declared dependency and runs its
    /// one-shot plugin activation. A missing or non-activatable manifest
    /// is fatal: the context does not come up.
    pub fn start(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock();
        if *state != Lifecycle::Created {
            return Ok(());
        }

        let mut manifests = HashMap::new();
        for name in &self.dependencies {
            let manifest = self
                .resolver
                .resolve(name)
                .ok_or_else(|| EngineError::ManifestLoad { name: name.clone() })?;
            self.resolver.activate(&manifest).map_err(|source| {
                EngineError::ManifestActivation {
                    name: name.clone(),
                    source,
                }
            })?;
            debug!(context = %self.context_id, policy = %name, "policy manifest loaded");
            manifests.insert(name.clone(), manifest);
        }

        info!(
            context = %self.context_id,
            policies = manifests.len(),
            "policy manager started"
        );
        self.manifests.store(Arc::new(manifests));
        *state = Lifecycle::Started;
        Ok(())
    }

    /// Resolves `metadata`'s policy name and builds (or reuses) its
    /// runtime instance for `phase`. An unknown name is a resolution
    /// miss, not an error: the caller drops the step.
    pub fn create(
        &self,
        phase: ExecutionPhase,
        metadata: &PolicyMetadata,
    ) -> Result<Option<Arc<dyn Policy>>, EngineError> {
        if !self.is_started() {
            return Err(EngineError::NotStarted);
        }

        let manifests = self.manifests.load();
        let Some(manifest) = manifests.get(metadata.name()) else {
            return Ok(None);
        };

        let configuration = self
            .configurations
            .create(metadata.name(), metadata.configuration())?;
        let factory = self.factory_manager.get(manifest);
        factory
            .create(phase, manifest, configuration, metadata)
            .map(Some)
    }

    /// Deactivates plugin contexts and drops every cached manifest,
    /// instance and configuration handle owned by this context.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if *state != Lifecycle::Started {
            return;
        }

        let manifests = self.manifests.swap(Arc::new(HashMap::new()));
        for manifest in manifests.values() {
            self.factory_manager.cleanup(manifest);
            self.resolver.deactivate(manifest);
        }
        self.configurations.clear();

        info!(context = %self.context_id, "policy manager stopped");
        *state = Lifecycle::Stopped;
    }
}

#[cfg(test)]
mod tests {
    use super::PolicyManager;
    use crate::errors::EngineError;
    use crate::factory::{DefaultPolicyFactory, PolicyFactory, PolicyFactoryManager};
    use crate::metadata::PolicyMetadata;
    use crate::registry::StaticManifestRegistry;
    use async_trait::async_trait;
    use policy_api::{
        BoxError, ConditionEvaluator, ExecutionContext, ExecutionPhase, Flow, ManifestResolver,
        Policy, PolicyManifest, Step,
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

    struct Noop;

    #[async_trait]
    impl Policy for Noop {
        fn id(&self) -> &str {
            "noop"
        }
    }

    fn factory_manager() -> Arc<PolicyFactoryManager> {
        Arc::new(
            PolicyFactoryManager::new(vec![Arc::new(DefaultPolicyFactory::new(Arc::new(
                AlwaysTrue,
            ))) as Arc<dyn PolicyFactory>])
            .expect("manager builds"),
        )
    }

    fn registry_with(names: &[&str]) -> Arc<StaticManifestRegistry> {
        let mut registry = StaticManifestRegistry::new();
        for name in names {
            registry.register(PolicyManifest::modern(*name, |_| {
                Ok(Arc::new(Noop) as Arc<dyn Policy>)
            }));
        }
        Arc::new(registry)
    }

    #[test]
    fn missing_dependency_is_fatal_to_start() {
        let manager = PolicyManager::new(
            "api-1",
            registry_with(&["rate-limit"]),
            factory_manager(),
            vec!["rate-limit".to_string(), "unknown".to_string()],
        );

        let err = manager.start().expect_err("unknown dependency");
        assert!(matches!(err, EngineError::ManifestLoad { name } if name == "unknown"));
        assert!(!manager.is_started());
    }

    #[test]
    fn create_before_start_is_rejected() {
        let manager = PolicyManager::new(
            "api-1",
            registry_with(&["rate-limit"]),
            factory_manager(),
            vec!["rate-limit".to_string()],
        );

        let err = manager
            .create(ExecutionPhase::Request, &PolicyMetadata::new("rate-limit"))
            .expect_err("manager not started");
        assert!(matches!(err, EngineError::NotStarted));
    }

    #[test]
    fn unknown_policy_is_a_resolution_miss() {
        let manager = PolicyManager::new(
            "api-1",
            registry_with(&["rate-limit"]),
            factory_manager(),
            vec!["rate-limit".to_string()],
        );
        manager.start().expect("start succeeds");

        let resolved = manager
            .create(ExecutionPhase::Request, &PolicyMetadata::new("rate-limit"))
            .expect("create succeeds");
        assert!(resolved.is_some());

        let missed = manager
            .create(ExecutionPhase::Request, &PolicyMetadata::new("unknown"))
            .expect("a miss is not an error");
        assert!(missed.is_none());
    }

    #[test]
    fn lifecycle_is_idempotent_and_linear() {
        struct CountingResolver {
            inner: Arc<StaticManifestRegistry>,
            activations: AtomicUsize,
            deactivations: AtomicUsize,
        }

        impl ManifestResolver for CountingResolver {
            fn resolve(&self, name: &str) -> Option<Arc<PolicyManifest>> {
                self.inner.resolve(name)
            }

            fn activate(&self, manifest: &PolicyManifest) -> Result<(), BoxError> {
                self.activations.fetch_add(1, Ordering::SeqCst);
                self.inner.activate(manifest)
            }

            fn deactivate(&self, manifest: &PolicyManifest) {
                self.deactivations.fetch_add(1, Ordering::SeqCst);
                self.inner.deactivate(manifest);
            }
        }

        let resolver = Arc::new(CountingResolver {
            inner: registry_with(&["rate-limit"]),
            activations: AtomicUsize::new(0),
            deactivations: AtomicUsize::new(0),
        });
        let manager = PolicyManager::new(
            "api-1",
            resolver.clone(),
            factory_manager(),
            vec!["rate-limit".to_string()],
        );

        manager.start().expect("first start");
        manager.start().expect("second start is a no-op");
        assert_eq!(resolver.activations.load(Ordering::SeqCst), 1);

        manager.stop();
        manager.stop();
        assert_eq!(resolver.deactivations.load(Ordering::SeqCst), 1);
        assert!(!manager.is_started());

        // Stopped is terminal: a later start performs no work.
        manager.start().expect("start after stop is a no-op");
        assert_eq!(resolver.activations.load(Ordering::SeqCst), 1);
        assert!(!manager.is_started());
    }

    #[test]
    fn flow_dependencies_skip_disabled_steps_and_flows() {
        let mut checkout = Flow::named("checkout");
        checkout.pre.push(Step::new("rate-limit"));
        checkout.pre.push(Step::new("transform").disabled());
        checkout.post.push(Step::new("rate-limit"));

        let mut disabled = Flow::named("disabled");
        disabled.enabled = false;
        disabled.pre.push(Step::new("auth"));

        let names = PolicyManager::flow_dependencies(&[checkout, disabled]);
        assert_eq!(names, vec!["rate-limit".to_string()]);
    }
}
