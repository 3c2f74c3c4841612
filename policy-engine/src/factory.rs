mod adapter;
mod manager;

use std::any::Any;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

use policy_api::{
    ConditionEvaluator, ExecutionPhase, Policy, PolicyImplementation, PolicyManifest, StreamKind,
};

pub use adapter::PolicyAdapter;
pub use manager::PolicyFactoryManager;

use crate::conditional::ConditionalPolicy;
use crate::configuration::content_digest;
use crate::errors::EngineError;
use crate::metadata::PolicyMetadata;

/// Builds runtime policy instances for one dialect of manifests. Factories
/// are selected per manifest by [`PolicyFactoryManager`].
pub trait PolicyFactory: Send + Sync {
    fn accept(&self, manifest: &PolicyManifest) -> bool;

    fn create(
        &self,
        phase: ExecutionPhase,
        manifest: &PolicyManifest,
        configuration: Option<Arc<Value>>,
        metadata: &PolicyMetadata,
    ) -> Result<Arc<dyn Policy>, EngineError>;

    /// Releases per-manifest cached state on context teardown.
    fn cleanup(&self, manifest: &PolicyManifest);

    fn as_any(&self) -> &dyn Any;
}

/// Composite identity of a memoized policy instance. Two steps using the
/// same policy with the same configuration and conditions on the same
/// phase share one instance.
#[derive(Clone, Eq, Hash, PartialEq)]
struct InstanceKey {
    phase: ExecutionPhase,
    manifest: String,
    configuration: Option<String>,
    condition: Option<String>,
    message_condition: Option<String>,
}

impl InstanceKey {
    fn new(phase: ExecutionPhase, manifest: &PolicyManifest, metadata: &PolicyMetadata) -> Self {
        Self {
            phase,
            manifest: manifest.name().to_string(),
            configuration: metadata.configuration().map(content_digest),
            condition: metadata.condition().map(str::to_string),
            message_condition: metadata.message_condition().map(str::to_string),
        }
    }
}

/// Standard factory: accepts every manifest, memoizes instances, and
/// reproduces the policy resolution order exactly:
///
/// 1. a modern manifest is instantiated directly;
/// 2. a legacy manifest on REQUEST/RESPONSE is built for the resolved
///    stream (after checking the manifest declares it) and wrapped in a
///    [`PolicyAdapter`];
/// 3. a legacy manifest on a message phase is a capability mismatch;
/// 4. a non-blank condition wraps the result in a [`ConditionalPolicy`];
///    a blank condition never wraps.
pub struct DefaultPolicyFactory {
    instances: DashMap<InstanceKey, Arc<dyn Policy>>,
    evaluator: Arc<dyn ConditionEvaluator>,
}

impl DefaultPolicyFactory {
    pub fn new(evaluator: Arc<dyn ConditionEvaluator>) -> Self {
        Self {
            instances: DashMap::new(),
            evaluator,
        }
    }

    pub fn cached_instances(&self) -> usize {
        self.instances.len()
    }

    fn build(
        &self,
        phase: ExecutionPhase,
        manifest: &PolicyManifest,
        configuration: Option<Arc<Value>>,
        metadata: &PolicyMetadata,
    ) -> Result<Arc<dyn Policy>, EngineError> {
        let policy: Arc<dyn Policy> = match manifest.implementation() {
            PolicyImplementation::Modern(constructor) => constructor(configuration)
                .map_err(|source| EngineError::InvalidConfiguration {
                    name: manifest.name().to_string(),
                    source,
                })?,
            PolicyImplementation::Legacy { constructor, .. } => {
                let Some(stream) = StreamKind::from_phase(phase) else {
                    return Err(EngineError::UnsupportedPhase {
                        name: manifest.name().to_string(),
                        phase,
                    });
                };
                if !manifest.supports_stream(stream) {
                    return Err(EngineError::UnsupportedPhase {
                        name: manifest.name().to_string(),
                        phase,
                    });
                }
                let legacy =
                    constructor(configuration).map_err(|source| {
                        EngineError::InvalidConfiguration {
                            name: manifest.name().to_string(),
                            source,
                        }
                    })?;
                Arc::new(PolicyAdapter::new(legacy, stream))
            }
        };

        match metadata.condition().map(str::trim) {
            Some(condition) if !condition.is_empty() => Ok(Arc::new(ConditionalPolicy::new(
                policy,
                Some(condition.to_string()),
                self.evaluator.clone(),
            ))),
            _ => Ok(policy),
        }
    }
}

impl PolicyFactory for DefaultPolicyFactory {
    fn accept(&self, _manifest: &PolicyManifest) -> bool {
        true
    }

    fn create(
        &self,
        phase: ExecutionPhase,
        manifest: &PolicyManifest,
        configuration: Option<Arc<Value>>,
        metadata: &PolicyMetadata,
    ) -> Result<Arc<dyn Policy>, EngineError> {
        let key = InstanceKey::new(phase, manifest, metadata);
        // The vacant-entry shard lock is held across the build so
        // concurrent first use constructs at most one instance per key.
        match self.instances.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let policy = self.build(phase, manifest, configuration, metadata)?;
                entry.insert(policy.clone());
                Ok(policy)
            }
        }
    }

    fn cleanup(&self, manifest: &PolicyManifest) {
        self.instances
            .retain(|key, _| key.manifest != manifest.name());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
