use std::any::TypeId;
use std::sync::Arc;

use policy_api::PolicyManifest;

use super::{DefaultPolicyFactory, PolicyFactory};
use crate::errors::EngineError;

/// Selects, among several candidate factories, the one that accepts a
/// given manifest, falling back to the mandatory default factory. The
/// default is identified by its concrete type; constructing a manager
/// without one is a startup-configuration error.
pub struct PolicyFactoryManager {
    factories: Vec<Arc<dyn PolicyFactory>>,
    default_factory: Arc<dyn PolicyFactory>,
}

impl PolicyFactoryManager {
    pub fn new(factories: Vec<Arc<dyn PolicyFactory>>) -> Result<Self, EngineError> {
        Self::with_default_type(factories, TypeId::of::<DefaultPolicyFactory>())
    }

    pub fn with_default_type(
        factories: Vec<Arc<dyn PolicyFactory>>,
        default_type: TypeId,
    ) -> Result<Self, EngineError> {
        let default_factory = factories
            .iter()
            .find(|factory| factory.as_any().type_id() == default_type)
            .cloned()
            .ok_or(EngineError::NoDefaultFactory)?;
        let factories = factories
            .into_iter()
            .filter(|factory| factory.as_any().type_id() != default_type)
            .collect();

        Ok(Self {
            factories,
            default_factory,
        })
    }

    pub fn get(&self, manifest: &PolicyManifest) -> &Arc<dyn PolicyFactory> {
        self.factories
            .iter()
            .find(|factory| factory.accept(manifest))
            .unwrap_or(&self.default_factory)
    }

    /// Runs teardown on every factory for one manifest.
    pub fn cleanup(&self, manifest: &PolicyManifest) {
        for factory in &self.factories {
            factory.cleanup(manifest);
        }
        self.default_factory.cleanup(manifest);
    }
}

impl std::fmt::Debug for PolicyFactoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyFactoryManager")
            .field("factories", &self.factories.len())
            .finish()
    }
}
