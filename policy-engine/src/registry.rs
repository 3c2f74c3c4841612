use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use policy_api::{BoxError, ManifestResolver, PolicyManifest};

/// Compiled-in manifest registry: the in-process stand-in for a plugin
/// loader. Manifests are registered by name before the registry is shared;
/// activation is tracked so each plugin context is activated at most once
/// until it is deactivated again.
#[derive(Default)]
pub struct StaticManifestRegistry {
    manifests: HashMap<String, Arc<PolicyManifest>>,
    activated: DashMap<String, ()>,
}

impl StaticManifestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, manifest: PolicyManifest) -> &mut Self {
        self.manifests
            .insert(manifest.name().to_string(), Arc::new(manifest));
        self
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    pub fn is_activated(&self, name: &str) -> bool {
        self.activated.contains_key(name)
    }
}

impl ManifestResolver for StaticManifestRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<PolicyManifest>> {
        self.manifests.get(name).cloned()
    }

    fn activate(&self, manifest: &PolicyManifest) -> Result<(), BoxError> {
        if self
            .activated
            .insert(manifest.name().to_string(), ())
            .is_none()
        {
            debug!(policy = %manifest.name(), "policy plugin activated");
        }
        Ok(())
    }

    fn deactivate(&self, manifest: &PolicyManifest) {
        if self.activated.remove(manifest.name()).is_some() {
            debug!(policy = %manifest.name(), "policy plugin deactivated");
        }
    }
}
