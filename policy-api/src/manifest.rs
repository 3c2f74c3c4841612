use std::sync::Arc;

use serde_json::Value;

use crate::errors::BoxError;
use crate::phase::StreamKind;
use crate::policy::{LegacyPolicy, Policy};

pub type ModernConstructor =
    Arc<dyn Fn(Option<Arc<Value>>) -> Result<Arc<dyn Policy>, BoxError> + Send + Sync>;
pub type LegacyConstructor =
    Arc<dyn Fn(Option<Arc<Value>>) -> Result<Arc<dyn LegacyPolicy>, BoxError> + Send + Sync>;

/// Which dialect a manifest builds, together with its constructor. A legacy
/// manifest also declares the streams its implementation actually handles.
#[derive(Clone)]
pub enum PolicyImplementation {
    Modern(ModernConstructor),
    Legacy {
        streams: Vec<StreamKind>,
        constructor: LegacyConstructor,
    },
}

/// Resolved, loaded description of a policy type. Produced by the plugin
/// layer, consumed read-only by the engine.
#[derive(Clone)]
pub struct PolicyManifest {
    name: String,
    implementation: PolicyImplementation,
}

impl PolicyManifest {
    pub fn modern<F>(name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(Option<Arc<Value>>) -> Result<Arc<dyn Policy>, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            implementation: PolicyImplementation::Modern(Arc::new(constructor)),
        }
    }

    pub fn legacy<F>(
        name: impl Into<String>,
        streams: impl IntoIterator<Item = StreamKind>,
        constructor: F,
    ) -> Self
    where
        F: Fn(Option<Arc<Value>>) -> Result<Arc<dyn LegacyPolicy>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            implementation: PolicyImplementation::Legacy {
                streams: streams.into_iter().collect(),
                constructor: Arc::new(constructor),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn implementation(&self) -> &PolicyImplementation {
        &self.implementation
    }

    pub fn is_modern(&self) -> bool {
        matches!(self.implementation, PolicyImplementation::Modern(_))
    }

    /// Modern policies handle every stream; legacy policies only the ones
    /// they declare.
    pub fn supports_stream(&self, stream: StreamKind) -> bool {
        match &self.implementation {
            PolicyImplementation::Modern(_) => true,
            PolicyImplementation::Legacy { streams, .. } => streams.contains(&stream),
        }
    }
}

impl std::fmt::Debug for PolicyManifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dialect = match &self.implementation {
            PolicyImplementation::Modern(_) => "modern",
            PolicyImplementation::Legacy { .. } => "legacy",
        };
        f.debug_struct("PolicyManifest")
            .field("name", &self.name)
            .field("dialect", &dialect)
            .finish()
    }
}

/// Plugin-loader collaborator: resolves a policy name to its manifest and
/// owns the one-shot plugin context activation tied to each manifest.
pub trait ManifestResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Arc<PolicyManifest>>;

    fn activate(&self, manifest: &PolicyManifest) -> Result<(), BoxError>;

    fn deactivate(&self, manifest: &PolicyManifest);
}

#[cfg(test)]
mod tests {
    use super::PolicyManifest;
    use crate::phase::StreamKind;
    use crate::policy::LegacyPolicy;
    use std::sync::Arc;

    struct NoopLegacy;

    impl LegacyPolicy for NoopLegacy {
        fn id(&self) -> &str {
            "noop"
        }
    }

    #[test]
    fn legacy_manifest_only_supports_declared_streams() {
        let manifest = PolicyManifest::legacy("noop", [StreamKind::Request], |_| {
            Ok(Arc::new(NoopLegacy) as Arc<dyn LegacyPolicy>)
        });

        assert!(manifest.supports_stream(StreamKind::Request));
        assert!(!manifest.supports_stream(StreamKind::Response));
        assert!(!manifest.is_modern());
    }
}
