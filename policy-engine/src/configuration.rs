use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::errors::EngineError;

/// Parses raw policy configuration strings and shares the result by
/// content identity: one parse per distinct (policy, content) pair, no
/// matter how many steps or chains reference it.
#[derive(Default)]
pub struct PolicyConfigurationFactory {
    configurations: DashMap<ConfigurationKey, Arc<Value>>,
}

#[derive(Clone, Eq, Hash, PartialEq)]
struct ConfigurationKey {
    policy: String,
    digest: String,
}

impl PolicyConfigurationFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        policy: &str,
        raw: Option<&str>,
    ) -> Result<Option<Arc<Value>>, EngineError> {
        let Some(raw) = raw else {
            return Ok(None);
        };

        let key = ConfigurationKey {
            policy: policy.to_string(),
            digest: content_digest(raw),
        };
        if let Some(configuration) = self.configurations.get(&key) {
            return Ok(Some(configuration.clone()));
        }

        let parsed: Value =
            serde_json::from_str(raw).map_err(|err| EngineError::InvalidConfiguration {
                name: policy.to_string(),
                source: Box::new(err),
            })?;
        let configuration = Arc::new(parsed);
        self.configurations.insert(key, configuration.clone());
        Ok(Some(configuration))
    }

    pub fn clear(&self) {
        self.configurations.clear();
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }
}

/// Hex digest of a configuration string, used as its cache identity.
pub fn content_digest(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::PolicyConfigurationFactory;
    use std::sync::Arc;

    #[test]
    fn shares_configuration_by_content() {
        let factory = PolicyConfigurationFactory::new();

        let first = factory
            .create("rate-limit", Some(r#"{"limit":10}"#))
            .expect("parse failed")
            .expect("configuration expected");
        let second = factory
            .create("rate-limit", Some(r#"{"limit":10}"#))
            .expect("parse failed")
            .expect("configuration expected");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(factory.len(), 1);
    }

    #[test]
    fn distinct_content_gets_distinct_entries() {
        let factory = PolicyConfigurationFactory::new();
        factory
            .create("rate-limit", Some(r#"{"limit":10}"#))
            .expect("parse failed");
        factory
            .create("rate-limit", Some(r#"{"limit":20}"#))
            .expect("parse failed");

        assert_eq!(factory.len(), 2);
    }

    #[test]
    fn absent_configuration_is_not_an_error() {
        let factory = PolicyConfigurationFactory::new();
        assert!(factory
            .create("rate-limit", None)
            .expect("absent configuration should succeed")
            .is_none());
        assert!(factory.is_empty());
    }

    #[test]
    fn invalid_json_is_rejected() {
        let factory = PolicyConfigurationFactory::new();
        let err = factory
            .create("rate-limit", Some("{not json"))
            .expect_err("invalid configuration should fail");
        assert!(err.to_string().contains("rate-limit"));
    }
}
