use std::time::Duration;

use figment::{providers::Env, providers::Format, providers::Toml, Figment};
use serde::Deserialize;

/// Engine tuning. Defaults match the shipped behavior; deployments
/// override them through a TOML file or `POLICY_ENGINE__`-prefixed
/// environment variables.
#[derive(Debug, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub chain_cache: ChainCacheConfig,
}

impl EngineConfig {
    pub fn load(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("POLICY_ENGINE__").split("__"))
            .extract()
    }
}

/// Bounds of the per-context chain cache. Chains are cheap to rebuild, so
/// the cache stays small: hot flows are rebuilt never, cold flows expire.
#[derive(Debug, Deserialize)]
pub struct ChainCacheConfig {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_time_to_idle_secs")]
    pub time_to_idle_secs: u64,
}

impl ChainCacheConfig {
    pub fn time_to_idle(&self) -> Duration {
        Duration::from_secs(self.time_to_idle_secs)
    }
}

impl Default for ChainCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            time_to_idle_secs: default_time_to_idle_secs(),
        }
    }
}

fn default_max_entries() -> usize {
    15
}

fn default_time_to_idle_secs() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::{ChainCacheConfig, EngineConfig};

    #[test]
    fn defaults_are_fifteen_entries_and_one_hour() {
        let config = ChainCacheConfig::default();
        assert_eq!(config.max_entries, 15);
        assert_eq!(config.time_to_idle_secs, 3600);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").expect("empty config parses");
        assert_eq!(config.chain_cache.max_entries, 15);
    }

    #[test]
    fn overrides_are_honored() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "chain_cache": { "max_entries": 4 } }"#)
                .expect("config parses");
        assert_eq!(config.chain_cache.max_entries, 4);
        assert_eq!(config.chain_cache.time_to_idle_secs, 3600);
    }
}
