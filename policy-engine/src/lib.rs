//! Policy chain execution engine.
//!
//! Turns a flow definition into an ordered, cached chain of policy
//! instances and executes it for one request phase with strict ordering,
//! first-failure short-circuit, and instrumentation hooks.

pub mod cache;
pub mod chain;
pub mod chain_factory;
pub mod conditional;
pub mod config;
pub mod configuration;
pub mod errors;
pub mod factory;
pub mod hooks;
pub mod manager;
pub mod metadata;
pub mod registry;

pub use chain::PolicyChain;
pub use chain_factory::PolicyChainFactory;
pub use conditional::ConditionalPolicy;
pub use config::{ChainCacheConfig, EngineConfig};
pub use configuration::PolicyConfigurationFactory;
pub use errors::{ChainError, EngineError};
pub use factory::{DefaultPolicyFactory, PolicyFactory, PolicyFactoryManager};
pub use hooks::{ChainHook, HookFamily, TracingMessageHook, TracingPolicyHook};
pub use manager::PolicyManager;
pub use metadata::PolicyMetadata;
pub use registry::StaticManifestRegistry;
