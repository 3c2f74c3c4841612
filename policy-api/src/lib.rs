//! Policy contract for the gateway policy chain engine.
//!
//! Defines the execution phases, the per-request execution context, the
//! modern and legacy policy traits, the manifest model resolved by the
//! plugin layer, and the flow/step definition model consumed as
//! configuration input.

pub mod condition;
pub mod context;
pub mod definition;
pub mod errors;
pub mod manifest;
pub mod phase;
pub mod policy;

pub use condition::ConditionEvaluator;
pub use context::{ExecutionContext, ExecutionFailure, RequestView, ResponseView};
pub use definition::{Flow, Step};
pub use errors::{BoxError, PolicyError, PolicyResult};
pub use manifest::{ManifestResolver, PolicyImplementation, PolicyManifest};
pub use phase::{ExecutionPhase, StreamKind};
pub use policy::{LegacyPolicy, Policy};
