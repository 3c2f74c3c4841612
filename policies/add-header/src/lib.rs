//! Header mutation policy.
//!
//! Applies a configured list of header operations to the request on the
//! request phase and to the response on the response phase.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use policy_api::{
    BoxError, ExecutionContext, Policy, PolicyManifest, PolicyResult,
};

pub const POLICY_NAME: &str = "add-header";

#[derive(Clone, Debug, Deserialize)]
pub struct HeaderOp {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Default, Deserialize)]
struct AddHeaderConfig {
    #[serde(default)]
    headers: Vec<HeaderOp>,
}

pub struct AddHeaderPolicy {
    headers: Vec<HeaderOp>,
}

impl AddHeaderPolicy {
    pub fn new(configuration: Option<Arc<Value>>) -> Result<Self, BoxError> {
        let config = match configuration {
            Some(value) => serde_json::from_value::<AddHeaderConfig>((*value).clone())?,
            None => AddHeaderConfig::default(),
        };
        if config.headers.is_empty() {
            return Err("headers must not be empty".into());
        }

        Ok(Self {
            headers: config.headers,
        })
    }

    /// Manifest registering this policy with the engine.
    pub fn manifest() -> PolicyManifest {
        PolicyManifest::modern(POLICY_NAME, |configuration| {
            Ok(Arc::new(AddHeaderPolicy::new(configuration)?) as Arc<dyn Policy>)
        })
    }
}

#[async_trait]
impl Policy for AddHeaderPolicy {
    fn id(&self) -> &str {
        POLICY_NAME
    }

    async fn on_request(&self, ctx: &mut ExecutionContext) -> PolicyResult {
        for header in &self.headers {
            if header.overwrite {
                ctx.request.insert_header(&header.name, &header.value);
            } else {
                ctx.request.append_header(&header.name, &header.value);
            }
        }
        Ok(())
    }

    async fn on_response(&self, ctx: &mut ExecutionContext) -> PolicyResult {
        for header in &self.headers {
            if header.overwrite {
                ctx.response.insert_header(&header.name, &header.value);
            } else {
                ctx.response.append_header(&header.name, &header.value);
            }
        }
        Ok(())
    }
}
