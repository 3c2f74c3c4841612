use std::collections::HashMap;

use policy_api::Step;
use serde_json::Value;

/// Attribute key recording which execution mode a chain build ran under.
pub const EXECUTION_MODE_ATTRIBUTE: &str = "execution-mode";

/// Per-use metadata derived from a [`Step`] for one chain build. Created
/// fresh per build, short-lived; the resulting policy instance outlives it.
#[derive(Clone, Debug)]
pub struct PolicyMetadata {
    name: String,
    configuration: Option<String>,
    condition: Option<String>,
    message_condition: Option<String>,
    attributes: HashMap<String, String>,
}

impl PolicyMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            configuration: None,
            condition: None,
            message_condition: None,
            attributes: HashMap::new(),
        }
    }

    pub fn from_step(step: &Step) -> Self {
        Self {
            name: step.policy.clone(),
            configuration: step.configuration.as_ref().map(Value::to_string),
            condition: step.condition.clone(),
            message_condition: step.message_condition.clone(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = Some(configuration.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_message_condition(mut self, condition: impl Into<String>) -> Self {
        self.message_condition = Some(condition.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn configuration(&self) -> Option<&str> {
        self.configuration.as_deref()
    }

    pub fn condition(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    pub fn message_condition(&self) -> Option<&str> {
        self.message_condition.as_deref()
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}
