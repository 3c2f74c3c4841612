use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// One configured use of a policy inside a flow. Immutable once read from
/// the definition model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub policy: String,
    #[serde(default)]
    pub configuration: Option<Value>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub message_condition: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Step {
    pub fn new(policy: impl Into<String>) -> Self {
        Self {
            name: None,
            description: None,
            policy: policy.into(),
            configuration: None,
            condition: None,
            message_condition: None,
            enabled: true,
        }
    }

    pub fn with_configuration(mut self, configuration: Value) -> Self {
        self.configuration = Some(configuration);
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

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Ordered configuration of pre/post policy steps matched to a request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Flow {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub pre: Vec<Step>,
    #[serde(default)]
    pub post: Vec<Step>,
}

impl Flow {
    pub fn new() -> Self {
        Self {
            name: None,
            enabled: true,
            path: None,
            methods: Vec::new(),
            pre: Vec::new(),
            post: Vec::new(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        let mut flow = Self::new();
        flow.name = Some(name.into());
        flow
    }

    /// Structural identity of the flow, used as a chain cache key
    /// component. Two flows with the same configuration hash alike.
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        digest_opt(&mut hasher, self.name.as_deref());
        hasher.update([self.enabled as u8]);
        digest_opt(&mut hasher, self.path.as_deref());
        for method in &self.methods {
            digest_str(&mut hasher, method);
        }
        for step in self.pre.iter().chain(self.post.iter()) {
            digest_step(&mut hasher, step);
        }
        hex::encode(hasher.finalize())
    }
}

impl Default for Flow {
    fn default() -> Self {
        Self::new()
    }
}

fn digest_step(hasher: &mut Sha256, step: &Step) {
    digest_opt(hasher, step.name.as_deref());
    digest_str(hasher, &step.policy);
    digest_opt(
        hasher,
        step.configuration.as_ref().map(Value::to_string).as_deref(),
    );
    digest_opt(hasher, step.condition.as_deref());
    digest_opt(hasher, step.message_condition.as_deref());
    hasher.update([step.enabled as u8]);
}

fn digest_opt(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(value) => digest_str(hasher, value),
        None => hasher.update([0u8]),
    }
}

fn digest_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}

fn default_enabled() -> bool {
    true
}
