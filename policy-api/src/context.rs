use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request half of the execution context.
#[derive(Clone, Debug, Default)]
pub struct RequestView {
    pub method: String,
    pub path: String,
    pub host: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl RequestView {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            host: None,
            headers: Vec::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header_of(&self.headers, name)
    }

    /// Replaces every existing value of `name` with `value`.
    pub fn insert_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        insert_header(&mut self.headers, name.into(), value.into());
    }

    /// Adds `value` without touching existing values of `name`.
    pub fn append_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }
}

/// Response half of the execution context.
#[derive(Clone, Debug)]
pub struct ResponseView {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl Default for ResponseView {
    fn default() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
        }
    }
}

impl ResponseView {
    pub fn header(&self, name: &str) -> Option<&str> {
        header_of(&self.headers, name)
    }

    pub fn insert_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        insert_header(&mut self.headers, name.into(), value.into());
    }

    pub fn append_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }
}

fn header_of<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn insert_header(headers: &mut Vec<(String, String)>, name: String, value: String) {
    headers.retain(|(candidate, _)| !candidate.eq_ignore_ascii_case(&name));
    headers.push((name, value));
}

/// Per-request state threaded through every policy call. Owned by the
/// caller of the chain; the engine never retains it across requests.
#[derive(Clone, Debug, Default)]
pub struct ExecutionContext {
    pub request: RequestView,
    pub response: ResponseView,
    attributes: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new(request: RequestView) -> Self {
        Self {
            request,
            response: ResponseView::default(),
            attributes: HashMap::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }
}

/// Payload attached to a deliberate chain interruption, rendered by the
/// surrounding reactor as the terminal response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionFailure {
    pub status: u16,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl ExecutionFailure {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            key: None,
            message: None,
            content_type: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}
