use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request to run an action, optionally followed by a chain of child
/// requests.
///
/// On the wire this is `{ "action": "...", ...params, "actions": [...] }`.
/// Child entries are nullable so that a stray `null` in a hand-written
/// script is caught at dispatch time instead of being skipped.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Option<ActionMessage>>,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl ActionMessage {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            ..Self::default()
        }
    }

    /// Parses a message from its JSON form.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: ActionMessage) -> Self {
        self.actions.push(Some(child));
        self
    }

    pub fn action_id(&self) -> Option<&str> {
        self.action.as_deref().filter(|id| !id.is_empty())
    }

    pub fn has_children(&self) -> bool {
        !self.actions.is_empty()
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key).filter(|value| !value.is_null())
    }

    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.param(key).and_then(Value::as_str)
    }

    pub fn f64_param(&self, key: &str) -> Option<f64> {
        self.param(key).and_then(Value::as_f64)
    }

    pub fn bool_param(&self, key: &str) -> Option<bool> {
        self.param(key).and_then(Value::as_bool)
    }

    /// Deserializes the parameter fields into a typed struct.
    pub fn parse_params<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(Value::Object(self.params.clone()))
    }

    /// Params as a JSON object, the shape handed to event subscribers.
    pub fn params_value(&self) -> Value {
        Value::Object(self.params.clone())
    }
}
