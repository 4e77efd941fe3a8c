//! Notification message model
//!
//! Messages arrive from a remote endpoint as a JSON array and are handed to
//! the message store after the transform pipeline has run.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A notification message, before or after transformation
///
/// Wraps the JSON element exactly as the remote endpoint returned it. The
/// accessors read the well-known fields (`type`, `content`, `recipient`,
/// ...) without requiring them to be present or well typed, so a message
/// nobody touches is written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Message(Value);

impl Message {
    /// Creates an empty message of the given type
    pub fn new(message_type: impl Into<String>) -> Self {
        let mut object = Map::new();
        object.insert("type".to_string(), Value::String(message_type.into()));
        Self(Value::Object(object))
    }

    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// The `type` tag, when it is a string
    pub fn message_type(&self) -> Option<&str> {
        self.str_field("type")
    }

    pub fn recipient(&self) -> Option<&str> {
        self.str_field("recipient")
    }

    pub fn sender(&self) -> Option<&str> {
        self.str_field("sender")
    }

    pub fn subject(&self) -> Option<&str> {
        self.str_field("subject")
    }

    /// `content`, when it is an object
    pub fn content(&self) -> Option<&Map<String, Value>> {
        self.0.get("content").and_then(Value::as_object)
    }

    /// `content.holder`, when it is a string
    pub fn holder(&self) -> Option<&str> {
        self.content()
            .and_then(|content| content.get("holder"))
            .and_then(Value::as_str)
    }

    /// Sets a top-level field
    ///
    /// # Returns
    /// `false` (and no change) when the message is not a JSON object
    pub fn set(&mut self, field: &str, value: Value) -> bool {
        match self.0.as_object_mut() {
            Some(object) => {
                object.insert(field.to_string(), value);
                true
            }
            None => false,
        }
    }

    /// Removes a top-level field
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.as_object_mut().and_then(|object| object.remove(field))
    }

    /// Sets a field of `content`
    ///
    /// # Returns
    /// `false` (and no change) when `content` is missing or not an object
    pub fn set_content(&mut self, field: &str, value: Value) -> bool {
        match self.0.get_mut("content").and_then(Value::as_object_mut) {
            Some(content) => {
                content.insert(field.to_string(), value);
                true
            }
            None => false,
        }
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }
}
