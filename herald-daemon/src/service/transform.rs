//! Message transform pipeline
//!
//! Maps the messages returned by one poll onto their stored form. A
//! transform is looked up by message type; types without one pass through
//! untouched. After the transform, observers registered for the type may
//! inspect or mutate the message. The pipeline never filters, reorders or
//! performs I/O.

use std::collections::HashMap;
use std::sync::Arc;

use herald_core::domain::message::Message;
use serde_json::Value;
use url::Url;

/// Type tag of the built-in credential notification
pub const CREDENTIAL_AVAILABLE: &str = "CredentialAvailableNotification";

const CREDENTIAL_SUBJECT: &str = "A new credential is available";

/// Rewrites one message of a known type
pub trait MessageTransform: Send + Sync {
    fn transform(&self, message: Message) -> Message;
}

/// Synchronous hook run on every message of a type before it is stored
pub trait MessageObserver: Send + Sync {
    fn observe(&self, message: &mut Message);
}

#[derive(Default, Clone)]
pub struct TransformPipeline {
    transforms: HashMap<String, Arc<dyn MessageTransform>>,
    observers: HashMap<String, Vec<Arc<dyn MessageObserver>>>,
}

impl TransformPipeline {
    /// Creates an empty pipeline (every message passes through)
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pipeline with the built-in notification transforms
    pub fn with_defaults() -> Self {
        let mut pipeline = Self::new();
        pipeline.register(CREDENTIAL_AVAILABLE, Arc::new(CredentialAvailable));
        pipeline
    }

    /// Registers (or replaces) the transform for `message_type`
    pub fn register(&mut self, message_type: impl Into<String>, transform: Arc<dyn MessageTransform>) {
        self.transforms.insert(message_type.into(), transform);
    }

    /// Adds an observer for `message_type`
    pub fn observe(&mut self, message_type: impl Into<String>, observer: Arc<dyn MessageObserver>) {
        self.observers
            .entry(message_type.into())
            .or_default()
            .push(observer);
    }

    pub fn transform(&self, messages: Vec<Message>) -> Vec<Message> {
        messages
            .into_iter()
            .map(|message| self.transform_one(message))
            .collect()
    }

    /// Messages without a string `type` tag, or whose tag has neither a
    /// transform nor observers, are returned as they are.
    fn transform_one(&self, message: Message) -> Message {
        let mut message = match message
            .message_type()
            .and_then(|message_type| self.transforms.get(message_type))
        {
            Some(transform) => transform.transform(message),
            None => message,
        };

        let observers = message
            .message_type()
            .and_then(|message_type| self.observers.get(message_type))
            .cloned()
            .unwrap_or_default();

        for observer in observers {
            observer.observe(&mut message);
        }

        message
    }
}

/// Credential notifications are addressed to the credential holder
struct CredentialAvailable;

impl MessageTransform for CredentialAvailable {
    fn transform(&self, mut message: Message) -> Message {
        match message.holder().map(str::to_string) {
            Some(holder) => {
                message.set("recipient", Value::String(holder));
            }
            None => {
                message.remove("recipient");
            }
        }
        message.set("subject", Value::String(CREDENTIAL_SUBJECT.to_string()));

        let target = message
            .content()
            .and_then(|content| content.get("potentialAction"))
            .and_then(Value::as_array)
            .and_then(|actions| actions.first())
            .and_then(action_target);

        if let Some(url) = target {
            message.set_content(
                "body",
                Value::String(format!(
                    "<a href=\"{}\">Click here to view the credential.</a>",
                    escape_attribute(&url)
                )),
            );
        }

        message
    }
}

/// `target.urlTemplate` of an action, or `target` itself when it is a string
///
/// Only http and https targets are linked.
fn action_target(action: &Value) -> Option<String> {
    let target = action.get("target")?;
    let url = target
        .get("urlTemplate")
        .and_then(Value::as_str)
        .or_else(|| target.as_str())?;

    let scheme = Url::parse(url).ok()?.scheme().to_string();
    if scheme != "http" && scheme != "https" {
        return None;
    }

    Some(url.to_string())
}

/// Escapes a value for use inside a double-quoted HTML attribute
fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn credential_message(holder: &str) -> Message {
        serde_json::from_value(json!({
            "type": CREDENTIAL_AVAILABLE,
            "recipient": "did:old-recipient",
            "subject": "old subject",
            "sender": "did:issuer",
            "content": {
                "holder": holder,
                "body": "old body",
                "potentialAction": [
                    {"target": {"urlTemplate": "https://issuer.example.com/credentials/1"}},
                    {"target": {"urlTemplate": "https://issuer.example.com/credentials/2"}}
                ]
            }
        }))
        .unwrap()
    }

    fn body(message: &Message) -> &str {
        message.content().unwrap()["body"].as_str().unwrap()
    }

    fn with_actions(actions: Value) -> Message {
        let mut message = credential_message("did:holder");
        message.set_content("potentialAction", actions);
        message
    }

    #[test]
    fn test_credential_message_is_addressed_to_holder() {
        let pipeline = TransformPipeline::with_defaults();
        let out = pipeline.transform(vec![credential_message("did:holder")]);

        assert_eq!(out.len(), 1);
        let message = &out[0];
        assert_eq!(message.recipient(), Some("did:holder"));
        assert_eq!(message.subject(), Some(CREDENTIAL_SUBJECT));
        assert_eq!(message.sender(), Some("did:issuer"));

        assert_eq!(
            body(message),
            "<a href=\"https://issuer.example.com/credentials/1\">Click here to view the credential.</a>"
        );
    }

    #[test]
    fn test_missing_holder_clears_recipient() {
        let mut message = credential_message("did:holder");
        message.set_content("holder", Value::Null);

        let out = TransformPipeline::with_defaults().transform(vec![message]);
        assert_eq!(out[0].recipient(), None);
        assert!(out[0].as_value().get("recipient").is_none());
        assert_eq!(out[0].subject(), Some(CREDENTIAL_SUBJECT));
    }

    #[test]
    fn test_body_kept_without_actions() {
        let out = TransformPipeline::with_defaults().transform(vec![with_actions(json!([]))]);
        assert_eq!(body(&out[0]), "old body");
        assert_eq!(out[0].recipient(), Some("did:holder"));
    }

    #[test]
    fn test_string_target_is_used() {
        let message = with_actions(json!([{"target": "https://issuer.example.com/view"}]));

        let out = TransformPipeline::with_defaults().transform(vec![message]);
        assert!(body(&out[0]).contains("href=\"https://issuer.example.com/view\""));
    }

    #[test]
    fn test_target_is_escaped_in_body() {
        let message = with_actions(json!([{
            "target": {"urlTemplate": "https://issuer.example.com/x\"><script>alert('x')</script>&y"}
        }]));

        let out = TransformPipeline::with_defaults().transform(vec![message]);
        let body = body(&out[0]);
        assert!(!body.contains("<script>"));
        assert!(!body.contains("\"><"));
        assert!(body.contains(
            "https://issuer.example.com/x&quot;&gt;&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;&amp;y"
        ));
    }

    #[test]
    fn test_non_http_target_keeps_body() {
        for target in ["javascript:alert(1)", "data:text/html,hi", "not a url"] {
            let message = with_actions(json!([{"target": target}]));

            let out = TransformPipeline::with_defaults().transform(vec![message]);
            assert_eq!(body(&out[0]), "old body", "target {}", target);
            assert_eq!(out[0].subject(), Some(CREDENTIAL_SUBJECT));
        }
    }

    #[test]
    fn test_unknown_types_pass_through() {
        let mut other = credential_message("did:holder");
        other.set("type", json!("TypeAlpha"));

        let out = TransformPipeline::with_defaults().transform(vec![other.clone()]);
        assert_eq!(out, vec![other]);
    }

    #[test]
    fn test_irregular_messages_pass_through() {
        let messages: Vec<Message> = serde_json::from_value(json!([
            {"type": "TypeAlpha", "content": "plain text", "recipient": null},
            {"type": CREDENTIAL_AVAILABLE, "content": "plain text"},
            {"content": {"holder": "did:holder"}},
            42
        ]))
        .unwrap();

        let out = TransformPipeline::with_defaults().transform(messages.clone());
        assert_eq!(out[0], messages[0]);
        assert_eq!(out[2], messages[2]);
        assert_eq!(out[3], messages[3]);

        // the credential transform only touches top-level fields here
        assert_eq!(out[1].as_value()["content"], "plain text");
        assert_eq!(out[1].subject(), Some(CREDENTIAL_SUBJECT));
    }

    #[test]
    fn test_order_and_count_preserved() {
        let messages: Vec<Message> = (0..21)
            .map(|i| {
                if i % 2 == 0 {
                    credential_message(&format!("did:holder:{}", i))
                } else {
                    Message::new(format!("Type{}", i))
                }
            })
            .collect();

        let out = TransformPipeline::with_defaults().transform(messages);
        assert_eq!(out.len(), 21);
        assert_eq!(out[0].recipient(), Some("did:holder:0"));
        assert_eq!(out[1].message_type(), Some("Type1"));
        assert_eq!(out[20].recipient(), Some("did:holder:20"));
    }

    struct Tag(&'static str);

    impl MessageObserver for Tag {
        fn observe(&self, message: &mut Message) {
            message.set("testProperty", Value::String(self.0.to_string()));
        }
    }

    #[test]
    fn test_observers_run_per_type() {
        let mut pipeline = TransformPipeline::new();
        pipeline.observe("TypeAlpha", Arc::new(Tag("alpha")));
        pipeline.observe("TypeBeta", Arc::new(Tag("beta")));

        let out = pipeline.transform(vec![
            Message::new("TypeAlpha"),
            Message::new("TypeBeta"),
            Message::new("TypeGamma"),
        ]);

        assert_eq!(out[0].as_value()["testProperty"], "alpha");
        assert_eq!(out[1].as_value()["testProperty"], "beta");
        assert!(out[2].as_value().get("testProperty").is_none());
    }

    #[test]
    fn test_registered_transform_replaces_default() {
        struct Upper;
        impl MessageTransform for Upper {
            fn transform(&self, mut message: Message) -> Message {
                message.set("subject", json!("UPPER"));
                message
            }
        }

        let mut pipeline = TransformPipeline::with_defaults();
        pipeline.register(CREDENTIAL_AVAILABLE, Arc::new(Upper));

        let out = pipeline.transform(vec![credential_message("did:holder")]);
        assert_eq!(out[0].subject(), Some("UPPER"));
        assert_eq!(out[0].recipient(), Some("did:old-recipient"));
    }
}
