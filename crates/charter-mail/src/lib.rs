//! Outbound mail: the `Mailer` contract the document service sends through,
//! and (behind the `http` feature) a client for an HTTP mail relay.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::RelayClient;

#[derive(Error, Debug)]
pub enum MailError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("relay returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid recipient {0:?}")]
    InvalidRecipient(String),
}

/// A file attached to an outbound message. Only textual content is carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub to_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_name: Option<String>,
    pub subject: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl OutboundMessage {
    pub fn new(
        to_email: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            to_email: to_email.into(),
            to_name: None,
            subject: subject.into(),
            body: body.into(),
            attachments: Vec::new(),
        }
    }

    pub fn to_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.to_name = (!name.trim().is_empty()).then_some(name);
        self
    }

    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

/// What the mail transport reports back for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub id: String,
}

/// Anything that can deliver an [`OutboundMessage`].
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<MessageReceipt, MailError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_parts_are_omitted_from_json() {
        let message = OutboundMessage::new("legal@acme.test", "NDA", "Please review.").to_name("  ");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "to_email": "legal@acme.test",
                "subject": "NDA",
                "body": "Please review."
            })
        );
    }

    #[test]
    fn attachments_and_name_are_carried() {
        let message = OutboundMessage::new("a@b.test", "SOW", "Attached.")
            .to_name("Globex")
            .attach(Attachment {
                filename: "sow.txt".into(),
                content_type: "text/plain; charset=utf-8".into(),
                content: "STATEMENT OF WORK".into(),
            });
        let json = serde_json::to_string(&message).unwrap();
        let parsed: OutboundMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.to_name.as_deref(), Some("Globex"));
        assert_eq!(parsed.attachments[0].filename, "sow.txt");
    }
}
