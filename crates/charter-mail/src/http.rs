//! HTTP client for a JSON mail relay.

use async_trait::async_trait;
use tracing::info;

use crate::{MailError, Mailer, MessageReceipt, OutboundMessage};

/// Posts messages to `<base_url>/api/messages` and reads back a receipt.
pub struct RelayClient {
    client: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    /// `base_url` like `http://localhost:8025`; a trailing slash is ignored.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn messages_url(&self) -> String {
        format!("{}/api/messages", self.base_url)
    }
}

#[async_trait]
impl Mailer for RelayClient {
    async fn send(&self, message: OutboundMessage) -> Result<MessageReceipt, MailError> {
        if !message.to_email.contains('@') {
            return Err(MailError::InvalidRecipient(message.to_email));
        }
        let url = self.messages_url();

        info!(url = %url, to = %message.to_email, subject = %message.subject, "posting message to relay");
        let resp = self.client.post(&url).json(&message).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MailError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;
        let receipt: MessageReceipt = serde_json::from_str(&body)?;
        info!(message_id = %receipt.id, "relay accepted message");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_client_trims_trailing_slash() {
        let client = RelayClient::new("http://localhost:8025/".into());
        assert_eq!(client.base_url, "http://localhost:8025");
        assert_eq!(client.messages_url(), "http://localhost:8025/api/messages");
    }

    #[test]
    fn receipt_parses_from_relay_json() {
        let receipt: MessageReceipt = serde_json::from_str(r#"{"id":"msg_123"}"#).unwrap();
        assert_eq!(receipt.id, "msg_123");
    }

    #[tokio::test]
    async fn recipient_without_at_sign_is_rejected_before_any_request() {
        let client = RelayClient::new("http://127.0.0.1:9".into());
        let err = client
            .send(OutboundMessage::new("nobody", "x", "y"))
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::InvalidRecipient(_)));
    }
}
