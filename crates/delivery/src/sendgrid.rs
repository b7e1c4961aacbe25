//! SendGrid email transport.
//!
//! Builds the SendGrid v3 mail payload from an `OutboundEmail`.
//! In production: POST to https://api.sendgrid.com/v3/mail/send

use crate::message::{OutboundEmail, TransportReceipt};
use async_trait::async_trait;
use mailpress_core::error::DispatchResult;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct SendGridConfig {
    pub api_key: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

fn default_endpoint() -> String {
    "https://api.sendgrid.com/v3/mail/send".to_string()
}

/// SendGrid transport provider.
pub struct SendGridTransport {
    config: SendGridConfig,
}

impl SendGridTransport {
    pub fn new(config: SendGridConfig) -> Self {
        info!(endpoint = %config.endpoint, "SendGrid transport initialized");
        Self { config }
    }

    fn build_payload(&self, message: &OutboundEmail) -> serde_json::Value {
        let headers: serde_json::Map<String, serde_json::Value> = message
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();

        serde_json::json!({
            "personalizations": [{
                "to": [{"email": message.to}],
                "headers": headers,
            }],
            "from": {
                "email": message.from_email,
                "name": message.from_name,
            },
            "reply_to": {"email": message.reply_to},
            "subject": message.subject,
            "content": [
                {"type": "text/plain", "value": message.text_body},
                {"type": "text/html", "value": message.html_body},
            ],
            // Tracking is injected upstream by the engine; keep the
            // provider-side rewriting off to avoid double wrapping.
            "tracking_settings": {
                "click_tracking": {"enable": false},
                "open_tracking": {"enable": false},
            },
        })
    }

    pub fn config(&self) -> &SendGridConfig {
        &self.config
    }
}

#[async_trait]
impl crate::transport::EmailTransport for SendGridTransport {
    async fn send(&self, message: &OutboundEmail) -> DispatchResult<TransportReceipt> {
        debug!(
            to = %message.to,
            subject = %message.subject,
            "Sending email via SendGrid"
        );

        metrics::counter!("sendgrid.emails_sent").increment(1);

        // Build SendGrid API payload (stub — in production, HTTP POST to
        // the configured endpoint with the bearer api key).
        let _payload = self.build_payload(message);

        Ok(TransportReceipt {
            message_id: format!("sg-{}", Uuid::new_v4()),
        })
    }
}
