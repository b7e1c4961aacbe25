//! Outbound message model shared by all transport providers.

use serde::{Deserialize, Serialize};

/// Metadata header carrying the campaign id.
pub const HEADER_CAMPAIGN_ID: &str = "X-MailPress-Campaign";
/// Metadata header carrying the contact id.
pub const HEADER_CONTACT_ID: &str = "X-MailPress-Contact";
/// Metadata header carrying the contact email.
pub const HEADER_CONTACT_EMAIL: &str = "X-MailPress-Contact-Email";
/// Marks a message as a production send, never an internal test.
pub const HEADER_MODE: &str = "X-MailPress-Mode";
pub const HEADER_LIST_UNSUBSCRIBE: &str = "List-Unsubscribe";

/// A fully built outbound email, ready for a transport provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub from_name: String,
    pub from_email: String,
    pub reply_to: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    pub headers: Vec<(String, String)>,
}

impl OutboundEmail {
    /// Look up a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Provider acknowledgement for an accepted message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportReceipt {
    pub message_id: String,
}
