//! Email transport contract and the in-memory transport.

use crate::message::{OutboundEmail, TransportReceipt};
use async_trait::async_trait;
use mailpress_core::error::{DispatchError, DispatchResult};
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Contract for delivering a built message. Retry and backoff are the
/// provider's own concern; the engine only observes success or failure.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, message: &OutboundEmail) -> DispatchResult<TransportReceipt>;
}

/// In-memory transport that captures sent messages, for development and
/// testing. Addresses registered with `fail_for` are rejected with a
/// transport error.
#[derive(Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<OutboundEmail>>,
    fail_addresses: HashSet<String>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sends to `email` fail with a transport error.
    pub fn fail_for(mut self, email: impl Into<String>) -> Self {
        self.fail_addresses.insert(email.into().to_lowercase());
        self
    }

    /// Snapshot of all captured messages.
    pub fn sent_messages(&self) -> Vec<OutboundEmail> {
        self.sent.lock().expect("transport mutex poisoned").clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("transport mutex poisoned").len()
    }
}

#[async_trait]
impl EmailTransport for MemoryTransport {
    async fn send(&self, message: &OutboundEmail) -> DispatchResult<TransportReceipt> {
        if self.fail_addresses.contains(&message.to.to_lowercase()) {
            return Err(DispatchError::Transport(format!(
                "delivery refused for {}",
                message.to
            )));
        }
        debug!(to = %message.to, subject = %message.subject, "Captured outbound email");
        self.sent
            .lock()
            .expect("transport mutex poisoned")
            .push(message.clone());
        Ok(TransportReceipt {
            message_id: format!("mem-{}", Uuid::new_v4()),
        })
    }
}
