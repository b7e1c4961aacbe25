//! Outbound email delivery — transport contract, providers, and tracking.
//!
//! Transport: delivers a built message via the configured provider (SendGrid
//! API stub, or the in-memory transport for development and testing).
//! Tracking: rewrites content to embed open/click tracking.
//! Events: folds inbound engagement events (delivered, opened, clicked,
//! unsubscribed) into campaign statistics.

pub mod events;
pub mod message;
pub mod sendgrid;
pub mod tracking;
pub mod transport;

pub use message::{OutboundEmail, TransportReceipt};
pub use sendgrid::SendGridTransport;
pub use tracking::{PixelTracker, TrackingService};
pub use transport::{EmailTransport, MemoryTransport};
