//! HTTP surface for the dispatch engine — REST triggers, tracking and
//! unsubscribe endpoints, health probes, and the metrics exporter.

pub mod rest;
pub mod server;

pub use server::ApiServer;
