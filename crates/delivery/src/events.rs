//! Engagement event folding.
//!
//! Inbound tracking hits and provider webhooks arrive as `EngagementEvent`s
//! and fold into the campaign's lifetime counters. These counters survive
//! re-sends: the dispatch stats aggregator carries them forward.

use mailpress_core::types::CampaignStats;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementEvent {
    pub campaign_id: Uuid,
    pub email: String,
    pub kind: EngagementKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EngagementKind {
    Delivered,
    Open,
    Click,
    Unsubscribe,
}

/// Fold one engagement event into campaign stats and refresh the rates.
pub fn apply_event(stats: &mut CampaignStats, event: &EngagementEvent) {
    match event.kind {
        EngagementKind::Delivered => stats.delivered += 1,
        EngagementKind::Open => stats.opened += 1,
        EngagementKind::Click => stats.clicked += 1,
        EngagementKind::Unsubscribe => stats.unsubscribed += 1,
    }
    stats.recompute_rates();

    metrics::counter!(
        "engagement.events",
        "kind" => format!("{:?}", event.kind)
    )
    .increment(1);
}
