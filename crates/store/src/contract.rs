//! Persistence contracts the dispatch engine depends on.

use async_trait::async_trait;
use mailpress_core::error::DispatchResult;
use mailpress_core::types::{Campaign, CampaignStats, CampaignStatus, Settings, TemplateSnapshot};
use uuid::Uuid;

/// Narrow campaign persistence surface used by the engine. The engine never
/// holds a long-lived mutable reference to a campaign; all writes go through
/// explicit update calls.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn get_campaign(&self, id: Uuid) -> DispatchResult<Option<Campaign>>;

    /// Persist a status transition, optionally together with new stats and a
    /// template snapshot. All provided fields are written as one update.
    async fn update_campaign_status(
        &self,
        id: Uuid,
        status: CampaignStatus,
        stats: Option<CampaignStats>,
        snapshot: Option<TemplateSnapshot>,
    ) -> DispatchResult<()>;
}

/// Sender settings lookup.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_settings(&self) -> DispatchResult<Option<Settings>>;
}
