//! In-memory store backed by DashMap.
//!
//! Provides the same API surface as a production database for development
//! and testing.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use mailpress_core::error::{DispatchError, DispatchResult};
use mailpress_core::types::{
    Campaign, CampaignStats, CampaignStatus, Contact, ContactStatus, Settings, Template,
    TemplateSnapshot, TemplateType,
};
use std::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Thread-safe in-memory store for campaigns and sender settings.
pub struct MemoryStore {
    campaigns: DashMap<Uuid, Campaign>,
    settings: RwLock<Option<Settings>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        info!("Memory store initialized (development mode)");
        Self {
            campaigns: DashMap::new(),
            settings: RwLock::new(None),
        }
    }

    // ─── Campaigns ─────────────────────────────────────────────────────────

    pub fn insert_campaign(&self, campaign: Campaign) {
        self.campaigns.insert(campaign.id, campaign);
    }

    pub fn list_campaigns(&self) -> Vec<Campaign> {
        let mut campaigns: Vec<Campaign> =
            self.campaigns.iter().map(|r| r.value().clone()).collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        campaigns
    }

    /// Apply a closure to a campaign's stats. Returns false when the
    /// campaign does not exist.
    pub fn update_stats(&self, id: Uuid, f: impl FnOnce(&mut CampaignStats)) -> bool {
        match self.campaigns.get_mut(&id) {
            Some(mut entry) => {
                let campaign = entry.value_mut();
                f(&mut campaign.stats);
                campaign.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Replace a campaign's live template. Existing snapshots are untouched.
    pub fn update_template(&self, id: Uuid, template: Template) -> bool {
        match self.campaigns.get_mut(&id) {
            Some(mut entry) => {
                let campaign = entry.value_mut();
                campaign.template = Some(template);
                campaign.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Flip a contact to `Unsubscribed` and bump the campaign counter.
    /// Returns false when the campaign or contact is missing, or the
    /// contact already unsubscribed.
    pub fn mark_unsubscribed(&self, campaign_id: Uuid, email: &str) -> bool {
        let Some(mut entry) = self.campaigns.get_mut(&campaign_id) else {
            return false;
        };
        let campaign = entry.value_mut();
        let contact = campaign.recipients.iter_mut().find(|c| {
            c.email.eq_ignore_ascii_case(email) && c.status != ContactStatus::Unsubscribed
        });
        match contact {
            Some(contact) => {
                contact.status = ContactStatus::Unsubscribed;
                campaign.stats.unsubscribed += 1;
                campaign.stats.recompute_rates();
                campaign.updated_at = Utc::now();
                info!(campaign_id = %campaign_id, email = %email, "Contact unsubscribed");
                true
            }
            None => false,
        }
    }

    // ─── Settings ──────────────────────────────────────────────────────────

    pub fn put_settings(&self, settings: Settings) {
        *self.settings.write().expect("settings lock poisoned") = Some(settings);
    }

    // ─── Demo Data ─────────────────────────────────────────────────────────

    /// Seeds one draft campaign and sender settings for development.
    pub fn seed_demo_data(&self) {
        let now = Utc::now();
        let template_id = Uuid::new_v4();
        let campaign_id = Uuid::new_v4();

        let contacts = vec![
            ("ada@example.com", Some("Ada"), ContactStatus::Active),
            ("grace@example.com", Some("Grace"), ContactStatus::Active),
            ("alan@example.com", None, ContactStatus::Active),
            ("stale@example.com", Some("Stale"), ContactStatus::Inactive),
        ];

        self.insert_campaign(Campaign {
            id: campaign_id,
            name: "Monthly Newsletter".to_string(),
            status: CampaignStatus::Draft,
            template: Some(Template {
                id: template_id,
                name: "newsletter-march".to_string(),
                subject: "Your {{first_name}} digest is here".to_string(),
                content: "<h1>Hello {{first_name}}!</h1><p>Read our <a href=\"https://example.com/post\">latest post</a>.</p>".to_string(),
                template_type: TemplateType::Newsletter,
            }),
            recipients: contacts
                .into_iter()
                .map(|(email, first_name, status)| Contact {
                    id: Uuid::new_v4(),
                    email: email.to_string(),
                    first_name: first_name.map(str::to_string),
                    status,
                })
                .collect(),
            snapshot: None,
            stats: CampaignStats::default(),
            created_at: now,
            updated_at: now,
        });

        self.put_settings(Settings {
            from_name: "MailPress Demo".to_string(),
            from_email: "news@demo.mailpress.io".to_string(),
            reply_to_email: None,
            company_address: Some("1 Demo Street\nSample City".to_string()),
        });

        info!(campaign_id = %campaign_id, "Seeded demo campaign");
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl crate::contract::CampaignStore for MemoryStore {
    async fn get_campaign(&self, id: Uuid) -> DispatchResult<Option<Campaign>> {
        Ok(self.campaigns.get(&id).map(|r| r.value().clone()))
    }

    async fn update_campaign_status(
        &self,
        id: Uuid,
        status: CampaignStatus,
        stats: Option<CampaignStats>,
        snapshot: Option<TemplateSnapshot>,
    ) -> DispatchResult<()> {
        let mut entry = self
            .campaigns
            .get_mut(&id)
            .ok_or_else(|| DispatchError::Persistence(format!("campaign {} missing", id)))?;
        let campaign = entry.value_mut();
        info!(campaign_id = %id, ?status, "Updating campaign status");
        campaign.status = status;
        if let Some(stats) = stats {
            campaign.stats = stats;
        }
        if let Some(snapshot) = snapshot {
            campaign.snapshot = Some(snapshot);
        }
        campaign.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl crate::contract::SettingsStore for MemoryStore {
    async fn get_settings(&self) -> DispatchResult<Option<Settings>> {
        Ok(self.settings.read().expect("settings lock poisoned").clone())
    }
}
