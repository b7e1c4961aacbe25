//! Campaign domain types — campaigns, templates, contacts, stats, settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Campaign ──────────────────────────────────────────────────────────────

/// An email campaign record, owned by the campaign store. The engine reads a
/// clone and mutates only through explicit store calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub status: CampaignStatus,
    pub template: Option<Template>,
    /// Validated target contacts. Shape checking happens at the store
    /// boundary; the engine only filters on status and address.
    pub recipients: Vec<Contact>,
    /// Frozen template content, set on the first dispatch.
    pub snapshot: Option<TemplateSnapshot>,
    #[serde(default)]
    pub stats: CampaignStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Sending,
    Sent,
}

// ─── Template ──────────────────────────────────────────────────────────────

/// A message template with `{{variable}}` placeholders. Immutable at send
/// time from the engine's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub subject: String,
    pub content: String,
    pub template_type: TemplateType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    Newsletter,
    Announcement,
    Custom,
}

/// A value copy of a template's fields frozen at dispatch time. All
/// personalization for a send derives from the snapshot, never from the
/// live (possibly since-edited) template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSnapshot {
    pub name: String,
    pub subject: String,
    pub content: String,
    pub template_type: TemplateType,
    pub snapshot_date: DateTime<Utc>,
    pub original_template_id: Uuid,
}

// ─── Contact ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub status: ContactStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    Active,
    Inactive,
    Unsubscribed,
    Bounced,
}

// ─── Stats ─────────────────────────────────────────────────────────────────

/// Durable campaign statistics. `sent`/`delivered`/`bounced` reflect the
/// latest send attempt; `opened`/`clicked`/`unsubscribed` are lifetime
/// engagement counters carried forward across re-sends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CampaignStats {
    pub sent: u64,
    pub delivered: u64,
    pub opened: u64,
    pub clicked: u64,
    pub bounced: u64,
    pub unsubscribed: u64,
    pub open_rate: String,
    pub click_rate: String,
}

impl Default for CampaignStats {
    fn default() -> Self {
        Self {
            sent: 0,
            delivered: 0,
            opened: 0,
            clicked: 0,
            bounced: 0,
            unsubscribed: 0,
            open_rate: "0%".to_string(),
            click_rate: "0%".to_string(),
        }
    }
}

impl CampaignStats {
    /// Recompute the derived percentage strings against `delivered`.
    /// Zero delivered yields `"0%"` rather than failing.
    pub fn recompute_rates(&mut self) {
        self.open_rate = percentage(self.opened, self.delivered);
        self.click_rate = percentage(self.clicked, self.delivered);
    }
}

/// Integer-rounded percentage string, e.g. `percentage(5, 3)` is `"167%"`.
pub fn percentage(count: u64, denominator: u64) -> String {
    if denominator == 0 {
        return "0%".to_string();
    }
    let pct = (count as f64 / denominator as f64 * 100.0).round() as u64;
    format!("{}%", pct)
}

// ─── Settings ──────────────────────────────────────────────────────────────

/// Sender settings, owned by the settings store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub from_name: String,
    pub from_email: String,
    pub reply_to_email: Option<String>,
    /// Postal address shown in the footer when configured.
    pub company_address: Option<String>,
}

impl Settings {
    /// Reply-To address, defaulting to the from address.
    pub fn reply_to(&self) -> &str {
        self.reply_to_email.as_deref().unwrap_or(&self.from_email)
    }
}

// ─── Send outcomes ─────────────────────────────────────────────────────────

/// Per-recipient result of one dispatch. Ephemeral — consumed by the stats
/// aggregator within the same dispatch call.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub email: String,
    pub result: SendResult,
}

#[derive(Debug, Clone)]
pub enum SendResult {
    Sent { message_id: String },
    Failed { error: String },
}

impl SendOutcome {
    pub fn sent(email: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            result: SendResult::Sent {
                message_id: message_id.into(),
            },
        }
    }

    pub fn failed(email: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            result: SendResult::Failed {
                error: error.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, SendResult::Sent { .. })
    }
}

/// Summary returned to the dispatch caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchSummary {
    pub sent: u64,
    pub failed: u64,
    pub total: u64,
}
