//! Dispatch coordination — the campaign send state machine.
//!
//! Validating → Sending → Finalizing → {Completed, RolledBack}. Validation
//! failures abort before any mutation; a fatal failure after the Sending
//! write triggers a best-effort compensating transition back to Draft.

use crate::personalize;
use crate::recipients::resolve_recipients;
use crate::snapshot::snapshot_template;
use crate::stats::fold_outcomes;
use mailpress_core::error::{DispatchError, DispatchResult};
use mailpress_core::types::{
    CampaignStatus, Contact, DispatchSummary, SendOutcome, Settings, TemplateSnapshot,
};
use mailpress_delivery::message::{self, OutboundEmail};
use mailpress_delivery::tracking::TrackingService;
use mailpress_delivery::transport::EmailTransport;
use mailpress_store::contract::{CampaignStore, SettingsStore};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Orchestrates a campaign send end to end.
pub struct Dispatcher {
    campaigns: Arc<dyn CampaignStore>,
    settings: Arc<dyn SettingsStore>,
    transport: Arc<dyn EmailTransport>,
    tracking: Arc<dyn TrackingService>,
    max_concurrent_sends: usize,
}

impl Dispatcher {
    pub fn new(
        campaigns: Arc<dyn CampaignStore>,
        settings: Arc<dyn SettingsStore>,
        transport: Arc<dyn EmailTransport>,
        tracking: Arc<dyn TrackingService>,
    ) -> Self {
        Self {
            campaigns,
            settings,
            transport,
            tracking,
            max_concurrent_sends: 16,
        }
    }

    /// Cap the number of in-flight per-recipient sends.
    pub fn with_max_concurrent_sends(mut self, limit: usize) -> Self {
        self.max_concurrent_sends = limit.max(1);
        self
    }

    /// Dispatch a campaign to every eligible recipient.
    ///
    /// A campaign already in `Sent` is rejected — a second call is not a
    /// no-op retry. `base_url` is embedded in tracking and unsubscribe
    /// links for this send.
    pub async fn dispatch_campaign(
        &self,
        campaign_id: Uuid,
        base_url: &str,
    ) -> DispatchResult<DispatchSummary> {
        let started = Instant::now();

        // Validating: pure precondition checks, no mutation.
        let campaign = self
            .campaigns
            .get_campaign(campaign_id)
            .await?
            .ok_or(DispatchError::NotFound)?;
        if campaign.status == CampaignStatus::Sent {
            return Err(DispatchError::InvalidState);
        }
        let snapshot = snapshot_template(&campaign)?;
        let recipients = resolve_recipients(&campaign.recipients)?;
        let settings = self
            .settings
            .get_settings()
            .await?
            .ok_or_else(|| DispatchError::Config("sender settings are not configured".to_string()))?;
        if settings.from_email.trim().is_empty() {
            return Err(DispatchError::Config("from_email is required".to_string()));
        }

        let prior_stats = campaign.stats.clone();

        // Sending transition: snapshot and zeroed attempt counters land
        // before any email leaves the system. Engagement counters are
        // lifetime values and stay.
        let mut sending_stats = prior_stats.clone();
        sending_stats.sent = 0;
        sending_stats.delivered = 0;
        sending_stats.bounced = 0;
        sending_stats.recompute_rates();
        self.campaigns
            .update_campaign_status(
                campaign_id,
                CampaignStatus::Sending,
                Some(sending_stats),
                Some(snapshot.clone()),
            )
            .await?;

        info!(
            campaign_id = %campaign_id,
            recipients = recipients.len(),
            "Campaign dispatch started"
        );
        metrics::counter!("dispatch.campaigns_started").increment(1);

        // Everything past the Sending write either finalizes or rolls back.
        let outcomes = match self
            .fan_out(campaign_id, &snapshot, &recipients, &settings, base_url)
            .await
        {
            Ok(outcomes) => outcomes,
            Err(e) => return Err(self.roll_back(campaign_id, e).await),
        };

        // Finalizing: fold outcomes and persist the Sent transition.
        let successful = outcomes.iter().filter(|o| o.is_success()).count() as u64;
        let failed = outcomes.len() as u64 - successful;
        let final_stats = fold_outcomes(&prior_stats, successful, failed);

        if let Err(e) = self
            .campaigns
            .update_campaign_status(
                campaign_id,
                CampaignStatus::Sent,
                Some(final_stats),
                Some(snapshot),
            )
            .await
        {
            return Err(self.roll_back(campaign_id, e).await);
        }

        metrics::counter!("dispatch.emails_sent").increment(successful);
        metrics::counter!("dispatch.emails_failed").increment(failed);
        metrics::histogram!("dispatch.duration_ms").record(started.elapsed().as_millis() as f64);

        info!(
            campaign_id = %campaign_id,
            sent = successful,
            failed = failed,
            "Campaign dispatch completed"
        );

        Ok(DispatchSummary {
            sent: successful,
            failed,
            total: outcomes.len() as u64,
        })
    }

    /// Concurrent, independent fan-out — one unit per recipient, bounded by
    /// the semaphore. A unit's transport failure becomes a failure outcome
    /// and never cancels or delays siblings. All units settle before this
    /// returns; no outcome is discarded.
    async fn fan_out(
        &self,
        campaign_id: Uuid,
        snapshot: &TemplateSnapshot,
        recipients: &[Contact],
        settings: &Settings,
        base_url: &str,
    ) -> DispatchResult<Vec<SendOutcome>> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_sends));
        let mut handles = Vec::with_capacity(recipients.len());

        for contact in recipients {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| DispatchError::Internal(anyhow::anyhow!(e)))?;
            let transport = Arc::clone(&self.transport);
            let tracking = Arc::clone(&self.tracking);
            let contact = contact.clone();
            let snapshot = snapshot.clone();
            let settings = settings.clone();
            let base_url = base_url.to_string();

            handles.push(tokio::spawn(async move {
                let message = build_message(
                    &snapshot,
                    &contact,
                    &settings,
                    campaign_id,
                    &base_url,
                    tracking.as_ref(),
                )
                .await;

                let outcome = match transport.send(&message).await {
                    Ok(receipt) => {
                        debug!(
                            to = %contact.email,
                            message_id = %receipt.message_id,
                            "Recipient send succeeded"
                        );
                        SendOutcome::sent(&contact.email, receipt.message_id)
                    }
                    Err(e) => {
                        warn!(to = %contact.email, error = %e, "Recipient send failed");
                        SendOutcome::failed(&contact.email, e.to_string())
                    }
                };
                drop(permit);
                outcome
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (handle, contact) in handles.into_iter().zip(recipients) {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    error!(to = %contact.email, error = %e, "Send task aborted");
                    outcomes.push(SendOutcome::failed(&contact.email, e.to_string()));
                }
            }
        }
        Ok(outcomes)
    }

    /// Best-effort compensating transition back to Draft. Stats and snapshot
    /// are left untouched; a failed compensation write is logged and the
    /// original error is always the one surfaced to the caller.
    async fn roll_back(&self, campaign_id: Uuid, original: DispatchError) -> DispatchError {
        warn!(
            campaign_id = %campaign_id,
            error = %original,
            "Dispatch failed after Sending transition, rolling back to Draft"
        );
        metrics::counter!("dispatch.rollbacks").increment(1);

        if let Err(e) = self
            .campaigns
            .update_campaign_status(campaign_id, CampaignStatus::Draft, None, None)
            .await
        {
            error!(campaign_id = %campaign_id, error = %e, "Rollback write failed");
        }
        original
    }
}

/// Build the outbound message for one recipient from the frozen snapshot.
async fn build_message(
    snapshot: &TemplateSnapshot,
    contact: &Contact,
    settings: &Settings,
    campaign_id: Uuid,
    base_url: &str,
    tracking: &dyn TrackingService,
) -> OutboundEmail {
    let first_name = contact.first_name.as_deref();

    let subject =
        personalize::sanitize_subject(&personalize::substitute_variables(&snapshot.subject, first_name));

    let content = personalize::substitute_variables(&snapshot.content, first_name);
    let content = personalize::append_footer(&content, settings, base_url, &contact.email, campaign_id);
    let html_body = tracking
        .inject_tracking(&content, campaign_id, contact.id, base_url)
        .await;
    // The text alternative is derived here from the tracked content, not by
    // the tracking collaborator.
    let text_body = personalize::strip_tags(&html_body);

    let unsubscribe = personalize::unsubscribe_link(base_url, &contact.email, campaign_id);

    OutboundEmail {
        from_name: settings.from_name.clone(),
        from_email: settings.from_email.clone(),
        reply_to: settings.reply_to().to_string(),
        to: contact.email.clone(),
        subject,
        html_body,
        text_body,
        headers: vec![
            (message::HEADER_CAMPAIGN_ID.to_string(), campaign_id.to_string()),
            (message::HEADER_CONTACT_ID.to_string(), contact.id.to_string()),
            (message::HEADER_CONTACT_EMAIL.to_string(), contact.email.clone()),
            (
                message::HEADER_LIST_UNSUBSCRIBE.to_string(),
                format!("<{}>", unsubscribe),
            ),
            (message::HEADER_MODE.to_string(), "production".to_string()),
        ],
    }
}
