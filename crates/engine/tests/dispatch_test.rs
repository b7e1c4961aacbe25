//! End-to-end dispatch flow tests against the in-memory store and capture
//! transport.

use async_trait::async_trait;
use chrono::Utc;
use mailpress_core::error::{DispatchError, DispatchResult};
use mailpress_core::types::{
    Campaign, CampaignStats, CampaignStatus, Contact, ContactStatus, Settings, Template,
    TemplateSnapshot, TemplateType,
};
use mailpress_delivery::message;
use mailpress_delivery::tracking::PixelTracker;
use mailpress_delivery::transport::{EmailTransport, MemoryTransport};
use mailpress_engine::Dispatcher;
use mailpress_store::{CampaignStore, MemoryStore, SettingsStore};
use std::sync::Arc;
use uuid::Uuid;

const BASE_URL: &str = "https://mail.example.com";

fn make_contact(email: &str, first_name: Option<&str>, status: ContactStatus) -> Contact {
    Contact {
        id: Uuid::new_v4(),
        email: email.to_string(),
        first_name: first_name.map(str::to_string),
        status,
    }
}

fn make_template(subject: &str) -> Template {
    Template {
        id: Uuid::new_v4(),
        name: "weekly".to_string(),
        subject: subject.to_string(),
        content:
            "<body><h1>Hi {{first_name}}!</h1><p>Read <a href=\"https://example.com/post\">our post</a>.</p></body>"
                .to_string(),
        template_type: TemplateType::Newsletter,
    }
}

fn make_campaign(template: Option<Template>, recipients: Vec<Contact>) -> Campaign {
    let now = Utc::now();
    Campaign {
        id: Uuid::new_v4(),
        name: "Weekly Digest".to_string(),
        status: CampaignStatus::Draft,
        template,
        recipients,
        snapshot: None,
        stats: CampaignStats::default(),
        created_at: now,
        updated_at: now,
    }
}

fn make_settings() -> Settings {
    Settings {
        from_name: "MailPress".to_string(),
        from_email: "news@example.com".to_string(),
        reply_to_email: Some("replies@example.com".to_string()),
        company_address: Some("1 Main St\nSpringfield".to_string()),
    }
}

fn seeded_store(campaign: Campaign) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert_campaign(campaign);
    store.put_settings(make_settings());
    store
}

fn make_dispatcher(store: &Arc<MemoryStore>, transport: &Arc<MemoryTransport>) -> Dispatcher {
    Dispatcher::new(
        Arc::clone(store) as Arc<dyn CampaignStore>,
        Arc::clone(store) as Arc<dyn SettingsStore>,
        Arc::clone(transport) as Arc<dyn EmailTransport>,
        Arc::new(PixelTracker),
    )
}

fn three_active_contacts() -> Vec<Contact> {
    vec![
        make_contact("ada@example.com", Some("Ada"), ContactStatus::Active),
        make_contact("grace@example.com", Some("Grace"), ContactStatus::Active),
        make_contact("alan@example.com", None, ContactStatus::Active),
    ]
}

#[tokio::test]
async fn test_dispatch_happy_path() {
    let campaign = make_campaign(
        Some(make_template("[Test: internal] Weekly digest for {{first_name}}")),
        three_active_contacts(),
    );
    let campaign_id = campaign.id;
    let store = seeded_store(campaign);
    let transport = Arc::new(MemoryTransport::new());
    let dispatcher = make_dispatcher(&store, &transport);

    let summary = dispatcher
        .dispatch_campaign(campaign_id, BASE_URL)
        .await
        .unwrap();

    assert_eq!(summary.sent, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.total, 3);

    let stored = store.get_campaign(campaign_id).await.unwrap().unwrap();
    assert_eq!(stored.status, CampaignStatus::Sent);
    assert_eq!(stored.stats.sent, 3);
    assert_eq!(stored.stats.delivered, 3);
    assert_eq!(stored.stats.bounced, 0);
    assert!(stored.snapshot.is_some());

    let messages = transport.sent_messages();
    assert_eq!(messages.len(), 3);

    let to_ada = messages.iter().find(|m| m.to == "ada@example.com").unwrap();
    assert_eq!(to_ada.subject, "Weekly digest for Ada");
    assert_eq!(to_ada.from_email, "news@example.com");
    assert_eq!(to_ada.reply_to, "replies@example.com");
    assert!(to_ada.html_body.contains("Hi Ada!"));
    assert!(to_ada.html_body.contains("/unsubscribe?email=ada%40example.com"));
    assert!(to_ada.html_body.contains("/track/open?"));
    assert!(to_ada.html_body.contains("/track/click?"));
    assert!(to_ada.html_body.contains("1 Main St<br>Springfield"));
    assert!(!to_ada.text_body.contains('<'));
    assert!(to_ada.text_body.contains("Hi Ada!"));

    assert_eq!(
        to_ada.header(message::HEADER_CAMPAIGN_ID),
        Some(campaign_id.to_string().as_str())
    );
    assert_eq!(to_ada.header(message::HEADER_MODE), Some("production"));
    assert!(to_ada
        .header(message::HEADER_LIST_UNSUBSCRIBE)
        .unwrap()
        .contains("/unsubscribe?"));

    // A contact with no first name falls back to the neutral greeting.
    let to_alan = messages.iter().find(|m| m.to == "alan@example.com").unwrap();
    assert_eq!(to_alan.subject, "Weekly digest for there");
    assert!(to_alan.html_body.contains("Hi there!"));
}

#[tokio::test]
async fn test_already_sent_campaign_is_rejected_without_writes() {
    let mut campaign = make_campaign(Some(make_template("Hello")), three_active_contacts());
    campaign.status = CampaignStatus::Sent;
    let campaign_id = campaign.id;
    let store = seeded_store(campaign);
    let transport = Arc::new(MemoryTransport::new());
    let dispatcher = make_dispatcher(&store, &transport);

    let err = dispatcher
        .dispatch_campaign(campaign_id, BASE_URL)
        .await
        .unwrap_err();

    assert!(matches!(err, DispatchError::InvalidState));
    assert_eq!(transport.sent_count(), 0);

    let stored = store.get_campaign(campaign_id).await.unwrap().unwrap();
    assert_eq!(stored.status, CampaignStatus::Sent);
    assert!(stored.snapshot.is_none());
}

#[tokio::test]
async fn test_missing_campaign_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    store.put_settings(make_settings());
    let transport = Arc::new(MemoryTransport::new());
    let dispatcher = make_dispatcher(&store, &transport);

    let err = dispatcher
        .dispatch_campaign(Uuid::new_v4(), BASE_URL)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::NotFound));
}

#[tokio::test]
async fn test_empty_and_filtered_recipient_lists_are_distinct_errors() {
    let empty = make_campaign(Some(make_template("Hello")), Vec::new());
    let empty_id = empty.id;
    let store = seeded_store(empty);

    let filtered = make_campaign(
        Some(make_template("Hello")),
        vec![
            make_contact("gone@example.com", None, ContactStatus::Unsubscribed),
            make_contact("asleep@example.com", None, ContactStatus::Inactive),
        ],
    );
    let filtered_id = filtered.id;
    store.insert_campaign(filtered);

    let transport = Arc::new(MemoryTransport::new());
    let dispatcher = make_dispatcher(&store, &transport);

    let err = dispatcher
        .dispatch_campaign(empty_id, BASE_URL)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::NoRecipients));

    let err = dispatcher
        .dispatch_campaign(filtered_id, BASE_URL)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::NoEligibleRecipients));

    // Pure precondition failures leave the campaigns untouched.
    for id in [empty_id, filtered_id] {
        let stored = store.get_campaign(id).await.unwrap().unwrap();
        assert_eq!(stored.status, CampaignStatus::Draft);
        assert!(stored.snapshot.is_none());
    }
    assert_eq!(transport.sent_count(), 0);
}

#[tokio::test]
async fn test_missing_from_email_is_config_error() {
    let campaign = make_campaign(Some(make_template("Hello")), three_active_contacts());
    let campaign_id = campaign.id;
    let store = Arc::new(MemoryStore::new());
    store.insert_campaign(campaign);
    store.put_settings(Settings {
        from_email: "   ".to_string(),
        ..make_settings()
    });

    let transport = Arc::new(MemoryTransport::new());
    let dispatcher = make_dispatcher(&store, &transport);

    let err = dispatcher
        .dispatch_campaign(campaign_id, BASE_URL)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Config(_)));
    assert_eq!(transport.sent_count(), 0);

    let stored = store.get_campaign(campaign_id).await.unwrap().unwrap();
    assert_eq!(stored.status, CampaignStatus::Draft);
}

#[tokio::test]
async fn test_one_failing_recipient_does_not_block_others() {
    let campaign = make_campaign(Some(make_template("Hello")), three_active_contacts());
    let campaign_id = campaign.id;
    let store = seeded_store(campaign);
    let transport = Arc::new(MemoryTransport::new().fail_for("grace@example.com"));
    let dispatcher = make_dispatcher(&store, &transport);

    let summary = dispatcher
        .dispatch_campaign(campaign_id, BASE_URL)
        .await
        .unwrap();

    assert_eq!(summary.sent, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.total, 3);
    assert_eq!(transport.sent_count(), 2);

    let stored = store.get_campaign(campaign_id).await.unwrap().unwrap();
    assert_eq!(stored.status, CampaignStatus::Sent);
    assert_eq!(stored.stats.delivered, 2);
    assert_eq!(stored.stats.bounced, 1);
}

#[tokio::test]
async fn test_engagement_counters_carry_forward_across_resend() {
    let mut campaign = make_campaign(
        Some(make_template("Hello")),
        vec![
            make_contact("a@example.com", None, ContactStatus::Active),
            make_contact("b@example.com", None, ContactStatus::Active),
            make_contact("c@example.com", None, ContactStatus::Active),
            make_contact("d@example.com", None, ContactStatus::Active),
        ],
    );
    campaign.stats = CampaignStats {
        sent: 9,
        delivered: 9,
        opened: 5,
        clicked: 2,
        bounced: 0,
        unsubscribed: 1,
        open_rate: "56%".to_string(),
        click_rate: "22%".to_string(),
    };
    let campaign_id = campaign.id;
    let store = seeded_store(campaign);
    let transport = Arc::new(MemoryTransport::new().fail_for("d@example.com"));
    let dispatcher = make_dispatcher(&store, &transport);

    let summary = dispatcher
        .dispatch_campaign(campaign_id, BASE_URL)
        .await
        .unwrap();
    assert_eq!(summary.sent, 3);
    assert_eq!(summary.failed, 1);

    let stats = store.get_campaign(campaign_id).await.unwrap().unwrap().stats;
    assert_eq!(stats.sent, 3);
    assert_eq!(stats.delivered, 3);
    assert_eq!(stats.opened, 5);
    assert_eq!(stats.clicked, 2);
    assert_eq!(stats.bounced, 1);
    assert_eq!(stats.unsubscribed, 1);
    assert_eq!(stats.open_rate, "167%");
    assert_eq!(stats.click_rate, "67%");
}

#[tokio::test]
async fn test_subjects_never_carry_test_markers() {
    for subject in [
        "[TEST] Hello {{first_name}}",
        "[Test: v2] Hello {{first_name}}",
        "[test|draft] Hello {{first_name}}",
        "TEST - Hello {{first_name}}",
        "Test: Hello {{first_name}}",
        "test| Hello {{first_name}}",
    ] {
        let campaign = make_campaign(
            Some(make_template(subject)),
            vec![make_contact("ada@example.com", Some("Ada"), ContactStatus::Active)],
        );
        let campaign_id = campaign.id;
        let store = seeded_store(campaign);
        let transport = Arc::new(MemoryTransport::new());
        let dispatcher = make_dispatcher(&store, &transport);

        dispatcher
            .dispatch_campaign(campaign_id, BASE_URL)
            .await
            .unwrap();

        let delivered = &transport.sent_messages()[0].subject;
        assert_eq!(delivered, "Hello Ada", "subject was {:?}", subject);
    }
}

#[tokio::test]
async fn test_concurrency_cap_of_one_still_delivers_all() {
    let recipients: Vec<Contact> = (0..5)
        .map(|i| make_contact(&format!("user{}@example.com", i), None, ContactStatus::Active))
        .collect();
    let campaign = make_campaign(Some(make_template("Hello")), recipients);
    let campaign_id = campaign.id;
    let store = seeded_store(campaign);
    let transport = Arc::new(MemoryTransport::new());
    let dispatcher = make_dispatcher(&store, &transport).with_max_concurrent_sends(1);

    let summary = dispatcher
        .dispatch_campaign(campaign_id, BASE_URL)
        .await
        .unwrap();
    assert_eq!(summary.total, 5);
    assert_eq!(summary.failed, 0);
    assert_eq!(transport.sent_count(), 5);
}

#[tokio::test]
async fn test_snapshot_frozen_against_later_template_edits() {
    let template = make_template("Original subject");
    let campaign = make_campaign(Some(template.clone()), three_active_contacts());
    let campaign_id = campaign.id;
    let store = seeded_store(campaign);
    let transport = Arc::new(MemoryTransport::new());
    let dispatcher = make_dispatcher(&store, &transport);

    dispatcher
        .dispatch_campaign(campaign_id, BASE_URL)
        .await
        .unwrap();

    // Edit the live template after the send.
    store.update_template(
        campaign_id,
        Template {
            subject: "Edited subject".to_string(),
            content: "<p>Edited</p>".to_string(),
            ..template
        },
    );

    let snapshot = store
        .get_campaign(campaign_id)
        .await
        .unwrap()
        .unwrap()
        .snapshot
        .unwrap();
    assert_eq!(snapshot.subject, "Original subject");
    assert!(snapshot.content.contains("Hi {{first_name}}!"));
}

// ─── Rollback ──────────────────────────────────────────────────────────────

/// Store wrapper that accepts the Sending transition but fails the final
/// Sent write, for exercising the compensating path.
struct FailingFinalizeStore {
    inner: Arc<MemoryStore>,
}

#[async_trait]
impl CampaignStore for FailingFinalizeStore {
    async fn get_campaign(&self, id: Uuid) -> DispatchResult<Option<Campaign>> {
        self.inner.get_campaign(id).await
    }

    async fn update_campaign_status(
        &self,
        id: Uuid,
        status: CampaignStatus,
        stats: Option<CampaignStats>,
        snapshot: Option<TemplateSnapshot>,
    ) -> DispatchResult<()> {
        if status == CampaignStatus::Sent {
            return Err(DispatchError::Persistence("write timed out".to_string()));
        }
        self.inner
            .update_campaign_status(id, status, stats, snapshot)
            .await
    }
}

#[tokio::test]
async fn test_finalize_failure_rolls_back_to_draft() {
    let campaign = make_campaign(Some(make_template("Hello")), three_active_contacts());
    let campaign_id = campaign.id;
    let inner = seeded_store(campaign);
    let store = Arc::new(FailingFinalizeStore {
        inner: Arc::clone(&inner),
    });
    let transport = Arc::new(MemoryTransport::new());

    let dispatcher = Dispatcher::new(
        store as Arc<dyn CampaignStore>,
        Arc::clone(&inner) as Arc<dyn SettingsStore>,
        Arc::clone(&transport) as Arc<dyn EmailTransport>,
        Arc::new(PixelTracker),
    );

    let err = dispatcher
        .dispatch_campaign(campaign_id, BASE_URL)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Persistence(_)));

    // The emails left the system, but the campaign is compensated back to
    // Draft with the snapshot from the Sending write untouched.
    assert_eq!(transport.sent_count(), 3);
    let stored = inner.get_campaign(campaign_id).await.unwrap().unwrap();
    assert_eq!(stored.status, CampaignStatus::Draft);
    assert!(stored.snapshot.is_some());
}
