//! Open/click tracking injection.
//!
//! Rewrites outbound HTML so link clicks route through the tracking
//! redirect and opens fire a 1x1 pixel.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use uuid::Uuid;

/// Contract for per-recipient tracking injection.
#[async_trait]
pub trait TrackingService: Send + Sync {
    async fn inject_tracking(
        &self,
        content: &str,
        campaign_id: Uuid,
        contact_id: Uuid,
        base_url: &str,
    ) -> String;
}

static HREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href="([^"]+)""#).expect("href pattern is valid"));

/// Default tracking implementation: click-redirect rewriting plus an open
/// pixel appended to the document.
pub struct PixelTracker;

impl PixelTracker {
    fn rewrite_links(content: &str, campaign_id: Uuid, contact_id: Uuid, base_url: &str) -> String {
        HREF_RE
            .replace_all(content, |caps: &Captures<'_>| {
                let target = &caps[1];
                // Unsubscribe and already-tracked links pass through untouched.
                if target.contains("/unsubscribe") || target.contains("/track/") {
                    return caps[0].to_string();
                }
                let query = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("campaign", &campaign_id.to_string())
                    .append_pair("contact", &contact_id.to_string())
                    .append_pair("url", target)
                    .finish();
                format!("href=\"{}/track/click?{}\"", base_url, query)
            })
            .into_owned()
    }

    fn open_pixel(campaign_id: Uuid, contact_id: Uuid, base_url: &str) -> String {
        format!(
            "<img src=\"{}/track/open?campaign={}&contact={}\" width=\"1\" height=\"1\" alt=\"\" style=\"display:none\" />",
            base_url, campaign_id, contact_id
        )
    }
}

#[async_trait]
impl TrackingService for PixelTracker {
    async fn inject_tracking(
        &self,
        content: &str,
        campaign_id: Uuid,
        contact_id: Uuid,
        base_url: &str,
    ) -> String {
        let base_url = base_url.trim_end_matches('/');
        let rewritten = Self::rewrite_links(content, campaign_id, contact_id, base_url);
        let pixel = Self::open_pixel(campaign_id, contact_id, base_url);
        match rewritten.find("</body>") {
            Some(idx) => {
                let mut tracked = rewritten;
                tracked.insert_str(idx, &pixel);
                tracked
            }
            None => rewritten + &pixel,
        }
    }
}
