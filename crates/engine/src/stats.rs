//! Stats aggregation — folds send outcomes into durable campaign stats.

use mailpress_core::types::CampaignStats;

/// Fold the outcome counts of one send attempt into the prior stats.
///
/// `sent`/`delivered`/`bounced` are reset to the current attempt;
/// `opened`/`clicked`/`unsubscribed` are lifetime engagement counters and
/// carry forward unchanged. Pure — aggregation is commutative over the
/// outcome set, only the counts matter.
pub fn fold_outcomes(prior: &CampaignStats, successful: u64, failed: u64) -> CampaignStats {
    let mut stats = CampaignStats {
        sent: successful,
        delivered: successful,
        bounced: failed,
        opened: prior.opened,
        clicked: prior.clicked,
        unsubscribed: prior.unsubscribed,
        open_rate: String::new(),
        click_rate: String::new(),
    };
    stats.recompute_rates();
    stats
}
