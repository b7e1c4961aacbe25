//! Template snapshotting — freezes template content at the moment dispatch
//! begins, so the emails sent reflect exactly what was approved.

use chrono::Utc;
use mailpress_core::error::{DispatchError, DispatchResult};
use mailpress_core::types::{Campaign, TemplateSnapshot};

/// Produce a value copy of the campaign's template. The coordinator persists
/// it together with the Sending transition, before any email leaves.
pub fn snapshot_template(campaign: &Campaign) -> DispatchResult<TemplateSnapshot> {
    let template = campaign
        .template
        .as_ref()
        .ok_or_else(|| DispatchError::InvalidTemplate("campaign has no template".to_string()))?;

    if template.subject.trim().is_empty() {
        return Err(DispatchError::InvalidTemplate(
            "template subject is empty".to_string(),
        ));
    }
    if template.content.trim().is_empty() {
        return Err(DispatchError::InvalidTemplate(
            "template content is empty".to_string(),
        ));
    }

    Ok(TemplateSnapshot {
        name: template.name.clone(),
        subject: template.subject.clone(),
        content: template.content.clone(),
        template_type: template.template_type,
        snapshot_date: Utc::now(),
        original_template_id: template.id,
    })
}
