//! Recipient resolution — filters a campaign's target contacts down to the
//! eligible, well-formed set.

use mailpress_core::error::{DispatchError, DispatchResult};
use mailpress_core::types::{Contact, ContactStatus};
use std::collections::HashSet;

/// Resolve the unique eligible recipients for a send. An empty target list
/// and an everyone-filtered-out list are distinct caller-visible failures.
pub fn resolve_recipients(contacts: &[Contact]) -> DispatchResult<Vec<Contact>> {
    if contacts.is_empty() {
        return Err(DispatchError::NoRecipients);
    }

    let mut seen = HashSet::new();
    let eligible: Vec<Contact> = contacts
        .iter()
        .filter(|c| is_eligible(c))
        .filter(|c| seen.insert(c.email.trim().to_lowercase()))
        .cloned()
        .collect();

    if eligible.is_empty() {
        return Err(DispatchError::NoEligibleRecipients);
    }
    Ok(eligible)
}

fn is_eligible(contact: &Contact) -> bool {
    contact.status == ContactStatus::Active && is_well_formed(&contact.email)
}

/// Minimal address check. Full RFC validation is the transport's concern.
fn is_well_formed(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.contains('@')
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn make_contact(email: &str, status: ContactStatus) -> Contact {
        Contact {
            id: Uuid::new_v4(),
            email: email.to_string(),
            first_name: None,
            status,
        }
    }

    #[test]
    fn test_empty_target_list_is_distinct_error() {
        let err = resolve_recipients(&[]).unwrap_err();
        assert!(matches!(err, DispatchError::NoRecipients));
    }

    #[test]
    fn test_all_filtered_out_is_distinct_error() {
        let contacts = vec![
            make_contact("gone@example.com", ContactStatus::Unsubscribed),
            make_contact("", ContactStatus::Active),
            make_contact("not-an-address", ContactStatus::Active),
        ];
        let err = resolve_recipients(&contacts).unwrap_err();
        assert!(matches!(err, DispatchError::NoEligibleRecipients));
    }

    #[test]
    fn test_filters_inactive_and_malformed() {
        let contacts = vec![
            make_contact("ada@example.com", ContactStatus::Active),
            make_contact("inactive@example.com", ContactStatus::Inactive),
            make_contact("bounced@example.com", ContactStatus::Bounced),
            make_contact("   ", ContactStatus::Active),
        ];
        let eligible = resolve_recipients(&contacts).unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].email, "ada@example.com");
    }

    #[test]
    fn test_dedupes_case_insensitively() {
        let contacts = vec![
            make_contact("ada@example.com", ContactStatus::Active),
            make_contact("Ada@Example.com", ContactStatus::Active),
            make_contact("grace@example.com", ContactStatus::Active),
        ];
        let eligible = resolve_recipients(&contacts).unwrap();
        assert_eq!(eligible.len(), 2);
    }
}
