//! Static resource catalog: reviewed helplines and counselling contacts
//! surfaced by the crisis payload and the external resources route.

use crate::shared::{ResourceEntry, ResourceKind};

/// KIRAN National Mental Health Helpline. Always present in the crisis payload.
pub fn kiran_helpline() -> ResourceEntry {
    ResourceEntry {
        title: "KIRAN National Mental Health Helpline (India)".to_string(),
        contact: "tel:18005990019".to_string(),
        kind: ResourceKind::Helpline,
        cost: Some("free".to_string()),
    }
}

/// The reviewed catalog for a region. Region-specific filtering is not yet
/// wired; every region receives the national set.
pub fn resources_for_region(_region: &str) -> Vec<ResourceEntry> {
    vec![
        kiran_helpline(),
        ResourceEntry {
            title: "iCALL (TISS) Counselling Helpline".to_string(),
            contact: "tel:9152987821".to_string(),
            kind: ResourceKind::Counselling,
            cost: Some("low".to_string()),
        },
        ResourceEntry {
            title: "Emergency Services (India)".to_string(),
            contact: "tel:112".to_string(),
            kind: ResourceKind::Emergency,
            cost: Some("free".to_string()),
        },
    ]
}
