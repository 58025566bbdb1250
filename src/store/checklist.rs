//! Push checklist items derived from request tags.

use crate::request::{RequestId, TagSet};
use serde::{Deserialize, Serialize};

/// One reminder on a push checklist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Item id
    pub id: u64,
    /// Request the reminder belongs to
    pub request: RequestId,
    /// Reminder kind, e.g. `hoods` or `hoods-cleanup`
    pub kind: String,
    /// Deploy step the reminder applies to
    pub target: String,
    /// Ticked off
    #[serde(default)]
    pub complete: bool,
}

/// Tag to checklist kind
const TAG_KINDS: [(&str, &str); 3] = [
    ("pushplans", "pushplans"),
    ("search-backend", "search"),
    ("hoods", "hoods"),
];

/// Targets reminded for each kind
fn targets(kind: &str) -> &'static [&'static str] {
    match kind {
        "pushplans" | "search" => &["prod"],
        "hoods" => &["stage", "post-stage", "prod"],
        "pushplans-cleanup" | "hoods-cleanup" => &["post-verify-stage"],
        "search-cleanup" => &["post-verify-prod"],
        _ => &[],
    }
}

/// Every (kind, target) pair a request with `tags` needs
pub fn required_items(tags: &TagSet) -> Vec<(String, &'static str)> {
    let mut items = Vec::new();
    for (tag, kind) in TAG_KINDS {
        if !tags.contains(tag) {
            continue;
        }
        for kind in [kind.to_string(), format!("{}-cleanup", kind)] {
            for target in targets(&kind) {
                items.push((kind.clone(), *target));
            }
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hoods_items() {
        let items = required_items(&TagSet::parse("hoods"));
        let kinds: Vec<(&str, &str)> = items.iter().map(|(k, t)| (k.as_str(), *t)).collect();
        assert_eq!(
            kinds,
            vec![
                ("hoods", "stage"),
                ("hoods", "post-stage"),
                ("hoods", "prod"),
                ("hoods-cleanup", "post-verify-stage"),
            ]
        );
    }

    #[test]
    fn test_search_backend_maps_to_search() {
        let items = required_items(&TagSet::parse("search-backend buildbot"));
        assert_eq!(
            items,
            vec![
                ("search".to_string(), "prod"),
                ("search-cleanup".to_string(), "post-verify-prod"),
            ]
        );
    }

    #[test]
    fn test_untagged_request_needs_nothing() {
        assert!(required_items(&TagSet::parse("l10n")).is_empty());
    }
}
