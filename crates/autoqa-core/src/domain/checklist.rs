//! Checklist types derived from issue acceptance criteria.
//!
//! A checklist is owned by its parent issue record and regenerated as a
//! whole when the issue body changes; individual items are never mutated
//! in place.

use serde::{Deserialize, Serialize};

/// A single acceptance-criterion entry extracted from an issue.
///
/// Identity is the `id` within one issue's checklist (`C1`, `C2`, ...);
/// the extractor assigns ids with a monotonically increasing suffix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChecklistItem {
    /// Stable identifier within the issue's checklist (e.g., "C3").
    pub id: String,
    /// Description of the requirement.
    pub description: String,
    /// Whether a passing test covering this item is required for merge.
    pub required: bool,
    /// Categorization tags (e.g., "testing", "validation").
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ChecklistItem {
    /// Create an item with an empty tag set.
    pub fn new(id: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            required,
            tags: Vec::new(),
        }
    }

    /// Attach tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checklist_item_serde_round_trip() {
        let item = ChecklistItem::new("C1", "Must validate email format", true)
            .with_tags(vec!["validation".to_string()]);
        let json = serde_json::to_string(&item).expect("serialize");
        let back: ChecklistItem = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(item, back);
    }

    #[test]
    fn test_tags_default_to_empty() {
        let json = r#"{"id":"C2","description":"Should show errors","required":false}"#;
        let item: ChecklistItem = serde_json::from_str(json).expect("deserialize");
        assert!(item.tags.is_empty());
    }
}
