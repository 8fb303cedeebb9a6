//! Knowledge Bank article record.
//!
//! # Responsibility
//! - Define the published form of a note.
//! - Own tag normalization rules shared by repository and service.
//!
//! # Invariants
//! - One article per source note; republishing keeps `id` and
//!   `published_at` and advances `updated_at`.
//! - Tags are trimmed, lowercase, deduplicated and sorted.

use crate::model::note::NoteId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Stable identifier for a published article.
pub type ArticleId = Uuid;

/// A note published to the Knowledge Bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: ArticleId,
    pub source_note_id: NoteId,
    pub title: String,
    /// Serialized content copied from the note at publish time.
    pub content: String,
    /// Short summary shown in listings.
    pub excerpt: Option<String>,
    pub author: String,
    pub tags: Vec<String>,
    pub published_at: i64,
    pub updated_at: i64,
}

/// Publishing metadata supplied by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleDraft {
    pub author: String,
    pub tags: Vec<String>,
    /// Explicit summary; derived from content when absent.
    pub excerpt: Option<String>,
}

/// Normalizes one tag value.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim().trim_start_matches('#').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes, deduplicates and sorts tag values.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .filter_map(|tag| normalize_tag(tag))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::normalize_tags;

    #[test]
    fn tags_are_normalized_and_deduplicated() {
        let tags = vec![
            " Cardiology ".to_string(),
            "#cardiology".to_string(),
            "ECG".to_string(),
            "   ".to_string(),
        ];
        assert_eq!(normalize_tags(&tags), vec!["cardiology", "ecg"]);
    }
}
