//! LearningItem - externally supplied candidate work
//!
//! Produced by a learning source outside this crate; only the fields used for
//! ranking are typed, everything else is carried through untouched.

use serde::{Deserialize, Serialize};

/// A candidate unit of future work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningItem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub base_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Source-specific fields passed through unchanged
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl LearningItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>, base_score: f64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            categories: Vec::new(),
            base_score,
            url: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Tag the item with a category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}
