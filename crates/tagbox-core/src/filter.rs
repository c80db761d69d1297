//! Element list filtering

use serde::{Deserialize, Serialize};

/// How multiple tag names in a filter combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    /// Element must carry every listed tag
    #[default]
    All,
    /// Element must carry at least one listed tag
    Any,
}

/// Filter for listing elements
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementFilter {
    tags: Vec<String>,
    pub combinator: Combinator,
    pub limit: Option<usize>,
    search: Option<String>,
}

impl ElementFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to elements carrying these tags. Blank names are dropped and
    /// duplicates collapsed.
    pub fn with_tags<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !name.trim().is_empty() && !self.tags.contains(&name) {
                self.tags.push(name);
            }
        }
        self
    }

    pub fn with_combinator(mut self, combinator: Combinator) -> Self {
        self.combinator = combinator;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Case-insensitive substring match on title or description
    pub fn with_search(mut self, needle: impl Into<String>) -> Self {
        let needle = needle.into();
        self.search = if needle.trim().is_empty() {
            None
        } else {
            Some(needle)
        };
        self
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }
}

/// Case-insensitive substring test of `needle` against title or description.
///
/// Folding is full Unicode lowercase. Every backend evaluates search through
/// this function so results agree across stores.
pub fn search_matches(needle: &str, title: Option<&str>, description: Option<&str>) -> bool {
    let needle = needle.to_lowercase();
    [title, description]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
}
