//! Resolved per-entry write options handed to stores.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Expiration and tags for a single store write.
///
/// Produced by resolving caller options at the moment a write is about to
/// happen. Tags keep their first-seen order and contain no duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryOptions {
    /// Time-to-live relative to the write.
    pub expiration: Duration,
    /// Tags used for bulk invalidation.
    pub tags: Vec<String>,
}

impl EntryOptions {
    /// Create entry options with no tags.
    pub fn new(expiration: Duration) -> Self {
        Self {
            expiration,
            tags: Vec::new(),
        }
    }

    /// Append tags, skipping any already present.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extend_tags(tags);
        self
    }

    /// Append tags in place, skipping any already present.
    pub fn extend_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            let tag = tag.into();
            if !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}
