//! Per-call cache options.
//!
//! Options are built up front and resolved exactly once, at the point a
//! miss is about to be written back. Deferred tag computations therefore
//! never run on a hit or after a failed load.

use std::fmt;
use std::time::Duration;

use cacheable_core::EntryOptions;

/// Deferred tag computation.
pub type TagFn = Box<dyn FnOnce() -> Vec<String> + Send + 'static>;

/// Where a group of tags comes from.
pub enum TagSource {
    /// Tags known when the call is made.
    Static(Vec<String>),
    /// Tags computed only if the value is written.
    Deferred(TagFn),
}

impl TagSource {
    fn resolve(self) -> Vec<String> {
        match self {
            TagSource::Static(tags) => tags,
            TagSource::Deferred(compute) => compute(),
        }
    }
}

impl fmt::Debug for TagSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagSource::Static(tags) => f.debug_tuple("Static").field(tags).finish(),
            TagSource::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Options for a single `get` call.
///
/// # Example
///
/// ```ignore
/// let options = CacheOptions::new()
///     .with_expiration(Duration::from_secs(600))
///     .with_tags(["user", "teamId:7"])
///     .with_dynamic_tags(|| lookup_team_tags("user1"));
/// ```
#[derive(Debug, Default)]
pub struct CacheOptions {
    expiration: Option<Duration>,
    tags: Vec<TagSource>,
}

impl CacheOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the expiration for this entry.
    ///
    /// A zero duration is treated as unset.
    pub fn with_expiration(mut self, expiration: Duration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Attach static tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.push(TagSource::Static(tags.into_iter().map(Into::into).collect()));
        self
    }

    /// Attach tags computed only when the value is about to be written.
    ///
    /// Use this when building tags is expensive (e.g. needs a lookup).
    pub fn with_dynamic_tags<F>(mut self, compute: F) -> Self
    where
        F: FnOnce() -> Vec<String> + Send + 'static,
    {
        self.tags.push(TagSource::Deferred(Box::new(compute)));
        self
    }

    /// The explicit expiration, if one was set and is non-zero.
    pub fn expiration(&self) -> Option<Duration> {
        self.expiration.filter(|d| !d.is_zero())
    }

    pub fn has_tags(&self) -> bool {
        !self.tags.is_empty()
    }

    /// Resolve into entry options, running deferred tag sources in order.
    pub fn resolve(self, default_expiration: Duration) -> EntryOptions {
        let expiration = self.expiration().unwrap_or(default_expiration);
        let mut entry = EntryOptions::new(expiration);
        for source in self.tags {
            entry.extend_tags(source.resolve());
        }
        entry
    }
}
