//! Composed cache keys.
//!
//! A `CacheKey` can only be built from a prefix, a namespace and a caller
//! key, so every store call is namespaced by construction.

use std::fmt;

/// Separator between prefix, namespace and key.
pub const KEY_SEPARATOR: char = ':';

const ESCAPE: char = '\\';

/// A fully composed cache key: `prefix:namespace:key`.
///
/// # Format
///
/// The namespace is escaped (`\` becomes `\\`, `:` becomes `\:`) so that two
/// distinct (namespace, key) pairs can never compose to the same string. A
/// namespace free of those characters composes verbatim, and the caller key
/// is never escaped because it is always the last segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    /// Private inner data - cannot be constructed externally
    inner: CacheKeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct CacheKeyInner {
    composed: String,
    prefix: String,
    namespace: String,
    key: String,
}

impl CacheKey {
    /// Compose a key from its parts.
    ///
    /// `prefix` is expected to be free of the separator; the config layer
    /// enforces that before a prefix ever reaches here.
    pub fn compose(prefix: &str, namespace: &str, key: &str) -> Self {
        let mut composed =
            String::with_capacity(prefix.len() + namespace.len() + key.len() + 2);
        composed.push_str(prefix);
        composed.push(KEY_SEPARATOR);
        for c in namespace.chars() {
            if c == ESCAPE || c == KEY_SEPARATOR {
                composed.push(ESCAPE);
            }
            composed.push(c);
        }
        composed.push(KEY_SEPARATOR);
        composed.push_str(key);

        Self {
            inner: CacheKeyInner {
                composed,
                prefix: prefix.to_string(),
                namespace: namespace.to_string(),
                key: key.to_string(),
            },
        }
    }

    /// Decode a composed key back into its parts.
    ///
    /// Returns `None` if the string has no prefix segment, no unescaped
    /// namespace terminator, or a dangling escape.
    pub fn parse(raw: &str) -> Option<Self> {
        let (prefix, rest) = raw.split_once(KEY_SEPARATOR)?;
        if prefix.is_empty() {
            return None;
        }

        let mut namespace = String::new();
        let mut chars = rest.char_indices();
        let key_start = loop {
            match chars.next()? {
                (_, ESCAPE) => {
                    let (_, escaped) = chars.next()?;
                    if escaped != ESCAPE && escaped != KEY_SEPARATOR {
                        return None;
                    }
                    namespace.push(escaped);
                }
                (i, KEY_SEPARATOR) => break i + KEY_SEPARATOR.len_utf8(),
                (_, c) => namespace.push(c),
            }
        };

        Some(Self {
            inner: CacheKeyInner {
                composed: raw.to_string(),
                prefix: prefix.to_string(),
                namespace,
                key: rest[key_start..].to_string(),
            },
        })
    }

    /// The composed string handed to stores.
    pub fn as_str(&self) -> &str {
        &self.inner.composed
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.inner.composed.as_bytes()
    }

    pub fn prefix(&self) -> &str {
        &self.inner.prefix
    }

    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    /// The caller-supplied key.
    pub fn key(&self) -> &str {
        &self.inner.key
    }

    pub fn into_string(self) -> String {
        self.inner.composed
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.composed)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
