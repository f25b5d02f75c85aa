//! Key namespacing for the remote tier

use tiercache_core::{CacheError, Result};
use uuid::Uuid;

/// Isolation scope for one cache instance
///
/// Every key sent to the remote store is `id:` + logical key. Shared
/// counters and collections live under sibling prefixes (`id#counter:`,
/// `id#list:`, `id#set:`) that value scans never match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    id: String,
    prefix: String,
}

impl Namespace {
    /// Namespace with a caller-chosen id
    ///
    /// Ids are limited to ASCII alphanumerics, `-`, `_` and `.`, which keeps
    /// glob metacharacters and the `:`/`#` separators out of every prefix.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_id(&id)?;
        Ok(Self::from_valid(id))
    }

    /// Namespace with a fresh UUID v4 id
    pub fn generated() -> Self {
        Self::from_valid(Uuid::new_v4().to_string())
    }

    fn from_valid(id: String) -> Self {
        let prefix = format!("{}:", id);
        Self { id, prefix }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Physical remote key for a logical key
    pub fn physical(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Logical key for a physical key, if it belongs to this namespace
    pub fn logical<'a>(&self, physical: &'a str) -> Option<&'a str> {
        physical.strip_prefix(self.prefix.as_str())
    }

    /// Remote `MATCH` pattern for keys starting with `pattern`
    pub fn match_pattern(&self, pattern: &str) -> String {
        format!("{}{}*", self.prefix, pattern)
    }

    pub fn counter_key(&self, name: &str) -> String {
        format!("{}#counter:{}", self.id, name)
    }

    pub fn list_key(&self, name: &str) -> String {
        format!("{}#list:{}", self.id, name)
    }

    pub fn set_key(&self, name: &str) -> String {
        format!("{}#set:{}", self.id, name)
    }
}

/// Check a namespace id
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(CacheError::InvalidConfig("namespace id is empty".into()));
    }
    if let Some(c) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(CacheError::InvalidConfig(format!(
            "namespace id {:?} contains {:?}",
            id, c
        )));
    }
    Ok(())
}
