//! Key namespacing.
//!
//! One object store holds every partition; a record's partition is the
//! prefix of its key: `"<partition>_<id>"`.

use std::fmt;

/// Logical collections multiplexed onto one object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Form drafts
    Drafts,
    /// Reference/lookup data
    Cache,
    /// Generic application data and the session token
    Data,
}

impl Partition {
    /// Every partition.
    pub const ALL: [Partition; 3] = [Partition::Drafts, Partition::Cache, Partition::Data];

    /// Prefix name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Drafts => "drafts",
            Partition::Cache => "cache",
            Partition::Data => "data",
        }
    }

    /// `"<partition>_"`, the string every member key starts with.
    pub fn prefix(&self) -> String {
        format!("{}_", self.as_str())
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical key for `id` in `partition`.
///
/// Idempotent: an id that already carries the prefix is returned as is.
pub fn namespaced_key(partition: Partition, id: &str) -> String {
    if belongs_to(id, partition) {
        id.to_string()
    } else {
        format!("{}_{}", partition.as_str(), id)
    }
}

/// Whether a physical key lives in `partition`.
pub fn belongs_to(key: &str, partition: Partition) -> bool {
    key.strip_prefix(partition.as_str())
        .map(|rest| rest.starts_with('_'))
        .unwrap_or(false)
}

/// Logical id of a physical key, if it belongs to `partition`.
pub fn strip_namespace(key: &str, partition: Partition) -> Option<&str> {
    key.strip_prefix(partition.as_str())
        .and_then(|rest| rest.strip_prefix('_'))
}
