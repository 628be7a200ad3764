//! Immutable route table snapshots.

use std::collections::HashSet;

use url::Url;

/// The routing table at one point in time.
///
/// Never mutated after construction. [`RouteSnapshot::with_flagged`] derives
/// the next version instead, so readers can hold a snapshot for as long as
/// they like without coordinating with anyone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSnapshot {
    flagged: HashSet<String>,
    default_backend: Url,
    version: u64,
}

impl RouteSnapshot {
    /// The initial, empty table.
    pub fn new(default_backend: Url) -> Self {
        Self {
            flagged: HashSet::new(),
            default_backend,
            version: 0,
        }
    }

    /// A copy of this snapshot with `user_id` added to the flagged set.
    pub fn with_flagged(&self, user_id: &str) -> Self {
        let mut flagged = self.flagged.clone();
        flagged.insert(user_id.to_string());
        Self {
            flagged,
            default_backend: self.default_backend.clone(),
            version: self.version + 1,
        }
    }

    pub fn is_flagged(&self, user_id: &str) -> bool {
        self.flagged.contains(user_id)
    }

    pub fn flagged(&self) -> &HashSet<String> {
        &self.flagged
    }

    pub fn default_backend(&self) -> &Url {
        &self.default_backend
    }

    /// Position of this snapshot in the adoption sequence.
    pub fn version(&self) -> u64 {
        self.version
    }
}
