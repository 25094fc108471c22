//! Partner history: bounded memory of recent match partners.
//!
//! Consulted by the matching scan to diversify pairing. Keyed by transport
//! connection rather than participant id: participant ids are minted fresh
//! on every `join-chat` and never reused, so the connection is the only
//! identity that survives a leave/rejoin cycle and can accumulate history.
//! The memory is dropped when the connection closes.

use std::collections::{HashMap, VecDeque};

/// Per-connection, most-recent-first list of previous partner connections.
#[derive(Debug)]
pub struct PartnerHistory {
    limit: usize,
    entries: HashMap<u64, VecDeque<u64>>,
}

impl PartnerHistory {
    /// Create a history keeping at most `limit` partners per connection.
    pub fn new(limit: usize) -> Self {
        Self { limit, entries: HashMap::new() }
    }

    /// Record a successful match in both directions.
    ///
    /// Each side's new partner lands at position 0. A pre-existing
    /// occurrence is moved to the front rather than duplicated, so the
    /// list stays a recency-ordered set.
    pub fn record(&mut self, a: u64, b: u64) {
        self.push_front(a, b);
        self.push_front(b, a);
    }

    /// Whether `partner` appears in `connection`'s recent history.
    pub fn contains(&self, connection: u64, partner: u64) -> bool {
        self.entries
            .get(&connection)
            .is_some_and(|recent| recent.contains(&partner))
    }

    /// Recent partner connections, most recent first.
    pub fn recent(&self, connection: u64) -> impl Iterator<Item = u64> + '_ {
        self.entries.get(&connection).into_iter().flat_map(|r| r.iter().copied())
    }

    /// Forget a connection's own history.
    ///
    /// Called when the connection closes. Connection ids are unique for
    /// the process lifetime, so stale references to a closed connection in
    /// other lists can never block anyone; they age out of the bounded
    /// lists naturally.
    pub fn forget(&mut self, connection: u64) {
        self.entries.remove(&connection);
    }

    fn push_front(&mut self, connection: u64, partner: u64) {
        let recent = self.entries.entry(connection).or_default();
        recent.retain(|p| *p != partner);
        recent.push_front(partner);
        recent.truncate(self.limit);
    }
}
