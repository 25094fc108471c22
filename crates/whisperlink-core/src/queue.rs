//! Waiting queue and pairing scan.
//!
//! FIFO list of participants seeking a partner. The scan performs lazy
//! eviction: entries whose connection is gone are removed in place when
//! encountered, so no separate sweep task exists.

use std::collections::VecDeque;

use crate::history::PartnerHistory;

/// A participant waiting to be matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitingEntry {
    /// Participant seeking a partner.
    pub participant_id: String,
    /// Transport connection backing the participant.
    pub connection_id: u64,
}

/// FIFO waiting list with the candidate-selection scan.
#[derive(Debug, Default)]
pub struct MatchQueue {
    entries: VecDeque<WaitingEntry>,
}

impl MatchQueue {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a partner for `requester`, removing it from the queue.
    ///
    /// Scans oldest-first. Candidates are skipped when they are the
    /// requester itself or their connection appears in the requester's
    /// recent-partner history; dead connections are evicted in place and
    /// never selected. FIFO order decides among eligible candidates.
    ///
    /// History avoidance is unconditional: a requester whose only live
    /// candidates are recent partners waits in the queue until someone
    /// new arrives, their history ages out, or the blocking side's
    /// connection closes.
    ///
    /// Returns `None` when no eligible candidate exists; the caller
    /// enqueues the requester instead.
    pub fn select<F>(
        &mut self,
        requester: &WaitingEntry,
        history: &PartnerHistory,
        is_live: F,
    ) -> Option<WaitingEntry>
    where
        F: Fn(u64) -> bool,
    {
        let mut i = 0;
        while i < self.entries.len() {
            let entry = &self.entries[i];
            if entry.participant_id == requester.participant_id {
                i += 1;
                continue;
            }
            if !is_live(entry.connection_id) {
                // Lazy eviction: remove and rescan the same index
                self.entries.remove(i);
                continue;
            }
            if history.contains(requester.connection_id, entry.connection_id) {
                i += 1;
                continue;
            }
            return self.entries.remove(i);
        }

        None
    }

    /// Remove any entry for a participant. Returns `true` if one existed.
    ///
    /// Used both for explicit leave/disconnect and as defensive
    /// de-duplication before a join enqueues.
    pub fn remove(&mut self, participant_id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.participant_id != participant_id);
        self.entries.len() != before
    }

    /// Append an entry at the tail (normal enqueue).
    pub fn push_back(&mut self, entry: WaitingEntry) {
        self.entries.push_back(entry);
    }

    /// Insert an entry at the head.
    ///
    /// Used by match-race recovery so a requester whose selected partner
    /// vanished is matched first on the next attempt.
    pub fn push_front(&mut self, entry: WaitingEntry) {
        self.entries.push_front(entry);
    }

    /// Whether a participant is currently queued.
    pub fn contains(&self, participant_id: &str) -> bool {
        self.entries.iter().any(|e| e.participant_id == participant_id)
    }

    /// Number of queued participants.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queued entries in FIFO order.
    pub fn iter(&self) -> impl Iterator<Item = &WaitingEntry> {
        self.entries.iter()
    }
}
