//! Monotonicity guard for message delivery status.
//!
//! The transport delivers receipts in whatever order the server sends
//! them; this ledger ensures subscribers only ever observe a forward
//! subsequence of `sent -> delivered -> read` per message id.

use std::collections::HashMap;
use std::sync::Mutex;

use tradewire_core::chat::MessageStatus;
use tradewire_core::types::EntityId;

/// Last observed status per message id.
#[derive(Default)]
pub struct StatusLedger {
    seen: Mutex<HashMap<EntityId, MessageStatus>>,
}

impl StatusLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation. Returns `true` when it advances the
    /// message's status (first sighting included), `false` when it
    /// would repeat or rewind it; the caller suppresses those.
    pub fn observe(&self, message_id: &str, status: MessageStatus) -> bool {
        let mut seen = self.seen.lock().expect("status ledger lock poisoned");
        match seen.get_mut(message_id) {
            Some(current) => current.advance(status),
            None => {
                seen.insert(message_id.to_string(), status);
                true
            }
        }
    }

    /// Forget everything (e.g. when the owning conversation view goes
    /// away).
    pub fn reset(&self) {
        self.seen.lock().expect("status ledger lock poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_is_accepted() {
        let ledger = StatusLedger::new();
        assert!(ledger.observe("m-1", MessageStatus::Sent));
    }

    #[test]
    fn forward_transitions_advance() {
        let ledger = StatusLedger::new();
        assert!(ledger.observe("m-1", MessageStatus::Sent));
        assert!(ledger.observe("m-1", MessageStatus::Delivered));
        assert!(ledger.observe("m-1", MessageStatus::Read));
    }

    #[test]
    fn backward_and_repeat_transitions_are_suppressed() {
        let ledger = StatusLedger::new();
        assert!(ledger.observe("m-1", MessageStatus::Read));

        assert!(!ledger.observe("m-1", MessageStatus::Read));
        assert!(!ledger.observe("m-1", MessageStatus::Delivered));
        assert!(!ledger.observe("m-1", MessageStatus::Sent));
    }

    #[test]
    fn message_ids_are_independent() {
        let ledger = StatusLedger::new();
        assert!(ledger.observe("m-1", MessageStatus::Read));
        assert!(ledger.observe("m-2", MessageStatus::Sent));
        assert!(ledger.observe("m-2", MessageStatus::Delivered));
    }

    #[test]
    fn reset_forgets_history() {
        let ledger = StatusLedger::new();
        assert!(ledger.observe("m-1", MessageStatus::Read));

        ledger.reset();
        assert!(ledger.observe("m-1", MessageStatus::Sent));
    }
}
