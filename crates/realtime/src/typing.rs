//! Per-conversation typing indicators with timeout-based auto-clear.
//!
//! Each `user_typing` frame arms (or re-arms) a single timer for that
//! (conversation, user) pair; the timer firing or an explicit stop
//! clears the flag. Expirations are delivered over a channel so the
//! connection loop can turn them into events.
//!
//! Timers carry a generation number: an expiration raced by a fresh
//! `touch` is recognisably stale and ignored, so a re-armed indicator
//! is never cleared by its predecessor's timer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tradewire_core::types::EntityId;

type TypingKey = (EntityId, EntityId);

/// A typing timer that ran to completion.
#[derive(Debug)]
pub struct Expiry {
    pub conversation_id: EntityId,
    pub user_id: EntityId,
    generation: u64,
}

struct TimerEntry {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Tracks live typing indicators and their auto-clear timers.
pub struct TypingTracker {
    timeout: Duration,
    expired_tx: mpsc::UnboundedSender<Expiry>,
    timers: Mutex<HashMap<TypingKey, TimerEntry>>,
    next_generation: AtomicU64,
}

impl TypingTracker {
    /// Create a tracker and the channel its expirations arrive on.
    pub fn new(timeout: Duration) -> (Self, mpsc::UnboundedReceiver<Expiry>) {
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        (
            Self {
                timeout,
                expired_tx,
                timers: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            },
            expired_rx,
        )
    }

    /// Mark the user as typing, cancelling any previous timer for the
    /// pair and arming a fresh one.
    pub fn touch(&self, conversation_id: &str, user_id: &str) {
        let key: TypingKey = (conversation_id.to_string(), user_id.to_string());
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        let tx = self.expired_tx.clone();
        let timeout = self.timeout;
        let (conversation, user) = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(Expiry {
                conversation_id: conversation,
                user_id: user,
                generation,
            });
        });

        let mut timers = self.lock();
        if let Some(previous) = timers.insert(key, TimerEntry { generation, handle }) {
            previous.handle.abort();
        }
    }

    /// Clear the flag (explicit `user_stop_typing`). Returns whether a
    /// flag was live.
    pub fn clear(&self, conversation_id: &str, user_id: &str) -> bool {
        let key: TypingKey = (conversation_id.to_string(), user_id.to_string());
        match self.lock().remove(&key) {
            Some(entry) => {
                entry.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Apply a timer expiration. Returns `false` for stale expirations
    /// whose pair was re-touched or cleared after the timer fired.
    pub fn expire(&self, expiry: &Expiry) -> bool {
        let key: TypingKey = (expiry.conversation_id.clone(), expiry.user_id.clone());
        let mut timers = self.lock();
        match timers.get(&key) {
            Some(entry) if entry.generation == expiry.generation => {
                timers.remove(&key);
                true
            }
            _ => false,
        }
    }

    /// Whether the user currently shows as typing in the conversation.
    pub fn is_typing(&self, conversation_id: &str, user_id: &str) -> bool {
        let key: TypingKey = (conversation_id.to_string(), user_id.to_string());
        self.lock().contains_key(&key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<TypingKey, TimerEntry>> {
        self.timers.lock().expect("typing tracker lock poisoned")
    }
}

impl Drop for TypingTracker {
    fn drop(&mut self) {
        for (_, entry) in self.lock().drain() {
            entry.handle.abort();
        }
    }
}
