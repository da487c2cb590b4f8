//! Typed publish/subscribe surface for realtime events.
//!
//! Handlers are keyed by [`EventKind`] and invoked in registration
//! order. Subscribing returns a [`SubscriptionToken`] for targeted
//! removal; [`EventDispatcher::clear`] drops every handler for a kind
//! (the "off with no callback" form).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::events::{EventKind, RealtimeEvent};

type Handler = Arc<dyn Fn(&RealtimeEvent) + Send + Sync>;

/// Proof of subscription; pass back to
/// [`EventDispatcher::unsubscribe`] to remove the handler.
#[derive(Debug)]
pub struct SubscriptionToken {
    kind: EventKind,
    id: u64,
}

/// Ordered, keyed handler registry.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Mutex<HashMap<EventKind, Vec<(u64, Handler)>>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionToken
    where
        F: Fn(&RealtimeEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .lock()
            .expect("dispatcher lock poisoned")
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        SubscriptionToken { kind, id }
    }

    /// Remove one handler. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut handlers = self.handlers.lock().expect("dispatcher lock poisoned");
        match handlers.get_mut(&token.kind) {
            Some(list) => {
                let before = list.len();
                list.retain(|(id, _)| *id != token.id);
                list.len() != before
            }
            None => false,
        }
    }

    /// Remove every handler for the given kind.
    pub fn clear(&self, kind: EventKind) {
        self.handlers
            .lock()
            .expect("dispatcher lock poisoned")
            .remove(&kind);
    }

    /// Invoke the kind's handlers in registration order.
    ///
    /// Handlers run outside the registry lock, so a handler may
    /// subscribe or unsubscribe without deadlocking; such changes take
    /// effect from the next emit.
    pub fn emit(&self, event: &RealtimeEvent) {
        let snapshot: Vec<Handler> = {
            let handlers = self.handlers.lock().expect("dispatcher lock poisoned");
            match handlers.get(&event.kind()) {
                Some(list) => list.iter().map(|(_, h)| Arc::clone(h)).collect(),
                None => return,
            }
        };

        for handler in snapshot {
            handler(event);
        }
    }
}
