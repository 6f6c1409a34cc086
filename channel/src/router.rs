//! Multi-subscriber event fan-out.
//!
//! The router replaces a single-callback-per-event-name registry (where each
//! new registration silently displaced the previous one) with a proper bus:
//! every subscriber gets its own slot and an unsubscribe token, and stream
//! consumers get an independent broadcast receiver.

use crate::EventStream;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tableflow_orders::events::{EventKind, RealtimeEvent};
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

type Callback = Arc<dyn Fn(&RealtimeEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    callbacks: HashMap<EventKind, Vec<(u64, Callback)>>,
}

/// Fans incoming events out to callback subscribers (by event kind) and to
/// broadcast stream subscribers (all events).
pub struct EventRouter {
    registry: Arc<Mutex<Registry>>,
    broadcast: broadcast::Sender<RealtimeEvent>,
    next_token: AtomicU64,
}

impl EventRouter {
    /// Creates a router whose stream subscribers buffer up to `capacity`
    /// events before lagging.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (broadcast, _) = broadcast::channel(capacity);
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
            broadcast,
            next_token: AtomicU64::new(1),
        }
    }

    /// Registers a callback for one event kind.
    ///
    /// Registration is additive: existing subscribers for the same kind keep
    /// receiving events. Dropping the returned [`Subscription`] removes the
    /// callback.
    pub fn on<F>(&self, kind: EventKind, callback: F) -> Subscription
    where
        F: Fn(&RealtimeEvent) + Send + Sync + 'static,
    {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let mut registry = lock(&self.registry);
        registry
            .callbacks
            .entry(kind)
            .or_default()
            .push((token, Arc::new(callback)));
        Subscription {
            token,
            kind,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// An independent stream of every published event.
    ///
    /// Lagging subscribers skip missed events instead of blocking the
    /// publisher; surfaces reconcile through their manual reload path.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        let receiver = self.broadcast.subscribe();
        Box::pin(BroadcastStream::new(receiver).filter_map(|item| match item {
            Ok(event) => Some(event),
            Err(error) => {
                tracing::warn!(%error, "event stream subscriber lagged, events skipped");
                None
            },
        }))
    }

    /// Publishes an event to every callback registered for its kind and to
    /// every stream subscriber.
    pub fn publish(&self, event: &RealtimeEvent) {
        metrics::counter!("channel.events.published", "kind" => event.kind().as_str())
            .increment(1);

        let callbacks: Vec<Callback> = {
            let registry = lock(&self.registry);
            registry
                .callbacks
                .get(&event.kind())
                .map(|subscribers| subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default()
        };
        for callback in callbacks {
            callback(event);
        }

        // No stream subscribers is fine; ignore the send error.
        let _ = self.broadcast.send(event.clone());
    }

    /// Number of callbacks currently registered for a kind.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        lock(&self.registry)
            .callbacks
            .get(&kind)
            .map_or(0, Vec::len)
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new(64)
    }
}

fn lock(registry: &Mutex<Registry>) -> std::sync::MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Unsubscribe token returned by [`EventRouter::on`].
///
/// Dropping it removes the callback, so a re-mounting component replaces its
/// own subscription and nobody else's.
pub struct Subscription {
    token: u64,
    kind: EventKind,
    registry: Weak<Mutex<Registry>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = lock(&registry);
            if let Some(subscribers) = registry.callbacks.get_mut(&self.kind) {
                subscribers.retain(|(token, _)| *token != self.token);
            }
        }
    }
}
