//! # Tableflow Channel
//!
//! The realtime push channel that fans order events out to every surface.
//!
//! One duplex connection per client process, joined to explicit rooms
//! (`admin`, `kitchen`, `table:<n>`, `customer:<orderId>`). Push delivery is
//! best-effort: events arrive in server-emission order on a live connection,
//! but nothing is guaranteed across reconnects. Surfaces treat pushes as a
//! freshness hint and keep a manual full-reload path for reconciliation.
//!
//! Design decisions baked in here:
//!
//! - **No global singleton.** The channel is an injectable service behind
//!   [`RealtimeChannel`] with an explicit `connect`/`disconnect`/`join`
//!   lifecycle, so tests substitute a fake and independent instances are
//!   possible.
//! - **Multi-subscriber fan-out.** The [`router::EventRouter`] keeps a list
//!   of subscribers per event kind, each with an unsubscribe token. A new
//!   registration never displaces an existing one.
//! - **Bounded reconnect.** Connection loss degrades the health flag and
//!   retries with capped, jittered exponential backoff; after the attempt
//!   budget is spent the channel reports [`ConnectionHealth::Lost`] and waits
//!   for an explicit reconnect.

use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use tableflow_orders::events::{RealtimeEvent, Room};
use thiserror::Error;

/// Multi-subscriber event fan-out
pub mod router;

/// Reconnect backoff policy
pub mod reconnect;

/// Best-effort notification cues
pub mod notify;

/// WebSocket transport
pub mod ws;

pub use notify::{AlertKind, Notifier, NullNotifier};
pub use reconnect::ReconnectPolicy;
pub use router::{EventRouter, Subscription};
pub use ws::WsRealtimeChannel;

/// Errors surfaced by channel implementations.
#[derive(Error, Debug, Clone)]
pub enum ChannelError {
    /// Failed to establish the connection
    #[error("connection failed: {0}")]
    ConnectFailed(String),

    /// Operation requires a live connection
    #[error("not connected")]
    NotConnected,

    /// Failed to join or leave a room
    #[error("subscription failed for room '{room}': {reason}")]
    SubscriptionFailed {
        /// The room that failed
        room: String,
        /// The reason for failure
        reason: String,
    },

    /// Network or transport error
    #[error("transport error: {0}")]
    TransportError(String),
}

/// Connection health as surfaces see it.
///
/// `Degraded` is the UI's cue to show a reconnecting banner; `Lost` means the
/// attempt budget is spent and only an explicit reconnect (manual reload)
/// will resume push delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionHealth {
    /// Not yet connected, or explicitly disconnected
    #[default]
    Idle,
    /// Connected and delivering events
    Connected,
    /// Connection lost; reconnecting (attempt number is 0-indexed)
    Degraded {
        /// Current reconnect attempt
        attempt: u32,
    },
    /// Reconnect budget exhausted; manual reconnect required
    Lost,
}

impl ConnectionHealth {
    /// Whether events are currently flowing
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Whether the UI should show a degraded-state flag
    #[must_use]
    pub const fn is_degraded(self) -> bool {
        matches!(self, Self::Degraded { .. } | Self::Lost)
    }
}

/// Stream of events delivered to one subscriber.
pub type EventStream = Pin<Box<dyn Stream<Item = RealtimeEvent> + Send>>;

/// Boxed future returned by [`RealtimeChannel`] methods (dyn compatibility).
pub type ChannelFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ChannelError>> + Send + 'a>>;

/// One duplex realtime connection with room-scoped subscriptions.
///
/// Implementations own the notification side effects and the reconnect
/// supervision; consumers only join rooms and drain [`EventStream`]s.
pub trait RealtimeChannel: Send + Sync {
    /// Establishes the connection and begins delivering events.
    ///
    /// Also the manual-reload path after [`ConnectionHealth::Lost`].
    fn connect(&self) -> ChannelFuture<'_, ()>;

    /// Closes the connection. Joined rooms are remembered and re-joined on
    /// the next `connect`.
    fn disconnect(&self) -> ChannelFuture<'_, ()>;

    /// Joins a room. Effective immediately on a live connection and
    /// replayed after every reconnect.
    fn join(&self, room: Room) -> ChannelFuture<'_, ()>;

    /// Leaves a room.
    fn leave(&self, room: Room) -> ChannelFuture<'_, ()>;

    /// A stream of every event from every joined room.
    ///
    /// Each call returns an independent subscriber; slow subscribers miss
    /// events rather than blocking the connection.
    fn events(&self) -> EventStream;

    /// Current connection health.
    fn health(&self) -> ConnectionHealth;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_flags() {
        assert!(ConnectionHealth::Connected.is_connected());
        assert!(!ConnectionHealth::Idle.is_connected());
        assert!(ConnectionHealth::Degraded { attempt: 2 }.is_degraded());
        assert!(ConnectionHealth::Lost.is_degraded());
        assert!(!ConnectionHealth::Connected.is_degraded());
    }
}
