//! WebSocket transport for the realtime channel.
//!
//! # Protocol
//!
//! One text-frame JSON protocol in both directions.
//!
//! **Client → Server (room control):**
//! ```json
//! {"action": "join", "room": "table:7"}
//! {"action": "leave", "room": "customer:ord-41"}
//! ```
//!
//! **Server → Client (events):**
//! ```json
//! {"event": "order-status-update", "payload": {"orderId": "ord-41", ...}}
//! ```
//!
//! Malformed frames are logged and skipped; they never tear the connection
//! down. When the connection drops, the read loop reconnects with the
//! configured [`ReconnectPolicy`], re-joins every room, and keeps going; once
//! the attempt budget is spent the channel parks in
//! [`ConnectionHealth::Lost`] until `connect` is called again. Events
//! emitted while disconnected are gone — surfaces reconcile via their manual
//! reload path.

use crate::router::EventRouter;
use crate::{
    AlertKind, ChannelError, ChannelFuture, ConnectionHealth, EventStream, Notifier,
    NullNotifier, RealtimeChannel, ReconnectPolicy,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tableflow_orders::events::{RealtimeEvent, Room};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

#[derive(serde::Serialize)]
struct ControlFrame<'a> {
    action: &'a str,
    room: String,
}

fn control_frame(action: &str, room: &Room) -> String {
    serde_json::to_string(&ControlFrame {
        action,
        room: room.to_string(),
    })
    .unwrap_or_default()
}

struct Shared {
    url: String,
    policy: ReconnectPolicy,
    router: EventRouter,
    notifier: Arc<dyn Notifier>,
    rooms: std::sync::Mutex<HashSet<Room>>,
    writer: Mutex<Option<WsSink>>,
    health: watch::Sender<ConnectionHealth>,
}

/// [`RealtimeChannel`] over a WebSocket connection.
pub struct WsRealtimeChannel {
    shared: Arc<Shared>,
    reader: Mutex<Option<tokio::task::JoinHandle<()>>>,
    health_rx: watch::Receiver<ConnectionHealth>,
}

impl WsRealtimeChannel {
    /// Creates a channel against `url` with the default reconnect policy and
    /// no notification cues.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_options(url, ReconnectPolicy::default(), Arc::new(NullNotifier))
    }

    /// Creates a channel with an explicit reconnect policy and notifier.
    #[must_use]
    pub fn with_options(
        url: impl Into<String>,
        policy: ReconnectPolicy,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (health_tx, health_rx) = watch::channel(ConnectionHealth::Idle);
        Self {
            shared: Arc::new(Shared {
                url: url.into(),
                policy,
                router: EventRouter::default(),
                notifier,
                rooms: std::sync::Mutex::new(HashSet::new()),
                writer: Mutex::new(None),
                health: health_tx,
            }),
            reader: Mutex::new(None),
            health_rx,
        }
    }

    /// The router, for kind-scoped callback subscriptions.
    #[must_use]
    pub fn router(&self) -> &EventRouter {
        &self.shared.router
    }

    /// A receiver that observes health changes (degraded-state UI flag).
    #[must_use]
    pub fn health_changes(&self) -> watch::Receiver<ConnectionHealth> {
        self.health_rx.clone()
    }
}

fn rooms_snapshot(shared: &Shared) -> Vec<Room> {
    shared
        .rooms
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .iter()
        .cloned()
        .collect()
}

/// Opens the socket, re-joins every remembered room and installs the writer.
async fn establish(shared: &Shared) -> Result<WsSource, ChannelError> {
    let (stream, _) = connect_async(shared.url.as_str())
        .await
        .map_err(|error| ChannelError::ConnectFailed(error.to_string()))?;
    let (mut sink, source) = stream.split();

    for room in rooms_snapshot(shared) {
        sink.send(Message::Text(control_frame("join", &room)))
            .await
            .map_err(|error| ChannelError::SubscriptionFailed {
                room: room.to_string(),
                reason: error.to_string(),
            })?;
    }

    *shared.writer.lock().await = Some(sink);
    let _ = shared.health.send(ConnectionHealth::Connected);
    Ok(source)
}

/// Parses one incoming frame and fans it out; cues are best-effort and never
/// gate the publish.
fn dispatch(shared: &Shared, text: &str) {
    match serde_json::from_str::<RealtimeEvent>(text) {
        Ok(event) => {
            match &event {
                RealtimeEvent::NewOrder(announced) => shared.notifier.alert(
                    AlertKind::NewActivity,
                    &format!("New order {} at table {}", announced.order_number, announced.table_number),
                ),
                RealtimeEvent::NewItemsAdded { order_id } => shared
                    .notifier
                    .alert(AlertKind::NewActivity, &format!("Items added to order {order_id}")),
                RealtimeEvent::OrderCompleted { order_id } => shared
                    .notifier
                    .alert(AlertKind::Completion, &format!("Order {order_id} completed")),
                RealtimeEvent::OrderStatusUpdate(_) | RealtimeEvent::OrderDeleted { .. } => {},
            }
            shared.router.publish(&event);
        },
        Err(error) => tracing::warn!(%error, "ignoring malformed realtime frame"),
    }
}

/// Reconnect loop: degraded while retrying, lost when the budget is spent.
async fn resume(shared: &Shared) -> Option<WsSource> {
    shared.writer.lock().await.take();

    let mut attempt = 0;
    while shared.policy.should_retry(attempt) {
        let _ = shared.health.send(ConnectionHealth::Degraded { attempt });
        let delay = shared.policy.delay_for_attempt(attempt);
        tracing::info!(attempt, ?delay, "reconnecting realtime channel");
        metrics::counter!("channel.reconnect.attempts").increment(1);
        tokio::time::sleep(delay).await;

        match establish(shared).await {
            Ok(source) => {
                tracing::info!(attempt, "realtime channel reconnected");
                return Some(source);
            },
            Err(error) => {
                tracing::warn!(attempt, %error, "reconnect attempt failed");
                attempt += 1;
            },
        }
    }

    let _ = shared.health.send(ConnectionHealth::Lost);
    metrics::counter!("channel.reconnect.exhausted").increment(1);
    tracing::error!("realtime reconnect budget exhausted, manual reload required");
    None
}

async fn read_loop(shared: Arc<Shared>, mut source: WsSource) {
    loop {
        match source.next().await {
            Some(Ok(Message::Text(text))) => dispatch(&shared, &text),
            // Pings are answered by the transport; other frame types carry
            // nothing for us
            Some(Ok(Message::Close(_))) | None => {
                tracing::info!("realtime connection closed");
                match resume(&shared).await {
                    Some(next) => source = next,
                    None => return,
                }
            },
            Some(Ok(_)) => {},
            Some(Err(error)) => {
                tracing::warn!(%error, "realtime connection errored");
                match resume(&shared).await {
                    Some(next) => source = next,
                    None => return,
                }
            },
        }
    }
}

impl RealtimeChannel for WsRealtimeChannel {
    fn connect(&self) -> ChannelFuture<'_, ()> {
        Box::pin(async move {
            if let Some(previous) = self.reader.lock().await.take() {
                previous.abort();
            }

            let source = establish(&self.shared).await?;
            let handle = tokio::spawn(read_loop(Arc::clone(&self.shared), source));
            *self.reader.lock().await = Some(handle);
            Ok(())
        })
    }

    fn disconnect(&self) -> ChannelFuture<'_, ()> {
        Box::pin(async move {
            if let Some(reader) = self.reader.lock().await.take() {
                reader.abort();
            }
            if let Some(mut sink) = self.shared.writer.lock().await.take() {
                let _ = sink.send(Message::Close(None)).await;
            }
            let _ = self.shared.health.send(ConnectionHealth::Idle);
            Ok(())
        })
    }

    fn join(&self, room: Room) -> ChannelFuture<'_, ()> {
        Box::pin(async move {
            self.shared
                .rooms
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(room.clone());

            let mut writer = self.shared.writer.lock().await;
            if let Some(sink) = writer.as_mut() {
                sink.send(Message::Text(control_frame("join", &room)))
                    .await
                    .map_err(|error| ChannelError::SubscriptionFailed {
                        room: room.to_string(),
                        reason: error.to_string(),
                    })?;
            }
            // Not connected: the room is remembered and joined on connect
            Ok(())
        })
    }

    fn leave(&self, room: Room) -> ChannelFuture<'_, ()> {
        Box::pin(async move {
            self.shared
                .rooms
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .remove(&room);

            let mut writer = self.shared.writer.lock().await;
            if let Some(sink) = writer.as_mut() {
                sink.send(Message::Text(control_frame("leave", &room)))
                    .await
                    .map_err(|error| ChannelError::SubscriptionFailed {
                        room: room.to_string(),
                        reason: error.to_string(),
                    })?;
            }
            Ok(())
        })
    }

    fn events(&self) -> EventStream {
        self.shared.router.subscribe()
    }

    fn health(&self) -> ConnectionHealth {
        *self.health_rx.borrow()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use tableflow_orders::TableNumber;

    #[test]
    fn control_frames_match_protocol() {
        let frame = control_frame("join", &Room::Table(TableNumber::new(7)));
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value["action"], "join");
        assert_eq!(value["room"], "table:7");
    }

    #[test]
    fn channel_starts_idle_with_rooms_remembered() {
        let channel = WsRealtimeChannel::new("ws://localhost:9000/ws");
        assert_eq!(channel.health(), ConnectionHealth::Idle);
    }

    #[tokio::test]
    async fn join_without_connection_is_remembered() {
        let channel = WsRealtimeChannel::new("ws://localhost:9000/ws");
        channel.join(Room::Kitchen).await.unwrap();
        assert!(rooms_snapshot(&channel.shared).contains(&Room::Kitchen));
    }

    #[test]
    fn malformed_frame_is_dropped_not_fatal() {
        let channel = WsRealtimeChannel::new("ws://localhost:9000/ws");
        // Must not panic or change health
        dispatch(&channel.shared, "{not json at all");
        assert_eq!(channel.health(), ConnectionHealth::Idle);
    }
}
