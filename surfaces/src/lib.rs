//! # Tableflow Surfaces
//!
//! The three surfaces that render one order's lifecycle — customer tracker,
//! kitchen queue, admin dashboard — each written as a reducer over an
//! explicit action stream. Local user actions and normalized push events
//! flow through the same `reduce` function, which removes the races between
//! manual navigation and event-driven view promotion that scattered event
//! callbacks invite.
//!
//! Hosts wire a surface up the same way every time:
//!
//! 1. build the environment (clock, [`tableflow_api::OrderApi`], session
//!    repository)
//! 2. run the reducer in a [`tableflow_runtime::Store`]
//! 3. connect a [`tableflow_channel::RealtimeChannel`], join the surface's
//!    rooms, and pump its events and health changes into the store with
//!    [`spawn_event_pump`] / [`spawn_health_pump`]

use futures::StreamExt;
use std::time::Duration;
use tableflow_channel::{ConnectionHealth, EventStream};
use tableflow_core::reducer::Reducer;
use tableflow_orders::events::RealtimeEvent;
use tableflow_runtime::Store;
use tokio::sync::watch;

/// Admin dashboard reducer
pub mod admin;

/// Host configuration
pub mod config;

/// Customer ordering reducer
pub mod customer;

/// Error taxonomy and notices
pub mod error;

/// Kitchen queue reducer
pub mod kitchen;

/// Shared order list reconciliation
pub mod order_book;

pub use error::{Notice, SyncError};

/// How long a completed order stays on the active list so staff see the
/// transition happen.
pub const COMPLETED_DISPLAY_DELAY: Duration = Duration::from_secs(5);

/// How long a manual "continue ordering" holds off automatic promotion to
/// the tracking view.
pub const CONTINUE_GRACE: Duration = Duration::from_secs(10);

/// Forwards every channel event into a store as an action.
///
/// The returned task ends when the stream ends or the store shuts down.
pub fn spawn_event_pump<S, A, E, R, W>(
    mut events: EventStream,
    store: Store<S, A, E, R>,
    wrap: W,
) -> tokio::task::JoinHandle<()>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    W: Fn(RealtimeEvent) -> A + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            if store.send(wrap(event)).await.is_err() {
                break;
            }
        }
    })
}

/// Forwards channel health changes into a store as actions (the degraded
/// banner follows these).
pub fn spawn_health_pump<S, A, E, R, W>(
    mut health: watch::Receiver<ConnectionHealth>,
    store: Store<S, A, E, R>,
    wrap: W,
) -> tokio::task::JoinHandle<()>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    W: Fn(ConnectionHealth) -> A + Send + 'static,
{
    tokio::spawn(async move {
        while health.changed().await.is_ok() {
            let current = *health.borrow_and_update();
            if store.send(wrap(current)).await.is_err() {
                break;
            }
        }
    })
}
