//! # Tableflow Runtime
//!
//! The Store runtime that drives every surface: it owns the state, runs the
//! reducer for each incoming action, and executes the effects the reducer
//! returns — backend calls, timers, and the feedback of their result actions.
//!
//! ## Core Components
//!
//! - **Store**: manages state and executes effects
//! - **Effect executor**: runs effect descriptions and feeds produced actions
//!   back into the reducer
//! - **Action broadcast**: lets observers (channel pumps, tests,
//!   request/response helpers) watch the actions effects produce
//!
//! ## Example
//!
//! ```ignore
//! use tableflow_runtime::Store;
//!
//! let store = Store::new(initial_state, reducer, environment);
//!
//! store.send(Action::Refresh).await?;
//! let orders = store.state(|s| s.active.clone()).await;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tableflow_core::effect::Effect;
use tableflow_core::reducer::Reducer;
use tokio::sync::{Notify, RwLock, broadcast};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        #[error("shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a matching action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before a
        /// matching action is received.
        #[error("timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Decrements the pending-effect counter even if the effect panics.
struct PendingGuard {
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// The Store - runtime coordinator for a reducer
///
/// The Store manages:
/// 1. State (behind `RwLock` for concurrent access)
/// 2. Reducer (surface logic)
/// 3. Environment (injected dependencies)
/// 4. Effect execution (with action feedback)
///
/// # Type Parameters
///
/// - `S`: State type
/// - `A`: Action type
/// - `E`: Environment type
/// - `R`: Reducer implementation
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: Arc<RwLock<S>>,
    reducer: R,
    environment: E,
    shutdown: Arc<AtomicBool>,
    pending_effects: Arc<AtomicUsize>,
    idle: Arc<Notify>,
    /// Actions produced by effects (delays, backend-call results) are
    /// broadcast to observers before being fed back into the reducer.
    action_broadcast: broadcast::Sender<A>,
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Creates a store with a default action broadcast capacity of 16.
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_broadcast_capacity(initial_state, reducer, environment, 16)
    }

    /// Creates a store with a custom action broadcast capacity.
    ///
    /// Increase the capacity when many slow observers subscribe (e.g. several
    /// surfaces mirroring one store in tests).
    #[must_use]
    pub fn with_broadcast_capacity(
        initial_state: S,
        reducer: R,
        environment: E,
        capacity: usize,
    ) -> Self {
        let (action_broadcast, _) = broadcast::channel(capacity);
        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer,
            environment,
            shutdown: Arc::new(AtomicBool::new(false)),
            pending_effects: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
            action_broadcast,
        }
    }

    /// Sends an action: runs the reducer and executes the returned effects.
    ///
    /// The reducer runs to completion before this returns; effects run on
    /// spawned tasks and feed their result actions back through `send`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after `shutdown` has been
    /// initiated.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: A) -> Result<(), StoreError> {
        if self.shutdown.load(Ordering::SeqCst) {
            return Err(StoreError::ShutdownInProgress);
        }

        metrics::counter!("store.actions.processed").increment(1);

        let effects = {
            let mut state = self.state.write().await;
            self.reducer.reduce(&mut state, action, &self.environment)
        };

        for effect in effects {
            self.execute_effect(effect);
        }
        Ok(())
    }

    /// Sends an action and waits for a matching result action.
    ///
    /// Designed for request/response flows: subscribe to the action
    /// broadcast first (avoiding the race with fast effects), send, then
    /// return the first effect-produced action the predicate accepts.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Timeout`] if no matching action arrives in time
    /// - [`StoreError::ChannelClosed`] if the broadcast closes
    /// - [`StoreError::ShutdownInProgress`] if the store is shutting down
    pub async fn send_and_wait_for<F>(
        &self,
        action: A,
        predicate: F,
        timeout: Duration,
    ) -> Result<A, StoreError>
    where
        F: Fn(&A) -> bool,
    {
        let mut receiver = self.action_broadcast.subscribe();
        self.send(action).await?;

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(StoreError::Timeout);
            }
            match tokio::time::timeout(remaining, receiver.recv()).await {
                Ok(Ok(candidate)) if predicate(&candidate) => return Ok(candidate),
                Ok(Ok(_)) => {},
                // Lagged observers keep waiting; the timeout bounds it
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => {},
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    return Err(StoreError::ChannelClosed);
                },
                Err(_) => return Err(StoreError::Timeout),
            }
        }
    }

    /// Subscribes to actions produced by effects.
    #[must_use]
    pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
        self.action_broadcast.subscribe()
    }

    /// Reads state through a closure.
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&S) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Stops accepting actions and waits for in-flight effects to drain.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] with the number of effects
    /// still running when the timeout elapses.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.shutdown.store(true, Ordering::SeqCst);

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            let notified = self.idle.notified();
            let pending = self.pending_effects.load(Ordering::SeqCst);
            if pending == 0 {
                return Ok(());
            }
            tokio::select! {
                () = notified => {},
                () = &mut deadline => {
                    return Err(StoreError::ShutdownTimeout(
                        self.pending_effects.load(Ordering::SeqCst),
                    ));
                },
            }
        }
    }

    /// Number of effects currently in flight.
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.pending_effects.load(Ordering::SeqCst)
    }

    /// Feeds an effect-produced action back to the reducer, then broadcasts
    /// it. Applying state first means observers that react to a broadcast
    /// action always read post-reduction state.
    async fn feedback(&self, action: A) {
        if let Err(error) = self.send(action.clone()).await {
            tracing::debug!(%error, "dropping effect feedback action");
        }
        let _ = self.action_broadcast.send(action);
    }

    fn track<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending_effects.fetch_add(1, Ordering::SeqCst);
        let guard = PendingGuard {
            pending: Arc::clone(&self.pending_effects),
            idle: Arc::clone(&self.idle),
        };
        tokio::spawn(async move {
            let _guard = guard;
            fut.await;
        });
    }

    /// Executes one effect description.
    ///
    /// `Future` and `Delay` run on spawned tasks and feed their actions back;
    /// `Parallel` fans out; `Sequential` runs its children in order on one
    /// task, waiting for each to finish before starting the next.
    fn execute_effect(&self, effect: Effect<A>) {
        match effect {
            Effect::None => {
                metrics::counter!("store.effects.executed", "type" => "none").increment(1);
            },
            Effect::Future(fut) => {
                metrics::counter!("store.effects.executed", "type" => "future").increment(1);
                let store = self.clone();
                self.track(async move {
                    if let Some(action) = fut.await {
                        store.feedback(action).await;
                    }
                });
            },
            Effect::Delay { duration, action } => {
                metrics::counter!("store.effects.executed", "type" => "delay").increment(1);
                let store = self.clone();
                self.track(async move {
                    tokio::time::sleep(duration).await;
                    store.feedback(*action).await;
                });
            },
            Effect::Parallel(effects) => {
                metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);
                for child in effects {
                    self.execute_effect(child);
                }
            },
            Effect::Sequential(effects) => {
                metrics::counter!("store.effects.executed", "type" => "sequential").increment(1);
                let store = self.clone();
                self.track(async move {
                    for child in effects {
                        store.run_effect_inline(child).await;
                    }
                });
            },
        }
    }

    /// Awaits one effect to completion, for sequential execution.
    fn run_effect_inline(&self, effect: Effect<A>) -> Pin<Box<dyn Future<Output = ()> + Send>>
    where
        Self: Clone,
    {
        let store = self.clone();
        Box::pin(async move {
            match effect {
                Effect::None => {},
                Effect::Future(fut) => {
                    if let Some(action) = fut.await {
                        store.feedback(action).await;
                    }
                },
                Effect::Delay { duration, action } => {
                    tokio::time::sleep(duration).await;
                    store.feedback(*action).await;
                },
                // Parallel children inside a sequence fan out without
                // blocking the sequence
                Effect::Parallel(effects) => {
                    for child in effects {
                        store.execute_effect(child);
                    }
                },
                Effect::Sequential(effects) => {
                    for child in effects {
                        store.run_effect_inline(child).await;
                    }
                },
            }
        })
    }
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Clone,
    E: Clone,
{
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            reducer: self.reducer.clone(),
            environment: self.environment.clone(),
            shutdown: Arc::clone(&self.shutdown),
            pending_effects: Arc::clone(&self.pending_effects),
            idle: Arc::clone(&self.idle),
            action_broadcast: self.action_broadcast.clone(),
        }
    }
}
