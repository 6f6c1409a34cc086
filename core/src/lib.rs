//! # Tableflow Core
//!
//! Core traits and types for the tableflow order-synchronization layer.
//!
//! Tableflow keeps a restaurant order's status consistent across three
//! independently-rendered surfaces (customer tracker, kitchen queue, admin
//! dashboard) that share nothing but best-effort push events. Every surface
//! is written as a reducer over an explicit action stream; all I/O is
//! described as effect values and executed by the store runtime.
//!
//! ## Core Concepts
//!
//! - **State**: owned, `Clone`-able domain state for a surface
//! - **Action**: every input a surface can receive — local user actions and
//!   normalized remote push events alike
//! - **Reducer**: pure function `(State, Action, Environment) → Effects`
//! - **Effect**: side-effect descriptions (not execution)
//! - **Environment**: injected dependencies behind traits
//!
//! ## Architecture Principles
//!
//! - Functional core, imperative shell
//! - Unidirectional data flow
//! - Explicit effects (no hidden I/O inside reducers)
//! - Dependency injection via Environment
//!
//! ## Example
//!
//! ```ignore
//! use tableflow_core::{effect::Effects, reducer::Reducer};
//!
//! impl Reducer for KitchenReducer {
//!     type State = KitchenState;
//!     type Action = KitchenAction;
//!     type Environment = KitchenEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut KitchenState,
//!         action: KitchenAction,
//!         env: &KitchenEnvironment,
//!     ) -> Effects<KitchenAction> {
//!         // business logic goes here
//!         Effects::new()
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Reducer module - the core trait for surface logic
///
/// Reducers are pure functions: `(State, Action, Environment) → Effects`.
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effects;

    /// The Reducer trait - core abstraction for surface logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: the domain state this reducer operates on
    /// - `Action`: the action type this reducer processes (local user actions
    ///   and normalized remote events)
    /// - `Environment`: the injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for CustomerReducer {
    ///     type State = CustomerState;
    ///     type Action = CustomerAction;
    ///     type Environment = CustomerEnvironment;
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut CustomerState,
    ///         action: CustomerAction,
    ///         env: &CustomerEnvironment,
    ///     ) -> Effects<CustomerAction> {
    ///         match action {
    ///             CustomerAction::AddToCart { item } => {
    ///                 // validate, mutate state, describe effects
    ///                 Effects::new()
    ///             }
    ///             _ => Effects::new(),
    ///         }
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Effects<Self::Action>;
    }
}

/// Effect module - side effect descriptions
///
/// Effects describe side effects to be performed by the runtime. They are
/// values (not execution) and are composable. Timers (completed-order display
/// delays, grace windows, cooldown sweeps) are `Delay` effects; backend calls
/// are `Future` effects that feed a result action back into the reducer.
pub mod effect {
    use smallvec::SmallVec;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// The effect vector returned by every reducer.
    ///
    /// Inline capacity of 4 covers the common case (zero to two effects per
    /// action) without allocation.
    pub type Effects<Action> = SmallVec<[Effect<Action>; 4]>;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what
    /// should happen, returned from reducers and executed by the store
    /// runtime.
    #[allow(missing_docs)]
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (timers: display delays, grace windows, sweeps)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after the delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if `Some`, the action is fed back into
        /// the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Wrap an async computation as a `Future` effect.
        ///
        /// Sugar for the `Effect::Future(Box::pin(async { .. }))` call-site
        /// pattern that every backend call in a reducer follows.
        pub fn future<F>(fut: F) -> Effect<Action>
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// Dispatch an action after a delay.
        #[must_use]
        pub fn delay(duration: Duration, action: Action) -> Effect<Action> {
            Effect::Delay {
                duration,
                action: Box::new(action),
            }
        }
    }
}

/// Environment module - dependency injection traits
///
/// All external dependencies of a reducer are abstracted behind traits and
/// injected via the Environment parameter: the clock, the backend API, the
/// session repository, the realtime channel, the notifier. Only the clock is
/// universal enough to live here; the rest are defined next to the subsystems
/// that own them.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// Staleness sweeps, newness thresholds, session-gap grouping and the
    /// stale-event guard all compare against `now()`; injecting the clock
    /// keeps every one of them deterministic under test.
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)] // Test code can panic
mod tests {
    use super::effect::{Effect, Effects};
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Ping,
    }

    #[test]
    fn effect_debug_formats_without_future_contents() {
        let fut: Effect<TestAction> = Effect::future(async { Some(TestAction::Ping) });
        assert_eq!(format!("{fut:?}"), "Effect::Future(<future>)");

        let delay = Effect::delay(Duration::from_secs(5), TestAction::Ping);
        let formatted = format!("{delay:?}");
        assert!(formatted.contains("Effect::Delay"));
    }

    #[test]
    fn effects_inline_capacity_holds_typical_load() {
        let effects: Effects<TestAction> = Effects::from_iter([
            Effect::None,
            Effect::delay(Duration::from_secs(1), TestAction::Ping),
        ]);
        assert!(!effects.spilled());
    }

    #[tokio::test]
    async fn future_effect_resolves_to_action() {
        let effect: Effect<TestAction> = Effect::future(async { Some(TestAction::Ping) });
        match effect {
            Effect::Future(fut) => assert_eq!(fut.await, Some(TestAction::Ping)),
            other => panic!("expected future effect, got {other:?}"),
        }
    }
}
