//! Kitchen queue surface.
//!
//! The kitchen watches every active order, advances them with quick actions,
//! and keeps completed tickets on screen for a short grace delay so staff see
//! the transition happen. The queue view itself is a pure function of
//! `(orders, filter, sort)`.

use crate::error::{Notice, SyncError};
use crate::order_book::{Applied, OrderBook};
use crate::COMPLETED_DISPLAY_DELAY;
use std::sync::Arc;
use tableflow_api::{OrderApi, OrderFilters};
use tableflow_channel::ConnectionHealth;
use tableflow_core::effect::{Effect, Effects};
use tableflow_core::environment::Clock;
use tableflow_core::reducer::Reducer;
use tableflow_core::smallvec;
use tableflow_orders::events::RealtimeEvent;
use tableflow_orders::{Order, OrderId, OrderStatus, policy};

/// Which orders the queue shows.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum QueueFilter {
    /// Every order in the queue
    #[default]
    All,
    /// Only orders in one status
    Status(OrderStatus),
}

/// Queue sort keys. Every key breaks ties by newest `created_at` first.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum QueueSort {
    /// Status rank (earliest lifecycle first), then newest
    #[default]
    Priority,
    /// Newest creation time first
    Newest,
    /// Oldest creation time first
    Oldest,
    /// Table number ascending
    Table,
    /// Customer name ascending
    Customer,
    /// Order total ascending
    AmountAsc,
    /// Order total descending
    AmountDesc,
}

/// The queue view: a pure function of `(orders, filter, sort)`.
#[must_use]
pub fn filter_and_sort(orders: &[Order], filter: QueueFilter, sort: QueueSort) -> Vec<Order> {
    let mut queue: Vec<Order> = orders
        .iter()
        .filter(|order| match filter {
            QueueFilter::All => true,
            QueueFilter::Status(status) => order.status == status,
        })
        .cloned()
        .collect();

    queue.sort_by(|a, b| {
        let newest_first = b.created_at.cmp(&a.created_at);
        match sort {
            QueueSort::Priority => a
                .status
                .priority_rank()
                .cmp(&b.status.priority_rank())
                .then(newest_first),
            QueueSort::Newest => newest_first,
            QueueSort::Oldest => a.created_at.cmp(&b.created_at),
            QueueSort::Table => a.table_number.cmp(&b.table_number).then(newest_first),
            QueueSort::Customer => a.customer_name.cmp(&b.customer_name).then(newest_first),
            QueueSort::AmountAsc => a.total_amount.cmp(&b.total_amount).then(newest_first),
            QueueSort::AmountDesc => b.total_amount.cmp(&a.total_amount).then(newest_first),
        }
    });
    queue
}

/// Kitchen surface state.
#[derive(Clone, Debug, Default)]
pub struct KitchenState {
    /// Active/completed partition with the stale-event guard
    pub book: OrderBook,
    /// Current queue filter
    pub filter: QueueFilter,
    /// Current queue sort
    pub sort: QueueSort,
    /// A reload is in flight
    pub loading: bool,
    /// Current dismissible notice
    pub notice: Option<Notice>,
    /// Channel health, for the degraded banner
    pub channel_health: ConnectionHealth,
}

impl KitchenState {
    /// The queue as currently filtered and sorted.
    #[must_use]
    pub fn queue(&self) -> Vec<Order> {
        filter_and_sort(self.book.active(), self.filter, self.sort)
    }
}

/// Everything that can happen on the kitchen surface.
#[derive(Clone, Debug)]
pub enum KitchenAction {
    /// Manual full reload (push is only a freshness hint)
    Refresh,
    /// Reload finished
    Loaded(Vec<Order>),
    /// Reload failed
    LoadFailed(Notice),
    /// Change the queue filter
    SetFilter(QueueFilter),
    /// Change the queue sort
    SetSort(QueueSort),
    /// Advance an order along its forward edge (quick action)
    QuickAdvance {
        /// Order to advance
        order_id: OrderId,
    },
    /// Move an order to an explicit status
    RequestTransition {
        /// Order to move
        order_id: OrderId,
        /// Target status
        next: OrderStatus,
    },
    /// Backend accepted a status change
    TransitionAccepted(Order),
    /// Backend (or the local guard) refused a status change
    TransitionFailed(Notice),
    /// One order was fetched after a push referenced it
    OrderFetched(Order),
    /// Grace delay elapsed; move the order off the active list
    FinalizeCompleted {
        /// The completed order
        order_id: OrderId,
    },
    /// Dismiss the current notice
    DismissNotice,
    /// Channel health changed
    ChannelHealth(ConnectionHealth),
    /// A push event arrived
    Remote(RealtimeEvent),
}

/// Environment dependencies for the kitchen reducer.
#[derive(Clone)]
pub struct KitchenEnvironment {
    /// Clock for event timestamps
    pub clock: Arc<dyn Clock>,
    /// Backend order service
    pub api: Arc<dyn OrderApi>,
}

impl KitchenEnvironment {
    /// Creates a new `KitchenEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, api: Arc<dyn OrderApi>) -> Self {
        Self { clock, api }
    }
}

/// Reducer for the kitchen surface.
#[derive(Clone, Debug, Default)]
pub struct KitchenReducer;

impl KitchenReducer {
    /// Creates a new `KitchenReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Guards a transition locally, then describes the backend call.
    ///
    /// A rejected transition produces a notice and no effect; no network
    /// call is made.
    fn request_transition(
        state: &mut KitchenState,
        env: &KitchenEnvironment,
        order_id: &OrderId,
        next: OrderStatus,
    ) -> Effects<KitchenAction> {
        let Some(order) = state.book.get(order_id) else {
            state.notice = Some(Notice::Transient {
                message: format!("order {order_id} is not in the queue; refresh and retry"),
            });
            return Effects::new();
        };

        if let Err(rejected) = policy::check_transition(order.status, next) {
            state.notice = Some(Notice::from_error(&SyncError::from(rejected)));
            return Effects::new();
        }

        if next == OrderStatus::Completed {
            if let Err(blocked) = policy::can_complete(order, &state.book.all()) {
                state.notice = Some(Notice::from_error(&SyncError::from(blocked)));
                return Effects::new();
            }
        }

        let api = Arc::clone(&env.api);
        let id = order_id.clone();
        smallvec![Effect::future(async move {
            Some(match api.update_order_status(id, next).await {
                Ok(order) => KitchenAction::TransitionAccepted(order),
                Err(error) => {
                    KitchenAction::TransitionFailed(Notice::from_error(&SyncError::from(error)))
                },
            })
        })]
    }

    /// Fetches one order after a push referenced it.
    fn fetch_order(env: &KitchenEnvironment, order_id: OrderId) -> Effect<KitchenAction> {
        let api = Arc::clone(&env.api);
        Effect::future(async move {
            match api.get_order(order_id).await {
                Ok(order) => Some(KitchenAction::OrderFetched(order)),
                Err(error) => {
                    tracing::warn!(%error, "failed to fetch order referenced by push event");
                    None
                },
            }
        })
    }

    /// Applies an observed status, scheduling the grace-delay finalize for
    /// completions and finalizing cancellations immediately.
    fn apply_observed_status(
        state: &mut KitchenState,
        order_id: &OrderId,
        status: OrderStatus,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> Effects<KitchenAction> {
        match state.book.apply_status(order_id, status, timestamp) {
            Applied::Changed => match status {
                OrderStatus::Completed => smallvec![Effect::delay(
                    COMPLETED_DISPLAY_DELAY,
                    KitchenAction::FinalizeCompleted {
                        order_id: order_id.clone(),
                    },
                )],
                OrderStatus::Cancelled => {
                    state.book.finalize(order_id);
                    Effects::new()
                },
                _ => Effects::new(),
            },
            // Duplicate or out-of-order delivery: nothing to do
            Applied::NoOp | Applied::Stale | Applied::Unknown => Effects::new(),
        }
    }

    fn on_remote(
        state: &mut KitchenState,
        env: &KitchenEnvironment,
        event: RealtimeEvent,
    ) -> Effects<KitchenAction> {
        match event {
            RealtimeEvent::NewOrder(announced) => {
                smallvec![Self::fetch_order(env, announced.id)]
            },
            RealtimeEvent::NewItemsAdded { order_id } => {
                smallvec![Self::fetch_order(env, order_id)]
            },
            RealtimeEvent::OrderStatusUpdate(update) => {
                if state.book.get(&update.order_id).is_none() {
                    // An order we never saw (joined late, missed the
                    // announcement): fetch it instead of guessing
                    return smallvec![Self::fetch_order(env, update.order_id)];
                }
                Self::apply_observed_status(
                    state,
                    &update.order_id,
                    update.status,
                    update.timestamp,
                )
            },
            RealtimeEvent::OrderCompleted { order_id } => {
                let now = env.clock.now();
                Self::apply_observed_status(state, &order_id, OrderStatus::Completed, now)
            },
            RealtimeEvent::OrderDeleted { order_id, .. } => {
                state.book.remove(&order_id);
                Effects::new()
            },
        }
    }
}

impl Reducer for KitchenReducer {
    type State = KitchenState;
    type Action = KitchenAction;
    type Environment = KitchenEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects<Self::Action> {
        match action {
            KitchenAction::Refresh => {
                state.loading = true;
                let api = Arc::clone(&env.api);
                smallvec![Effect::future(async move {
                    Some(match api.search_orders(OrderFilters::default()).await {
                        Ok(orders) => KitchenAction::Loaded(orders),
                        Err(error) => {
                            KitchenAction::LoadFailed(Notice::from_error(&SyncError::from(error)))
                        },
                    })
                })]
            },

            KitchenAction::Loaded(orders) => {
                state.loading = false;
                state.book.load(orders);
                Effects::new()
            },

            KitchenAction::LoadFailed(notice) => {
                state.loading = false;
                state.notice = Some(notice);
                Effects::new()
            },

            KitchenAction::SetFilter(filter) => {
                state.filter = filter;
                Effects::new()
            },

            KitchenAction::SetSort(sort) => {
                state.sort = sort;
                Effects::new()
            },

            KitchenAction::QuickAdvance { order_id } => {
                let Some(order) = state.book.get(&order_id) else {
                    state.notice = Some(Notice::Transient {
                        message: format!("order {order_id} is not in the queue; refresh and retry"),
                    });
                    return Effects::new();
                };
                let Some(next) = policy::forward(order.status) else {
                    state.notice = Some(Notice::Rejected {
                        message: format!(
                            "order {} is already '{}'",
                            order.order_number, order.status
                        ),
                    });
                    return Effects::new();
                };
                Self::request_transition(state, env, &order_id, next)
            },

            KitchenAction::RequestTransition { order_id, next } => {
                Self::request_transition(state, env, &order_id, next)
            },

            KitchenAction::TransitionAccepted(order) => {
                let (id, status, updated_at) = (order.id.clone(), order.status, order.updated_at);
                if state.book.get(&id).is_none() {
                    state.book.upsert(order);
                    return Effects::new();
                }
                Self::apply_observed_status(state, &id, status, updated_at)
            },

            KitchenAction::TransitionFailed(notice) => {
                state.notice = Some(notice);
                Effects::new()
            },

            KitchenAction::OrderFetched(order) => {
                state.book.upsert(order);
                Effects::new()
            },

            KitchenAction::FinalizeCompleted { order_id } => {
                state.book.finalize(&order_id);
                Effects::new()
            },

            KitchenAction::DismissNotice => {
                state.notice = None;
                Effects::new()
            },

            KitchenAction::ChannelHealth(health) => {
                state.channel_health = health;
                Effects::new()
            },

            KitchenAction::Remote(event) => Self::on_remote(state, env, event),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)] // Test code can use unwrap/panic
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tableflow_orders::events::StatusUpdate;
    use tableflow_orders::{Money, OrderNumber, TableNumber};

    fn base_time() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn order(id: &str, status: OrderStatus, minutes_ago: i64) -> Order {
        let created = base_time() - Duration::minutes(minutes_ago);
        Order {
            id: OrderId::from(id),
            order_number: OrderNumber::new(format!("#{id}")),
            table_number: TableNumber::new(1),
            customer_name: "Ana".to_string(),
            status,
            items: vec![],
            total_amount: Money::from_cents(1000),
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn priority_sort_ranks_status_then_newest() {
        let orders = vec![
            order("ready-old", OrderStatus::Ready, 30),
            order("pending-old", OrderStatus::Pending, 20),
            order("pending-new", OrderStatus::Pending, 5),
            order("preparing", OrderStatus::Preparing, 10),
        ];
        let queue = filter_and_sort(&orders, QueueFilter::All, QueueSort::Priority);
        let ids: Vec<&str> = queue.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["pending-new", "pending-old", "preparing", "ready-old"]);
    }

    #[test]
    fn status_filter_narrows_queue() {
        let orders = vec![
            order("1", OrderStatus::Pending, 1),
            order("2", OrderStatus::Ready, 2),
        ];
        let queue = filter_and_sort(
            &orders,
            QueueFilter::Status(OrderStatus::Ready),
            QueueSort::Newest,
        );
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id.as_str(), "2");
    }

    mod reducer {
        use super::*;
        use tableflow_testing::fakes::ScriptedOrderApi;
        use tableflow_testing::{ReducerTest, assertions, test_clock};

        fn env() -> KitchenEnvironment {
            KitchenEnvironment::new(Arc::new(test_clock()), Arc::new(ScriptedOrderApi::new()))
        }

        fn state_with(orders: Vec<Order>) -> KitchenState {
            let mut state = KitchenState::default();
            state.book.load(orders);
            state
        }

        #[test]
        fn illegal_transition_is_rejected_locally_with_no_call() {
            ReducerTest::new(KitchenReducer::new())
                .with_env(env())
                .given_state(state_with(vec![order("1", OrderStatus::Completed, 5)]))
                .when_action(KitchenAction::RequestTransition {
                    order_id: OrderId::from("1"),
                    next: OrderStatus::Preparing,
                })
                .then_state(|state| match &state.notice {
                    Some(Notice::Rejected { message }) => {
                        assert!(message.contains("completed"));
                        assert!(message.contains("preparing"));
                    },
                    other => panic!("expected rejection notice, got {other:?}"),
                })
                .then_effects(assertions::assert_no_effects)
                .run();
        }

        #[test]
        fn legal_transition_describes_backend_call() {
            ReducerTest::new(KitchenReducer::new())
                .with_env(env())
                .given_state(state_with(vec![order("1", OrderStatus::Pending, 5)]))
                .when_action(KitchenAction::QuickAdvance {
                    order_id: OrderId::from("1"),
                })
                .then_state(|state| assert!(state.notice.is_none()))
                .then_effects(assertions::assert_has_future_effect)
                .run();
        }

        #[test]
        fn completion_blocked_by_sibling_order_makes_no_call() {
            ReducerTest::new(KitchenReducer::new())
                .with_env(env())
                .given_state(state_with(vec![
                    order("1", OrderStatus::Ready, 10),
                    order("2", OrderStatus::Preparing, 5),
                ]))
                .when_action(KitchenAction::RequestTransition {
                    order_id: OrderId::from("1"),
                    next: OrderStatus::Completed,
                })
                .then_state(|state| match &state.notice {
                    Some(Notice::Blocked { blocking, .. }) => {
                        assert_eq!(blocking.len(), 1);
                        assert_eq!(blocking[0].order_number, OrderNumber::new("#2".to_string()));
                    },
                    other => panic!("expected blocked notice, got {other:?}"),
                })
                .then_effects(assertions::assert_no_effects)
                .run();
        }

        #[test]
        fn completed_push_schedules_display_grace_delay() {
            let update = StatusUpdate {
                order_id: OrderId::from("1"),
                status: OrderStatus::Completed,
                timestamp: base_time() + Duration::seconds(30),
                table_number: TableNumber::new(1),
            };
            ReducerTest::new(KitchenReducer::new())
                .with_env(env())
                .given_state(state_with(vec![order("1", OrderStatus::Ready, 5)]))
                .when_action(KitchenAction::Remote(RealtimeEvent::OrderStatusUpdate(
                    update,
                )))
                .then_state(|state| {
                    // Still on the active list until the grace delay elapses
                    assert_eq!(state.book.active().len(), 1);
                    assert_eq!(
                        state.book.get(&OrderId::from("1")).unwrap().status,
                        OrderStatus::Completed
                    );
                })
                .then_effects(assertions::assert_has_delay_effect)
                .run();
        }

        #[test]
        fn stale_push_does_not_regress_status() {
            let stale = StatusUpdate {
                order_id: OrderId::from("1"),
                status: OrderStatus::Preparing,
                timestamp: base_time() - Duration::minutes(30),
                table_number: TableNumber::new(1),
            };
            ReducerTest::new(KitchenReducer::new())
                .with_env(env())
                .given_state(state_with(vec![order("1", OrderStatus::Ready, 5)]))
                .when_action(KitchenAction::Remote(RealtimeEvent::OrderStatusUpdate(stale)))
                .then_state(|state| {
                    assert_eq!(
                        state.book.get(&OrderId::from("1")).unwrap().status,
                        OrderStatus::Ready
                    );
                })
                .then_effects(assertions::assert_no_effects)
                .run();
        }

        #[test]
        fn deletion_push_removes_order() {
            ReducerTest::new(KitchenReducer::new())
                .with_env(env())
                .given_state(state_with(vec![order("1", OrderStatus::Pending, 5)]))
                .when_action(KitchenAction::Remote(RealtimeEvent::OrderDeleted {
                    order_id: OrderId::from("1"),
                    table_number: TableNumber::new(1),
                }))
                .then_state(|state| assert!(state.book.active().is_empty()))
                .run();
        }

        #[test]
        fn finalize_moves_completed_order_off_queue() {
            let mut state = state_with(vec![order("1", OrderStatus::Ready, 5)]);
            state.book.apply_status(
                &OrderId::from("1"),
                OrderStatus::Completed,
                base_time() + Duration::seconds(30),
            );

            ReducerTest::new(KitchenReducer::new())
                .with_env(env())
                .given_state(state)
                .when_action(KitchenAction::FinalizeCompleted {
                    order_id: OrderId::from("1"),
                })
                .then_state(|state| {
                    assert!(state.book.active().is_empty());
                    assert_eq!(state.book.completed().len(), 1);
                })
                .run();
        }
    }
}
