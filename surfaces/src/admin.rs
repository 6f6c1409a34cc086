//! Admin dashboard surface.
//!
//! A filterable order table with bulk status updates and deletion. Every
//! mutating action runs the transition policy locally first — a bulk update
//! goes out only when every selected order accepts the transition — and
//! completion conflicts come back with the structured blocker list instead
//! of a generic failure.

use crate::error::{Notice, SyncError};
use crate::order_book::{Applied, OrderBook};
use crate::COMPLETED_DISPLAY_DELAY;
use std::collections::BTreeSet;
use std::sync::Arc;
use tableflow_api::{OrderApi, OrderFilters, TableInfo};
use tableflow_channel::ConnectionHealth;
use tableflow_core::effect::{Effect, Effects};
use tableflow_core::environment::Clock;
use tableflow_core::reducer::Reducer;
use tableflow_core::smallvec;
use tableflow_orders::events::RealtimeEvent;
use tableflow_orders::{Order, OrderId, OrderStatus, policy};

/// Admin surface state.
#[derive(Clone, Debug, Default)]
pub struct AdminState {
    /// Active/completed partition with the stale-event guard
    pub book: OrderBook,
    /// Filters applied to the order table
    pub filters: OrderFilters,
    /// Orders selected for bulk actions
    pub selected: BTreeSet<OrderId>,
    /// Restaurant tables, for the filter dropdown
    pub tables: Vec<TableInfo>,
    /// A reload is in flight
    pub loading: bool,
    /// Current dismissible notice
    pub notice: Option<Notice>,
    /// Channel health, for the degraded banner
    pub channel_health: ConnectionHealth,
}

/// Everything that can happen on the admin surface.
#[derive(Clone, Debug)]
pub enum AdminAction {
    /// Reload orders with the current filters
    Refresh,
    /// Reload finished
    Loaded(Vec<Order>),
    /// Reload failed
    LoadFailed(Notice),
    /// Change the table filters and reload
    SetFilters(OrderFilters),
    /// Load the table list
    LoadTables,
    /// Table list arrived
    TablesLoaded(Vec<TableInfo>),
    /// Table list failed
    TablesFailed(Notice),
    /// Toggle an order's selection
    ToggleSelect(OrderId),
    /// Clear the selection
    ClearSelection,
    /// Move every selected order to `next`
    BulkTransition {
        /// Target status
        next: OrderStatus,
    },
    /// Backend applied a bulk update
    BulkApplied(Vec<Order>),
    /// Move one order to an explicit status
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
    /// Delete an order
    DeleteOrder(OrderId),
    /// Backend confirmed a deletion
    DeleteConfirmed(OrderId),
    /// Deletion failed
    DeleteFailed(Notice),
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

/// Environment dependencies for the admin reducer.
#[derive(Clone)]
pub struct AdminEnvironment {
    /// Clock for event timestamps
    pub clock: Arc<dyn Clock>,
    /// Backend order service
    pub api: Arc<dyn OrderApi>,
}

impl AdminEnvironment {
    /// Creates a new `AdminEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, api: Arc<dyn OrderApi>) -> Self {
        Self { clock, api }
    }
}

/// Reducer for the admin surface.
#[derive(Clone, Debug, Default)]
pub struct AdminReducer;

impl AdminReducer {
    /// Creates a new `AdminReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn search_effect(env: &AdminEnvironment, filters: OrderFilters) -> Effect<AdminAction> {
        let api = Arc::clone(&env.api);
        Effect::future(async move {
            Some(match api.search_orders(filters).await {
                Ok(orders) => AdminAction::Loaded(orders),
                Err(error) => AdminAction::LoadFailed(Notice::from_error(&SyncError::from(error))),
            })
        })
    }

    fn fetch_order(env: &AdminEnvironment, order_id: OrderId) -> Effect<AdminAction> {
        let api = Arc::clone(&env.api);
        Effect::future(async move {
            match api.get_order(order_id).await {
                Ok(order) => Some(AdminAction::OrderFetched(order)),
                Err(error) => {
                    tracing::warn!(%error, "failed to fetch order referenced by push event");
                    None
                },
            }
        })
    }

    /// Validates every selected order against the policy before any call; a
    /// single rejection stops the whole batch locally.
    fn bulk_transition(
        state: &mut AdminState,
        env: &AdminEnvironment,
        next: OrderStatus,
    ) -> Effects<AdminAction> {
        if state.selected.is_empty() {
            state.notice = Some(Notice::Rejected {
                message: "No orders selected".to_string(),
            });
            return Effects::new();
        }

        for order_id in &state.selected {
            let Some(order) = state.book.get(order_id) else {
                state.notice = Some(Notice::Transient {
                    message: format!("order {order_id} is no longer listed; refresh and retry"),
                });
                return Effects::new();
            };
            if let Err(rejected) = policy::check_transition(order.status, next) {
                state.notice = Some(Notice::Rejected {
                    message: format!("order {}: {rejected}", order.order_number),
                });
                return Effects::new();
            }
            if next == OrderStatus::Completed {
                if let Err(blocked) = policy::can_complete(order, &state.book.all()) {
                    state.notice = Some(Notice::from_error(&SyncError::from(blocked)));
                    return Effects::new();
                }
            }
        }

        let ids: Vec<OrderId> = state.selected.iter().cloned().collect();
        let api = Arc::clone(&env.api);
        smallvec![Effect::future(async move {
            Some(match api.bulk_update_order_status(ids, next).await {
                Ok(orders) => AdminAction::BulkApplied(orders),
                Err(error) => {
                    AdminAction::TransitionFailed(Notice::from_error(&SyncError::from(error)))
                },
            })
        })]
    }

    /// Applies an observed status with the same grace-delay policy as the
    /// kitchen: completed orders linger, cancellations finalize immediately.
    fn apply_observed_status(
        state: &mut AdminState,
        order_id: &OrderId,
        status: OrderStatus,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> Effects<AdminAction> {
        match state.book.apply_status(order_id, status, timestamp) {
            Applied::Changed => match status {
                OrderStatus::Completed => smallvec![Effect::delay(
                    COMPLETED_DISPLAY_DELAY,
                    AdminAction::FinalizeCompleted {
                        order_id: order_id.clone(),
                    },
                )],
                OrderStatus::Cancelled => {
                    state.book.finalize(order_id);
                    Effects::new()
                },
                _ => Effects::new(),
            },
            Applied::NoOp | Applied::Stale | Applied::Unknown => Effects::new(),
        }
    }

    fn on_remote(
        state: &mut AdminState,
        env: &AdminEnvironment,
        event: RealtimeEvent,
    ) -> Effects<AdminAction> {
        match event {
            RealtimeEvent::NewOrder(announced) => {
                smallvec![Self::fetch_order(env, announced.id)]
            },
            RealtimeEvent::NewItemsAdded { order_id } => {
                smallvec![Self::fetch_order(env, order_id)]
            },
            RealtimeEvent::OrderStatusUpdate(update) => {
                if state.book.get(&update.order_id).is_none() {
                    return smallvec![Self::fetch_order(env, update.order_id)];
                }
                Self::apply_observed_status(state, &update.order_id, update.status, update.timestamp)
            },
            RealtimeEvent::OrderCompleted { order_id } => {
                let now = env.clock.now();
                Self::apply_observed_status(state, &order_id, OrderStatus::Completed, now)
            },
            RealtimeEvent::OrderDeleted { order_id, .. } => {
                state.book.remove(&order_id);
                state.selected.remove(&order_id);
                Effects::new()
            },
        }
    }
}

impl Reducer for AdminReducer {
    type State = AdminState;
    type Action = AdminAction;
    type Environment = AdminEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects<Self::Action> {
        match action {
            AdminAction::Refresh => {
                state.loading = true;
                smallvec![Self::search_effect(env, state.filters.clone())]
            },

            AdminAction::Loaded(orders) => {
                state.loading = false;
                state.book.load(orders);
                let book = &state.book;
                state.selected.retain(|order_id| book.get(order_id).is_some());
                Effects::new()
            },

            AdminAction::LoadFailed(notice) => {
                state.loading = false;
                state.notice = Some(notice);
                Effects::new()
            },

            AdminAction::SetFilters(filters) => {
                state.filters = filters;
                state.loading = true;
                smallvec![Self::search_effect(env, state.filters.clone())]
            },

            AdminAction::LoadTables => {
                let api = Arc::clone(&env.api);
                smallvec![Effect::future(async move {
                    Some(match api.fetch_tables().await {
                        Ok(tables) => AdminAction::TablesLoaded(tables),
                        Err(error) => {
                            AdminAction::TablesFailed(Notice::from_error(&SyncError::from(error)))
                        },
                    })
                })]
            },

            AdminAction::TablesLoaded(tables) => {
                state.tables = tables;
                Effects::new()
            },

            AdminAction::TablesFailed(notice) => {
                state.notice = Some(notice);
                Effects::new()
            },

            AdminAction::ToggleSelect(order_id) => {
                if !state.selected.remove(&order_id) {
                    state.selected.insert(order_id);
                }
                Effects::new()
            },

            AdminAction::ClearSelection => {
                state.selected.clear();
                Effects::new()
            },

            AdminAction::BulkTransition { next } => Self::bulk_transition(state, env, next),

            AdminAction::BulkApplied(orders) => {
                state.selected.clear();
                let mut effects = Effects::new();
                for order in orders {
                    let (id, status, updated_at) =
                        (order.id.clone(), order.status, order.updated_at);
                    if state.book.get(&id).is_none() {
                        state.book.upsert(order);
                        continue;
                    }
                    effects.extend(Self::apply_observed_status(state, &id, status, updated_at));
                }
                effects
            },

            AdminAction::RequestTransition { order_id, next } => {
                let Some(order) = state.book.get(&order_id) else {
                    state.notice = Some(Notice::Transient {
                        message: format!("order {order_id} is no longer listed; refresh and retry"),
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
                smallvec![Effect::future(async move {
                    Some(match api.update_order_status(order_id, next).await {
                        Ok(order) => AdminAction::TransitionAccepted(order),
                        Err(error) => {
                            AdminAction::TransitionFailed(Notice::from_error(&SyncError::from(
                                error,
                            )))
                        },
                    })
                })]
            },

            AdminAction::TransitionAccepted(order) => {
                let (id, status, updated_at) = (order.id.clone(), order.status, order.updated_at);
                if state.book.get(&id).is_none() {
                    state.book.upsert(order);
                    return Effects::new();
                }
                Self::apply_observed_status(state, &id, status, updated_at)
            },

            AdminAction::TransitionFailed(notice) => {
                state.notice = Some(notice);
                Effects::new()
            },

            AdminAction::DeleteOrder(order_id) => {
                let api = Arc::clone(&env.api);
                let id = order_id.clone();
                smallvec![Effect::future(async move {
                    Some(match api.delete_order(id.clone()).await {
                        Ok(()) => AdminAction::DeleteConfirmed(id),
                        Err(error) => {
                            AdminAction::DeleteFailed(Notice::from_error(&SyncError::from(error)))
                        },
                    })
                })]
            },

            AdminAction::DeleteConfirmed(order_id) => {
                state.book.remove(&order_id);
                state.selected.remove(&order_id);
                Effects::new()
            },

            AdminAction::DeleteFailed(notice) => {
                state.notice = Some(notice);
                Effects::new()
            },

            AdminAction::OrderFetched(order) => {
                state.book.upsert(order);
                Effects::new()
            },

            AdminAction::FinalizeCompleted { order_id } => {
                state.book.finalize(&order_id);
                Effects::new()
            },

            AdminAction::DismissNotice => {
                state.notice = None;
                Effects::new()
            },

            AdminAction::ChannelHealth(health) => {
                state.channel_health = health;
                Effects::new()
            },

            AdminAction::Remote(event) => Self::on_remote(state, env, event),
        }
    }
}
