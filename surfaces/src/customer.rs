//! Customer ordering surface.
//!
//! One state machine per table session: `Menu` (browsing), `Cart` (reviewing)
//! and `Tracking` (watching a placed order). The cart and the customer's
//! identity persist through the session repository, so a re-scan of the same
//! table resumes where the customer left off; when the placement response
//! reports a merge, the surface still moves to `Tracking` but announces
//! "items added" instead of a new order.
//!
//! "Continue ordering" drops back to the menu and holds a short grace window
//! during which push events do not yank the customer straight back to the
//! tracker; once it lapses, automatic promotion resumes while active orders
//! exist.

use crate::error::{Notice, SyncError};
use crate::order_book::{Applied, OrderBook};
use crate::{COMPLETED_DISPLAY_DELAY, CONTINUE_GRACE};
use std::sync::Arc;
use std::time::Duration;
use tableflow_api::{NewOrder, NewOrderItem, OrderApi, PlacedOrder};
use tableflow_channel::ConnectionHealth;
use tableflow_core::effect::{Effect, Effects};
use tableflow_core::environment::Clock;
use tableflow_core::reducer::Reducer;
use tableflow_core::smallvec;
use tableflow_orders::events::RealtimeEvent;
use tableflow_orders::{Order, OrderId, OrderStatus, TableNumber};
use tableflow_session::{
    CANCELLED_COOLDOWN_MINUTES, CancelledOrderMarker, Cart, CartEntry, Session,
    SessionRepository, TableKey, WriteOutcome,
};

/// Which screen the customer sees.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CustomerView {
    /// Browsing the menu
    Menu,
    /// Reviewing the cart
    Cart,
    /// Watching a placed order
    Tracking,
}

/// Customer surface state.
#[derive(Clone, Debug)]
pub struct CustomerState {
    /// Table this session belongs to
    pub table: TableNumber,
    /// Canonical session key
    pub key: TableKey,
    /// Current screen
    pub view: CustomerView,
    /// In-progress cart (mirrored to the session repository)
    pub cart: Cart,
    /// Version of the last session write we based our state on
    pub session_version: u64,
    /// Customer name, once entered
    pub customer_name: Option<String>,
    /// Order-level special instructions
    pub special_instructions: Option<String>,
    /// This customer's orders on this table
    pub book: OrderBook,
    /// The order the tracker follows
    pub tracked_order: Option<OrderId>,
    /// Manual "continue ordering" grace window is active
    pub in_grace: bool,
    /// Current dismissible notice
    pub notice: Option<Notice>,
    /// Channel health, for the degraded banner
    pub channel_health: ConnectionHealth,
}

impl CustomerState {
    /// Builds the initial state from what is present on load.
    ///
    /// The initial view is `Tracking` when an order identifier is present,
    /// else `Cart` when the persisted cart is non-empty, else `Menu`.
    #[must_use]
    pub fn on_load(
        table: TableNumber,
        session: Option<&Session>,
        tracked_order: Option<OrderId>,
    ) -> Self {
        let view = if tracked_order.is_some() {
            CustomerView::Tracking
        } else if session.is_some_and(|held| !held.cart.is_empty()) {
            CustomerView::Cart
        } else {
            CustomerView::Menu
        };

        Self {
            table,
            key: TableKey::for_table(table),
            view,
            cart: session.map(|held| held.cart.clone()).unwrap_or_default(),
            session_version: session.map_or(0, |held| held.version),
            customer_name: session.and_then(|held| held.customer_name.clone()),
            special_instructions: session.and_then(|held| held.special_instructions.clone()),
            book: OrderBook::new(),
            tracked_order,
            in_grace: false,
            notice: None,
            channel_health: ConnectionHealth::Idle,
        }
    }

    /// Sum of the cart's line totals.
    #[must_use]
    pub fn cart_total(&self) -> tableflow_orders::Money {
        self.cart.total()
    }
}

/// Everything that can happen on the customer surface.
#[derive(Clone, Debug)]
pub enum CustomerAction {
    /// Add an item to the cart (duplicates increment quantity)
    AddToCart(CartEntry),
    /// Remove an item from the cart
    RemoveFromCart {
        /// Menu item to remove
        menu_item_id: String,
    },
    /// Set an item's quantity (zero removes it)
    SetQuantity {
        /// Menu item to change
        menu_item_id: String,
        /// New quantity
        quantity: u32,
    },
    /// The customer entered their name
    SetName(String),
    /// The customer entered order-level instructions
    SetInstructions(String),
    /// Open the cart view
    OpenCart,
    /// Back to the menu, holding promotion off for the grace window
    ContinueOrdering,
    /// The grace window lapsed
    GraceExpired,
    /// Submit the cart as an order
    PlaceOrder,
    /// The backend stored (or merged) the order
    OrderPlaced(PlacedOrder),
    /// The placement failed
    PlaceFailed(Notice),
    /// Reload this table's orders
    Refresh,
    /// Reload finished
    OrdersLoaded(Vec<Order>),
    /// Reload failed
    LoadFailed(Notice),
    /// Cancelled-order cooldown lapsed; sweep and maybe reset
    SweepCooldown,
    /// Reset all client-held state back to an empty menu view
    FreshStart,
    /// Dismiss the current notice
    DismissNotice,
    /// Channel health changed
    ChannelHealth(ConnectionHealth),
    /// A push event arrived
    Remote(RealtimeEvent),
}

/// Environment dependencies for the customer reducer.
#[derive(Clone)]
pub struct CustomerEnvironment {
    /// Clock for timestamps and grace windows
    pub clock: Arc<dyn Clock>,
    /// Backend order service
    pub api: Arc<dyn OrderApi>,
    /// Session persistence
    pub sessions: Arc<dyn SessionRepository>,
}

impl CustomerEnvironment {
    /// Creates a new `CustomerEnvironment`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        api: Arc<dyn OrderApi>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self { clock, api, sessions }
    }
}

/// Reducer for the customer surface.
#[derive(Clone, Debug, Default)]
pub struct CustomerReducer;

impl CustomerReducer {
    /// Creates a new `CustomerReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Absorbs the outcome of a versioned session write. When another tab
    /// wrote a newer version, its session wins and replaces ours.
    fn absorb_write(state: &mut CustomerState, env: &CustomerEnvironment, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Applied { version } => state.session_version = version,
            WriteOutcome::StaleBasis { held } => {
                tracing::debug!(held, "session write lost to a newer tab, reloading");
                if let Some(session) = env.sessions.get(state.key) {
                    state.cart = session.cart;
                    state.customer_name = session.customer_name;
                    state.special_instructions = session.special_instructions;
                    state.session_version = session.version;
                }
            },
        }
    }

    fn persist_cart(state: &mut CustomerState, env: &CustomerEnvironment) {
        let outcome = env
            .sessions
            .set_cart(state.key, &state.cart, state.session_version);
        Self::absorb_write(state, env, outcome);
    }

    /// Promotes to the tracker unless the grace window holds it off.
    fn auto_promote(state: &mut CustomerState) {
        if !state.in_grace && state.book.has_active_orders() {
            state.view = CustomerView::Tracking;
        }
    }

    /// Full reset back to an empty menu view.
    fn fresh_start(state: &mut CustomerState, env: &CustomerEnvironment) {
        env.sessions.clear(state.key);
        state.cart = Cart::new();
        state.customer_name = None;
        state.special_instructions = None;
        state.session_version = 0;
        state.tracked_order = None;
        state.book = OrderBook::new();
        state.view = CustomerView::Menu;
    }

    fn load_orders_effect(
        env: &CustomerEnvironment,
        table: TableNumber,
    ) -> Effect<CustomerAction> {
        let api = Arc::clone(&env.api);
        Effect::future(async move {
            Some(match api.get_orders_by_table(table).await {
                Ok(orders) => CustomerAction::OrdersLoaded(orders),
                Err(error) => {
                    CustomerAction::LoadFailed(Notice::from_error(&SyncError::from(error)))
                },
            })
        })
    }

    fn on_cancelled(
        state: &mut CustomerState,
        env: &CustomerEnvironment,
        order_id: &OrderId,
    ) -> Effects<CustomerAction> {
        env.sessions.mark_cancelled(CancelledOrderMarker {
            order_id: order_id.clone(),
            table_number: state.table,
            timestamp: env.clock.now(),
        });
        state.notice = Some(Notice::info("Your order was cancelled by the restaurant"));
        state.book.finalize(order_id);

        #[allow(clippy::cast_sign_loss)] // cooldown constant is positive
        let cooldown = Duration::from_secs(CANCELLED_COOLDOWN_MINUTES as u64 * 60);
        smallvec![Effect::delay(cooldown, CustomerAction::SweepCooldown)]
    }

    #[allow(clippy::too_many_lines)] // One arm per remote event kind
    fn on_remote(
        state: &mut CustomerState,
        env: &CustomerEnvironment,
        event: RealtimeEvent,
    ) -> Effects<CustomerAction> {
        match event {
            RealtimeEvent::OrderStatusUpdate(update) => {
                if update.table_number != state.table {
                    return Effects::new();
                }
                match state
                    .book
                    .apply_status(&update.order_id, update.status, update.timestamp)
                {
                    Applied::Changed => match update.status {
                        OrderStatus::Cancelled => Self::on_cancelled(state, env, &update.order_id),
                        OrderStatus::Completed => {
                            smallvec![Effect::delay(
                                COMPLETED_DISPLAY_DELAY,
                                CustomerAction::FreshStart,
                            )]
                        },
                        _ => {
                            Self::auto_promote(state);
                            Effects::new()
                        },
                    },
                    Applied::NoOp | Applied::Stale | Applied::Unknown => Effects::new(),
                }
            },

            RealtimeEvent::OrderCompleted { order_id } => {
                let now = env.clock.now();
                match state.book.apply_status(&order_id, OrderStatus::Completed, now) {
                    Applied::Changed => {
                        if state.tracked_order.as_ref() == Some(&order_id) {
                            state.notice = Some(Notice::info("Your order is complete — enjoy!"));
                        }
                        smallvec![Effect::delay(
                            COMPLETED_DISPLAY_DELAY,
                            CustomerAction::FreshStart,
                        )]
                    },
                    Applied::NoOp | Applied::Stale | Applied::Unknown => Effects::new(),
                }
            },

            RealtimeEvent::OrderDeleted {
                order_id,
                table_number,
            } => {
                if table_number != state.table {
                    return Effects::new();
                }
                state.book.remove(&order_id);
                state.notice = Some(Notice::info("Your order was removed by the restaurant"));
                Self::fresh_start(state, env);
                Effects::new()
            },

            RealtimeEvent::NewItemsAdded { order_id } => {
                if state.tracked_order.as_ref() == Some(&order_id) {
                    state.notice = Some(Notice::info("Items were added to your order"));
                    return smallvec![Self::load_orders_effect(env, state.table)];
                }
                Effects::new()
            },

            // The customer's own placements arrive as `OrderPlaced`
            RealtimeEvent::NewOrder(_) => Effects::new(),
        }
    }
}

impl Reducer for CustomerReducer {
    type State = CustomerState;
    type Action = CustomerAction;
    type Environment = CustomerEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects<Self::Action> {
        match action {
            CustomerAction::AddToCart(entry) => {
                state.cart.add(entry);
                Self::persist_cart(state, env);
                Effects::new()
            },

            CustomerAction::RemoveFromCart { menu_item_id } => {
                state.cart.remove(&menu_item_id);
                Self::persist_cart(state, env);
                if state.cart.is_empty() && state.view == CustomerView::Cart {
                    state.view = CustomerView::Menu;
                }
                Effects::new()
            },

            CustomerAction::SetQuantity {
                menu_item_id,
                quantity,
            } => {
                state.cart.set_quantity(&menu_item_id, quantity);
                Self::persist_cart(state, env);
                Effects::new()
            },

            CustomerAction::SetName(name) => {
                let outcome = env
                    .sessions
                    .set_customer(state.key, &name, state.session_version);
                let trimmed = name.trim();
                state.customer_name = if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                };
                Self::absorb_write(state, env, outcome);
                Effects::new()
            },

            CustomerAction::SetInstructions(text) => {
                let outcome = env
                    .sessions
                    .set_instructions(state.key, &text, state.session_version);
                let trimmed = text.trim();
                state.special_instructions = if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                };
                Self::absorb_write(state, env, outcome);
                Effects::new()
            },

            CustomerAction::OpenCart => {
                state.view = CustomerView::Cart;
                Effects::new()
            },

            CustomerAction::ContinueOrdering => {
                state.view = CustomerView::Menu;
                state.in_grace = true;
                smallvec![Effect::delay(CONTINUE_GRACE, CustomerAction::GraceExpired)]
            },

            CustomerAction::GraceExpired => {
                state.in_grace = false;
                // Promotion resumes once the window lapses
                Self::auto_promote(state);
                Effects::new()
            },

            CustomerAction::PlaceOrder => {
                if state.cart.is_empty() {
                    state.notice = Some(Notice::Rejected {
                        message: "Your cart is empty".to_string(),
                    });
                    return Effects::new();
                }
                let Some(customer_name) = state.customer_name.clone() else {
                    state.notice = Some(Notice::Rejected {
                        message: "Please enter your name before ordering".to_string(),
                    });
                    return Effects::new();
                };

                let payload = NewOrder {
                    table_id: state.table,
                    customer_name,
                    special_instructions: state.special_instructions.clone(),
                    items: state
                        .cart
                        .entries()
                        .iter()
                        .map(|entry| NewOrderItem {
                            menu_item_id: entry.menu_item_id.clone(),
                            quantity: entry.quantity,
                            special_requests: entry.special_requests.clone(),
                        })
                        .collect(),
                };

                let api = Arc::clone(&env.api);
                smallvec![Effect::future(async move {
                    Some(match api.create_order(payload).await {
                        Ok(placed) => CustomerAction::OrderPlaced(placed),
                        Err(error) => {
                            CustomerAction::PlaceFailed(Notice::from_error(&SyncError::from(error)))
                        },
                    })
                })]
            },

            CustomerAction::OrderPlaced(placed) => {
                // Merged placements announce "items added" instead of a new
                // order
                state.notice = Some(if placed.merged {
                    Notice::info("Your items were added to your existing order")
                } else {
                    Notice::info(format!("Order {} placed", placed.order.order_number))
                });

                state.tracked_order = Some(placed.order.id.clone());
                state.book.upsert(placed.order);
                state.view = CustomerView::Tracking;

                state.cart = Cart::new();
                Self::persist_cart(state, env);
                env.sessions.touch(state.key);
                Effects::new()
            },

            CustomerAction::PlaceFailed(notice) => {
                state.notice = Some(notice);
                Effects::new()
            },

            CustomerAction::Refresh => {
                smallvec![Self::load_orders_effect(env, state.table)]
            },

            CustomerAction::OrdersLoaded(orders) => {
                let mine: Vec<Order> = match &state.customer_name {
                    Some(name) => orders
                        .into_iter()
                        .filter(|order| &order.customer_name == name)
                        .collect(),
                    None => orders,
                };
                state.book.load(mine);

                if state.view == CustomerView::Tracking && !state.book.has_active_orders() {
                    // Nothing left to track
                    if state.book.completed().is_empty() {
                        Self::fresh_start(state, env);
                    }
                }
                Effects::new()
            },

            CustomerAction::LoadFailed(notice) => {
                state.notice = Some(notice);
                Effects::new()
            },

            CustomerAction::SweepCooldown => {
                env.sessions.sweep(state.key);
                if env.sessions.cancelled_marker(state.table).is_none() {
                    Self::fresh_start(state, env);
                }
                Effects::new()
            },

            CustomerAction::FreshStart => {
                Self::fresh_start(state, env);
                Effects::new()
            },

            CustomerAction::DismissNotice => {
                state.notice = None;
                Effects::new()
            },

            CustomerAction::ChannelHealth(health) => {
                state.channel_health = health;
                Effects::new()
            },

            CustomerAction::Remote(event) => Self::on_remote(state, env, event),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)] // Test code can use unwrap/panic
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tableflow_orders::{Money, OrderNumber};
    use tableflow_session::InMemorySessionRepository;
    use tableflow_testing::fakes::ScriptedOrderApi;
    use tableflow_testing::{ReducerTest, assertions, test_clock};

    fn entry(menu_item_id: &str, dollars: i64, quantity: u32) -> CartEntry {
        CartEntry {
            menu_item_id: menu_item_id.to_string(),
            name: menu_item_id.to_uppercase(),
            price: Money::from_dollars(dollars),
            quantity,
            special_requests: None,
        }
    }

    fn order(id: &str, table: u32, customer: &str, status: OrderStatus) -> Order {
        let now = Utc.with_ymd_and_hms(2025, 12, 1, 12, 0, 0).unwrap();
        Order {
            id: OrderId::from(id),
            order_number: OrderNumber::new(format!("#{id}")),
            table_number: TableNumber::new(table),
            customer_name: customer.to_string(),
            status,
            items: vec![],
            total_amount: Money::from_cents(0),
            created_at: now,
            updated_at: now,
        }
    }

    fn env() -> CustomerEnvironment {
        let clock = Arc::new(test_clock());
        CustomerEnvironment::new(
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::new(ScriptedOrderApi::new()),
            Arc::new(InMemorySessionRepository::new(clock)),
        )
    }

    fn fresh_state() -> CustomerState {
        CustomerState::on_load(TableNumber::new(7), None, None)
    }

    #[test]
    fn initial_view_prefers_tracking_then_cart_then_menu() {
        let table = TableNumber::new(7);

        let tracking =
            CustomerState::on_load(table, None, Some(OrderId::from("ord-1")));
        assert_eq!(tracking.view, CustomerView::Tracking);

        let mut session = Session::fresh(test_clock().now());
        session.cart.add(entry("ramen", 12, 1));
        let cart = CustomerState::on_load(table, Some(&session), None);
        assert_eq!(cart.view, CustomerView::Cart);

        let menu = CustomerState::on_load(table, None, None);
        assert_eq!(menu.view, CustomerView::Menu);
    }

    #[test]
    fn add_to_cart_increments_duplicates_and_persists() {
        let environment = env();
        let sessions = Arc::clone(&environment.sessions);

        ReducerTest::new(CustomerReducer::new())
            .with_env(environment)
            .given_state(fresh_state())
            .when_action(CustomerAction::AddToCart(entry("ramen", 12, 2)))
            .when_action(CustomerAction::AddToCart(entry("ramen", 12, 1)))
            .then_state(|state| {
                assert_eq!(state.cart.len(), 1);
                assert_eq!(state.cart.entries()[0].quantity, 3);
                assert_eq!(state.cart_total(), Money::from_dollars(36));
            })
            .then_effects(assertions::assert_no_effects)
            .run();

        let persisted = sessions.get(TableKey::for_table(TableNumber::new(7))).unwrap();
        assert_eq!(persisted.cart.entries()[0].quantity, 3);
    }

    #[test]
    fn place_order_requires_items_and_name() {
        ReducerTest::new(CustomerReducer::new())
            .with_env(env())
            .given_state(fresh_state())
            .when_action(CustomerAction::PlaceOrder)
            .then_state(|state| {
                assert!(matches!(state.notice, Some(Notice::Rejected { .. })));
            })
            .then_effects(assertions::assert_no_effects)
            .run();

        let mut with_cart = fresh_state();
        with_cart.cart.add(entry("ramen", 12, 1));
        ReducerTest::new(CustomerReducer::new())
            .with_env(env())
            .given_state(with_cart)
            .when_action(CustomerAction::PlaceOrder)
            .then_state(|state| {
                assert!(matches!(state.notice, Some(Notice::Rejected { .. })));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn valid_place_order_calls_backend() {
        let mut state = fresh_state();
        state.cart.add(entry("ramen", 12, 1));
        state.customer_name = Some("Ana".to_string());

        ReducerTest::new(CustomerReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(CustomerAction::PlaceOrder)
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn merged_placement_announces_items_added_and_tracks() {
        let placed = PlacedOrder {
            order: order("ord-1", 7, "Ana", OrderStatus::Pending),
            merged: true,
        };
        let mut state = fresh_state();
        state.cart.add(entry("ramen", 12, 1));
        state.customer_name = Some("Ana".to_string());
        state.view = CustomerView::Cart;

        ReducerTest::new(CustomerReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(CustomerAction::OrderPlaced(placed))
            .then_state(|state| {
                assert_eq!(state.view, CustomerView::Tracking);
                assert!(state.cart.is_empty());
                match &state.notice {
                    Some(Notice::Info { message }) => {
                        assert!(message.contains("added to your existing order"));
                    },
                    other => panic!("expected items-added notice, got {other:?}"),
                }
            })
            .run();
    }

    #[test]
    fn continue_ordering_holds_promotion_for_grace_window() {
        let mut state = fresh_state();
        state.book.load(vec![order("ord-1", 7, "Ana", OrderStatus::Preparing)]);
        state.view = CustomerView::Tracking;

        ReducerTest::new(CustomerReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(CustomerAction::ContinueOrdering)
            .then_state(|state| {
                assert_eq!(state.view, CustomerView::Menu);
                assert!(state.in_grace);
            })
            .then_effects(assertions::assert_has_delay_effect)
            .run();
    }

    #[test]
    fn promotion_resumes_after_grace_when_active_orders_exist() {
        let mut state = fresh_state();
        state.book.load(vec![order("ord-1", 7, "Ana", OrderStatus::Preparing)]);
        state.view = CustomerView::Menu;
        state.in_grace = true;

        ReducerTest::new(CustomerReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(CustomerAction::GraceExpired)
            .then_state(|state| {
                assert!(!state.in_grace);
                assert_eq!(state.view, CustomerView::Tracking);
            })
            .run();
    }

    #[test]
    fn status_push_during_grace_does_not_yank_view() {
        let mut state = fresh_state();
        state.book.load(vec![order("ord-1", 7, "Ana", OrderStatus::Pending)]);
        state.view = CustomerView::Menu;
        state.in_grace = true;

        let update = tableflow_orders::events::StatusUpdate {
            order_id: OrderId::from("ord-1"),
            status: OrderStatus::Preparing,
            timestamp: test_clock().now(),
            table_number: TableNumber::new(7),
        };

        ReducerTest::new(CustomerReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(CustomerAction::Remote(RealtimeEvent::OrderStatusUpdate(
                update,
            )))
            .then_state(|state| {
                assert_eq!(state.view, CustomerView::Menu);
                // The status still applied; only the view was protected
                assert_eq!(
                    state.book.get(&OrderId::from("ord-1")).unwrap().status,
                    OrderStatus::Preparing
                );
            })
            .run();
    }

    #[test]
    fn cancelled_push_marks_cooldown_and_schedules_sweep() {
        let environment = env();
        let sessions = Arc::clone(&environment.sessions);
        let mut state = fresh_state();
        state.book.load(vec![order("ord-1", 7, "Ana", OrderStatus::Pending)]);
        state.tracked_order = Some(OrderId::from("ord-1"));

        let update = tableflow_orders::events::StatusUpdate {
            order_id: OrderId::from("ord-1"),
            status: OrderStatus::Cancelled,
            timestamp: test_clock().now(),
            table_number: TableNumber::new(7),
        };

        ReducerTest::new(CustomerReducer::new())
            .with_env(environment)
            .given_state(state)
            .when_action(CustomerAction::Remote(RealtimeEvent::OrderStatusUpdate(
                update,
            )))
            .then_effects(assertions::assert_has_delay_effect)
            .run();

        assert!(sessions.cancelled_marker(TableNumber::new(7)).is_some());
    }

    #[test]
    fn deletion_push_resets_to_fresh_menu() {
        let environment = env();
        let sessions = Arc::clone(&environment.sessions);
        sessions.set_customer(TableKey::for_table(TableNumber::new(7)), "Ana", 0);

        let mut state = fresh_state();
        state.book.load(vec![order("ord-1", 7, "Ana", OrderStatus::Pending)]);
        state.tracked_order = Some(OrderId::from("ord-1"));
        state.view = CustomerView::Tracking;

        ReducerTest::new(CustomerReducer::new())
            .with_env(environment)
            .given_state(state)
            .when_action(CustomerAction::Remote(RealtimeEvent::OrderDeleted {
                order_id: OrderId::from("ord-1"),
                table_number: TableNumber::new(7),
            }))
            .then_state(|state| {
                assert_eq!(state.view, CustomerView::Menu);
                assert!(state.tracked_order.is_none());
                assert!(state.cart.is_empty());
            })
            .run();

        assert!(sessions.get(TableKey::for_table(TableNumber::new(7))).is_none());
    }
}
