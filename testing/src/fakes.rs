//! Fake channel and scripted backend.
//!
//! Both fakes capture what the code under test did (rooms joined, calls
//! made) and let the test script what comes back (push events, backend
//! responses, failures).

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use tableflow_api::{
    ApiError, ApiFuture, NewOrder, OrderApi, OrderFilters, PlacedOrder, TableInfo,
};
use tableflow_channel::router::EventRouter;
use tableflow_channel::{ChannelFuture, ConnectionHealth, EventStream, RealtimeChannel};
use tableflow_orders::events::{RealtimeEvent, Room};
use tableflow_orders::{Order, OrderId, OrderStatus, TableNumber};

fn locked<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// In-process [`RealtimeChannel`]: the test pushes events by hand.
pub struct FakeChannel {
    router: EventRouter,
    rooms: Mutex<HashSet<Room>>,
    health: Mutex<ConnectionHealth>,
}

impl FakeChannel {
    /// Creates a fake channel in the [`ConnectionHealth::Idle`] state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            router: EventRouter::default(),
            rooms: Mutex::new(HashSet::new()),
            health: Mutex::new(ConnectionHealth::Idle),
        }
    }

    /// Delivers a push event to every subscriber, as if the server sent it.
    pub fn push(&self, event: &RealtimeEvent) {
        self.router.publish(event);
    }

    /// The rooms currently joined.
    #[must_use]
    pub fn joined_rooms(&self) -> HashSet<Room> {
        locked(&self.rooms).clone()
    }

    /// Forces a health state, simulating connection loss or exhaustion.
    pub fn set_health(&self, health: ConnectionHealth) {
        *locked(&self.health) = health;
    }

    /// The router, for kind-scoped callback subscriptions.
    #[must_use]
    pub const fn router(&self) -> &EventRouter {
        &self.router
    }
}

impl Default for FakeChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeChannel for FakeChannel {
    fn connect(&self) -> ChannelFuture<'_, ()> {
        Box::pin(async move {
            *locked(&self.health) = ConnectionHealth::Connected;
            Ok(())
        })
    }

    fn disconnect(&self) -> ChannelFuture<'_, ()> {
        Box::pin(async move {
            *locked(&self.health) = ConnectionHealth::Idle;
            Ok(())
        })
    }

    fn join(&self, room: Room) -> ChannelFuture<'_, ()> {
        Box::pin(async move {
            locked(&self.rooms).insert(room);
            Ok(())
        })
    }

    fn leave(&self, room: Room) -> ChannelFuture<'_, ()> {
        Box::pin(async move {
            locked(&self.rooms).remove(&room);
            Ok(())
        })
    }

    fn events(&self) -> EventStream {
        self.router.subscribe()
    }

    fn health(&self) -> ConnectionHealth {
        *locked(&self.health)
    }
}

/// A call the scripted backend received.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedCall {
    /// `create_order` was called
    CreateOrder(NewOrder),
    /// `update_order_status` was called
    UpdateStatus(OrderId, OrderStatus),
    /// `bulk_update_order_status` was called
    BulkUpdateStatus(Vec<OrderId>, OrderStatus),
    /// `delete_order` was called
    DeleteOrder(OrderId),
    /// `search_orders` was called
    Search(OrderFilters),
    /// `get_order` was called
    GetOrder(OrderId),
    /// `get_orders_by_table` was called
    GetOrdersByTable(TableNumber),
    /// `get_table_by_qr_code` was called
    GetTableByQrCode(String),
    /// `fetch_tables` was called
    FetchTables,
}

/// [`OrderApi`] with scripted responses.
///
/// Responses are queued per method and popped in call order; a method called
/// with an empty queue fails with a transport error so tests notice missing
/// scripts instead of hanging on defaults. Lookup methods (`get_order`,
/// `get_orders_by_table`, tables) read from seeded maps.
#[derive(Default)]
pub struct ScriptedOrderApi {
    calls: Mutex<Vec<RecordedCall>>,
    create_results: Mutex<VecDeque<Result<PlacedOrder, ApiError>>>,
    update_results: Mutex<VecDeque<Result<Order, ApiError>>>,
    bulk_results: Mutex<VecDeque<Result<Vec<Order>, ApiError>>>,
    delete_results: Mutex<VecDeque<Result<(), ApiError>>>,
    search_results: Mutex<VecDeque<Result<Vec<Order>, ApiError>>>,
    orders: Mutex<HashMap<OrderId, Order>>,
    orders_by_table: Mutex<HashMap<TableNumber, Vec<Order>>>,
    tables: Mutex<Vec<TableInfo>>,
}

impl ScriptedOrderApi {
    /// Creates a backend with nothing scripted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a `create_order` response.
    pub fn script_create(&self, result: Result<PlacedOrder, ApiError>) {
        locked(&self.create_results).push_back(result);
    }

    /// Queues an `update_order_status` response.
    pub fn script_update(&self, result: Result<Order, ApiError>) {
        locked(&self.update_results).push_back(result);
    }

    /// Queues a `bulk_update_order_status` response.
    pub fn script_bulk_update(&self, result: Result<Vec<Order>, ApiError>) {
        locked(&self.bulk_results).push_back(result);
    }

    /// Queues a `delete_order` response.
    pub fn script_delete(&self, result: Result<(), ApiError>) {
        locked(&self.delete_results).push_back(result);
    }

    /// Queues a `search_orders` response.
    pub fn script_search(&self, result: Result<Vec<Order>, ApiError>) {
        locked(&self.search_results).push_back(result);
    }

    /// Seeds an order for `get_order`.
    pub fn seed_order(&self, order: Order) {
        locked(&self.orders).insert(order.id.clone(), order);
    }

    /// Seeds the order list for a table.
    pub fn seed_table_orders(&self, table: TableNumber, orders: Vec<Order>) {
        locked(&self.orders_by_table).insert(table, orders);
    }

    /// Seeds the table list (also used by `get_table_by_qr_code`).
    pub fn seed_tables(&self, tables: Vec<TableInfo>) {
        *locked(&self.tables) = tables;
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        locked(&self.calls).clone()
    }

    fn record(&self, call: RecordedCall) {
        locked(&self.calls).push(call);
    }

    fn unscripted<T>(method: &str) -> Result<T, ApiError> {
        Err(ApiError::Transport(format!(
            "no scripted response for {method}"
        )))
    }
}

impl OrderApi for ScriptedOrderApi {
    fn create_order(&self, order: NewOrder) -> ApiFuture<'_, PlacedOrder> {
        self.record(RecordedCall::CreateOrder(order));
        let result = locked(&self.create_results)
            .pop_front()
            .unwrap_or_else(|| Self::unscripted("create_order"));
        Box::pin(async move { result })
    }

    fn update_order_status(&self, id: OrderId, status: OrderStatus) -> ApiFuture<'_, Order> {
        self.record(RecordedCall::UpdateStatus(id, status));
        let result = locked(&self.update_results)
            .pop_front()
            .unwrap_or_else(|| Self::unscripted("update_order_status"));
        Box::pin(async move { result })
    }

    fn bulk_update_order_status(
        &self,
        ids: Vec<OrderId>,
        status: OrderStatus,
    ) -> ApiFuture<'_, Vec<Order>> {
        self.record(RecordedCall::BulkUpdateStatus(ids, status));
        let result = locked(&self.bulk_results)
            .pop_front()
            .unwrap_or_else(|| Self::unscripted("bulk_update_order_status"));
        Box::pin(async move { result })
    }

    fn delete_order(&self, id: OrderId) -> ApiFuture<'_, ()> {
        self.record(RecordedCall::DeleteOrder(id));
        let result = locked(&self.delete_results)
            .pop_front()
            .unwrap_or_else(|| Self::unscripted("delete_order"));
        Box::pin(async move { result })
    }

    fn search_orders(&self, filters: OrderFilters) -> ApiFuture<'_, Vec<Order>> {
        self.record(RecordedCall::Search(filters));
        let result = locked(&self.search_results)
            .pop_front()
            .unwrap_or_else(|| Self::unscripted("search_orders"));
        Box::pin(async move { result })
    }

    fn get_order(&self, id: OrderId) -> ApiFuture<'_, Order> {
        self.record(RecordedCall::GetOrder(id.clone()));
        let result = locked(&self.orders)
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound {
                entity: "order".to_string(),
            });
        Box::pin(async move { result })
    }

    fn get_orders_by_table(&self, table: TableNumber) -> ApiFuture<'_, Vec<Order>> {
        self.record(RecordedCall::GetOrdersByTable(table));
        let result = Ok(locked(&self.orders_by_table)
            .get(&table)
            .cloned()
            .unwrap_or_default());
        Box::pin(async move { result })
    }

    fn get_table_by_qr_code(&self, code: String) -> ApiFuture<'_, TableInfo> {
        self.record(RecordedCall::GetTableByQrCode(code.clone()));
        let result = locked(&self.tables)
            .iter()
            .find(|table| table.qr_code == code)
            .cloned()
            .ok_or_else(|| ApiError::NotFound {
                entity: "QR code".to_string(),
            });
        Box::pin(async move { result })
    }

    fn fetch_tables(&self) -> ApiFuture<'_, Vec<TableInfo>> {
        self.record(RecordedCall::FetchTables);
        let result = Ok(locked(&self.tables).clone());
        Box::pin(async move { result })
    }
}
