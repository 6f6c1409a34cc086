//! # Tableflow API
//!
//! Contract for the backend order service. The relational schema and REST
//! handlers live elsewhere; every surface consumes them through the
//! [`OrderApi`] trait so tests can substitute a scripted implementation and
//! the HTTP client stays a detail.
//!
//! One-shot REST calls are not retried automatically — failures surface with
//! a retry affordance in the UI. The realtime channel is the component that
//! retries on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use tableflow_orders::{Order, OrderId, OrderStatus, TableNumber};
use thiserror::Error;

mod http;

pub use http::{HttpOrderApi, HttpOrderApiBuilder};

/// Item of a new-order request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    /// Menu item to order
    pub menu_item_id: String,
    /// Quantity (> 0)
    pub quantity: u32,
    /// Free-text preparation notes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}

/// Payload of `create_order`.
///
/// The backend decides whether these items open a new order or merge into an
/// existing non-terminal order for the same customer and table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    /// Table the order is placed from
    pub table_id: TableNumber,
    /// Customer placing the order
    pub customer_name: String,
    /// Order-level special instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
    /// Items to order
    pub items: Vec<NewOrderItem>,
}

/// Result of `create_order`: the stored order plus whether the backend merged
/// the items into an existing order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedOrder {
    /// The order as the backend now holds it
    pub order: Order,
    /// True when the items were folded into an existing order
    pub merged: bool,
}

/// Filters accepted by `search_orders`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderFilters {
    /// Restrict to a status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    /// Restrict to a table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_id: Option<TableNumber>,
    /// Orders created at or after this instant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<DateTime<Utc>>,
    /// Orders created at or before this instant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<DateTime<Utc>>,
    /// Free-text match on customer name / order number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

/// A restaurant table as the backend knows it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Backend identifier
    pub id: String,
    /// Physical table number
    pub table_number: TableNumber,
    /// QR code payload printed on the table
    pub qr_code: String,
}

/// Structured detail of a completion the backend refused: the customer still
/// has other active orders on the table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionConflict {
    /// Customer whose sibling orders block the completion
    pub customer_name: String,
    /// The orders that must finish first
    pub active_orders: Vec<Order>,
}

/// Errors surfaced by the backend contract, grouped by how the UI reacts.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The referenced entity does not exist. Terminal: surfaces redirect to a
    /// safe fallback view instead of rendering a broken state.
    #[error("{entity} not found")]
    NotFound {
        /// What was looked up ("order", "table", "QR code")
        entity: String,
    },

    /// The backend refused the action and said why; carries the structured
    /// blocker detail instead of a generic failure.
    #[error("completion blocked: {0}")]
    CompletionBlocked(CompletionConflict),

    /// Connection failure or timeout. Not retried automatically; the caller
    /// surfaces a dismissible notice with a retry affordance.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The backend answered with something that does not decode. Treated as
    /// absent data, logged, never a crash.
    #[error("malformed response: {0}")]
    InvalidResponse(String),

    /// Any other rejection (validation, permissions)
    #[error("request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Backend-provided message
        message: String,
    },
}

impl std::fmt::Display for CompletionConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} has {} other active order(s)",
            self.customer_name,
            self.active_orders.len()
        )
    }
}

/// Boxed future returned by [`OrderApi`] methods.
///
/// Explicit `Pin<Box<dyn Future>>` instead of `async fn` keeps the trait
/// dyn-compatible: reducer environments hold `Arc<dyn OrderApi>`.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// The backend order service, as consumed by every surface.
pub trait OrderApi: Send + Sync {
    /// Places an order, or merges its items into an existing non-terminal
    /// order for the same customer and table (the backend decides and
    /// reports `merged`).
    fn create_order(&self, order: NewOrder) -> ApiFuture<'_, PlacedOrder>;

    /// Moves an order to a new status.
    ///
    /// Rejects with [`ApiError::CompletionBlocked`] when a completion is
    /// blocked by sibling active orders.
    fn update_order_status(&self, id: OrderId, status: OrderStatus) -> ApiFuture<'_, Order>;

    /// Moves several orders to the same status in one call.
    fn bulk_update_order_status(
        &self,
        ids: Vec<OrderId>,
        status: OrderStatus,
    ) -> ApiFuture<'_, Vec<Order>>;

    /// Deletes an order.
    fn delete_order(&self, id: OrderId) -> ApiFuture<'_, ()>;

    /// Searches orders by the given filters.
    fn search_orders(&self, filters: OrderFilters) -> ApiFuture<'_, Vec<Order>>;

    /// Loads one order.
    fn get_order(&self, id: OrderId) -> ApiFuture<'_, Order>;

    /// Loads all orders for a table.
    fn get_orders_by_table(&self, table: TableNumber) -> ApiFuture<'_, Vec<Order>>;

    /// Resolves a scanned QR code to its table.
    fn get_table_by_qr_code(&self, code: String) -> ApiFuture<'_, TableInfo>;

    /// Lists all tables.
    fn fetch_tables(&self) -> ApiFuture<'_, Vec<TableInfo>>;
}
