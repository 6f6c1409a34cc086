//! Realtime event catalog and room names.
//!
//! Push events are a freshness hint, not the source of truth: delivery across
//! reconnects is not guaranteed, so every surface also supports a manual full
//! reload. Payloads are JSON with camelCase fields, matching the wire
//! contract of the backend's push fan-out.

use crate::{Money, OrderId, OrderNumber, OrderStatus, TableNumber};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A room a surface explicitly joins on the realtime channel.
///
/// There is no implicit global subscription: the admin dashboard joins
/// [`Room::Admin`], the kitchen queue [`Room::Kitchen`], a customer tracker
/// its table room and, once an order exists, that order's room.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Room {
    /// Admin dashboard fan-out
    Admin,
    /// Kitchen queue fan-out
    Kitchen,
    /// Per-table customer fan-out
    Table(TableNumber),
    /// Per-order customer fan-out
    Customer(OrderId),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Kitchen => write!(f, "kitchen"),
            Self::Table(table) => write!(f, "table:{table}"),
            Self::Customer(order_id) => write!(f, "customer:{order_id}"),
        }
    }
}

/// Kind discriminant for [`RealtimeEvent`], used by subscriber registries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `new-order`
    NewOrder,
    /// `order-status-update`
    OrderStatusUpdate,
    /// `order-completed`
    OrderCompleted,
    /// `order-deleted`
    OrderDeleted,
    /// `new-items-added`
    NewItemsAdded,
}

impl EventKind {
    /// Wire name of the event
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewOrder => "new-order",
            Self::OrderStatusUpdate => "order-status-update",
            Self::OrderCompleted => "order-completed",
            Self::OrderDeleted => "order-deleted",
            Self::NewItemsAdded => "new-items-added",
        }
    }
}

/// Payload of a `new-order` announcement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAnnounced {
    /// Order identifier
    pub id: OrderId,
    /// Display number
    pub order_number: OrderNumber,
    /// Table the order was placed from
    pub table_number: TableNumber,
    /// Customer who placed it
    pub customer_name: String,
    /// Order total at announcement time
    pub total_amount: Money,
    /// When the order was created
    pub created_at: DateTime<Utc>,
}

/// Payload of an `order-status-update`.
///
/// `timestamp` is the server-side mutation time; consumers apply the update
/// only if it is not older than the last timestamp they applied for the same
/// order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    /// Order whose status changed
    pub order_id: OrderId,
    /// The status the backend moved the order to
    pub status: OrderStatus,
    /// Server-side mutation time
    pub timestamp: DateTime<Utc>,
    /// Table the order belongs to
    pub table_number: TableNumber,
}

/// Every push event a surface consumes.
///
/// Serialized as `{"event": "<kebab-case name>", "payload": {...}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum RealtimeEvent {
    /// A new order was placed
    NewOrder(OrderAnnounced),
    /// An order's status changed
    OrderStatusUpdate(StatusUpdate),
    /// An order reached `completed`
    #[serde(rename_all = "camelCase")]
    OrderCompleted {
        /// Completed order
        order_id: OrderId,
    },
    /// An order was deleted by an admin
    #[serde(rename_all = "camelCase")]
    OrderDeleted {
        /// Deleted order
        order_id: OrderId,
        /// Table the order belonged to
        table_number: TableNumber,
    },
    /// Items were folded into an existing order
    #[serde(rename_all = "camelCase")]
    NewItemsAdded {
        /// Order that received the items
        order_id: OrderId,
    },
}

impl RealtimeEvent {
    /// Kind discriminant for subscriber registries
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::NewOrder(_) => EventKind::NewOrder,
            Self::OrderStatusUpdate(_) => EventKind::OrderStatusUpdate,
            Self::OrderCompleted { .. } => EventKind::OrderCompleted,
            Self::OrderDeleted { .. } => EventKind::OrderDeleted,
            Self::NewItemsAdded { .. } => EventKind::NewItemsAdded,
        }
    }

    /// The order this event refers to
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        match self {
            Self::NewOrder(announced) => &announced.id,
            Self::OrderStatusUpdate(update) => &update.order_id,
            Self::OrderCompleted { order_id }
            | Self::OrderDeleted { order_id, .. }
            | Self::NewItemsAdded { order_id } => order_id,
        }
    }
}
