//! Shared order list reconciliation.
//!
//! Every surface holds two disjoint lists — active and completed orders —
//! partitioned by status on load and kept current by push events. The book
//! also owns the stale-event guard: a per-order last-applied timestamp, so a
//! push (or a late REST response) older than what is already applied can
//! never regress a status.
//!
//! The book only updates orders in place; *when* a terminal order leaves the
//! active list is surface policy (kitchen and admin keep completed orders
//! visible for a short grace delay), so callers move it with
//! [`OrderBook::finalize`].

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tableflow_orders::{Order, OrderId, OrderStatus};

/// Result of applying a status to the book.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Applied {
    /// The status was applied
    Changed,
    /// The book already held this status (duplicate delivery); timestamp
    /// recorded, nothing else changed
    NoOp,
    /// The update was older than the last applied one and was discarded
    Stale,
    /// The book does not hold this order
    Unknown,
}

/// Active/completed partition with a freshness guard.
#[derive(Clone, Debug, Default)]
pub struct OrderBook {
    active: Vec<Order>,
    completed: Vec<Order>,
    last_applied: HashMap<OrderId, DateTime<Utc>>,
}

impl OrderBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the book's contents from a full reload, partitioning by
    /// status. The freshness guard restarts from each order's `updated_at`.
    pub fn load(&mut self, orders: Vec<Order>) {
        self.active.clear();
        self.completed.clear();
        self.last_applied.clear();
        for order in orders {
            self.last_applied.insert(order.id.clone(), order.updated_at);
            if order.is_active() {
                self.active.push(order);
            } else {
                self.completed.push(order);
            }
        }
    }

    /// Inserts or replaces one order, keeping it in the list its status
    /// demands. Newly fetched orders land here.
    pub fn upsert(&mut self, order: Order) {
        self.remove(&order.id);
        self.last_applied.insert(order.id.clone(), order.updated_at);
        if order.is_active() {
            self.active.push(order);
        } else {
            self.completed.push(order);
        }
    }

    /// Applies a status observed at `timestamp` (from a push event or a REST
    /// response), unless something newer was already applied.
    ///
    /// A terminal status is applied in place; call [`Self::finalize`] to move
    /// the order out of the active list when the surface is ready.
    pub fn apply_status(
        &mut self,
        order_id: &OrderId,
        status: OrderStatus,
        timestamp: DateTime<Utc>,
    ) -> Applied {
        if let Some(last) = self.last_applied.get(order_id) {
            if timestamp < *last {
                tracing::debug!(
                    %order_id,
                    %status,
                    "discarding stale status update"
                );
                return Applied::Stale;
            }
        }

        let Some(order) = self.get_mut(order_id) else {
            return Applied::Unknown;
        };

        let changed = order.status != status;
        order.status = status;
        order.updated_at = timestamp;
        self.last_applied.insert(order_id.clone(), timestamp);

        if changed { Applied::Changed } else { Applied::NoOp }
    }

    /// Moves a now-terminal order out of the active list.
    pub fn finalize(&mut self, order_id: &OrderId) {
        if let Some(index) = self.active.iter().position(|order| &order.id == order_id) {
            if !self.active[index].is_active() {
                let order = self.active.remove(index);
                self.completed.push(order);
            }
        }
    }

    /// Removes an order entirely (deletions).
    pub fn remove(&mut self, order_id: &OrderId) {
        self.active.retain(|order| &order.id != order_id);
        self.completed.retain(|order| &order.id != order_id);
        self.last_applied.remove(order_id);
    }

    /// Orders not yet moved out of the active list.
    #[must_use]
    pub fn active(&self) -> &[Order] {
        &self.active
    }

    /// Orders moved out of the active list.
    #[must_use]
    pub fn completed(&self) -> &[Order] {
        &self.completed
    }

    /// Whether any order is in a non-terminal status.
    #[must_use]
    pub fn has_active_orders(&self) -> bool {
        self.active.iter().any(Order::is_active)
    }

    /// Looks an order up in either list.
    #[must_use]
    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        self.active
            .iter()
            .chain(self.completed.iter())
            .find(|order| &order.id == order_id)
    }

    fn get_mut(&mut self, order_id: &OrderId) -> Option<&mut Order> {
        self.active
            .iter_mut()
            .chain(self.completed.iter_mut())
            .find(|order| &order.id == order_id)
    }

    /// All orders, active first.
    #[must_use]
    pub fn all(&self) -> Vec<Order> {
        self.active
            .iter()
            .chain(self.completed.iter())
            .cloned()
            .collect()
    }
}
