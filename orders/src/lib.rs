//! # Tableflow Orders
//!
//! Order domain model shared by every surface: the order/item types, the
//! status transition policy, merge tracking (distinguishing an order's
//! original items from later additions), and the realtime event catalog.
//!
//! Everything in this crate is pure data and pure functions. The backend
//! store owns the authoritative `Order`; clients hold local copies that are
//! either speculative (superseded by the next matching push event) or reads
//! used purely for optimistic display.

/// Order status transition policy
pub mod policy;

/// Newness classification and ordering-session grouping
pub mod merge;

/// Realtime event catalog and room names
pub mod events;

mod types;

pub use types::{Money, Order, OrderId, OrderItem, OrderNumber, OrderStatus, TableNumber};
