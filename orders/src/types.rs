//! Core order domain types.
//!
//! The backend store owns orders; these types mirror its wire representation.
//! Status serializes lowercase (`"pending"`, `"preparing"`, ...) to match the
//! REST and push payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an order, assigned by the backend
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    /// Creates a new `OrderId` from a string
    #[must_use]
    pub const fn new(id: String) -> Self {
        Self(id)
    }

    /// Returns the inner string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Human-facing order number shown on tickets and trackers
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Creates a new `OrderNumber` from a string
    #[must_use]
    pub const fn new(number: String) -> Self {
        Self(number)
    }

    /// Returns the inner string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical table number, encoded in the QR code a customer scans
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableNumber(u32);

impl TableNumber {
    /// Creates a new `TableNumber`
    #[must_use]
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    /// Returns the numeric value
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TableNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Money amount in cents (to avoid floating point issues)
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money(i64);

impl Money {
    /// Creates a new money amount from cents
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates a new money amount from whole dollars (converted to cents)
    #[must_use]
    pub const fn from_dollars(dollars: i64) -> Self {
        Self(dollars * 100)
    }

    /// Returns the value in cents
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns the value in dollars (as floating point, display only)
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // i64 to f64 precision loss is acceptable for display
    pub fn dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Multiplies the amount by a quantity
    #[must_use]
    pub const fn times(self, quantity: u32) -> Self {
        Self(self.0 * quantity as i64)
    }

    /// Adds two amounts
    #[must_use]
    pub const fn plus(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::from_cents(0), Self::plus)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.dollars())
    }
}

/// Status of an order in its lifecycle
///
/// Legal movement between statuses is defined by [`crate::policy`]; this type
/// only knows which statuses are terminal and how they rank in the kitchen's
/// priority sort.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order placed, not yet acknowledged by the kitchen
    Pending,
    /// Kitchen is preparing the order
    Preparing,
    /// Order is ready for pickup/serving
    Ready,
    /// Order served and settled; terminal
    Completed,
    /// Order cancelled; terminal
    Cancelled,
}

impl OrderStatus {
    /// Whether this status accepts no further transitions
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Rank used by the kitchen priority sort: the earlier in the lifecycle,
    /// the more urgent.
    #[must_use]
    pub const fn priority_rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Preparing => 1,
            Self::Ready => 2,
            Self::Completed => 3,
            Self::Cancelled => 4,
        }
    }

    /// All statuses, in lifecycle order
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Preparing,
        Self::Ready,
        Self::Completed,
        Self::Cancelled,
    ];
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Preparing => write!(f, "preparing"),
            Self::Ready => write!(f, "ready"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A single line item on an order
///
/// `created_at` is preserved even when items are appended to an existing
/// order; it is the basis for new-item highlighting and session grouping and
/// must never be overwritten on merge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Item identifier, assigned by the backend
    pub id: String,
    /// Menu item this line refers to
    pub menu_item_id: String,
    /// Menu item name at order time
    pub name: String,
    /// Quantity ordered (> 0)
    pub quantity: u32,
    /// Price per unit
    pub unit_price: Money,
    /// Line total (= quantity × `unit_price`)
    pub total_price: Money,
    /// Free-text preparation notes
    pub special_instructions: Option<String>,
    /// When this item was added to the order
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Recomputes the line total from quantity and unit price
    #[must_use]
    pub const fn computed_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// A customer order as held by the backend store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier
    pub id: OrderId,
    /// Human-facing display number
    pub order_number: OrderNumber,
    /// Table the order belongs to
    pub table_number: TableNumber,
    /// Name the customer entered when ordering
    pub customer_name: String,
    /// Current lifecycle status
    pub status: OrderStatus,
    /// Line items, in the order they were added
    pub items: Vec<OrderItem>,
    /// Order total
    pub total_amount: Money,
    /// When the order was created
    pub created_at: DateTime<Utc>,
    /// When the order was last modified
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Whether the order is still in a non-terminal status
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Sums the line totals
    #[must_use]
    pub fn items_total(&self) -> Money {
        self.items.iter().map(|item| item.total_price).sum()
    }
}
