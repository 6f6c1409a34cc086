//! # Tableflow Session
//!
//! Client-side cart and session persistence, keyed by table.
//!
//! A customer's in-progress cart, name and special instructions survive page
//! reloads and re-scans of the same table's QR code. Two sweeps keep that
//! persistence honest: sessions untouched for four hours are wiped, and once
//! a cancelled order's cooldown elapses every trace of the table's session is
//! cleared so the next scan starts fresh.
//!
//! The repository trait is the single canonical key scheme for all surfaces;
//! writes carry the version they were based on and are ignored when another
//! tab has written a newer one (last-write-wins across tabs, but never
//! backwards).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tableflow_orders::{Money, OrderId, TableNumber};

mod memory;

pub use memory::InMemorySessionRepository;

/// Sessions untouched for this long are invalidated on load.
pub const SESSION_TTL_MINUTES: i64 = 4 * 60;

/// Cooldown after a cancelled order before the table's session data is wiped.
///
/// One canonical value for every surface.
pub const CANCELLED_COOLDOWN_MINUTES: i64 = 5;

/// Canonical session key: one per table.
///
/// Every surface derives the key the same way, from the table number the QR
/// code resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableKey(TableNumber);

impl TableKey {
    /// Key for a table's session data
    #[must_use]
    pub const fn for_table(table: TableNumber) -> Self {
        Self(table)
    }

    /// The table this key belongs to
    #[must_use]
    pub const fn table(self) -> TableNumber {
        self.0
    }
}

impl std::fmt::Display for TableKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "table:{}", self.0)
    }
}

/// One line in a not-yet-placed cart. Unique by `menu_item_id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    /// Menu item this entry refers to
    pub menu_item_id: String,
    /// Menu item name at add time
    pub name: String,
    /// Unit price at add time
    pub price: Money,
    /// Quantity (> 0)
    pub quantity: u32,
    /// Free-text preparation notes
    pub special_requests: Option<String>,
}

impl CartEntry {
    /// Line total for this entry
    #[must_use]
    pub const fn line_total(&self) -> Money {
        self.price.times(self.quantity)
    }
}

/// A pre-order cart: ordered entries, unique by menu item.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart(Vec<CartEntry>);

impl Cart {
    /// Creates an empty cart
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds an entry; a duplicate `menu_item_id` increments the existing
    /// entry's quantity instead of appending.
    pub fn add(&mut self, entry: CartEntry) {
        if let Some(existing) = self
            .0
            .iter_mut()
            .find(|held| held.menu_item_id == entry.menu_item_id)
        {
            existing.quantity += entry.quantity;
        } else {
            self.0.push(entry);
        }
    }

    /// Removes the entry for a menu item, if present
    pub fn remove(&mut self, menu_item_id: &str) {
        self.0.retain(|entry| entry.menu_item_id != menu_item_id);
    }

    /// Sets the quantity for a menu item; zero removes the entry
    pub fn set_quantity(&mut self, menu_item_id: &str, quantity: u32) {
        if quantity == 0 {
            self.remove(menu_item_id);
        } else if let Some(entry) = self
            .0
            .iter_mut()
            .find(|entry| entry.menu_item_id == menu_item_id)
        {
            entry.quantity = quantity;
        }
    }

    /// Sum of `price × quantity` over all entries
    #[must_use]
    pub fn total(&self) -> Money {
        self.0.iter().map(CartEntry::line_total).sum()
    }

    /// Number of distinct entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the cart holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The entries, in add order
    #[must_use]
    pub fn entries(&self) -> &[CartEntry] {
        &self.0
    }
}

impl FromIterator<CartEntry> for Cart {
    fn from_iter<I: IntoIterator<Item = CartEntry>>(iter: I) -> Self {
        let mut cart = Self::new();
        for entry in iter {
            cart.add(entry);
        }
        cart
    }
}

/// Everything persisted for one table between page loads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// In-progress cart
    pub cart: Cart,
    /// Customer name, once entered
    pub customer_name: Option<String>,
    /// Order-level special instructions
    pub special_instructions: Option<String>,
    /// Refreshed on every mutation; staleness is measured against it
    pub last_mutated_at: DateTime<Utc>,
    /// Monotonic write version; writes based on an older version are ignored
    pub version: u64,
}

impl Session {
    /// A fresh session created at `now`
    #[must_use]
    pub const fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            cart: Cart::new(),
            customer_name: None,
            special_instructions: None,
            last_mutated_at: now,
            version: 0,
        }
    }

    /// Whether the session has outlived the staleness ceiling at `now`
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.last_mutated_at) > Duration::minutes(SESSION_TTL_MINUTES)
    }

    /// Defensive parse of a persisted session payload.
    ///
    /// Malformed JSON is a data-integrity failure, not a crash: it is logged
    /// and treated as an absent session.
    #[must_use]
    pub fn parse_persisted(raw: &str) -> Option<Self> {
        match serde_json::from_str(raw) {
            Ok(session) => Some(session),
            Err(error) => {
                tracing::warn!(%error, "discarding malformed persisted session");
                None
            },
        }
    }
}

/// Marker left behind when a push event reports an order cancelled.
///
/// Consumed by the sweep: once `timestamp` is older than
/// [`CANCELLED_COOLDOWN_MINUTES`], the marker and all session data for the
/// table are cleared to restore a fresh start.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CancelledOrderMarker {
    /// The cancelled order
    pub order_id: OrderId,
    /// Table the order belonged to
    pub table_number: TableNumber,
    /// When the cancellation was observed
    pub timestamp: DateTime<Utc>,
}

impl CancelledOrderMarker {
    /// Whether the cooldown has elapsed at `now`
    #[must_use]
    pub fn cooldown_elapsed(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp)
            > Duration::minutes(CANCELLED_COOLDOWN_MINUTES)
    }
}

/// Outcome of a versioned session write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The write was applied; the session now holds this version
    Applied {
        /// Version after the write
        version: u64,
    },
    /// The write was based on an older version than the one held and was
    /// ignored (another tab wrote in between)
    StaleBasis {
        /// Version currently held
        held: u64,
    },
}

impl WriteOutcome {
    /// Whether the write took effect
    #[must_use]
    pub const fn applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Typed repository for per-table session state.
///
/// One canonical key scheme for every surface. `get` sweeps before returning,
/// so callers never observe a stale cart or a session past a cancelled
/// order's cooldown. All mutating calls refresh the staleness timestamp.
pub trait SessionRepository: Send + Sync {
    /// Loads the session for a table, sweeping expired state first.
    fn get(&self, key: TableKey) -> Option<Session>;

    /// Replaces the cart. An empty cart clears the stored cart entry rather
    /// than persisting an empty array.
    fn set_cart(&self, key: TableKey, cart: &Cart, basis_version: u64) -> WriteOutcome;

    /// Stores the customer name.
    fn set_customer(&self, key: TableKey, name: &str, basis_version: u64) -> WriteOutcome;

    /// Stores order-level special instructions.
    fn set_instructions(&self, key: TableKey, text: &str, basis_version: u64) -> WriteOutcome;

    /// Refreshes the staleness timestamp without changing data.
    fn touch(&self, key: TableKey);

    /// Removes all session data for a table.
    fn clear(&self, key: TableKey);

    /// Records that an order on this table was cancelled.
    fn mark_cancelled(&self, marker: CancelledOrderMarker);

    /// The cancellation marker for a table, if one is held and its cooldown
    /// has not yet been swept.
    fn cancelled_marker(&self, table: TableNumber) -> Option<CancelledOrderMarker>;

    /// Runs the staleness and cooldown sweep for a table without loading.
    fn sweep(&self, key: TableKey);
}
