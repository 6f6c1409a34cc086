//! In-memory session repository.
//!
//! The production deployment persists sessions in the embedding host's
//! storage; this implementation backs tests and single-process hosts. It
//! still enforces every contract rule: sweep-before-read, versioned writes,
//! empty-cart elision and cancelled-order cooldowns.

use crate::{
    CancelledOrderMarker, Cart, Session, SessionRepository, TableKey, WriteOutcome,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tableflow_core::environment::Clock;
use tableflow_orders::TableNumber;

#[derive(Default)]
struct Shelf {
    sessions: HashMap<TableKey, Session>,
    markers: HashMap<TableNumber, CancelledOrderMarker>,
}

/// Session repository held in process memory.
pub struct InMemorySessionRepository {
    clock: Arc<dyn Clock>,
    shelf: RwLock<Shelf>,
}

impl InMemorySessionRepository {
    /// Creates an empty repository using `clock` for sweeps and timestamps.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            shelf: RwLock::new(Shelf::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Shelf> {
        self.shelf.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Shelf> {
        self.shelf.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Applies the staleness and cooldown sweep for one key while holding the
    /// write lock.
    fn sweep_locked(shelf: &mut Shelf, key: TableKey, now: chrono::DateTime<chrono::Utc>) {
        if let Some(marker) = shelf.markers.get(&key.table()) {
            if marker.cooldown_elapsed(now) {
                tracing::debug!(%key, order_id = %marker.order_id, "cancelled-order cooldown elapsed, clearing session");
                shelf.markers.remove(&key.table());
                shelf.sessions.remove(&key);
                return;
            }
        }

        if let Some(session) = shelf.sessions.get(&key) {
            if session.is_stale(now) {
                tracing::debug!(%key, "session staleness ceiling elapsed, clearing session");
                shelf.sessions.remove(&key);
            }
        }
    }

    /// Versioned mutation helper: sweeps, checks the basis version, applies
    /// `mutate`, refreshes the timestamp and bumps the version.
    fn mutate_session<F>(&self, key: TableKey, basis_version: u64, mutate: F) -> WriteOutcome
    where
        F: FnOnce(&mut Session),
    {
        let now = self.clock.now();
        let mut shelf = self.write();
        Self::sweep_locked(&mut shelf, key, now);

        let session = shelf
            .sessions
            .entry(key)
            .or_insert_with(|| Session::fresh(now));

        if basis_version < session.version {
            tracing::debug!(
                %key,
                basis_version,
                held = session.version,
                "ignoring session write with stale basis version"
            );
            return WriteOutcome::StaleBasis {
                held: session.version,
            };
        }

        mutate(session);
        session.last_mutated_at = now;
        session.version += 1;
        WriteOutcome::Applied {
            version: session.version,
        }
    }
}

impl SessionRepository for InMemorySessionRepository {
    fn get(&self, key: TableKey) -> Option<Session> {
        let now = self.clock.now();
        let mut shelf = self.write();
        Self::sweep_locked(&mut shelf, key, now);
        shelf.sessions.get(&key).cloned()
    }

    fn set_cart(&self, key: TableKey, cart: &Cart, basis_version: u64) -> WriteOutcome {
        if cart.is_empty() {
            // An empty cart is not persisted; it would leak empty-but-present
            // state to other devices sharing the table key.
            let outcome = self.mutate_session(key, basis_version, |session| {
                session.cart = Cart::new();
            });
            if outcome.applied() {
                let mut shelf = self.write();
                if let Some(session) = shelf.sessions.get(&key) {
                    if session.cart.is_empty()
                        && session.customer_name.is_none()
                        && session.special_instructions.is_none()
                    {
                        shelf.sessions.remove(&key);
                    }
                }
            }
            return outcome;
        }

        self.mutate_session(key, basis_version, |session| {
            session.cart = cart.clone();
        })
    }

    fn set_customer(&self, key: TableKey, name: &str, basis_version: u64) -> WriteOutcome {
        let name = name.trim().to_string();
        self.mutate_session(key, basis_version, |session| {
            session.customer_name = if name.is_empty() { None } else { Some(name) };
        })
    }

    fn set_instructions(&self, key: TableKey, text: &str, basis_version: u64) -> WriteOutcome {
        let text = text.trim().to_string();
        self.mutate_session(key, basis_version, |session| {
            session.special_instructions = if text.is_empty() { None } else { Some(text) };
        })
    }

    fn touch(&self, key: TableKey) {
        let now = self.clock.now();
        let mut shelf = self.write();
        Self::sweep_locked(&mut shelf, key, now);
        if let Some(session) = shelf.sessions.get_mut(&key) {
            session.last_mutated_at = now;
        }
    }

    fn clear(&self, key: TableKey) {
        let mut shelf = self.write();
        shelf.sessions.remove(&key);
        shelf.markers.remove(&key.table());
    }

    fn mark_cancelled(&self, marker: CancelledOrderMarker) {
        let mut shelf = self.write();
        shelf.markers.insert(marker.table_number, marker);
    }

    fn cancelled_marker(&self, table: TableNumber) -> Option<CancelledOrderMarker> {
        self.read().markers.get(&table).cloned()
    }

    fn sweep(&self, key: TableKey) {
        let now = self.clock.now();
        let mut shelf = self.write();
        Self::sweep_locked(&mut shelf, key, now);
    }
}
