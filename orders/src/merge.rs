//! Newness classification and ordering-session grouping.
//!
//! When a customer re-scans a table's QR code and adds items, the backend
//! folds them into the existing order. Each item keeps its own `created_at`,
//! so the merged order's item list carries its history: this module turns
//! that history into "new item" highlighting and original-vs-added session
//! groups for the kitchen and admin views.

use crate::OrderItem;
use chrono::{DateTime, Duration, Utc};

/// Default age below which an item is highlighted as new.
pub const NEW_ITEM_THRESHOLD_MINUTES: i64 = 30;

/// Default gap between items that starts a new ordering session.
pub const SESSION_GAP_MINUTES: i64 = 5;

/// Label distinguishing an order's first ordering session from later ones.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionLabel {
    /// The items the order was first placed with
    Original,
    /// Items folded in by a later ordering session
    Added,
}

impl SessionLabel {
    /// Display label used by kitchen/admin views
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Added => "added",
        }
    }
}

/// A cluster of items added within [`SESSION_GAP_MINUTES`] of each other.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderingSession {
    /// Original vs added-later
    pub label: SessionLabel,
    /// Items in this session, ascending by `created_at`
    pub items: Vec<OrderItem>,
}

/// Whether `item` was added less than `threshold_minutes` before `now`.
#[must_use]
pub fn is_new(item: &OrderItem, now: DateTime<Utc>, threshold_minutes: i64) -> bool {
    now.signed_duration_since(item.created_at) < Duration::minutes(threshold_minutes)
}

/// Sorts items for display: new items first (newest first among them), the
/// rest by `created_at` descending.
///
/// Both partitions order by descending `created_at`, so this is a single
/// two-key sort.
pub fn sort_by_newness(items: &mut [OrderItem], now: DateTime<Utc>, threshold_minutes: i64) {
    items.sort_by(|a, b| {
        let a_new = is_new(a, now, threshold_minutes);
        let b_new = is_new(b, now, threshold_minutes);
        b_new
            .cmp(&a_new)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

/// Groups items into time-bounded ordering sessions.
///
/// Items are sorted ascending by `created_at`; a new session starts whenever
/// the gap to the previous item exceeds `gap_minutes`. The first session is
/// labeled [`SessionLabel::Original`], every later one [`SessionLabel::Added`].
#[must_use]
pub fn group_by_session(items: &[OrderItem], gap_minutes: i64) -> Vec<OrderingSession> {
    let mut sorted: Vec<OrderItem> = items.to_vec();
    sorted.sort_by_key(|item| item.created_at);

    let gap = Duration::minutes(gap_minutes);
    let mut sessions: Vec<OrderingSession> = Vec::new();

    for item in sorted {
        let starts_new_session = match sessions.last() {
            None => true,
            Some(session) => session
                .items
                .last()
                .is_none_or(|prev| item.created_at.signed_duration_since(prev.created_at) > gap),
        };

        if starts_new_session {
            let label = if sessions.is_empty() {
                SessionLabel::Original
            } else {
                SessionLabel::Added
            };
            sessions.push(OrderingSession {
                label,
                items: vec![item],
            });
        } else if let Some(session) = sessions.last_mut() {
            session.items.push(item);
        }
    }

    sessions
}

/// Whether the item list spans more than one ordering session — the marker of
/// a merged order in kitchen and admin views.
#[must_use]
pub fn has_multiple_sessions(items: &[OrderItem], gap_minutes: i64) -> bool {
    group_by_session(items, gap_minutes).len() > 1
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::Money;
    use chrono::TimeZone;

    fn item(id: &str, created_at: DateTime<Utc>) -> OrderItem {
        OrderItem {
            id: id.to_string(),
            menu_item_id: format!("menu-{id}"),
            name: format!("Item {id}"),
            quantity: 1,
            unit_price: Money::from_dollars(5),
            total_price: Money::from_dollars(5),
            special_instructions: None,
            created_at,
        }
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, minute, 0).unwrap()
    }

    #[test]
    fn is_new_respects_threshold() {
        let now = at(45);
        assert!(is_new(&item("a", at(20)), now, 30));
        assert!(!is_new(&item("b", at(10)), now, 30));
        // Exactly at the threshold is no longer new
        assert!(!is_new(&item("c", at(15)), now, 30));
    }

    #[test]
    fn sort_by_newness_partitions_then_orders_descending() {
        let now = at(59);
        let mut items = vec![
            item("old-early", at(0)),
            item("new-late", at(55)),
            item("old-late", at(20)),
            item("new-early", at(40)),
        ];
        sort_by_newness(&mut items, now, 30);

        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["new-late", "new-early", "old-late", "old-early"]);
    }

    #[test]
    fn group_by_session_splits_on_gap() {
        let items = vec![
            item("a", at(0)),
            item("b", at(3)),
            item("c", at(20)),
            item("d", at(24)),
        ];
        let sessions = group_by_session(&items, SESSION_GAP_MINUTES);

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].label, SessionLabel::Original);
        assert_eq!(sessions[1].label, SessionLabel::Added);
        assert_eq!(sessions[0].items.len(), 2);
        assert_eq!(sessions[1].items.len(), 2);
        assert_eq!(sessions[1].items[0].id, "c");
    }

    #[test]
    fn group_by_session_single_session_for_tight_items() {
        let items = vec![item("a", at(0)), item("b", at(4)), item("c", at(8))];
        let sessions = group_by_session(&items, SESSION_GAP_MINUTES);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].label, SessionLabel::Original);
        assert!(!has_multiple_sessions(&items, SESSION_GAP_MINUTES));
    }

    #[test]
    fn group_by_session_is_idempotent() {
        let items = vec![
            item("a", at(0)),
            item("b", at(2)),
            item("c", at(30)),
            item("d", at(58)),
        ];
        let first = group_by_session(&items, SESSION_GAP_MINUTES);

        let flattened: Vec<OrderItem> = first
            .iter()
            .flat_map(|session| session.items.clone())
            .collect();
        let second = group_by_session(&flattened, SESSION_GAP_MINUTES);

        assert_eq!(first, second);
    }

    #[test]
    fn empty_item_list_has_no_sessions() {
        assert!(group_by_session(&[], SESSION_GAP_MINUTES).is_empty());
        assert!(!has_multiple_sessions(&[], SESSION_GAP_MINUTES));
    }
}
