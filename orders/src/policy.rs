//! Order status transition policy.
//!
//! Encodes the legal order-status graph. Every mutating call site — single
//! update, bulk update, kitchen quick action — evaluates this policy locally
//! before any network call; a rejected transition surfaces both the attempted
//! and the current status and makes no call at all.

use crate::{Order, OrderId, OrderNumber, OrderStatus};
use thiserror::Error;

/// A transition the policy refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot move order from '{current}' to '{attempted}'")]
pub struct TransitionRejected {
    /// The status the order currently holds
    pub current: OrderStatus,
    /// The status the caller tried to move to
    pub attempted: OrderStatus,
}

/// Completion refused because the customer still has other active orders on
/// the table.
///
/// Carries the blocking orders so the caller can show which tickets hold the
/// completion up instead of a generic failure.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{customer_name} has {} other active order(s) on this table", blocking.len())]
pub struct CompletionBlocked {
    /// The customer whose sibling orders block completion
    pub customer_name: String,
    /// The orders that must complete or cancel first
    pub blocking: Vec<BlockingOrder>,
}

/// Summary of an order that blocks a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingOrder {
    /// Order identifier
    pub id: OrderId,
    /// Display number for the user-facing message
    pub order_number: OrderNumber,
    /// Status the blocking order is in
    pub status: OrderStatus,
}

/// Whether `next` is a legal successor of `current`.
///
/// Edges: `pending → {preparing, cancelled}`, `preparing → {ready, cancelled}`,
/// `ready → {completed, cancelled}`. `completed` and `cancelled` are terminal.
#[must_use]
pub const fn can_transition(current: OrderStatus, next: OrderStatus) -> bool {
    use OrderStatus::{Cancelled, Completed, Pending, Preparing, Ready};
    matches!(
        (current, next),
        (Pending, Preparing | Cancelled)
            | (Preparing, Ready | Cancelled)
            | (Ready, Completed | Cancelled)
    )
}

/// The legal successors of `current`, in lifecycle order.
///
/// Surfaces use this to render status action menus.
#[must_use]
pub const fn allowed_transitions(current: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::{Cancelled, Completed, Pending, Preparing, Ready};
    match current {
        Pending => &[Preparing, Cancelled],
        Preparing => &[Ready, Cancelled],
        Ready => &[Completed, Cancelled],
        Completed | Cancelled => &[],
    }
}

/// The single forward (non-cancelling) successor of `current`, if any.
///
/// Kitchen quick actions advance along this edge: pending → preparing →
/// ready → completed.
#[must_use]
pub const fn forward(current: OrderStatus) -> Option<OrderStatus> {
    use OrderStatus::{Cancelled, Completed, Pending, Preparing, Ready};
    match current {
        Pending => Some(Preparing),
        Preparing => Some(Ready),
        Ready => Some(Completed),
        Completed | Cancelled => None,
    }
}

/// Validates a transition, producing the user-facing rejection on failure.
///
/// # Errors
///
/// Returns [`TransitionRejected`] naming both statuses when the edge is not
/// in the graph.
pub const fn check_transition(
    current: OrderStatus,
    next: OrderStatus,
) -> Result<(), TransitionRejected> {
    if can_transition(current, next) {
        Ok(())
    } else {
        Err(TransitionRejected {
            current,
            attempted: next,
        })
    }
}

/// Secondary completion guard: refuses to complete `order` while the same
/// customer has other non-terminal orders on the same table.
///
/// The definitive check lives at the service boundary; this local scan exists
/// so surfaces can block the action (and name the blockers) without a round
/// trip when the sibling orders are already loaded.
///
/// # Errors
///
/// Returns [`CompletionBlocked`] listing the sibling orders that must finish
/// first.
pub fn can_complete(order: &Order, all_orders_for_customer: &[Order]) -> Result<(), CompletionBlocked> {
    let blocking: Vec<BlockingOrder> = all_orders_for_customer
        .iter()
        .filter(|sibling| {
            sibling.id != order.id
                && sibling.table_number == order.table_number
                && sibling.customer_name == order.customer_name
                && sibling.is_active()
        })
        .map(|sibling| BlockingOrder {
            id: sibling.id.clone(),
            order_number: sibling.order_number.clone(),
            status: sibling.status,
        })
        .collect();

    if blocking.is_empty() {
        Ok(())
    } else {
        Err(CompletionBlocked {
            customer_name: order.customer_name.clone(),
            blocking,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code can use unwrap
mod tests {
    use super::*;
    use crate::{Money, TableNumber};
    use chrono::Utc;
    use proptest::prelude::*;

    fn order(id: &str, table: u32, customer: &str, status: OrderStatus) -> Order {
        let now = Utc::now();
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

    #[test]
    fn forward_edges_are_legal() {
        use OrderStatus::{Cancelled, Completed, Pending, Preparing, Ready};
        assert!(can_transition(Pending, Preparing));
        assert!(can_transition(Pending, Cancelled));
        assert!(can_transition(Preparing, Ready));
        assert!(can_transition(Preparing, Cancelled));
        assert!(can_transition(Ready, Completed));
        assert!(can_transition(Ready, Cancelled));
    }

    #[test]
    fn terminal_statuses_have_no_outgoing_edges() {
        for next in OrderStatus::ALL {
            assert!(!can_transition(OrderStatus::Completed, next));
            assert!(!can_transition(OrderStatus::Cancelled, next));
        }
        assert!(allowed_transitions(OrderStatus::Completed).is_empty());
        assert!(allowed_transitions(OrderStatus::Cancelled).is_empty());
    }

    #[test]
    fn backward_and_skip_edges_are_rejected() {
        use OrderStatus::{Completed, Pending, Preparing, Ready};
        assert!(!can_transition(Completed, Preparing));
        assert!(!can_transition(Ready, Preparing));
        assert!(!can_transition(Pending, Ready));
        assert!(!can_transition(Pending, Completed));
        assert!(!can_transition(Preparing, Pending));
    }

    #[test]
    fn rejection_names_both_statuses() {
        let err = check_transition(OrderStatus::Completed, OrderStatus::Preparing).unwrap_err();
        assert_eq!(err.current, OrderStatus::Completed);
        assert_eq!(err.attempted, OrderStatus::Preparing);
        let message = err.to_string();
        assert!(message.contains("completed"));
        assert!(message.contains("preparing"));
    }

    #[test]
    fn completion_blocked_by_sibling_active_order() {
        let ready = order("1", 4, "Ana", OrderStatus::Ready);
        let preparing = order("2", 4, "Ana", OrderStatus::Preparing);

        let err = can_complete(&ready, &[ready.clone(), preparing.clone()]).unwrap_err();
        assert_eq!(err.customer_name, "Ana");
        assert_eq!(err.blocking.len(), 1);
        assert_eq!(err.blocking[0].id, preparing.id);
        assert_eq!(err.blocking[0].status, OrderStatus::Preparing);
    }

    #[test]
    fn completion_allowed_when_siblings_are_terminal_or_elsewhere() {
        let ready = order("1", 4, "Ana", OrderStatus::Ready);
        let done = order("2", 4, "Ana", OrderStatus::Completed);
        let other_table = order("3", 9, "Ana", OrderStatus::Preparing);
        let other_customer = order("4", 4, "Ben", OrderStatus::Preparing);

        assert!(can_complete(&ready, &[ready.clone(), done, other_table, other_customer]).is_ok());
    }

    fn any_status() -> impl Strategy<Value = OrderStatus> {
        prop::sample::select(OrderStatus::ALL.to_vec())
    }

    proptest! {
        /// `can_transition` is exactly the six-edge set: legal iff the pair
        /// appears in `allowed_transitions`.
        #[test]
        fn transition_matches_edge_table(current in any_status(), next in any_status()) {
            let legal = allowed_transitions(current).contains(&next);
            prop_assert_eq!(can_transition(current, next), legal);
        }

        /// No transition ever targets the same status it starts from.
        #[test]
        fn no_self_loops(status in any_status()) {
            prop_assert!(!can_transition(status, status));
        }
    }
}
