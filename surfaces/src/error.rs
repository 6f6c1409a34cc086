//! Error taxonomy and user-facing notices.
//!
//! Four failure classes, each with its own user-visible behavior:
//!
//! 1. **Policy violations** — resolved client-side, no network call, not
//!    retried
//! 2. **Transport failures** — surfaced with a retry affordance (the realtime
//!    channel retries itself; one-shot REST calls do not)
//! 3. **Data integrity failures** — treated as absent state, logged, never a
//!    crash
//! 4. **Conflict responses** — surfaced with the structured blocker detail

use tableflow_api::ApiError;
use tableflow_channel::ChannelError;
use tableflow_orders::policy::{BlockingOrder, CompletionBlocked, TransitionRejected};
use tableflow_orders::{OrderNumber, OrderStatus};
use thiserror::Error;

/// Everything that can go wrong while keeping an order in sync.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Illegal status transition (policy class 1)
    #[error(transparent)]
    Transition(#[from] TransitionRejected),

    /// Completion blocked by sibling active orders, detected locally
    /// (policy class 1)
    #[error(transparent)]
    Completion(#[from] CompletionBlocked),

    /// Backend call failed (classes 2–4, by variant)
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Realtime channel failed (class 2)
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Summary of an order blocking a completion, ready for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockingSummary {
    /// Display number of the blocking order
    pub order_number: OrderNumber,
    /// Its current status
    pub status: OrderStatus,
}

impl From<BlockingOrder> for BlockingSummary {
    fn from(order: BlockingOrder) -> Self {
        Self {
            order_number: order.order_number,
            status: order.status,
        }
    }
}

/// A dismissible user-facing notice.
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    /// Informational ("order placed", "items added to your order")
    Info {
        /// Message shown to the user
        message: String,
    },
    /// A local policy rejection; nothing was sent
    Rejected {
        /// Message naming the attempted and current status
        message: String,
    },
    /// A transient failure the user may retry
    Transient {
        /// Message shown next to the retry affordance
        message: String,
    },
    /// Completion blocked; shows which orders hold it up
    Blocked {
        /// Customer whose orders block the completion
        customer_name: String,
        /// The blocking orders
        blocking: Vec<BlockingSummary>,
    },
    /// Terminal failure; the surface redirects to a safe fallback view
    Fatal {
        /// Message shown before redirecting
        message: String,
    },
}

impl Notice {
    /// Informational notice
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::Info {
            message: message.into(),
        }
    }

    /// Classifies an error into the notice the surface shows.
    #[must_use]
    pub fn from_error(error: &SyncError) -> Self {
        match error {
            SyncError::Transition(rejected) => Self::Rejected {
                message: rejected.to_string(),
            },
            SyncError::Completion(blocked) => Self::Blocked {
                customer_name: blocked.customer_name.clone(),
                blocking: blocked
                    .blocking
                    .iter()
                    .cloned()
                    .map(BlockingSummary::from)
                    .collect(),
            },
            SyncError::Api(ApiError::CompletionBlocked(conflict)) => Self::Blocked {
                customer_name: conflict.customer_name.clone(),
                blocking: conflict
                    .active_orders
                    .iter()
                    .map(|order| BlockingSummary {
                        order_number: order.order_number.clone(),
                        status: order.status,
                    })
                    .collect(),
            },
            SyncError::Api(ApiError::NotFound { entity }) => Self::Fatal {
                message: format!("{entity} not found"),
            },
            SyncError::Api(ApiError::Transport(message))
            | SyncError::Api(ApiError::InvalidResponse(message)) => Self::Transient {
                message: message.clone(),
            },
            SyncError::Api(ApiError::Rejected { message, .. }) => Self::Transient {
                message: message.clone(),
            },
            SyncError::Channel(error) => Self::Transient {
                message: error.to_string(),
            },
        }
    }

    /// Whether the notice represents a terminal failure (redirect to a safe
    /// view rather than rendering a broken state).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}

#[cfg(test)]
#[allow(clippy::panic)] // Test code can panic
mod tests {
    use super::*;
    use tableflow_api::CompletionConflict;

    #[test]
    fn transition_rejection_becomes_rejected_notice() {
        let error = SyncError::from(TransitionRejected {
            current: OrderStatus::Completed,
            attempted: OrderStatus::Preparing,
        });
        let notice = Notice::from_error(&error);
        assert!(matches!(notice, Notice::Rejected { .. }));
    }

    #[test]
    fn api_conflict_keeps_structured_blockers() {
        let error = SyncError::from(ApiError::CompletionBlocked(CompletionConflict {
            customer_name: "Ana".to_string(),
            active_orders: vec![],
        }));
        match Notice::from_error(&error) {
            Notice::Blocked { customer_name, .. } => assert_eq!(customer_name, "Ana"),
            other => panic!("expected blocked notice, got {other:?}"),
        }
    }

    #[test]
    fn not_found_is_fatal() {
        let error = SyncError::from(ApiError::NotFound {
            entity: "order".to_string(),
        });
        assert!(Notice::from_error(&error).is_fatal());
    }
}
