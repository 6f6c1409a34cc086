//! End-to-end merge flow: a customer places an order, re-scans the same
//! table within the session window, adds another item, and the backend folds
//! it into the existing order instead of opening a new one.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tableflow_core::environment::Clock;
use tableflow_orders::merge::{SESSION_GAP_MINUTES, group_by_session, has_multiple_sessions};
use tableflow_orders::{
    Money, Order, OrderId, OrderItem, OrderNumber, OrderStatus, TableNumber,
};
use tableflow_runtime::Store;
use tableflow_session::{CartEntry, InMemorySessionRepository, SessionRepository, TableKey};
use tableflow_surfaces::customer::{
    CustomerAction, CustomerEnvironment, CustomerReducer, CustomerState, CustomerView,
};
use tableflow_surfaces::Notice;
use tableflow_testing::SteppingClock;
use tableflow_testing::fakes::ScriptedOrderApi;
use tableflow_api::PlacedOrder;

const TABLE: TableNumber = TableNumber::new(7);

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn entry(menu_item_id: &str, dollars: i64, quantity: u32) -> CartEntry {
    CartEntry {
        menu_item_id: menu_item_id.to_string(),
        name: menu_item_id.to_uppercase(),
        price: Money::from_dollars(dollars),
        quantity,
        special_requests: None,
    }
}

fn item(id: &str, menu_item_id: &str, quantity: u32, created_at: DateTime<Utc>) -> OrderItem {
    OrderItem {
        id: id.to_string(),
        menu_item_id: menu_item_id.to_string(),
        name: menu_item_id.to_uppercase(),
        quantity,
        unit_price: Money::from_dollars(10),
        total_price: Money::from_dollars(10).times(quantity),
        special_instructions: None,
        created_at,
    }
}

fn order_with_items(items: Vec<OrderItem>, created_at: DateTime<Utc>) -> Order {
    let total = items.iter().map(|i| i.total_price).sum();
    Order {
        id: OrderId::from("ord-1"),
        order_number: OrderNumber::new("#41".to_string()),
        table_number: TABLE,
        customer_name: "Ana".to_string(),
        status: OrderStatus::Pending,
        items,
        total_amount: total,
        created_at,
        updated_at: created_at,
    }
}

#[tokio::test]
async fn rescan_merges_new_items_into_existing_order() {
    let clock = SteppingClock::starting_at(start_time());
    let api = Arc::new(ScriptedOrderApi::new());
    let sessions = Arc::new(InMemorySessionRepository::new(
        Arc::clone(&clock) as Arc<dyn Clock>
    ));
    let key = TableKey::for_table(TABLE);

    let env = CustomerEnvironment::new(
        Arc::clone(&clock) as Arc<dyn Clock>,
        Arc::clone(&api) as Arc<dyn tableflow_api::OrderApi>,
        Arc::clone(&sessions) as Arc<dyn SessionRepository>,
    );

    // First visit: fill the cart as a new customer and place the order
    let store = Store::new(
        CustomerState::on_load(TABLE, None, None),
        CustomerReducer::new(),
        env.clone(),
    );
    store
        .send(CustomerAction::AddToCart(entry("ramen", 10, 2)))
        .await
        .unwrap();
    store
        .send(CustomerAction::AddToCart(entry("gyoza", 10, 1)))
        .await
        .unwrap();
    store
        .send(CustomerAction::SetName("Ana".to_string()))
        .await
        .unwrap();

    let first_items = vec![
        item("i1", "ramen", 2, clock.now()),
        item("i2", "gyoza", 1, clock.now()),
    ];
    api.script_create(Ok(PlacedOrder {
        order: order_with_items(first_items, clock.now()),
        merged: false,
    }));

    let placed = store
        .send_and_wait_for(
            CustomerAction::PlaceOrder,
            |action| {
                matches!(
                    action,
                    CustomerAction::OrderPlaced(_) | CustomerAction::PlaceFailed(_)
                )
            },
            Duration::from_secs(1),
        )
        .await
        .unwrap();
    assert!(matches!(
        placed,
        CustomerAction::OrderPlaced(PlacedOrder { merged: false, .. })
    ));

    assert_eq!(store.state(|s| s.view).await, CustomerView::Tracking);
    assert!(store.state(|s| s.cart.is_empty()).await);

    // The session survived the placement: the name is still there for the
    // next scan, the cart is not
    let session = sessions.get(key).expect("session should survive placement");
    assert_eq!(session.customer_name.as_deref(), Some("Ana"));
    assert!(session.cart.is_empty());

    // Ten minutes later the customer re-scans the same QR code and resumes
    clock.advance(ChronoDuration::minutes(10));
    let resumed_session = sessions.get(key).unwrap();
    let resumed = CustomerState::on_load(
        TABLE,
        Some(&resumed_session),
        Some(OrderId::from("ord-1")),
    );
    assert_eq!(resumed.view, CustomerView::Tracking);

    let store = Store::new(resumed, CustomerReducer::new(), env);
    store.send(CustomerAction::ContinueOrdering).await.unwrap();
    store
        .send(CustomerAction::AddToCart(entry("mochi", 10, 1)))
        .await
        .unwrap();

    // The backend recognizes the active order and merges; item timestamps
    // are preserved, so the added item lands in its own session
    let merged_items = vec![
        item("i1", "ramen", 2, start_time()),
        item("i2", "gyoza", 1, start_time()),
        item("i3", "mochi", 1, clock.now()),
    ];
    api.script_create(Ok(PlacedOrder {
        order: order_with_items(merged_items.clone(), start_time()),
        merged: true,
    }));

    let placed = store
        .send_and_wait_for(
            CustomerAction::PlaceOrder,
            |action| {
                matches!(
                    action,
                    CustomerAction::OrderPlaced(_) | CustomerAction::PlaceFailed(_)
                )
            },
            Duration::from_secs(1),
        )
        .await
        .unwrap();
    assert!(matches!(
        placed,
        CustomerAction::OrderPlaced(PlacedOrder { merged: true, .. })
    ));

    // Merged placement still tracks, but announces "items added" instead of
    // a new order
    assert_eq!(store.state(|s| s.view).await, CustomerView::Tracking);
    match store.state(|s| s.notice.clone()).await {
        Some(Notice::Info { message }) => assert!(message.contains("added")),
        other => panic!("expected items-added notice, got {other:?}"),
    }

    // The merged order reads as two ordering sessions, with the added item
    // alone in the later one
    assert!(has_multiple_sessions(&merged_items, SESSION_GAP_MINUTES));
    let grouped = group_by_session(&merged_items, SESSION_GAP_MINUTES);
    assert_eq!(grouped.len(), 2);
    assert_eq!(grouped[1].items.len(), 1);
    assert_eq!(grouped[1].items[0].menu_item_id, "mochi");
}
