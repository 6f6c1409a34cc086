//! Cross-surface synchronization: one push event updates every subscribed
//! surface, stale updates never regress a locally newer status, and a late
//! REST response loses to a newer push.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tableflow_core::environment::Clock;
use tableflow_orders::events::{RealtimeEvent, Room, StatusUpdate};
use tableflow_orders::{Money, Order, OrderId, OrderNumber, OrderStatus, TableNumber};
use tableflow_runtime::Store;
use tableflow_session::{InMemorySessionRepository, SessionRepository};
use tableflow_surfaces::admin::{AdminAction, AdminEnvironment, AdminReducer, AdminState};
use tableflow_surfaces::customer::{
    CustomerAction, CustomerEnvironment, CustomerReducer, CustomerState,
};
use tableflow_surfaces::kitchen::{
    KitchenAction, KitchenEnvironment, KitchenReducer, KitchenState,
};
use tableflow_surfaces::spawn_event_pump;
use tableflow_testing::fakes::{FakeChannel, ScriptedOrderApi};
use tableflow_testing::test_clock;
use tableflow_channel::RealtimeChannel;

const TABLE: TableNumber = TableNumber::new(4);

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn order(id: &str, status: OrderStatus) -> Order {
    Order {
        id: OrderId::from(id),
        order_number: OrderNumber::new(format!("#{id}")),
        table_number: TABLE,
        customer_name: "Ana".to_string(),
        status,
        items: vec![],
        total_amount: Money::from_dollars(15),
        created_at: base_time(),
        updated_at: base_time(),
    }
}

fn status_push(id: &str, status: OrderStatus, minutes: i64) -> RealtimeEvent {
    RealtimeEvent::OrderStatusUpdate(StatusUpdate {
        order_id: OrderId::from(id),
        status,
        timestamp: base_time() + ChronoDuration::minutes(minutes),
        table_number: TABLE,
    })
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tableflow=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Polls until the closure returns true or the deadline passes.
async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if check().await {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn late_rest_response_never_regresses_a_newer_push() {
    init_tracing();
    let api = Arc::new(ScriptedOrderApi::new());
    let env = KitchenEnvironment::new(
        Arc::new(test_clock()),
        Arc::clone(&api) as Arc<dyn tableflow_api::OrderApi>,
    );
    let store = Store::new(KitchenState::default(), KitchenReducer::new(), env);

    store
        .send(KitchenAction::Loaded(vec![order("5", OrderStatus::Preparing)]))
        .await
        .unwrap();

    // A push already advanced #5 to ready
    store
        .send(KitchenAction::Remote(status_push("5", OrderStatus::Ready, 10)))
        .await
        .unwrap();

    // The late response of an earlier update call still says preparing
    let mut late = order("5", OrderStatus::Preparing);
    late.updated_at = base_time() + ChronoDuration::minutes(5);
    store
        .send(KitchenAction::TransitionAccepted(late))
        .await
        .unwrap();

    let status = store
        .state(|s| s.book.get(&OrderId::from("5")).map(|o| o.status))
        .await
        .unwrap();
    assert_eq!(status, OrderStatus::Ready);
}

#[tokio::test]
async fn one_push_updates_every_subscribed_surface() {
    init_tracing();
    let channel = Arc::new(FakeChannel::new());
    channel.connect().await.unwrap();
    channel.join(Room::Kitchen).await.unwrap();
    channel.join(Room::Admin).await.unwrap();
    channel.join(Room::Table(TABLE)).await.unwrap();

    let clock = Arc::new(test_clock());
    let api = Arc::new(ScriptedOrderApi::new());
    let sessions = Arc::new(InMemorySessionRepository::new(
        Arc::clone(&clock) as Arc<dyn Clock>
    ));

    let kitchen = Store::new(
        KitchenState::default(),
        KitchenReducer::new(),
        KitchenEnvironment::new(
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::clone(&api) as Arc<dyn tableflow_api::OrderApi>,
        ),
    );
    let admin = Store::new(
        AdminState::default(),
        AdminReducer::new(),
        AdminEnvironment::new(
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::clone(&api) as Arc<dyn tableflow_api::OrderApi>,
        ),
    );
    let customer = Store::new(
        CustomerState::on_load(TABLE, None, Some(OrderId::from("9"))),
        CustomerReducer::new(),
        CustomerEnvironment::new(
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::clone(&api) as Arc<dyn tableflow_api::OrderApi>,
            Arc::clone(&sessions) as Arc<dyn SessionRepository>,
        ),
    );

    // Every surface starts from the same loaded order
    kitchen
        .send(KitchenAction::Loaded(vec![order("9", OrderStatus::Pending)]))
        .await
        .unwrap();
    admin
        .send(AdminAction::Loaded(vec![order("9", OrderStatus::Pending)]))
        .await
        .unwrap();
    customer
        .send(CustomerAction::OrdersLoaded(vec![order(
            "9",
            OrderStatus::Pending,
        )]))
        .await
        .unwrap();

    // Subscribe all three surfaces before the push goes out
    let _kitchen_pump = spawn_event_pump(channel.events(), kitchen.clone(), KitchenAction::Remote);
    let _admin_pump = spawn_event_pump(channel.events(), admin.clone(), AdminAction::Remote);
    let _customer_pump =
        spawn_event_pump(channel.events(), customer.clone(), CustomerAction::Remote);

    channel.push(&status_push("9", OrderStatus::Preparing, 3));

    let id = OrderId::from("9");
    eventually(|| {
        let kitchen = kitchen.clone();
        let id = id.clone();
        async move {
            kitchen
                .state(|s| s.book.get(&id).map(|o| o.status))
                .await
                == Some(OrderStatus::Preparing)
        }
    })
    .await;
    eventually(|| {
        let admin = admin.clone();
        let id = id.clone();
        async move {
            admin.state(|s| s.book.get(&id).map(|o| o.status)).await
                == Some(OrderStatus::Preparing)
        }
    })
    .await;
    eventually(|| {
        let customer = customer.clone();
        let id = id.clone();
        async move {
            customer
                .state(|s| s.book.get(&id).map(|o| o.status))
                .await
                == Some(OrderStatus::Preparing)
        }
    })
    .await;

    // A duplicate of the same push is a no-op everywhere
    channel.push(&status_push("9", OrderStatus::Preparing, 3));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        kitchen.state(|s| s.book.get(&id).map(|o| o.status)).await,
        Some(OrderStatus::Preparing)
    );
}
