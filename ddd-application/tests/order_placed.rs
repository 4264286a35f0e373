use anyhow::Result as AnyResult;
use async_trait::async_trait;
use ddd_application::command::Command;
use ddd_application::command_bus::CommandBus;
use ddd_application::command_handler::CommandHandler;
use ddd_application::context::AppContext;
use ddd_application::domain_event_handler::DomainEventHandler;
use ddd_application::error::AppError;
use ddd_application::{
    DomainEventDispatcher, DomainEventRegistry, EventDispatchTable, HandlerCollection,
    InMemoryCommandBus,
};
use ddd_domain::domain_event::{DomainEvent, DomainEventPublisher};
use ddd_domain::error::{DomainError, DomainResult};
use ddd_macros::domain_event;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[domain_event(name = "order.placed")]
struct OrderPlaced {
    order_id: Uuid,
    total: i64,
}

#[domain_event(name = "order.cancelled")]
struct OrderCancelled {
    order_id: Uuid,
}

#[derive(Default)]
struct CountPlaced {
    seen: AtomicUsize,
}

#[async_trait]
impl DomainEventHandler<OrderPlaced> for CountPlaced {
    async fn handle(&self, _: &OrderPlaced, _: &CancellationToken) -> DomainResult<()> {
        self.seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct RejectLargeOrders;

#[async_trait]
impl DomainEventHandler<OrderPlaced> for RejectLargeOrders {
    async fn handle(&self, event: &OrderPlaced, _: &CancellationToken) -> DomainResult<()> {
        if event.total > 1_000 {
            return Err(DomainError::EventHandler {
                handler: self.handler_name().to_string(),
                reason: format!("order {} exceeds credit limit", event.order_id),
            });
        }
        Ok(())
    }
}

struct PlaceOrder {
    total: i64,
}

impl Command for PlaceOrder {
    const NAME: &'static str = "PlaceOrder";
    type Output = Uuid;
}

/// 下单后通过发布端口通知领域事件
struct PlaceOrderHandler {
    publisher: Arc<dyn DomainEventPublisher>,
}

#[async_trait]
impl CommandHandler<PlaceOrder> for PlaceOrderHandler {
    async fn handle(&self, ctx: &AppContext, cmd: PlaceOrder) -> Result<Uuid, AppError> {
        let order_id = Uuid::new_v4();
        let events: Vec<Arc<dyn DomainEvent>> = vec![Arc::new(OrderPlaced {
            meta: Default::default(),
            order_id,
            total: cmd.total,
        })];
        self.publisher
            .publish_all(&events, ctx.cancellation())
            .await?;
        Ok(order_id)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn setup() -> (DomainEventDispatcher, Arc<CountPlaced>, Arc<DomainEventRegistry>) {
    let registry = Arc::new(DomainEventRegistry::new());
    registry.register::<OrderPlaced>().unwrap();
    registry.freeze();

    let counter = Arc::new(CountPlaced::default());
    let handlers = Arc::new(HandlerCollection::new());
    handlers
        .add_shared_event_handler::<OrderPlaced>(counter.clone())
        .add_event_handler::<OrderPlaced, _>(RejectLargeOrders);

    let dispatcher = DomainEventDispatcher::new(registry.clone(), handlers);
    (dispatcher, counter, registry)
}

#[tokio::test]
async fn handlers_run_in_order_and_failure_is_reported() -> AnyResult<()> {
    init_tracing();
    let (dispatcher, counter, _) = setup();
    let cancel = CancellationToken::new();

    let large = OrderPlaced {
        meta: Default::default(),
        order_id: Uuid::new_v4(),
        total: 5_000,
    };
    let err = dispatcher.dispatch_dyn(&large, &cancel).await.unwrap_err();
    assert!(matches!(err, DomainError::EventHandler { .. }));
    assert_eq!(counter.seen.load(Ordering::SeqCst), 1);

    let small: Arc<dyn DomainEvent> = Arc::new(OrderPlaced {
        meta: Default::default(),
        order_id: Uuid::new_v4(),
        total: 10,
    });
    dispatcher.dispatch_all(&[small], &cancel).await?;
    assert_eq!(counter.seen.load(Ordering::SeqCst), 2);
    Ok(())
}

#[tokio::test]
async fn registry_rejects_late_registration_and_unknown_events() -> AnyResult<()> {
    init_tracing();
    let (dispatcher, counter, registry) = setup();
    let cancel = CancellationToken::new();

    assert!(matches!(
        registry.register::<OrderCancelled>(),
        Err(DomainError::RegistryFrozen { .. })
    ));
    assert_eq!(registry.registered_event_types().len(), 1);

    let cancelled = OrderCancelled {
        meta: Default::default(),
        order_id: Uuid::new_v4(),
    };
    assert_eq!(cancelled.event_type(), "order.cancelled");
    let err = dispatcher.dispatch_dyn(&cancelled, &cancel).await.unwrap_err();
    assert!(matches!(err, DomainError::UnregisteredEvent { .. }));
    assert_eq!(counter.seen.load(Ordering::SeqCst), 0);
    Ok(())
}

#[tokio::test]
async fn command_handler_publishes_through_the_dispatcher() -> AnyResult<()> {
    init_tracing();
    let (dispatcher, counter, _) = setup();
    let bus = InMemoryCommandBus::new();
    bus.register::<PlaceOrder, _>(Arc::new(PlaceOrderHandler {
        publisher: Arc::new(dispatcher),
    }))?;

    let ctx = AppContext::builder()
        .correlation_id("req-1".to_string())
        .build();
    let order_id = bus.dispatch(&ctx, PlaceOrder { total: 99 }).await?;
    assert!(!order_id.is_nil());
    assert_eq!(counter.seen.load(Ordering::SeqCst), 1);

    let err = bus
        .dispatch(&ctx, PlaceOrder { total: 10_000 })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Domain(DomainError::EventHandler { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn cancelled_context_stops_before_any_handler() -> AnyResult<()> {
    init_tracing();
    let (dispatcher, counter, _) = setup();
    let ctx = AppContext::default();
    ctx.cancellation().cancel();

    let event = OrderPlaced {
        meta: Default::default(),
        order_id: Uuid::new_v4(),
        total: 1,
    };
    let err = dispatcher
        .dispatch(&event, ctx.cancellation())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Cancelled));
    assert_eq!(counter.seen.load(Ordering::SeqCst), 0);
    Ok(())
}
