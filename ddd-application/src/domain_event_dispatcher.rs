use crate::domain_event_registry::{EventDispatchTable, dispatch_to_handlers};
use crate::handler_scope::HandlerScope;
use async_trait::async_trait;
use ddd_domain::domain_event::{DomainEvent, DomainEventPublisher};
use ddd_domain::error::{DomainError, DomainResult};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// 领域事件分发器
///
/// - `dispatch::<E>`：类型化路径，直接解析 `E` 的处理器，无需预先注册；
/// - `dispatch_dyn`：类型擦除路径，经注册表查找分发函数，未注册返回 `UnregisteredEvent`；
/// - `dispatch_all`：按顺序逐个走类型擦除路径，首个失败即中止后续事件。
///
/// 同一事件的处理器按解析作用域返回的顺序（通常为注册顺序）依次调用。
#[derive(Clone)]
pub struct DomainEventDispatcher {
    table: Arc<dyn EventDispatchTable>,
    scope: Arc<dyn HandlerScope>,
}

impl DomainEventDispatcher {
    pub fn new(table: Arc<dyn EventDispatchTable>, scope: Arc<dyn HandlerScope>) -> Self {
        Self { table, scope }
    }

    pub async fn dispatch<E: DomainEvent>(
        &self,
        event: &E,
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        dispatch_to_handlers(event, self.scope.as_ref(), cancel).await
    }

    pub async fn dispatch_dyn(
        &self,
        event: &dyn DomainEvent,
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        let Some(dispatch) = self.table.try_get_dispatcher(event.as_any().type_id()) else {
            return Err(DomainError::UnregisteredEvent {
                event_type: event.event_type(),
            });
        };
        tracing::debug!(
            event_type = event.event_type(),
            event_id = %event.event_id(),
            "dispatching domain event"
        );
        dispatch(event, self.scope.as_ref(), cancel).await
    }

    pub async fn dispatch_all(
        &self,
        events: &[Arc<dyn DomainEvent>],
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        for event in events {
            self.dispatch_dyn(&**event, cancel).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl DomainEventPublisher for DomainEventDispatcher {
    async fn publish_all(
        &self,
        events: &[Arc<dyn DomainEvent>],
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        self.dispatch_all(events, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_event_handler::DomainEventHandler;
    use crate::domain_event_registry::{DomainEventRegistry, DomainEventRegistryBuilder};
    use crate::handler_scope::HandlerCollection;
    use chrono::{DateTime, Utc};
    use ddd_domain::domain_event::EventMeta;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Debug, Default)]
    struct ItemShipped {
        meta: EventMeta,
        sku: &'static str,
    }

    impl DomainEvent for ItemShipped {
        fn event_id(&self) -> Uuid {
            self.meta.event_id()
        }
        fn occurred_at(&self) -> DateTime<Utc> {
            self.meta.occurred_at()
        }
    }

    #[derive(Debug, Default)]
    struct Unknown {
        meta: EventMeta,
    }

    impl DomainEvent for Unknown {
        fn event_id(&self) -> Uuid {
            self.meta.event_id()
        }
        fn occurred_at(&self) -> DateTime<Utc> {
            self.meta.occurred_at()
        }
    }

    type Log = Arc<Mutex<Vec<String>>>;

    struct Recording {
        name: &'static str,
        log: Log,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl DomainEventHandler<ItemShipped> for Recording {
        async fn handle(&self, e: &ItemShipped, _c: &CancellationToken) -> DomainResult<()> {
            if self.fail_on == Some(e.sku) {
                return Err(DomainError::EventHandler {
                    handler: self.name.to_string(),
                    reason: format!("cannot ship {}", e.sku),
                });
            }
            self.log.lock().unwrap().push(format!("{}:{}", self.name, e.sku));
            Ok(())
        }
        fn handler_name(&self) -> &'static str {
            self.name
        }
    }

    fn setup(fail_on: Option<&'static str>) -> (DomainEventDispatcher, Log) {
        let log = Log::default();
        let scope = HandlerCollection::new();
        scope
            .add_event_handler::<ItemShipped, _>(Recording {
                name: "h1",
                log: log.clone(),
                fail_on: None,
            })
            .add_event_handler::<ItemShipped, _>(Recording {
                name: "h2",
                log: log.clone(),
                fail_on,
            })
            .add_event_handler::<ItemShipped, _>(Recording {
                name: "h3",
                log: log.clone(),
                fail_on: None,
            });

        let mut builder = DomainEventRegistryBuilder::new();
        builder.register::<ItemShipped>();
        let dispatcher = DomainEventDispatcher::new(Arc::new(builder.freeze()), Arc::new(scope));
        (dispatcher, log)
    }

    fn shipped(sku: &'static str) -> Arc<dyn DomainEvent> {
        Arc::new(ItemShipped {
            sku,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn handlers_run_in_registration_order() {
        let (dispatcher, log) = setup(None);
        dispatcher
            .dispatch_dyn(&*shipped("a"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["h1:a", "h2:a", "h3:a"]);
    }

    #[tokio::test]
    async fn first_failure_stops_remaining_handlers() {
        let (dispatcher, log) = setup(Some("bad"));
        let err = dispatcher
            .dispatch_dyn(&*shipped("bad"), &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            DomainError::EventHandler { handler, .. } => assert_eq!(handler, "h2"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(*log.lock().unwrap(), vec!["h1:bad"]);
    }

    #[tokio::test]
    async fn batch_is_sequential_and_fail_fast() {
        let (dispatcher, log) = setup(Some("bad"));
        let events = vec![shipped("a"), shipped("bad"), shipped("c")];
        let result = dispatcher
            .dispatch_all(&events, &CancellationToken::new())
            .await;
        assert!(result.is_err());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["h1:a", "h2:a", "h3:a", "h1:bad"]
        );
    }

    #[tokio::test]
    async fn unregistered_type_fails_on_erased_path() {
        let (dispatcher, _) = setup(None);
        let event: Arc<dyn DomainEvent> = Arc::new(Unknown::default());
        let err = dispatcher
            .dispatch_dyn(&*event, &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            DomainError::UnregisteredEvent { event_type } => {
                assert!(event_type.ends_with("Unknown"))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn typed_path_bypasses_registry() {
        let log = Log::default();
        let scope = HandlerCollection::new();
        scope.add_event_handler::<ItemShipped, _>(Recording {
            name: "only",
            log: log.clone(),
            fail_on: None,
        });
        let dispatcher =
            DomainEventDispatcher::new(Arc::new(DomainEventRegistry::new()), Arc::new(scope));

        let event = ItemShipped {
            sku: "typed",
            ..Default::default()
        };
        dispatcher
            .dispatch(&event, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["only:typed"]);
    }

    #[tokio::test]
    async fn cancellation_is_checked_before_each_handler() {
        let (dispatcher, log) = setup(None);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = dispatcher
            .dispatch_dyn(&*shipped("a"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Cancelled));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn publisher_seam_dispatches_batch() {
        let (dispatcher, log) = setup(None);
        let publisher: Arc<dyn DomainEventPublisher> = Arc::new(dispatcher);
        publisher
            .publish_all(&[shipped("x")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(log.lock().unwrap().len(), 3);
    }
}
