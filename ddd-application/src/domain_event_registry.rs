//! 领域事件注册表
//!
//! 在启动阶段把“事件类型 -> 分发函数”登记下来：分发函数在注册时对具体事件类型
//! 单态化，运行期只需按 `TypeId` 查表，不依赖任何运行时反射。
//!
//! 生命周期分两段：
//! - 可变阶段：[`DomainEventRegistryBuilder`]，允许注册，同一类型重复注册以最后一次为准；
//! - 冻结阶段：[`FrozenEventRegistry`]，不可变、可无锁并发读取。
//!
//! [`DomainEventRegistry`] 是两段式的生命周期句柄（进程级实例见 [`DomainEventRegistry::global`]）：
//! 冻结后再注册返回 `RegistryFrozen`；冻结前的查询会基于当前登记内容即时构建只读视图。
//!
use crate::domain_event_handler::DomainEventHandler;
use crate::handler_scope::{HandlerScope, HandlerScopeExt};
use ddd_domain::domain_event::DomainEvent;
use ddd_domain::error::{DomainError, DomainResult};
use futures_core::future::BoxFuture;
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tokio_util::sync::CancellationToken;

/// 类型擦除后的分发函数
pub type EventDispatchFn = Arc<
    dyn for<'a> Fn(
            &'a dyn DomainEvent,
            &'a dyn HandlerScope,
            &'a CancellationToken,
        ) -> BoxFuture<'a, DomainResult<()>>
        + Send
        + Sync,
>;

/// 按事件类型查找分发函数的只读表
pub trait EventDispatchTable: Send + Sync {
    fn try_get_dispatcher(&self, event_type: TypeId) -> Option<EventDispatchFn>;

    /// 已注册事件类型名（按名称排序，用于诊断）
    fn registered_event_types(&self) -> Vec<&'static str>;
}

#[derive(Clone)]
struct Registration {
    event_type: &'static str,
    dispatch: EventDispatchFn,
}

/// 按注册顺序依次调用事件 `E` 的全部处理器，首个失败即中止
///
/// 每个处理器调用前检查取消信号；失败时记录事件类型与处理器名称后原样返回错误。
pub async fn dispatch_to_handlers<E: DomainEvent>(
    event: &E,
    scope: &dyn HandlerScope,
    cancel: &CancellationToken,
) -> DomainResult<()> {
    let handlers: Vec<Arc<dyn DomainEventHandler<E>>> = scope.event_handlers::<E>();
    for handler in handlers {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }
        tracing::trace!(
            event_type = event.event_type(),
            handler = handler.handler_name(),
            "invoking domain event handler"
        );
        if let Err(error) = handler.handle(event, cancel).await {
            tracing::error!(
                event_type = event.event_type(),
                handler = handler.handler_name(),
                %error,
                "domain event handler failed"
            );
            return Err(error);
        }
    }
    Ok(())
}

fn dispatch_erased<'a, E: DomainEvent>(
    event: &'a dyn DomainEvent,
    scope: &'a dyn HandlerScope,
    cancel: &'a CancellationToken,
) -> BoxFuture<'a, DomainResult<()>> {
    Box::pin(async move {
        let event = event
            .downcast_ref::<E>()
            .ok_or_else(|| DomainError::TypeMismatch {
                expected: type_name::<E>(),
                found: event.event_type(),
            })?;
        dispatch_to_handlers(event, scope, cancel).await
    })
}

/// 可变阶段的注册表
#[derive(Default)]
pub struct DomainEventRegistryBuilder {
    entries: HashMap<TypeId, Registration>,
}

impl DomainEventRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记事件类型 `E`；已登记时覆盖
    pub fn register<E: DomainEvent>(&mut self) -> &mut Self {
        let dispatch: EventDispatchFn = Arc::new(dispatch_erased::<E>);
        let replaced = self
            .entries
            .insert(
                TypeId::of::<E>(),
                Registration {
                    event_type: type_name::<E>(),
                    dispatch,
                },
            )
            .is_some();
        tracing::debug!(event_type = type_name::<E>(), replaced, "domain event registered");
        self
    }

    pub fn is_registered<E: DomainEvent>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<E>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 结束注册，得到不可变的注册表
    pub fn freeze(self) -> FrozenEventRegistry {
        tracing::debug!(event_types = self.entries.len(), "domain event registry frozen");
        FrozenEventRegistry {
            entries: self.entries,
        }
    }

    fn snapshot(&self) -> FrozenEventRegistry {
        FrozenEventRegistry {
            entries: self.entries.clone(),
        }
    }
}

/// 冻结后的注册表
#[derive(Clone, Default)]
pub struct FrozenEventRegistry {
    entries: HashMap<TypeId, Registration>,
}

impl FrozenEventRegistry {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl EventDispatchTable for FrozenEventRegistry {
    fn try_get_dispatcher(&self, event_type: TypeId) -> Option<EventDispatchFn> {
        self.entries.get(&event_type).map(|r| r.dispatch.clone())
    }

    fn registered_event_types(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.values().map(|r| r.event_type).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for FrozenEventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrozenEventRegistry")
            .field("event_types", &self.registered_event_types())
            .finish()
    }
}

/// 注册表生命周期句柄：可变 -> 冻结（终态）
pub struct DomainEventRegistry {
    // 冻结时取走构建器，之后保持为 None
    pending: Mutex<Option<DomainEventRegistryBuilder>>,
    frozen: OnceLock<FrozenEventRegistry>,
}

impl Default for DomainEventRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainEventRegistry {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Some(DomainEventRegistryBuilder::new())),
            frozen: OnceLock::new(),
        }
    }

    /// 进程级注册表
    pub fn global() -> &'static DomainEventRegistry {
        static GLOBAL: OnceLock<DomainEventRegistry> = OnceLock::new();
        GLOBAL.get_or_init(DomainEventRegistry::new)
    }

    /// 登记事件类型 `E`；冻结后调用返回 `RegistryFrozen`
    pub fn register<E: DomainEvent>(&self) -> DomainResult<()> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match pending.as_mut() {
            Some(builder) => {
                builder.register::<E>();
                Ok(())
            }
            None => Err(DomainError::RegistryFrozen {
                event_type: type_name::<E>(),
            }),
        }
    }

    /// 冻结注册表（幂等），返回冻结后的只读表
    pub fn freeze(&self) -> &FrozenEventRegistry {
        self.frozen.get_or_init(|| {
            self.pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .unwrap_or_default()
                .freeze()
        })
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get().is_some()
    }

    /// 冻结前的即时只读视图
    fn view(&self) -> FrozenEventRegistry {
        if let Some(frozen) = self.frozen.get() {
            return frozen.clone();
        }
        let snapshot = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(DomainEventRegistryBuilder::snapshot);
        // 构建器已被取走说明冻结正在进行
        snapshot.unwrap_or_else(|| self.freeze().clone())
    }
}

impl EventDispatchTable for DomainEventRegistry {
    fn try_get_dispatcher(&self, event_type: TypeId) -> Option<EventDispatchFn> {
        if let Some(frozen) = self.frozen.get() {
            return frozen.try_get_dispatcher(event_type);
        }
        tracing::warn!("domain event registry queried before freeze; building a temporary view");
        self.view().try_get_dispatcher(event_type)
    }

    fn registered_event_types(&self) -> Vec<&'static str> {
        match self.frozen.get() {
            Some(frozen) => frozen.registered_event_types(),
            None => self.view().registered_event_types(),
        }
    }
}

impl<T> EventDispatchTable for Arc<T>
where
    T: EventDispatchTable + ?Sized,
{
    fn try_get_dispatcher(&self, event_type: TypeId) -> Option<EventDispatchFn> {
        (**self).try_get_dispatcher(event_type)
    }

    fn registered_event_types(&self) -> Vec<&'static str> {
        (**self).registered_event_types()
    }
}

impl EventDispatchTable for &'static DomainEventRegistry {
    fn try_get_dispatcher(&self, event_type: TypeId) -> Option<EventDispatchFn> {
        (**self).try_get_dispatcher(event_type)
    }

    fn registered_event_types(&self) -> Vec<&'static str> {
        (**self).registered_event_types()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler_scope::HandlerCollection;
    use async_trait::async_trait;
    use ddd_domain::domain_event::EventMeta;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    macro_rules! test_event {
        ($name:ident) => {
            #[derive(Debug, Default)]
            struct $name {
                meta: EventMeta,
            }

            impl DomainEvent for $name {
                fn event_id(&self) -> Uuid {
                    self.meta.event_id()
                }
                fn occurred_at(&self) -> DateTime<Utc> {
                    self.meta.occurred_at()
                }
            }
        };
    }

    test_event!(UserRegistered);
    test_event!(UserRenamed);
    test_event!(NeverRegistered);

    struct Count(Arc<AtomicUsize>);

    #[async_trait]
    impl DomainEventHandler<UserRegistered> for Count {
        async fn handle(&self, _e: &UserRegistered, _c: &CancellationToken) -> DomainResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn register_after_freeze_fails() {
        let registry = DomainEventRegistry::new();
        registry.register::<UserRegistered>().unwrap();
        registry.freeze();

        let err = registry.register::<UserRenamed>().unwrap_err();
        match err {
            DomainError::RegistryFrozen { event_type } => {
                assert!(event_type.ends_with("UserRenamed"))
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(registry.try_get_dispatcher(TypeId::of::<UserRenamed>()).is_none());
    }

    #[test]
    fn freeze_is_idempotent() {
        let registry = DomainEventRegistry::new();
        registry.register::<UserRegistered>().unwrap();
        assert_eq!(registry.freeze().len(), 1);
        assert_eq!(registry.freeze().len(), 1);
        assert!(registry.is_frozen());
    }

    #[test]
    fn unknown_type_is_not_found_before_and_after_freeze() {
        let registry = DomainEventRegistry::new();
        registry.register::<UserRegistered>().unwrap();

        let unknown = TypeId::of::<NeverRegistered>();
        assert!(registry.try_get_dispatcher(unknown).is_none());
        assert!(registry.try_get_dispatcher(TypeId::of::<UserRegistered>()).is_some());

        registry.freeze();
        assert!(registry.try_get_dispatcher(unknown).is_none());
        assert!(registry.try_get_dispatcher(TypeId::of::<UserRegistered>()).is_some());
    }

    #[test]
    fn re_registration_overwrites() {
        let mut builder = DomainEventRegistryBuilder::new();
        builder.register::<UserRegistered>().register::<UserRegistered>();
        builder.register::<UserRenamed>();
        assert_eq!(builder.len(), 2);
        assert!(builder.is_registered::<UserRenamed>());

        let frozen = builder.freeze();
        let names = frozen.registered_event_types();
        assert_eq!(names.len(), 2);
        assert!(names.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn dispatch_fn_runs_handlers_of_exact_type() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scope = HandlerCollection::new();
        scope
            .add_event_handler::<UserRegistered, _>(Count(counter.clone()))
            .add_event_handler::<UserRegistered, _>(Count(counter.clone()));

        let mut builder = DomainEventRegistryBuilder::new();
        builder.register::<UserRegistered>();
        let frozen = builder.freeze();

        let dispatch = frozen
            .try_get_dispatcher(TypeId::of::<UserRegistered>())
            .unwrap();
        let event = UserRegistered::default();
        dispatch(&event, &scope, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn dispatch_fn_rejects_other_event_types() {
        let mut builder = DomainEventRegistryBuilder::new();
        builder.register::<UserRegistered>();
        let dispatch = builder
            .freeze()
            .try_get_dispatcher(TypeId::of::<UserRegistered>())
            .unwrap();

        let scope = HandlerCollection::new();
        let err = dispatch(&UserRenamed::default(), &scope, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::TypeMismatch { .. }));
    }

    #[test]
    fn global_registry_is_shared() {
        let a = DomainEventRegistry::global() as *const _;
        let b = DomainEventRegistry::global() as *const _;
        assert_eq!(a, b);
    }
}
