//! 处理器解析作用域
//!
//! 给定处理器契约（如 `dyn DomainEventHandler<E>`）的 `TypeId`，返回本作用域中
//! 按注册顺序排列的全部实现。作用域以类型擦除方式保存实例，可作为 trait 对象传递；
//! 类型化的读取由 [`HandlerScopeExt`] 提供。
//!
use crate::domain_event_handler::DomainEventHandler;
use dashmap::DashMap;
use ddd_domain::domain_event::DomainEvent;
use std::any::{Any, TypeId};
use std::sync::Arc;

type ErasedHandler = Arc<dyn Any + Send + Sync>;

/// 处理器解析作用域（对象安全）
pub trait HandlerScope: Send + Sync {
    /// 解析某一处理器契约的全部实现，按注册顺序返回
    fn resolve_all(&self, contract: TypeId) -> Vec<ErasedHandler>;
}

impl<T> HandlerScope for Arc<T>
where
    T: HandlerScope + ?Sized,
{
    fn resolve_all(&self, contract: TypeId) -> Vec<ErasedHandler> {
        (**self).resolve_all(contract)
    }
}

/// 类型化的解析辅助
pub trait HandlerScopeExt: HandlerScope {
    /// 解析事件 `E` 的全部处理器
    fn event_handlers<E: DomainEvent>(&self) -> Vec<Arc<dyn DomainEventHandler<E>>> {
        self.resolve_all(event_contract::<E>())
            .into_iter()
            .filter_map(|h| h.downcast_ref::<Arc<dyn DomainEventHandler<E>>>().cloned())
            .collect()
    }
}

impl<S: HandlerScope + ?Sized> HandlerScopeExt for S {}

fn event_contract<E: DomainEvent>() -> TypeId {
    TypeId::of::<dyn DomainEventHandler<E>>()
}

/// 进程内的处理器集合
///
/// 启动阶段注册，运行期只读共享（通常以 `Arc<HandlerCollection>` 注入）。
#[derive(Default)]
pub struct HandlerCollection {
    handlers: DashMap<TypeId, Vec<ErasedHandler>>,
}

impl HandlerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为事件 `E` 追加一个处理器
    pub fn add_event_handler<E, H>(&self, handler: H) -> &Self
    where
        E: DomainEvent,
        H: DomainEventHandler<E> + 'static,
    {
        self.add_shared_event_handler::<E>(Arc::new(handler))
    }

    /// 追加一个已共享的处理器实例（同一实例可同时服务多个事件类型）
    pub fn add_shared_event_handler<E>(&self, handler: Arc<dyn DomainEventHandler<E>>) -> &Self
    where
        E: DomainEvent,
    {
        tracing::debug!(
            event_type = std::any::type_name::<E>(),
            handler = handler.handler_name(),
            "domain event handler added"
        );
        self.handlers
            .entry(event_contract::<E>())
            .or_default()
            .push(Arc::new(handler));
        self
    }

    /// 事件 `E` 已注册的处理器数量
    pub fn event_handler_count<E: DomainEvent>(&self) -> usize {
        self.handlers
            .get(&event_contract::<E>())
            .map_or(0, |h| h.len())
    }
}

impl HandlerScope for HandlerCollection {
    fn resolve_all(&self, contract: TypeId) -> Vec<ErasedHandler> {
        self.handlers
            .get(&contract)
            .map(|h| h.value().clone())
            .unwrap_or_default()
    }
}
