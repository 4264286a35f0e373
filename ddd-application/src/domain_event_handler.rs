use async_trait::async_trait;
use ddd_domain::domain_event::DomainEvent;
use ddd_domain::error::DomainResult;
use tokio_util::sync::CancellationToken;

/// 领域事件处理器
///
/// 同一事件类型可以有任意多个处理器，分发时按注册顺序依次调用。
/// 处理器对事件只读；返回错误会中止该事件后续处理器的调用。
#[async_trait]
pub trait DomainEventHandler<E>: Send + Sync
where
    E: DomainEvent,
{
    async fn handle(&self, event: &E, cancel: &CancellationToken) -> DomainResult<()>;

    /// 处理器名称（用于日志与诊断）
    fn handler_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
