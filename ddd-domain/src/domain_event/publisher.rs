use super::DomainEvent;
use crate::error::DomainResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// 领域事件发布端口
///
/// 持久化边界（工作单元）在提交后把从聚合收集到的事件交给该端口，
/// 由应用层的分发器按顺序投递给处理器。首个失败即中止并返回。
#[async_trait]
pub trait DomainEventPublisher: Send + Sync {
    async fn publish_all(
        &self,
        events: &[Arc<dyn DomainEvent>],
        cancel: &CancellationToken,
    ) -> DomainResult<()>;
}

#[async_trait]
impl<T> DomainEventPublisher for Arc<T>
where
    T: DomainEventPublisher + ?Sized,
{
    async fn publish_all(
        &self,
        events: &[Arc<dyn DomainEvent>],
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        (**self).publish_all(events, cancel).await
    }
}
