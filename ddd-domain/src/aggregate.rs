//! 聚合根（Aggregate Root）抽象
//!
//! 聚合根是带标识的实体，并持有一个只追加的待发布领域事件缓冲区：
//! - 只有聚合自身的行为方法通过 `raise` 追加事件；
//! - 只有持久化边界在消费后通过 `take` 取走并清空（每个保存周期至多一次）。
//!
use crate::domain_event::DomainEvent;
use crate::entity::Entity;
use std::slice::Iter;
use std::sync::Arc;

/// 聚合根接口
pub trait AggregateRoot: Entity {
    /// 待发布事件的只读视图
    fn domain_events(&self) -> &DomainEvents;

    /// 待发布事件缓冲区（仅供聚合自身行为与持久化边界使用）
    fn domain_events_mut(&mut self) -> &mut DomainEvents;

    /// 记录一条新发生的领域事件
    fn raise<E: DomainEvent>(&mut self, event: E)
    where
        Self: Sized,
    {
        self.domain_events_mut().raise(event);
    }

    /// 取走并清空待发布事件
    fn take_domain_events(&mut self) -> Vec<Arc<dyn DomainEvent>> {
        self.domain_events_mut().take()
    }
}

/// 待发布领域事件缓冲区，按产生顺序保存
#[derive(Debug, Clone, Default)]
pub struct DomainEvents {
    pending: Vec<Arc<dyn DomainEvent>>,
}

impl DomainEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise<E: DomainEvent>(&mut self, event: E) {
        self.pending.push(Arc::new(event));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, Arc<dyn DomainEvent>> {
        self.pending.iter()
    }

    /// 取走全部事件，缓冲区随之清空
    pub fn take(&mut self) -> Vec<Arc<dyn DomainEvent>> {
        std::mem::take(&mut self.pending)
    }
}

impl<'a> IntoIterator for &'a DomainEvents {
    type Item = &'a Arc<dyn DomainEvent>;
    type IntoIter = Iter<'a, Arc<dyn DomainEvent>>;

    fn into_iter(self) -> Self::IntoIter {
        self.pending.iter()
    }
}
