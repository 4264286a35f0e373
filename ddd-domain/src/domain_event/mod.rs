//! 领域事件（Domain Event）
//!
//! 定义事件载荷需要实现的最小接口（`DomainEvent`）、事件元信息（`EventMeta`），
//! 以及持久化边界用于投递已收集事件的发布端口（`DomainEventPublisher`）。

mod domain_event_trait;
mod event_meta;
mod publisher;

pub use domain_event_trait::{AsAny, DomainEvent};
pub use event_meta::EventMeta;
pub use publisher::DomainEventPublisher;
