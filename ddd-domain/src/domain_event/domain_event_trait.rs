use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use uuid::Uuid;

/// 类型擦除辅助：将具体事件视为 `&dyn Any` 以便向下转型
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 领域事件：不可变地记录“某件事已经发生”
///
/// 事件由聚合产生并暂存于聚合内部，持久化边界在保存后取走并交由分发管道只读处理。
pub trait DomainEvent: AsAny + fmt::Debug + Send + Sync + 'static {
    /// 事件唯一标识
    fn event_id(&self) -> Uuid;

    /// 事件发生时间
    fn occurred_at(&self) -> DateTime<Utc>;

    /// 事件类型名（用于日志与诊断，默认取具体类型名）
    fn event_type(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl dyn DomainEvent {
    /// 尝试还原为具体事件类型
    pub fn downcast_ref<E: DomainEvent>(&self) -> Option<&E> {
        self.as_any().downcast_ref::<E>()
    }

    /// 是否为指定的具体事件类型
    pub fn is<E: DomainEvent>(&self) -> bool {
        self.as_any().is::<E>()
    }
}
