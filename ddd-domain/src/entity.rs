//! 实体（Entity）基础抽象
//!
//! 为实体与聚合提供统一的标识（Id）能力，相等性以标识为准。
//!
use std::{fmt::Debug, hash::Hash};

/// 具备唯一标识的实体抽象
pub trait Entity: Send + Sync + 'static {
    /// 实体标识类型，要求可比较、可哈希与可克隆（仓储以其为键）
    type Id: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    /// 获取实体标识
    fn id(&self) -> &Self::Id;

    /// 两个实体是否表示同一对象（标识相等）
    fn same_identity_as(&self, other: &Self) -> bool
    where
        Self: Sized,
    {
        self.id() == other.id()
    }
}
