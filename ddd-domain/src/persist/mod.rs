//! 持久化契约（persist）
//!
//! 定义基于规约的只读仓储、聚合写仓储与工作单元接口：
//! - 读取：按标识、按规约过滤/计数/分页（`ReadRepository`）；
//! - 写入：对聚合的新增/更新/删除只做暂存（`Repository`）；
//! - 提交：`UnitOfWork::save_changes` 一次性提交暂存变更，并把聚合的待发布事件
//!   交给 `DomainEventPublisher`。
//!
//! 具体存储后端由基础设施层实现并注入。
//!
mod repository;

pub use repository::{ReadRepository, Repository, UnitOfWork};
