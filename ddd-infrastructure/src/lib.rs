//! 基础设施层参考实现
//!
//! - `InMemoryQuery`：内存查询源，按规约过滤、排序、分页；
//! - `InMemoryRepository`：内存仓储 + 工作单元，提交后发布聚合上的领域事件；
//! - `RepositoryConfig`：仓储配置。
//!
pub mod config;
pub mod in_memory_query;
pub mod in_memory_repository;

pub use config::RepositoryConfig;
pub use in_memory_query::InMemoryQuery;
pub use in_memory_repository::InMemoryRepository;
