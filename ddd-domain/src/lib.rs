//! DDD 领域层基础库（ddd-domain）
//!
//! 提供以 DDD 为中心的通用抽象与构件：
//! - 实体（`entity`）与聚合根（`aggregate`），聚合根持有待发布的领域事件；
//! - 领域事件（`domain_event`）及其发布端口；
//! - 规约（`specification`）：条件、预加载、排序、分页与执行提示的声明式描述，
//!   支持 AND/OR/NOT 组合，并可应用到任意查询源；
//! - 持久化契约（`persist`）：基于规约的仓储与工作单元；
//! - 值对象（`value_object`）与统一错误（`error`）。
//!
//! 本 crate 不依赖任何存储或传输实现，仅定义领域层接口与最小必要的错误类型，
//! 以便在不同基础设施上进行适配实现。
//!
//! 典型用法：
//! 1. 以 `ddd_macros` 定义聚合根与领域事件，在行为方法中 `raise` 事件；
//! 2. 以工厂函数返回 `BaseSpecification` 描述查询，按需组合；
//! 3. 通过 `persist` 中的仓储读取、暂存写入，最后 `save_changes` 提交并发布事件。
//!
pub mod aggregate;
pub mod domain_event;
pub mod entity;
pub mod error;
pub mod persist;
pub mod specification;
pub mod value_object;

// 允许在本 crate 内部通过 ::ddd_domain 进行自引用，
// 以便过程宏在本 crate 的单元测试中也能解析到 ::ddd_domain 路径。
extern crate self as ddd_domain;

// 供 ddd_macros 生成的代码使用，调用方无需直接依赖这些 crate
#[doc(hidden)]
pub mod __private {
    pub use chrono;
    pub use uuid;
}
