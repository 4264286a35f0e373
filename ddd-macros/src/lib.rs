//! ddd-domain 的过程宏
//!
//! - `#[entity]` / `#[aggregate_root]`：补齐标识与事件缓冲区字段并实现对应 trait；
//! - `#[domain_event]`：补齐事件元信息字段并实现 `DomainEvent`；
//! - `#[entity_id]`：标识新类型的常用转换；
//! - `#[derive(FieldAccess)]`：供内存查询按成员名读取字段值。
//!
use proc_macro::TokenStream;

mod aggregate_root;
mod domain_event;
mod entity;
mod entity_id;
mod field_access;
mod utils;

/// 实体宏
/// - 若缺失则追加字段 `id: IdType` 并置于字段最前
/// - 实现 `::ddd_domain::entity::Entity`
/// - 支持参数：`#[entity(id = IdType, debug = false)]`，`id` 默认 `String`
#[proc_macro_attribute]
pub fn entity(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity::expand(attr, item)
}

/// 聚合根宏
/// - 追加字段 `id` 与 `domain_events`
/// - 实现 `Entity` 与 `::ddd_domain::aggregate::AggregateRoot`
#[proc_macro_attribute]
pub fn aggregate_root(attr: TokenStream, item: TokenStream) -> TokenStream {
    aggregate_root::expand(attr, item)
}

/// 领域事件宏
/// - 追加字段 `meta: EventMeta`（若缺失）
/// - 实现 `::ddd_domain::domain_event::DomainEvent`
/// - 支持参数：`#[domain_event(name = "order.placed")]`
#[proc_macro_attribute]
pub fn domain_event(attr: TokenStream, item: TokenStream) -> TokenStream {
    domain_event::expand(attr, item)
}

/// 实体 ID 宏
/// 用于 `tuple struct` 形式的 ID 类型（例如 `struct OrderId(Uuid);`），
/// 生成 `Display`、`FromStr`、`From`、`AsRef` 与 `ToValue` 等实现。
#[proc_macro_attribute]
pub fn entity_id(attr: TokenStream, item: TokenStream) -> TokenStream {
    entity_id::expand(attr, item)
}

/// 派生 `::ddd_domain::specification::FieldAccess`
#[proc_macro_derive(FieldAccess, attributes(field))]
pub fn derive_field_access(input: TokenStream) -> TokenStream {
    field_access::expand(input)
}
