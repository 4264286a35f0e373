//! 规约模式（Specification）
//!
//! 以声明式方式描述一次查询：过滤条件、预加载路径、主/次排序、分页与执行提示
//! （跟踪、拆分查询、忽略全局过滤器）。规约可通过 AND/OR/NOT 组合，
//! 并由 `SpecificationEvaluator` 应用到任意实现了 `QuerySource` 的查询源上。
//!
//! 典型用法：
//! ```
//! use ddd_domain::specification::{BaseSpecification, Specification};
//!
//! struct Customer;
//!
//! fn adults() -> BaseSpecification<Customer> {
//!     BaseSpecification::builder()
//!         .criteria(|c| c.member("age").ge(18))
//!         .order_by(|c| c.member("name"))
//!         .build()
//! }
//!
//! fn active() -> BaseSpecification<Customer> {
//!     BaseSpecification::builder()
//!         .criteria(|c| c.member("is_active").eq(true))
//!         .build()
//! }
//!
//! let spec = adults().and(active());
//! assert!(spec.criteria().is_some());
//! assert!(spec.order_by().is_some());
//! ```
//!
mod base;
mod combinators;
mod evaluator;
mod expr;
mod lambda;
mod value;

pub use base::{BaseSpecification, SortDirection, SpecificationBuilder, ThenBy};
pub use combinators::{AndSpecification, NotSpecification, OrSpecification};
pub use evaluator::{QuerySource, SpecificationEvaluator};
pub use expr::{BinaryOp, Expr, ExprVisitor, IntoExpr, Parameter, ParameterReplacer, UnaryOp};
pub use lambda::Lambda;
pub use value::{FieldAccess, ToValue, Value};

use std::sync::Arc;

/// 规约的核心 trait
///
/// 实现者在构造阶段确定全部属性，此后只读，可在多次查询间并发复用。
pub trait Specification<T>: Send + Sync {
    /// 过滤条件；`None` 表示匹配全部
    fn criteria(&self) -> Option<Lambda<T>>;

    /// 表达式形式的预加载导航路径（声明顺序）
    fn includes(&self) -> Vec<Lambda<T>>;

    /// 字符串形式的预加载导航路径（声明顺序）
    fn include_strings(&self) -> Vec<String>;

    /// 升序主排序键
    fn order_by(&self) -> Option<Lambda<T>>;

    /// 降序主排序键（与升序同时存在时以升序为准）
    fn order_by_descending(&self) -> Option<Lambda<T>>;

    /// 次级排序（声明顺序）
    fn then_by(&self) -> Vec<ThenBy<T>>;

    fn skip(&self) -> Option<usize>;

    fn take(&self) -> Option<usize>;

    fn is_split_query(&self) -> bool {
        false
    }

    fn is_no_tracking(&self) -> bool {
        true
    }

    fn ignore_query_filters(&self) -> bool {
        false
    }

    /// 与另一个规约进行 AND 组合
    fn and<S>(self, other: S) -> AndSpecification<T>
    where
        Self: Sized + 'static,
        S: Specification<T> + 'static,
    {
        AndSpecification::new(Box::new(self), Box::new(other))
    }

    /// 与另一个规约进行 OR 组合
    fn or<S>(self, other: S) -> OrSpecification<T>
    where
        Self: Sized + 'static,
        S: Specification<T> + 'static,
    {
        OrSpecification::new(Box::new(self), Box::new(other))
    }

    /// 对规约进行 NOT 操作
    fn not(self) -> NotSpecification<T>
    where
        Self: Sized + 'static,
    {
        NotSpecification::new(Box::new(self))
    }
}

macro_rules! forward_specification {
    () => {
        fn criteria(&self) -> Option<Lambda<T>> {
            (**self).criteria()
        }
        fn includes(&self) -> Vec<Lambda<T>> {
            (**self).includes()
        }
        fn include_strings(&self) -> Vec<String> {
            (**self).include_strings()
        }
        fn order_by(&self) -> Option<Lambda<T>> {
            (**self).order_by()
        }
        fn order_by_descending(&self) -> Option<Lambda<T>> {
            (**self).order_by_descending()
        }
        fn then_by(&self) -> Vec<ThenBy<T>> {
            (**self).then_by()
        }
        fn skip(&self) -> Option<usize> {
            (**self).skip()
        }
        fn take(&self) -> Option<usize> {
            (**self).take()
        }
        fn is_split_query(&self) -> bool {
            (**self).is_split_query()
        }
        fn is_no_tracking(&self) -> bool {
            (**self).is_no_tracking()
        }
        fn ignore_query_filters(&self) -> bool {
            (**self).ignore_query_filters()
        }
    };
}

/// 使 `Box<dyn Specification<T>>` 可直接作为规约使用
impl<T> Specification<T> for Box<dyn Specification<T>> {
    forward_specification!();
}

/// 共享规约（如缓存于服务中的规约实例）
impl<T, S> Specification<T> for Arc<S>
where
    S: Specification<T> + ?Sized,
{
    forward_specification!();
}
