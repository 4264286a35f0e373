use super::Specification;
use super::expr::Expr;
use super::lambda::Lambda;
use std::fmt;

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// 次级排序项
pub struct ThenBy<T> {
    pub key: Lambda<T>,
    pub direction: SortDirection,
}

impl<T> Clone for ThenBy<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            direction: self.direction,
        }
    }
}

impl<T> fmt::Debug for ThenBy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThenBy")
            .field("key", &self.key)
            .field("direction", &self.direction)
            .finish()
    }
}

/// 规约的数据载体
///
/// 只能经由 [`SpecificationBuilder`] 构造，构造完成后只读。
/// 业务规约通常是返回 `BaseSpecification` 的工厂函数，或包装它的新类型。
pub struct BaseSpecification<T> {
    criteria: Option<Lambda<T>>,
    includes: Vec<Lambda<T>>,
    include_strings: Vec<String>,
    order_by: Option<Lambda<T>>,
    order_by_descending: Option<Lambda<T>>,
    then_by: Vec<ThenBy<T>>,
    skip: Option<usize>,
    take: Option<usize>,
    is_split_query: bool,
    is_no_tracking: bool,
    ignore_query_filters: bool,
}

impl<T> BaseSpecification<T> {
    pub fn builder() -> SpecificationBuilder<T> {
        SpecificationBuilder {
            spec: BaseSpecification {
                criteria: None,
                includes: Vec::new(),
                include_strings: Vec::new(),
                order_by: None,
                order_by_descending: None,
                then_by: Vec::new(),
                skip: None,
                take: None,
                is_split_query: false,
                is_no_tracking: true,
                ignore_query_filters: false,
            },
        }
    }

    /// 匹配全部、无排序与分页的规约
    pub fn all() -> Self {
        Self::builder().build()
    }
}

impl<T> Default for BaseSpecification<T> {
    fn default() -> Self {
        Self::all()
    }
}

impl<T> Clone for BaseSpecification<T> {
    fn clone(&self) -> Self {
        Self {
            criteria: self.criteria.clone(),
            includes: self.includes.clone(),
            include_strings: self.include_strings.clone(),
            order_by: self.order_by.clone(),
            order_by_descending: self.order_by_descending.clone(),
            then_by: self.then_by.clone(),
            skip: self.skip,
            take: self.take,
            is_split_query: self.is_split_query,
            is_no_tracking: self.is_no_tracking,
            ignore_query_filters: self.ignore_query_filters,
        }
    }
}

impl<T> fmt::Debug for BaseSpecification<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseSpecification")
            .field("criteria", &self.criteria.as_ref().map(ToString::to_string))
            .field("include_strings", &self.include_strings)
            .field("skip", &self.skip)
            .field("take", &self.take)
            .field("is_split_query", &self.is_split_query)
            .field("is_no_tracking", &self.is_no_tracking)
            .field("ignore_query_filters", &self.ignore_query_filters)
            .finish_non_exhaustive()
    }
}

impl<T> Specification<T> for BaseSpecification<T> {
    fn criteria(&self) -> Option<Lambda<T>> {
        self.criteria.clone()
    }

    fn includes(&self) -> Vec<Lambda<T>> {
        self.includes.clone()
    }

    fn include_strings(&self) -> Vec<String> {
        self.include_strings.clone()
    }

    fn order_by(&self) -> Option<Lambda<T>> {
        self.order_by.clone()
    }

    fn order_by_descending(&self) -> Option<Lambda<T>> {
        self.order_by_descending.clone()
    }

    fn then_by(&self) -> Vec<ThenBy<T>> {
        self.then_by.clone()
    }

    fn skip(&self) -> Option<usize> {
        self.skip
    }

    fn take(&self) -> Option<usize> {
        self.take
    }

    fn is_split_query(&self) -> bool {
        self.is_split_query
    }

    fn is_no_tracking(&self) -> bool {
        self.is_no_tracking
    }

    fn ignore_query_filters(&self) -> bool {
        self.ignore_query_filters
    }
}

/// 规约构建器：构造阶段唯一的可变入口
///
/// 每类属性通常只设置一次；单值属性重复设置时以最后一次为准。
/// 所有方法都不会失败，`skip`/`take` 为 `usize`，负数无从表达。
pub struct SpecificationBuilder<T> {
    spec: BaseSpecification<T>,
}

impl<T> SpecificationBuilder<T> {
    pub fn criteria(mut self, predicate: impl FnOnce(Expr) -> Expr) -> Self {
        self.spec.criteria = Some(Lambda::new(predicate));
        self
    }

    pub fn criteria_lambda(mut self, predicate: Lambda<T>) -> Self {
        self.spec.criteria = Some(predicate);
        self
    }

    /// 以导航表达式声明预加载，如 `|o| o.member("lines")`
    pub fn include(mut self, navigation: impl FnOnce(Expr) -> Expr) -> Self {
        self.spec.includes.push(Lambda::new(navigation));
        self
    }

    /// 以点分路径声明预加载，如 `"lines.product"`
    pub fn include_path(mut self, path: impl Into<String>) -> Self {
        self.spec.include_strings.push(path.into());
        self
    }

    pub fn order_by(mut self, key: impl FnOnce(Expr) -> Expr) -> Self {
        self.spec.order_by = Some(Lambda::new(key));
        self
    }

    pub fn order_by_descending(mut self, key: impl FnOnce(Expr) -> Expr) -> Self {
        self.spec.order_by_descending = Some(Lambda::new(key));
        self
    }

    pub fn then_by(mut self, key: impl FnOnce(Expr) -> Expr) -> Self {
        self.spec.then_by.push(ThenBy {
            key: Lambda::new(key),
            direction: SortDirection::Ascending,
        });
        self
    }

    pub fn then_by_descending(mut self, key: impl FnOnce(Expr) -> Expr) -> Self {
        self.spec.then_by.push(ThenBy {
            key: Lambda::new(key),
            direction: SortDirection::Descending,
        });
        self
    }

    pub fn paging(mut self, skip: usize, take: usize) -> Self {
        self.spec.skip = Some(skip);
        self.spec.take = Some(take);
        self
    }

    pub fn split_query(mut self) -> Self {
        self.spec.is_split_query = true;
        self
    }

    /// 启用变更跟踪（默认不跟踪）
    pub fn tracking(mut self) -> Self {
        self.spec.is_no_tracking = false;
        self
    }

    /// 忽略查询源上的全局过滤器（如软删除、租户过滤）
    pub fn ignore_query_filters(mut self) -> Self {
        self.spec.ignore_query_filters = true;
        self
    }

    pub fn build(self) -> BaseSpecification<T> {
        self.spec
    }
}
