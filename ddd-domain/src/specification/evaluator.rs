use super::Specification;
use super::base::SortDirection;
use super::lambda::Lambda;

/// 可组合的查询源
///
/// 每个操作消费当前查询并返回追加了该操作的新查询，不立即执行。
/// 持久化提供者（或内存实现）负责把这些操作翻译为实际查询。
pub trait QuerySource<T>: Sized {
    /// 关闭查询源上的全局过滤器
    fn ignore_query_filters(self) -> Self;

    fn filter(self, predicate: &Lambda<T>) -> Self;

    fn include(self, navigation: &Lambda<T>) -> Self;

    fn include_path(self, path: &str) -> Self;

    fn order_by(self, key: &Lambda<T>) -> Self;

    fn order_by_descending(self, key: &Lambda<T>) -> Self;

    fn then_by(self, key: &Lambda<T>) -> Self;

    fn then_by_descending(self, key: &Lambda<T>) -> Self;

    fn skip(self, count: usize) -> Self;

    fn take(self, count: usize) -> Self;

    fn as_split_query(self) -> Self;

    fn as_no_tracking(self) -> Self;
}

/// 把规约应用到查询源
///
/// 步骤顺序固定：忽略全局过滤器、过滤、预加载（表达式在前，字符串在后）、
/// 排序、分页、拆分查询、不跟踪。
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecificationEvaluator;

impl SpecificationEvaluator {
    /// `apply_paging` 为 `false` 时忽略 `skip`/`take`（用于计数等场景）
    pub fn evaluate<T, Q, S>(source: Q, spec: &S, apply_paging: bool) -> Q
    where
        Q: QuerySource<T>,
        S: Specification<T> + ?Sized,
    {
        let criteria = spec.criteria();
        tracing::trace!(
            criteria = ?criteria.as_ref().map(ToString::to_string),
            apply_paging,
            skip = ?spec.skip(),
            take = ?spec.take(),
            "applying specification"
        );

        let mut query = source;

        if spec.ignore_query_filters() {
            query = query.ignore_query_filters();
        }

        if let Some(criteria) = &criteria {
            query = query.filter(criteria);
        }

        query = spec
            .includes()
            .iter()
            .fold(query, |q, include| q.include(include));
        query = spec
            .include_strings()
            .iter()
            .fold(query, |q, path| q.include_path(path));

        // 升序与降序同时存在时以升序为准
        let primary = match (spec.order_by(), spec.order_by_descending()) {
            (Some(key), _) => Some((key, SortDirection::Ascending)),
            (None, Some(key)) => Some((key, SortDirection::Descending)),
            (None, None) => None,
        };
        if let Some((key, direction)) = primary {
            query = match direction {
                SortDirection::Ascending => query.order_by(&key),
                SortDirection::Descending => query.order_by_descending(&key),
            };
            for then in spec.then_by() {
                query = match then.direction {
                    SortDirection::Ascending => query.then_by(&then.key),
                    SortDirection::Descending => query.then_by_descending(&then.key),
                };
            }
        }

        if apply_paging {
            if let Some(skip) = spec.skip() {
                query = query.skip(skip);
            }
            if let Some(take) = spec.take() {
                query = query.take(take);
            }
        }

        if spec.is_split_query() {
            query = query.as_split_query();
        }

        if spec.is_no_tracking() {
            query = query.as_no_tracking();
        }

        query
    }
}
