//! 规约组合（AND / OR / NOT）
//!
//! 组合规约不保存独立状态，每个属性都由子规约按固定规则推导：
//! - 条件：以共享参数改写两侧表达式后用逻辑运算连接；
//! - 预加载：并集，按结构/字符串相等去重，左侧优先；
//! - 主排序：左侧设置了任一方向则取左侧，否则取右侧；
//! - 次排序：左侧在前，右侧在后；
//! - 分页：各自取左侧，缺失时取右侧；
//! - 提示：拆分查询与忽略过滤器任一侧要求即生效，不跟踪需两侧同时要求。
//!
use super::base::ThenBy;
use super::expr::BinaryOp;
use super::lambda::Lambda;
use super::Specification;

// AND 与 OR 共用的非条件属性推导规则
macro_rules! binary_derived_properties {
    () => {
        fn includes(&self) -> Vec<Lambda<T>> {
            union_includes(self.left.includes(), self.right.includes())
        }

        fn include_strings(&self) -> Vec<String> {
            union_include_strings(self.left.include_strings(), self.right.include_strings())
        }

        fn order_by(&self) -> Option<Lambda<T>> {
            primary_order(&*self.left, &*self.right).0
        }

        fn order_by_descending(&self) -> Option<Lambda<T>> {
            primary_order(&*self.left, &*self.right).1
        }

        fn then_by(&self) -> Vec<ThenBy<T>> {
            let mut then_by = self.left.then_by();
            then_by.extend(self.right.then_by());
            then_by
        }

        fn skip(&self) -> Option<usize> {
            self.left.skip().or_else(|| self.right.skip())
        }

        fn take(&self) -> Option<usize> {
            self.left.take().or_else(|| self.right.take())
        }

        fn is_split_query(&self) -> bool {
            self.left.is_split_query() || self.right.is_split_query()
        }

        fn is_no_tracking(&self) -> bool {
            self.left.is_no_tracking() && self.right.is_no_tracking()
        }

        fn ignore_query_filters(&self) -> bool {
            self.left.ignore_query_filters() || self.right.ignore_query_filters()
        }
    };
}

/// AND 组合规约
///
/// 一侧没有条件时等价于另一侧。
pub struct AndSpecification<T> {
    left: Box<dyn Specification<T>>,
    right: Box<dyn Specification<T>>,
}

impl<T> AndSpecification<T> {
    pub fn new(left: Box<dyn Specification<T>>, right: Box<dyn Specification<T>>) -> Self {
        Self { left, right }
    }
}

impl<T> Specification<T> for AndSpecification<T> {
    fn criteria(&self) -> Option<Lambda<T>> {
        match (self.left.criteria(), self.right.criteria()) {
            (Some(l), Some(r)) => Some(Lambda::combine(&l, &r, BinaryOp::AndAlso)),
            (Some(l), None) => Some(l),
            (None, r) => r,
        }
    }

    binary_derived_properties!();
}

/// OR 组合规约
///
/// 任一侧没有条件（匹配全部）时，组合结果同样没有条件。
pub struct OrSpecification<T> {
    left: Box<dyn Specification<T>>,
    right: Box<dyn Specification<T>>,
}

impl<T> OrSpecification<T> {
    pub fn new(left: Box<dyn Specification<T>>, right: Box<dyn Specification<T>>) -> Self {
        Self { left, right }
    }
}

impl<T> Specification<T> for OrSpecification<T> {
    fn criteria(&self) -> Option<Lambda<T>> {
        match (self.left.criteria(), self.right.criteria()) {
            (Some(l), Some(r)) => Some(Lambda::combine(&l, &r, BinaryOp::OrElse)),
            _ => None,
        }
    }

    binary_derived_properties!();
}

/// NOT 规约
///
/// 内部规约没有条件时结果仍没有条件（并非“不匹配任何”），其余属性原样透传。
pub struct NotSpecification<T> {
    inner: Box<dyn Specification<T>>,
}

impl<T> NotSpecification<T> {
    pub fn new(inner: Box<dyn Specification<T>>) -> Self {
        Self { inner }
    }
}

impl<T> Specification<T> for NotSpecification<T> {
    fn criteria(&self) -> Option<Lambda<T>> {
        self.inner.criteria().map(|c| c.negate())
    }

    fn includes(&self) -> Vec<Lambda<T>> {
        self.inner.includes()
    }

    fn include_strings(&self) -> Vec<String> {
        self.inner.include_strings()
    }

    fn order_by(&self) -> Option<Lambda<T>> {
        self.inner.order_by()
    }

    fn order_by_descending(&self) -> Option<Lambda<T>> {
        self.inner.order_by_descending()
    }

    fn then_by(&self) -> Vec<ThenBy<T>> {
        self.inner.then_by()
    }

    fn skip(&self) -> Option<usize> {
        self.inner.skip()
    }

    fn take(&self) -> Option<usize> {
        self.inner.take()
    }

    fn is_split_query(&self) -> bool {
        self.inner.is_split_query()
    }

    fn is_no_tracking(&self) -> bool {
        self.inner.is_no_tracking()
    }

    fn ignore_query_filters(&self) -> bool {
        self.inner.ignore_query_filters()
    }
}

fn union_includes<T>(left: Vec<Lambda<T>>, right: Vec<Lambda<T>>) -> Vec<Lambda<T>> {
    let mut merged: Vec<Lambda<T>> = Vec::with_capacity(left.len() + right.len());
    for include in left.into_iter().chain(right) {
        if !merged.iter().any(|m| m.structurally_eq(&include)) {
            merged.push(include);
        }
    }
    merged
}

fn union_include_strings(left: Vec<String>, right: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(left.len() + right.len());
    for path in left.into_iter().chain(right) {
        if !merged.contains(&path) {
            merged.push(path);
        }
    }
    merged
}

type PrimaryOrder<T> = (Option<Lambda<T>>, Option<Lambda<T>>);

fn primary_order<T>(
    left: &dyn Specification<T>,
    right: &dyn Specification<T>,
) -> PrimaryOrder<T> {
    let (asc, desc) = (left.order_by(), left.order_by_descending());
    if asc.is_some() || desc.is_some() {
        (asc, desc)
    } else {
        (right.order_by(), right.order_by_descending())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specification::base::{BaseSpecification, SortDirection};
    use crate::specification::value::{FieldAccess, ToValue, Value};
    use std::collections::BTreeSet;

    #[derive(Debug)]
    struct Person {
        age: i32,
        is_active: bool,
    }

    impl FieldAccess for Person {
        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "age" => Some(self.age.to_value()),
                "is_active" => Some(self.is_active.to_value()),
                _ => None,
            }
        }
    }

    fn adults() -> BaseSpecification<Person> {
        BaseSpecification::builder()
            .criteria(|p| p.member("age").ge(18))
            .build()
    }

    fn active() -> BaseSpecification<Person> {
        BaseSpecification::builder()
            .criteria(|p| p.member("is_active").eq(true))
            .build()
    }

    fn everyone() -> BaseSpecification<Person> {
        BaseSpecification::all()
    }

    fn people() -> Vec<Person> {
        vec![
            Person { age: 20, is_active: true },
            Person { age: 15, is_active: true },
            Person { age: 30, is_active: false },
            Person { age: 17, is_active: false },
        ]
    }

    fn matching(spec: &dyn Specification<Person>) -> Vec<i32> {
        let criteria = spec.criteria();
        people()
            .into_iter()
            .filter(|p| criteria.as_ref().map_or(true, |c| c.matches(p).unwrap()))
            .map(|p| p.age)
            .collect()
    }

    #[test]
    fn and_requires_both_sides() {
        let spec = adults().and(active());
        assert_eq!(matching(&spec), vec![20]);
    }

    #[test]
    fn and_with_missing_side_behaves_as_other_side() {
        assert_eq!(matching(&adults().and(everyone())), vec![20, 30]);
        assert_eq!(matching(&everyone().and(adults())), vec![20, 30]);
        assert!(everyone().and(everyone()).criteria().is_none());
    }

    #[test]
    fn or_accepts_either_side() {
        let spec = adults().or(active());
        assert_eq!(matching(&spec), vec![20, 15, 30]);
    }

    #[test]
    fn or_with_missing_side_matches_everything() {
        assert!(adults().or(everyone()).criteria().is_none());
        assert!(everyone().or(adults()).criteria().is_none());
        assert_eq!(matching(&adults().or(everyone())).len(), 4);
    }

    #[test]
    fn not_negates_criteria() {
        assert_eq!(matching(&adults().not()), vec![15, 17]);
        assert_eq!(matching(&adults().not().not()), vec![20, 30]);
    }

    // 已知缺陷：对“匹配全部”取反仍为“匹配全部”，而非“不匹配任何”
    #[test]
    fn not_of_unconstrained_stays_unconstrained() {
        let once = everyone().not();
        assert!(once.criteria().is_none());
        let twice = everyone().not().not();
        assert!(twice.criteria().is_none());
        assert_eq!(matching(&once).len(), 4);
    }

    #[test]
    fn combined_criteria_shares_a_single_parameter() {
        let combined = adults().and(active()).criteria().unwrap();
        assert!(combined.body().references(combined.parameter()));
        assert_eq!(
            combined.to_string(),
            "x => ((x.age >= 18) && (x.is_active == true))"
        );
    }

    fn with_includes(paths: &[&'static str], strings: &[&str]) -> BaseSpecification<Person> {
        let mut b = BaseSpecification::builder();
        for p in paths {
            b = b.include(|x| x.member(p));
        }
        for s in strings {
            b = b.include_path(*s);
        }
        b.build()
    }

    fn include_set(spec: &dyn Specification<Person>) -> BTreeSet<String> {
        spec.includes()
            .iter()
            .filter_map(|l| l.member_path())
            .chain(spec.include_strings())
            .collect()
    }

    #[test]
    fn includes_are_deduplicated_union_regardless_of_order() {
        let s1 = || with_includes(&["orders", "address"], &["orders.lines"]);
        let s2 = || with_includes(&["address", "payments"], &["orders.lines", "tags"]);

        let ab = s1().and(s2());
        let ba = s2().and(s1());
        assert_eq!(ab.includes().len(), 3);
        assert_eq!(ab.include_strings().len(), 2);
        assert_eq!(include_set(&ab), include_set(&ba));
        assert_eq!(include_set(&s1().or(s2())), include_set(&ab));
    }

    #[test]
    fn ordering_prefers_left_pair() {
        let left_desc = BaseSpecification::<Person>::builder()
            .order_by_descending(|p| p.member("age"))
            .then_by(|p| p.member("a"))
            .build();
        let right_asc = BaseSpecification::<Person>::builder()
            .order_by(|p| p.member("is_active"))
            .then_by_descending(|p| p.member("b"))
            .build();

        let spec = left_desc.clone().and(right_asc.clone());
        assert!(spec.order_by().is_none());
        assert!(spec.order_by_descending().is_some());
        let dirs: Vec<_> = spec.then_by().iter().map(|t| t.direction).collect();
        assert_eq!(dirs, vec![SortDirection::Ascending, SortDirection::Descending]);

        let spec = everyone().or(right_asc);
        assert!(spec.order_by().is_some());
        assert!(spec.order_by_descending().is_none());
    }

    #[test]
    fn paging_and_hints_follow_precedence_rules() {
        let left = BaseSpecification::<Person>::builder()
            .paging(5, 10)
            .split_query()
            .build();
        let right = BaseSpecification::<Person>::builder()
            .paging(1, 2)
            .tracking()
            .ignore_query_filters()
            .build();

        let spec = left.clone().and(right.clone());
        assert_eq!((spec.skip(), spec.take()), (Some(5), Some(10)));
        assert!(spec.is_split_query());
        assert!(!spec.is_no_tracking());
        assert!(spec.ignore_query_filters());

        let spec = everyone().or(right);
        assert_eq!((spec.skip(), spec.take()), (Some(1), Some(2)));

        assert!(everyone().and(everyone()).is_no_tracking());
    }

    #[test]
    fn not_passes_other_properties_through() {
        let inner = BaseSpecification::<Person>::builder()
            .criteria(|p| p.member("age").lt(10))
            .include_path("orders")
            .paging(0, 3)
            .split_query()
            .build();
        let spec = inner.not();
        assert_eq!(spec.include_strings(), vec!["orders".to_string()]);
        assert_eq!(spec.take(), Some(3));
        assert!(spec.is_split_query());
    }
}
