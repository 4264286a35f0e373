use ddd_domain::error::{DomainError, DomainResult};
use ddd_domain::specification::{FieldAccess, Lambda, QuerySource, SortDirection, Value};
use std::cmp::Ordering;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// 基于快照的内存查询源
///
/// 操作按调用顺序立即作用于快照；表达式求值失败会被记录下来，
/// 直到物化（`to_list`/`count`/`first`）时以 `DomainError::QueryTranslation` 返回。
/// 全局过滤器（如软删除）在第一个查询操作前生效，除非先调用了 `ignore_query_filters`。
pub struct InMemoryQuery<T> {
    items: Vec<T>,
    query_filters: Vec<Lambda<T>>,
    ignore_query_filters: bool,
    started: bool,
    sort_keys: Vec<(Lambda<T>, SortDirection)>,
    includes: Vec<String>,
    split_query: bool,
    no_tracking: bool,
    error: Option<DomainError>,
}

impl<T> InMemoryQuery<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            query_filters: Vec::new(),
            ignore_query_filters: false,
            started: false,
            sort_keys: Vec::new(),
            includes: Vec::new(),
            split_query: false,
            no_tracking: false,
            error: None,
        }
    }

    /// 追加一个全局过滤器
    pub fn with_query_filter(mut self, filter: Lambda<T>) -> Self {
        self.query_filters.push(filter);
        self
    }

    pub fn with_query_filters(mut self, filters: impl IntoIterator<Item = Lambda<T>>) -> Self {
        self.query_filters.extend(filters);
        self
    }

    /// 已记录的预加载路径（调用顺序）
    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn is_split_query(&self) -> bool {
        self.split_query
    }

    pub fn is_no_tracking(&self) -> bool {
        self.no_tracking
    }

    pub fn query_filters_ignored(&self) -> bool {
        self.ignore_query_filters
    }

    fn fail(&mut self, error: DomainError) {
        if self.error.is_none() {
            tracing::debug!(%error, "in-memory query deferred an error");
            self.error = Some(error);
        }
    }
}

impl<T: FieldAccess> InMemoryQuery<T> {
    pub async fn to_list(self, cancel: &CancellationToken) -> DomainResult<Vec<T>> {
        self.materialize(cancel)
    }

    pub async fn count(self, cancel: &CancellationToken) -> DomainResult<usize> {
        self.materialize(cancel).map(|items| items.len())
    }

    pub async fn first(self, cancel: &CancellationToken) -> DomainResult<Option<T>> {
        self.take(1)
            .materialize(cancel)
            .map(|items| items.into_iter().next())
    }

    fn materialize(self, cancel: &CancellationToken) -> DomainResult<Vec<T>> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }
        let mut query = self.start();
        match query.error.take() {
            Some(error) => Err(error),
            None => Ok(query.items),
        }
    }

    /// 首个查询操作前应用全局过滤器
    fn start(mut self) -> Self {
        if self.started {
            return self;
        }
        self.started = true;
        if !self.ignore_query_filters {
            for filter in std::mem::take(&mut self.query_filters) {
                self = self.retain(&filter);
            }
        }
        self
    }

    fn retain(mut self, predicate: &Lambda<T>) -> Self {
        if self.error.is_some() {
            return self;
        }
        let mut kept = Vec::with_capacity(self.items.len());
        for item in std::mem::take(&mut self.items) {
            match predicate.matches(&item) {
                Ok(true) => kept.push(item),
                Ok(false) => {}
                Err(error) => {
                    self.fail(error);
                    return self;
                }
            }
        }
        self.items = kept;
        self
    }

    /// 按当前全部排序键做稳定排序
    fn sort(mut self) -> Self {
        if self.error.is_some() {
            return self;
        }
        let mut keyed = Vec::with_capacity(self.items.len());
        for item in std::mem::take(&mut self.items) {
            let keys = self
                .sort_keys
                .iter()
                .map(|(key, _)| key.evaluate(&item))
                .collect::<DomainResult<Vec<Value>>>();
            match keys {
                Ok(keys) => keyed.push((keys, item)),
                Err(error) => {
                    self.fail(error);
                    return self;
                }
            }
        }
        let directions: Vec<_> = self.sort_keys.iter().map(|(_, d)| *d).collect();
        keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, &directions));
        self.items = keyed.into_iter().map(|(_, item)| item).collect();
        self
    }

    fn order(mut self, key: &Lambda<T>, direction: SortDirection) -> Self {
        self = self.start();
        self.sort_keys = vec![(key.clone(), direction)];
        self.sort()
    }

    fn then(mut self, key: &Lambda<T>, direction: SortDirection) -> Self {
        self = self.start();
        if self.sort_keys.is_empty() {
            self.fail(DomainError::translation(
                key,
                "then_by requires a preceding order_by",
            ));
            return self;
        }
        self.sort_keys.push((key.clone(), direction));
        self.sort()
    }
}

fn compare_keys(a: &[Value], b: &[Value], directions: &[SortDirection]) -> Ordering {
    for ((x, y), direction) in a.iter().zip(b).zip(directions) {
        let ord = match direction {
            SortDirection::Ascending => x.sort_cmp(y),
            SortDirection::Descending => y.sort_cmp(x),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

impl<T: FieldAccess> QuerySource<T> for InMemoryQuery<T> {
    fn ignore_query_filters(mut self) -> Self {
        if self.started {
            tracing::warn!("ignore_query_filters called after query filters were applied");
        } else {
            self.ignore_query_filters = true;
        }
        self
    }

    fn filter(self, predicate: &Lambda<T>) -> Self {
        self.start().retain(predicate)
    }

    fn include(self, navigation: &Lambda<T>) -> Self {
        let mut query = self.start();
        match navigation.member_path() {
            Some(path) => query.includes.push(path),
            None => query.fail(DomainError::translation(
                navigation,
                "include must be a member path",
            )),
        }
        query
    }

    fn include_path(self, path: &str) -> Self {
        let mut query = self.start();
        query.includes.push(path.to_string());
        query
    }

    fn order_by(self, key: &Lambda<T>) -> Self {
        self.order(key, SortDirection::Ascending)
    }

    fn order_by_descending(self, key: &Lambda<T>) -> Self {
        self.order(key, SortDirection::Descending)
    }

    fn then_by(self, key: &Lambda<T>) -> Self {
        self.then(key, SortDirection::Ascending)
    }

    fn then_by_descending(self, key: &Lambda<T>) -> Self {
        self.then(key, SortDirection::Descending)
    }

    fn skip(self, count: usize) -> Self {
        let mut query = self.start();
        let count = count.min(query.items.len());
        query.items.drain(..count);
        query
    }

    fn take(self, count: usize) -> Self {
        let mut query = self.start();
        query.items.truncate(count);
        query
    }

    fn as_split_query(self) -> Self {
        let mut query = self.start();
        query.split_query = true;
        query
    }

    fn as_no_tracking(self) -> Self {
        let mut query = self.start();
        query.no_tracking = true;
        query
    }
}

impl<T> fmt::Debug for InMemoryQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryQuery")
            .field("len", &self.items.len())
            .field("query_filters", &self.query_filters.len())
            .field("ignore_query_filters", &self.ignore_query_filters)
            .field("includes", &self.includes)
            .field("split_query", &self.split_query)
            .field("no_tracking", &self.no_tracking)
            .field("error", &self.error)
            .finish()
    }
}
