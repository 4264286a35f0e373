use crate::config::RepositoryConfig;
use crate::in_memory_query::InMemoryQuery;
use async_trait::async_trait;
use ddd_domain::aggregate::AggregateRoot;
use ddd_domain::domain_event::{DomainEvent, DomainEventPublisher};
use ddd_domain::entity::Entity;
use ddd_domain::error::{DomainError, DomainResult};
use ddd_domain::persist::{ReadRepository, Repository, UnitOfWork};
use ddd_domain::specification::{
    Expr, FieldAccess, Lambda, QuerySource, Specification, SpecificationEvaluator,
};
use ddd_domain::value_object::{PageRequest, PagedResult};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// 暂存的变更
enum Change<A> {
    Add(A),
    Update(A),
    Remove(A),
}

impl<A> Change<A> {
    fn aggregate_mut(&mut self) -> &mut A {
        match self {
            Change::Add(a) | Change::Update(a) | Change::Remove(a) => a,
        }
    }
}

/// 内存仓储与工作单元
///
/// 写操作只做暂存，`save_changes` 时一次性提交：提交失败则存储不变、暂存保留。
/// 提交成功后取走并清空各聚合的待发布事件，按变更顺序交给发布端口。
/// 事件在发布前已被清空，发布失败不会重试。
pub struct InMemoryRepository<A> {
    store: RwLock<Vec<A>>,
    staged: Mutex<Vec<Change<A>>>,
    query_filters: Vec<Lambda<A>>,
    publisher: Option<Arc<dyn DomainEventPublisher>>,
    config: RepositoryConfig,
}

impl<A> InMemoryRepository<A>
where
    A: AggregateRoot + FieldAccess + Clone,
{
    pub fn new(config: RepositoryConfig) -> Self {
        Self {
            store: RwLock::new(Vec::new()),
            staged: Mutex::new(Vec::new()),
            query_filters: Vec::new(),
            publisher: None,
            config,
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn DomainEventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// 追加一个全局过滤器（如软删除），规约可通过 `ignore_query_filters` 关闭
    pub fn with_query_filter(mut self, filter: impl FnOnce(Expr) -> Expr) -> Self {
        self.query_filters.push(Lambda::new(filter));
        self
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// 已提交数据的查询快照
    pub async fn query(&self) -> InMemoryQuery<A> {
        let items = self.store.read().await.clone();
        self.snapshot(items)
    }

    /// 尚未提交的变更数
    pub async fn pending_changes(&self) -> usize {
        self.staged.lock().await.len()
    }

    fn snapshot(&self, items: Vec<A>) -> InMemoryQuery<A> {
        InMemoryQuery::new(items).with_query_filters(self.query_filters.iter().cloned())
    }

    async fn stage(&self, change: Change<A>, cancel: &CancellationToken) -> DomainResult<()> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }
        self.staged.lock().await.push(change);
        Ok(())
    }
}

fn position<A: Entity>(store: &[A], aggregate: &A) -> Option<usize> {
    store.iter().position(|s| s.same_identity_as(aggregate))
}

fn apply<A: AggregateRoot + Clone>(store: &mut Vec<A>, change: &Change<A>) -> DomainResult<()> {
    match change {
        Change::Add(a) => {
            if position(store, a).is_some() {
                return Err(DomainError::InvalidState {
                    reason: format!("aggregate {:?} already exists", a.id()),
                });
            }
            store.push(a.clone());
        }
        Change::Update(a) => {
            let i = position(store, a).ok_or_else(|| not_found(a))?;
            store[i] = a.clone();
        }
        Change::Remove(a) => {
            let i = position(store, a).ok_or_else(|| not_found(a))?;
            store.remove(i);
        }
    }
    Ok(())
}

fn not_found<A: Entity>(aggregate: &A) -> DomainError {
    DomainError::NotFound {
        reason: format!("aggregate {:?}", aggregate.id()),
    }
}

#[async_trait]
impl<A> ReadRepository<A> for InMemoryRepository<A>
where
    A: AggregateRoot + FieldAccess + Clone,
{
    async fn get_by_id(&self, id: &A::Id, cancel: &CancellationToken) -> DomainResult<Option<A>> {
        let found: Vec<A> = self
            .store
            .read()
            .await
            .iter()
            .filter(|a| a.id() == id)
            .cloned()
            .collect();
        self.snapshot(found).first(cancel).await
    }

    async fn get_all(&self, cancel: &CancellationToken) -> DomainResult<Vec<A>> {
        self.query().await.to_list(cancel).await
    }

    async fn find(
        &self,
        spec: &dyn Specification<A>,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<A>> {
        SpecificationEvaluator::evaluate(self.query().await, spec, true)
            .to_list(cancel)
            .await
    }

    async fn first_or_default(
        &self,
        spec: &dyn Specification<A>,
        cancel: &CancellationToken,
    ) -> DomainResult<Option<A>> {
        SpecificationEvaluator::evaluate(self.query().await, spec, true)
            .first(cancel)
            .await
    }

    async fn count(
        &self,
        spec: Option<&dyn Specification<A>>,
        cancel: &CancellationToken,
    ) -> DomainResult<usize> {
        let query = self.query().await;
        match spec {
            Some(spec) => {
                SpecificationEvaluator::evaluate(query, spec, false)
                    .count(cancel)
                    .await
            }
            None => query.count(cancel).await,
        }
    }

    async fn get_paged(
        &self,
        spec: &dyn Specification<A>,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> DomainResult<PagedResult<A>> {
        let page = page.clamp_size(self.config.max_page_size);
        let total_count = self.count(Some(spec), cancel).await?;
        let items = SpecificationEvaluator::evaluate(self.query().await, spec, false)
            .skip(page.skip())
            .take(page.page_size())
            .to_list(cancel)
            .await?;
        Ok(PagedResult::new(items, page, total_count))
    }
}

#[async_trait]
impl<A> Repository<A> for InMemoryRepository<A>
where
    A: AggregateRoot + FieldAccess + Clone,
{
    async fn add(&self, aggregate: A, cancel: &CancellationToken) -> DomainResult<()> {
        self.stage(Change::Add(aggregate), cancel).await
    }

    async fn update(&self, aggregate: A, cancel: &CancellationToken) -> DomainResult<()> {
        self.stage(Change::Update(aggregate), cancel).await
    }

    async fn remove(&self, aggregate: A, cancel: &CancellationToken) -> DomainResult<()> {
        self.stage(Change::Remove(aggregate), cancel).await
    }
}

#[async_trait]
impl<A> UnitOfWork for InMemoryRepository<A>
where
    A: AggregateRoot + FieldAccess + Clone,
{
    async fn save_changes(&self, cancel: &CancellationToken) -> DomainResult<usize> {
        if cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }

        let (saved, events) = {
            let mut staged = self.staged.lock().await;
            if staged.is_empty() {
                return Ok(0);
            }

            let mut store = self.store.write().await;
            let mut next = store.clone();
            for change in staged.iter() {
                apply(&mut next, change)?;
            }
            // 存储中的副本不带待发布事件
            for aggregate in next.iter_mut() {
                aggregate.domain_events_mut().take();
            }
            *store = next;

            let saved = staged.len();
            let mut events: Vec<Arc<dyn DomainEvent>> = Vec::new();
            for mut change in staged.drain(..) {
                events.extend(change.aggregate_mut().take_domain_events());
            }
            tracing::debug!(saved, events = events.len(), "changes saved");
            (saved, events)
        };

        if let Some(publisher) = &self.publisher {
            if self.config.dispatch_events_on_save && !events.is_empty() {
                publisher.publish_all(&events, cancel).await?;
            }
        }
        Ok(saved)
    }
}
