use crate::aggregate::AggregateRoot;
use crate::entity::Entity;
use crate::error::DomainResult;
use crate::specification::Specification;
use crate::value_object::{PageRequest, PagedResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// 只读仓储
///
/// 所有查询都以规约描述，由实现者借助 `SpecificationEvaluator` 翻译到底层查询。
/// 找不到时 `get_by_id`/`first_or_default` 返回 `Ok(None)`。
#[async_trait]
pub trait ReadRepository<T>: Send + Sync
where
    T: Entity,
{
    async fn get_by_id(&self, id: &T::Id, cancel: &CancellationToken) -> DomainResult<Option<T>>;

    async fn get_all(&self, cancel: &CancellationToken) -> DomainResult<Vec<T>>;

    async fn find(
        &self,
        spec: &dyn Specification<T>,
        cancel: &CancellationToken,
    ) -> DomainResult<Vec<T>>;

    async fn first_or_default(
        &self,
        spec: &dyn Specification<T>,
        cancel: &CancellationToken,
    ) -> DomainResult<Option<T>>;

    /// 计数时忽略规约中的分页；`None` 统计全部
    async fn count(
        &self,
        spec: Option<&dyn Specification<T>>,
        cancel: &CancellationToken,
    ) -> DomainResult<usize>;

    async fn exists(
        &self,
        spec: &dyn Specification<T>,
        cancel: &CancellationToken,
    ) -> DomainResult<bool> {
        Ok(self.count(Some(spec), cancel).await? > 0)
    }

    /// 按页读取；规约自带的 `skip`/`take` 被 `page` 取代
    async fn get_paged(
        &self,
        spec: &dyn Specification<T>,
        page: PageRequest,
        cancel: &CancellationToken,
    ) -> DomainResult<PagedResult<T>>;
}

/// 聚合写仓储：变更只做暂存，由 [`UnitOfWork::save_changes`] 提交
#[async_trait]
pub trait Repository<A>: ReadRepository<A>
where
    A: AggregateRoot,
{
    async fn add(&self, aggregate: A, cancel: &CancellationToken) -> DomainResult<()>;

    async fn add_range(&self, aggregates: Vec<A>, cancel: &CancellationToken) -> DomainResult<()> {
        for aggregate in aggregates {
            self.add(aggregate, cancel).await?;
        }
        Ok(())
    }

    async fn update(&self, aggregate: A, cancel: &CancellationToken) -> DomainResult<()>;

    async fn update_range(
        &self,
        aggregates: Vec<A>,
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        for aggregate in aggregates {
            self.update(aggregate, cancel).await?;
        }
        Ok(())
    }

    async fn remove(&self, aggregate: A, cancel: &CancellationToken) -> DomainResult<()>;

    async fn remove_range(
        &self,
        aggregates: Vec<A>,
        cancel: &CancellationToken,
    ) -> DomainResult<()> {
        for aggregate in aggregates {
            self.remove(aggregate, cancel).await?;
        }
        Ok(())
    }
}

/// 工作单元
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// 提交暂存变更并发布聚合上收集到的领域事件，返回受影响的聚合数
    async fn save_changes(&self, cancel: &CancellationToken) -> DomainResult<usize>;
}

#[async_trait]
impl<T> UnitOfWork for Arc<T>
where
    T: UnitOfWork + ?Sized,
{
    async fn save_changes(&self, cancel: &CancellationToken) -> DomainResult<usize> {
        (**self).save_changes(cancel).await
    }
}
