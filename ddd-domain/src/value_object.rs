//! 值对象（Value Object）
//!
//! 无标识、以值相等为准的对象，用于封装不可变的概念性值与校验逻辑。
//!
use crate::error::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};

/// 值对象抽象
pub trait ValueObject {
    /// 业务校验失败时的错误类型
    type Error;

    /// 创建值对象时进行验证
    fn validate(&self) -> Result<(), Self::Error>;
}

/// 分页请求（页码从 1 开始）
///
/// ```
/// use ddd_domain::value_object::PageRequest;
///
/// let page = PageRequest::new(3, 20).unwrap();
/// assert_eq!(page.skip(), 40);
/// assert!(PageRequest::new(0, 20).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPageRequest")]
pub struct PageRequest {
    page_number: usize,
    page_size: usize,
}

/// 反序列化的中间形态，经 `PageRequest::new` 校验后才成为分页请求
#[derive(Deserialize)]
struct RawPageRequest {
    page_number: usize,
    page_size: usize,
}

impl TryFrom<RawPageRequest> for PageRequest {
    type Error = DomainError;

    fn try_from(raw: RawPageRequest) -> Result<Self, Self::Error> {
        Self::new(raw.page_number, raw.page_size)
    }
}

impl PageRequest {
    pub fn new(page_number: usize, page_size: usize) -> DomainResult<Self> {
        let page = Self {
            page_number,
            page_size,
        };
        page.validate()?;
        Ok(page)
    }

    pub fn page_number(&self) -> usize {
        self.page_number
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// 本页之前需要跳过的记录数
    pub fn skip(&self) -> usize {
        self.page_number.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// 把页大小限制在 `max_page_size` 以内
    pub fn clamp_size(self, max_page_size: usize) -> Self {
        Self {
            page_size: self.page_size.min(max_page_size.max(1)),
            ..self
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: 1,
            page_size: 20,
        }
    }
}

impl ValueObject for PageRequest {
    type Error = DomainError;

    fn validate(&self) -> Result<(), Self::Error> {
        if self.page_number < 1 {
            return Err(DomainError::invalid_value("page_number must be >= 1"));
        }
        if self.page_size < 1 {
            return Err(DomainError::invalid_value("page_size must be >= 1"));
        }
        Ok(())
    }
}

/// 分页查询结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub page_number: usize,
    pub page_size: usize,
    pub total_count: usize,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, page: PageRequest, total_count: usize) -> Self {
        Self {
            items,
            page_number: page.page_number(),
            page_size: page.page_size(),
            total_count,
        }
    }

    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.total_count.div_ceil(self.page_size)
    }

    pub fn has_previous_page(&self) -> bool {
        self.page_number > 1
    }

    pub fn has_next_page(&self) -> bool {
        self.page_number < self.total_pages()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_count: self.total_count,
        }
    }
}
