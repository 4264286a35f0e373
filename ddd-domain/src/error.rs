//! 领域层统一错误定义
//!
//! 聚焦查询翻译、事件分发注册表、仓储、状态校验与取消等最小必要集合，
//! 便于在各实现层统一转换为 `DomainError`。
//!
use thiserror::Error;

/// 统一错误类型（基础库最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 查询/规约 ---
    #[error("query translation failed: expression={expression}, reason={reason}")]
    QueryTranslation { expression: String, reason: String },

    // --- 事件分发 ---
    #[error("domain event registry is frozen: cannot register {event_type}")]
    RegistryFrozen { event_type: &'static str },
    #[error("domain event type is not registered: {event_type}")]
    UnregisteredEvent { event_type: &'static str },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("event handler error: handler={handler}, reason={reason}")]
    EventHandler { handler: String, reason: String },

    // --- 仓储/持久化 ---
    #[error("repository error: {reason}")]
    Repository { reason: String },

    // --- 领域规则/状态 ---
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },
    #[error("invalid value: {reason}")]
    InvalidValue { reason: String },
    #[error("not found: {reason}")]
    NotFound { reason: String },

    // --- 通用 ---
    #[error("operation cancelled")]
    Cancelled,
}

impl DomainError {
    pub fn translation(expression: impl ToString, reason: impl Into<String>) -> Self {
        DomainError::QueryTranslation {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_value(reason: impl Into<String>) -> Self {
        DomainError::InvalidValue {
            reason: reason.into(),
        }
    }

    pub fn repository(reason: impl Into<String>) -> Self {
        DomainError::Repository {
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;
