use bon::Builder;
use tokio_util::sync::CancellationToken;

/// 应用层上下文（Application Context）
///
/// 承载一次应用层调用（命令/查询）所需的横切信息，例如：
/// - 链路追踪 `correlation_id`、因果链 `causation_id`、执行者 `actor_id`；
/// - 幂等键（`idempotency_key`）：用于在基础设施层实现请求幂等；
/// - 取消信号（`cancellation`）：总线在分发前检查，并向仓储与事件分发传递。
///
/// 典型用法：
/// ```rust
/// use ddd_application::context::AppContext;
///
/// let ctx = AppContext::builder()
///     .correlation_id("cor-123".into())
///     .causation_id("cau-abc".into())
///     .actor_id("u-1".into())
///     .idempotency_key("idem-xyz".into())
///     .build();
/// assert!(!ctx.is_cancelled());
/// ```
#[derive(Builder, Clone, Debug, Default)]
pub struct AppContext {
    pub correlation_id: Option<String>,
    pub causation_id: Option<String>,
    pub actor_id: Option<String>,
    /// 幂等键（可选）：为空则由上层或基础设施决定是否参与幂等
    pub idempotency_key: Option<String>,
    #[builder(default)]
    pub cancellation: CancellationToken,
}

impl AppContext {
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// 派生子上下文：沿用追踪信息，取消信号为父信号的子令牌
    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
            ..self.clone()
        }
    }
}
