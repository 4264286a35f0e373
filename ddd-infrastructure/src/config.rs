use bon::Builder;
use serde::{Deserialize, Serialize};

/// 仓储配置
#[derive(Builder, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// 分页查询允许的最大页大小
    #[builder(default = 100)]
    pub max_page_size: usize,
    /// `save_changes` 提交后是否发布领域事件
    #[builder(default = true)]
    pub dispatch_events_on_save: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            dispatch_events_on_save: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_default() {
        assert_eq!(RepositoryConfig::builder().build(), RepositoryConfig::default());
        let cfg = RepositoryConfig::builder().max_page_size(10).build();
        assert_eq!(cfg.max_page_size, 10);
        assert!(cfg.dispatch_events_on_save);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let cfg: RepositoryConfig =
            serde_json::from_str(r#"{"dispatch_events_on_save":false}"#).unwrap();
        assert_eq!(cfg.max_page_size, 100);
        assert!(!cfg.dispatch_events_on_save);
    }
}
