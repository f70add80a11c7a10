use thiserror::Error;

/// 元素调度引擎错误类型定义
///
/// 单个元素在调度过程中产生的故障不会以此类型返回，
/// 而是归一化为 [`DispatchResult`](crate::models::DispatchResult) 上的标记字段。
#[derive(Debug, Error)]
pub enum ElementsError {
    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("元素注册表加载失败: {}", failures.join("; "))]
    RegistryLoad { failures: Vec<String> },

    #[error("元素实现未找到: {reference}")]
    ImplementationNotFound { reference: String },

    #[error("无效的元素标识: {0:?}")]
    InvalidElementId(String),

    #[error("缓存错误: {0}")]
    Cache(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("布局重组错误: {0}")]
    Reassembly(String),
}

impl ElementsError {
    pub fn cache_error(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// 统一的Result类型
pub type ElementsResult<T> = std::result::Result<T, ElementsError>;

/// 元素实现自身逻辑使用的Result类型
pub type ElementResult<T> = anyhow::Result<T>;
