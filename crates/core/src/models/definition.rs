use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifier::display_id;
use crate::traits::ElementFactory;
use crate::utils::merge_recursive;

fn default_ttl() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// 元素缓存策略
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    /// 过期时间（秒），0表示不过期
    #[serde(default = "default_ttl")]
    pub ttl: u64,
    /// 缓存键是否区分页面路径
    #[serde(default = "default_true")]
    pub page: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            page: true,
        }
    }
}

impl CachePolicy {
    pub fn new(ttl: u64) -> Self {
        Self { ttl, page: true }
    }

    /// 缓存键不包含页面路径，同一元素在所有页面共享缓存
    pub fn page_insensitive(mut self) -> Self {
        self.page = false;
        self
    }

    pub fn ttl_duration(&self) -> Option<Duration> {
        (self.ttl > 0).then(|| Duration::from_secs(self.ttl))
    }
}

/// 声明文件中的 `cache` 字段：`false`、`true` 或完整策略对象
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheSetting {
    Toggle(bool),
    Policy(CachePolicy),
}

impl CacheSetting {
    /// 结合默认策略得出最终生效的缓存策略，`None` 表示不缓存
    pub fn resolve(
        setting: Option<&CacheSetting>,
        default_policy: Option<&CachePolicy>,
    ) -> Option<CachePolicy> {
        match setting {
            Some(CacheSetting::Toggle(false)) => None,
            Some(CacheSetting::Toggle(true)) | None => default_policy.cloned(),
            Some(CacheSetting::Policy(policy)) => Some(policy.clone()),
        }
    }
}

/// 注册源中的单条元素声明
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDeclaration {
    pub name: String,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default)]
    pub esi: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSetting>,
    /// 超时时间（毫秒），0表示使用默认值
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code_if_error: Option<u16>,
    #[serde(default = "empty_object")]
    pub config: Value,
}

impl ElementDeclaration {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            action: None,
            esi: false,
            cache: None,
            timeout: None,
            status_code_if_error: None,
            config: empty_object(),
        }
    }
}

/// 一个分类下的全部元素声明
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDeclaration {
    pub category: String,
    pub elements: Vec<ElementDeclaration>,
}

/// 元素定义
///
/// 注册表加载时创建，之后只读共享。单次调度的配置覆盖合并到
/// [`effective_config`](Self::effective_config) 返回的副本上，不会修改定义本身。
#[derive(Clone)]
pub struct ElementDefinition {
    pub identifier: String,
    pub category: String,
    pub name: String,
    pub file: String,
    pub implementation: Arc<dyn ElementFactory>,
    pub default_config: Value,
    pub cache_policy: Option<CachePolicy>,
    pub action: Option<String>,
    pub esi: bool,
    pub timeout: Option<Duration>,
    pub status_code_if_error: Option<u16>,
}

impl ElementDefinition {
    pub fn from_declaration(
        category: &str,
        declaration: &ElementDeclaration,
        implementation: Arc<dyn ElementFactory>,
        default_cache_policy: Option<&CachePolicy>,
    ) -> Self {
        Self {
            identifier: format!("{category}.{}", declaration.name),
            category: category.to_string(),
            name: declaration.name.clone(),
            file: declaration.file.clone(),
            implementation,
            default_config: declaration.config.clone(),
            cache_policy: CacheSetting::resolve(declaration.cache.as_ref(), default_cache_policy),
            action: declaration.action.clone().filter(|action| !action.is_empty()),
            esi: declaration.esi,
            timeout: declaration
                .timeout
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            status_code_if_error: declaration.status_code_if_error,
        }
    }

    /// 默认配置与单次覆盖合并后的配置副本
    pub fn effective_config(&self, overwrite: Option<&Value>) -> Value {
        let mut config = match &self.default_config {
            Value::Null => empty_object(),
            other => other.clone(),
        };
        if let Some(overwrite) = overwrite {
            merge_recursive(&mut config, overwrite);
        }
        config
    }

    pub fn display_id(&self) -> String {
        display_id(&self.category, &self.file, self.action.as_deref())
    }

    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default)
    }

    pub fn is_cacheable(&self) -> bool {
        self.cache_policy.is_some()
    }
}

impl fmt::Debug for ElementDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementDefinition")
            .field("identifier", &self.identifier)
            .field("file", &self.file)
            .field("action", &self.action)
            .field("esi", &self.esi)
            .field("cache_policy", &self.cache_policy)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
