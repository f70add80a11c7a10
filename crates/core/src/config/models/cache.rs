use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::CachePolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

impl CacheBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheBackend::Memory => "memory",
            CacheBackend::Redis => "redis",
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheBackend {
    type Err = crate::errors::ElementsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "redis" => Ok(CacheBackend::Redis),
            _ => Err(crate::errors::ElementsError::Configuration(format!(
                "Invalid cache backend: {value}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub backend: CacheBackend,
    pub redis_url: Option<String>,
    pub key_prefix: String,
    /// 未声明缓存策略的元素使用的默认策略
    pub element_default: CachePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Memory,
            redis_url: None,
            key_prefix: "elements".to_string(),
            element_default: CachePolicy::default(),
        }
    }
}

impl CacheConfig {
    /// 缓存启用时的默认元素缓存策略
    pub fn default_policy(&self) -> Option<CachePolicy> {
        self.enabled.then(|| self.element_default.clone())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.backend == CacheBackend::Redis {
            match self.redis_url.as_deref() {
                None | Some("") => {
                    return Err(anyhow::anyhow!("使用redis缓存时必须配置redis_url"));
                }
                Some(url) if !url.starts_with("redis://") && !url.starts_with("rediss://") => {
                    return Err(anyhow::anyhow!("无效的Redis URL: {}", url));
                }
                _ => {}
            }
        }

        Ok(())
    }
}
