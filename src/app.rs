use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use elements_core::config::AppConfig;
use elements_core::models::{DispatchResult, RequestContext, SlotLayout};
use elements_dispatcher::{
    DispatchSettings, ElementDispatcher, ElementRegistry, ImplementationCatalog, RegistryDefaults,
};
use elements_infrastructure::{create_cache_store, FileRegistrySource};
use serde_json::{json, Value};
use tracing::info;

use crate::builtin::builtin_catalog;

/// 应用运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// 加载注册表并列出全部元素定义
    Check,
    /// 调度整个插槽布局
    Render,
    /// 调度单个元素
    Element,
}

impl FromStr for AppMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "check" => Ok(AppMode::Check),
            "render" => Ok(AppMode::Render),
            "element" => Ok(AppMode::Element),
            _ => Err(anyhow::anyhow!("不支持的运行模式: {s}")),
        }
    }
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
    dispatcher: Arc<ElementDispatcher>,
}

impl Application {
    /// 使用内置元素目录创建应用实例
    pub async fn new(config: AppConfig) -> Result<Self> {
        Self::with_catalog(config, builtin_catalog()).await
    }

    /// 使用指定的实现目录创建应用实例
    pub async fn with_catalog(config: AppConfig, catalog: ImplementationCatalog) -> Result<Self> {
        let elements_dir = config.elements.elements_dir();
        info!("初始化元素调度引擎，声明目录: {}", elements_dir.display());

        let source = FileRegistrySource::new(&elements_dir);
        let defaults = RegistryDefaults {
            default_cache_policy: config.cache.default_policy(),
        };
        let registry = ElementRegistry::load(&source, &catalog, &defaults)
            .await
            .with_context(|| format!("加载元素注册表失败: {}", elements_dir.display()))?;

        let cache = create_cache_store(&config.cache)
            .await
            .context("创建缓存存储失败")?;

        let dispatcher = ElementDispatcher::new(
            Arc::new(registry),
            cache,
            DispatchSettings::from_config(&config),
        );

        Ok(Self {
            config,
            dispatcher: Arc::new(dispatcher),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> Arc<ElementDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// 已加载的元素定义摘要
    pub fn check(&self) -> Value {
        let registry = self.dispatcher.registry();
        let elements: Vec<Value> = registry
            .identifiers()
            .into_iter()
            .filter_map(|id| registry.get_by_id(id))
            .map(|definition| {
                json!({
                    "identifier": definition.identifier,
                    "id": definition.display_id(),
                    "esi": definition.esi,
                    "cache": definition.cache_policy,
                    "timeoutMs": definition.timeout.map(|t| t.as_millis() as u64),
                })
            })
            .collect();

        json!({
            "count": elements.len(),
            "cache": self.dispatcher.cache().map(|store| store.backend()),
            "elements": elements,
        })
    }

    /// 调度布局，返回调度后的插槽与请求级元数据
    pub async fn render(&self, layout: &SlotLayout, request: RequestContext) -> Result<Value> {
        let request = request.into_shared();
        let resolved = self
            .dispatcher
            .dispatch_elements_in_slots(layout, &request)
            .await
            .context("调度插槽布局失败")?;

        Ok(json!({
            "slots": resolved,
            "meta": request.meta.snapshot(),
        }))
    }

    /// 调度单个元素
    pub async fn element(
        &self,
        id: &str,
        request: RequestContext,
        config_overwrite: Option<Value>,
    ) -> Result<DispatchResult> {
        let request = request.into_shared();
        self.dispatcher
            .get_data_for_element(id, &request, config_overwrite)
            .await
            .with_context(|| format!("调度元素失败: {id}"))
    }
}
