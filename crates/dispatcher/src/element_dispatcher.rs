//! 单元素调度
//!
//! 状态流转：`开始 → 缓存查询 → 执行 | 返回缓存 → 超时 | 成功 | 错误 | 致命 → 结束`。
//! 任何单个元素的故障都以数据形式记录在 [`DispatchResult`] 上，不会作为 `Err` 传出。

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use elements_core::config::AppConfig;
use elements_core::identifier::{action_method_name, normalize_element_id};
use elements_core::models::{
    Classification, DispatchResult, ElementDefinition, ElementReference, RequestContext,
};
use elements_core::traits::{CacheStore, CacheStoreExt, Element};
use elements_core::{ElementResult, ElementsError, ElementsResult};
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::cache_key::derive_key;
use crate::invocation::{invoke, panic_message, InvocationOutcome};
use crate::registry::ElementRegistry;

/// 调度行为设置
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSettings {
    pub esi_enabled: bool,
    pub show_missing_element_warnings: bool,
    pub show_dispatching_debug: bool,
    pub default_timeout: Duration,
    pub slot_order: Vec<String>,
    pub metrics_enabled: bool,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl DispatchSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            esi_enabled: config.elements.esi_enabled,
            show_missing_element_warnings: config.elements.show_missing_element_warnings,
            show_dispatching_debug: config.elements.show_dispatching_debug,
            default_timeout: config.elements.default_timeout(),
            slot_order: config.elements.slot_order.clone(),
            metrics_enabled: config.observability.metrics_enabled,
        }
    }

    pub fn with_esi_enabled(mut self, enabled: bool) -> Self {
        self.esi_enabled = enabled;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_slot_order<I, S>(mut self, slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.slot_order = slots.into_iter().map(Into::into).collect();
        self
    }
}

/// 元素调度器
pub struct ElementDispatcher {
    registry: Arc<ElementRegistry>,
    cache: Option<Arc<dyn CacheStore>>,
    settings: DispatchSettings,
}

impl ElementDispatcher {
    pub fn new(
        registry: Arc<ElementRegistry>,
        cache: Option<Arc<dyn CacheStore>>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            registry,
            cache,
            settings,
        }
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    pub fn cache(&self) -> Option<&Arc<dyn CacheStore>> {
        self.cache.as_ref()
    }

    /// 按标识获取单个元素的数据
    ///
    /// 仅在标识为空时返回 `Err`，元素自身的故障记录在结果上。
    pub async fn get_data_for_element(
        &self,
        id: &str,
        request: &Arc<RequestContext>,
        config_overwrite: Option<Value>,
    ) -> ElementsResult<DispatchResult> {
        if id.trim().is_empty() {
            return Err(ElementsError::InvalidElementId(id.to_string()));
        }
        let reference = ElementReference::new(id).with_config_overwrite(config_overwrite);
        Ok(self.dispatch_element(&reference, request).await)
    }

    /// 调度单个元素引用
    #[instrument(skip_all, fields(element = %reference.element, slot = ?reference.slot_name, position = ?reference.position))]
    pub async fn dispatch_element(
        &self,
        reference: &ElementReference,
        request: &Arc<RequestContext>,
    ) -> DispatchResult {
        let result = DispatchResult::new(reference.element.clone()).located(
            reference.slot_name.clone(),
            reference.position,
            request.path.clone(),
        );

        let result = match self.registry.get_by_id(&reference.element) {
            Some(definition) => self.dispatch_defined(reference, &definition, request, result).await,
            None => self.missing(reference, result),
        };

        self.record_outcome(&result);
        result
    }

    fn missing(&self, reference: &ElementReference, mut result: DispatchResult) -> DispatchResult {
        if self.registry.note_missing(&reference.element) && self.settings.show_missing_element_warnings {
            warn!("Element {} not found", reference.element);
        }
        result.does_not_exist = true;
        result
    }

    async fn dispatch_defined(
        &self,
        reference: &ElementReference,
        definition: &ElementDefinition,
        request: &Arc<RequestContext>,
        mut result: DispatchResult,
    ) -> DispatchResult {
        let cache = self.cache.as_ref().filter(|_| definition.is_cacheable());
        let cache_key = cache.map(|store| derive_key(reference, definition, request, store.as_ref()));

        if let (Some(store), Some(key)) = (cache, cache_key.as_deref()) {
            if !request.clear_cache {
                if let Some(cached) = self.read_cached(store.as_ref(), key).await {
                    return self.serve_cached(reference, request, cached);
                }
            }
        }

        if self.settings.show_dispatching_debug {
            debug!(
                "Dispatching element {} in slot {}",
                reference.element,
                reference.slot_name.as_deref().unwrap_or("-")
            );
        }

        let config = definition.effective_config(reference.config_overwrite.as_ref());
        result.cached = false;
        result.config = Some(config.clone());
        result.status_code_if_error = definition.status_code_if_error;
        result.esi = definition.esi;
        result.id = Some(definition.display_id());

        let element = match Self::instantiate(definition, &reference.element, config, request) {
            Ok(element) => element,
            Err(e) => {
                error!("Error in Element: ({}) {}: {:#}", request.url, reference.element, e);
                result.mark_fatal(e.to_string(), Some(format!("{e:?}")));
                return result;
            }
        };

        let action = action_method_name(definition.action.as_deref(), &reference.element);
        if !element.has_action(&action) {
            error!("Action {} is missing for {}", action, reference.element);
            result.action_missing = true;
            return result;
        }

        let started = Instant::now();
        let timeout = definition.timeout_or(self.settings.default_timeout);
        let outcome = if self.defers_to_edge(definition, request) {
            InvocationOutcome::Resolved(Default::default())
        } else {
            invoke(element, action, timeout).await
        };

        match outcome {
            InvocationOutcome::Resolved(output) => {
                let elapsed = started.elapsed();
                result.duration = Some(elapsed.as_millis() as u64);
                result.merge_output(&output);
                request.meta.extend(result.meta_data().iter().cloned());

                if self.settings.show_dispatching_debug {
                    debug!("Dispatched element {} in {}ms", reference.element, elapsed.as_millis());
                }
                if self.settings.metrics_enabled {
                    metrics::histogram!("elements_dispatch_duration_ms")
                        .record(elapsed.as_secs_f64() * 1000.0);
                }

                let writable = !output.is_no_cache() && !request.is_preview;
                if let (Some(store), Some(key), Some(policy), true) =
                    (cache, cache_key.as_deref(), definition.cache_policy.as_ref(), writable)
                {
                    if let Err(e) = store.set_typed(key, &result, policy).await {
                        warn!("Cache write failed for element {}: {}", reference.element, e);
                    }
                }
            }
            InvocationOutcome::TimedOut => {
                let message = format!(
                    "Element {} took more than {} seconds!",
                    reference.element,
                    timeout.as_secs_f64()
                );
                warn!("{} ({})", message, request.path);
                result.mark_timed_out(message);
            }
            InvocationOutcome::Rejected(e) => {
                error!("Error in Element: ({}) {}: {:#}", request.url, reference.element, e);
                result.mark_error(e.to_string(), Some(format!("{e:?}")));
            }
            InvocationOutcome::Abandoned => {
                error!(
                    "Error in Element: ({}) {}: completion dropped without a result",
                    request.url, reference.element
                );
                result.mark_error("completion dropped without a result", None);
            }
            InvocationOutcome::Fault(e) => {
                error!("Error in Element: ({}) {}: {:#}", request.url, reference.element, e);
                result.mark_fatal(e.to_string(), Some(format!("{e:?}")));
            }
            InvocationOutcome::Panicked(message) => {
                error!("Element {} panicked: {}", reference.element, message);
                result.mark_fatal(format!("element panicked: {message}"), Some(message));
            }
        }

        result
    }

    /// 创建实例并注入配置与请求，期间的panic视为错误
    fn instantiate(
        definition: &ElementDefinition,
        reference_id: &str,
        config: Value,
        request: &Arc<RequestContext>,
    ) -> ElementResult<Box<dyn Element>> {
        let normalized = normalize_element_id(reference_id);
        let setup = catch_unwind(AssertUnwindSafe(|| -> ElementResult<Box<dyn Element>> {
            let mut element = definition.implementation.create(&normalized)?;
            element.set_config(config)?;
            element.set_request(Arc::clone(request));
            Ok(element)
        }));
        setup.unwrap_or_else(|payload| {
            Err(anyhow::anyhow!(
                "element setup panicked: {}",
                panic_message(&*payload)
            ))
        })
    }

    /// ESI元素在普通GET请求中交给边缘缓存层渲染
    fn defers_to_edge(&self, definition: &ElementDefinition, request: &RequestContext) -> bool {
        definition.esi && !request.esi && request.is_safe_read() && self.settings.esi_enabled
    }

    async fn read_cached(&self, store: &dyn CacheStore, key: &str) -> Option<DispatchResult> {
        match store.get_typed::<DispatchResult>(key).await {
            Ok(Some(cached)) => {
                if self.settings.metrics_enabled {
                    metrics::counter!("elements_cache_hits_total").increment(1);
                }
                Some(cached)
            }
            Ok(None) => {
                if self.settings.metrics_enabled {
                    metrics::counter!("elements_cache_misses_total").increment(1);
                }
                None
            }
            Err(e) => {
                warn!("Cache read failed, treating as miss: {}", e);
                if self.settings.metrics_enabled {
                    metrics::counter!("elements_cache_misses_total").increment(1);
                }
                None
            }
        }
    }

    /// 缓存命中：位置信息改写为本次调用的位置
    fn serve_cached(
        &self,
        reference: &ElementReference,
        request: &RequestContext,
        mut cached: DispatchResult,
    ) -> DispatchResult {
        cached.slot_name = reference.slot_name.clone();
        cached.position = reference.position;
        cached.page = Some(request.path.clone());
        cached.from_cache = true;
        cached.cached = true;
        request.meta.extend(cached.meta_data().iter().cloned());

        if self.settings.show_dispatching_debug {
            debug!(
                "Dispatching element {} in slot {} from CACHE",
                reference.element,
                reference.slot_name.as_deref().unwrap_or("-")
            );
        }
        cached
    }

    fn record_outcome(&self, result: &DispatchResult) {
        if !self.settings.metrics_enabled {
            return;
        }
        let outcome: Classification = result.classification();
        metrics::counter!("elements_dispatch_total", "outcome" => outcome.as_str()).increment(1);
    }
}
