//! 内置元素实现

use std::sync::Arc;

use async_trait::async_trait;
use elements_core::identifier::ACTION_PREFIX;
use elements_core::models::RequestContext;
use elements_core::traits::{Completion, Element, ElementBase};
use elements_core::ElementResult;
use elements_dispatcher::ImplementationCatalog;
use serde_json::Value;

/// 内置元素所在的分类
pub const BUILTIN_CATEGORY: &str = "core";

/// 静态元素：以合并后的配置作为输出，接受任意 `execute*` 动作
///
/// 配置中的 `meta` 与 `NO_CACHE` 字段按普通元素输出的规则处理。
pub struct StaticElement {
    base: ElementBase,
}

impl StaticElement {
    pub fn create(id: &str) -> ElementResult<Box<dyn Element>> {
        Ok(Box::new(Self {
            base: ElementBase::new(id),
        }))
    }
}

#[async_trait]
impl Element for StaticElement {
    fn set_config(&mut self, config: Value) -> ElementResult<()> {
        if !config.is_object() {
            anyhow::bail!("static element {} expects an object config", self.base.id);
        }
        self.base.config = config;
        Ok(())
    }

    fn set_request(&mut self, request: Arc<RequestContext>) {
        self.base.request = Some(request);
    }

    fn has_action(&self, action: &str) -> bool {
        action.starts_with(ACTION_PREFIX)
    }

    async fn execute(&self, _action: &str, completion: Completion) -> ElementResult<()> {
        completion.resolve(self.base.config.clone());
        Ok(())
    }
}

/// 包含全部内置元素的实现目录
pub fn builtin_catalog() -> ImplementationCatalog {
    ImplementationCatalog::new().with(BUILTIN_CATEGORY, "static", StaticElement::create)
}
