//! Test data builders

use elements_core::models::{CachePolicy, ElementDefinition, RequestContext};
use elements_core::traits::ElementFactory;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::mocks::ScriptedFactory;

/// Builder for [`ElementDefinition`] with a resolving scripted factory by default
pub struct DefinitionBuilder {
    definition: ElementDefinition,
}

impl DefinitionBuilder {
    pub fn new(category: &str, name: &str) -> Self {
        Self {
            definition: ElementDefinition {
                identifier: format!("{category}.{name}"),
                category: category.to_string(),
                name: name.to_string(),
                file: name.to_string(),
                implementation: Arc::new(ScriptedFactory::resolving(json!({}))),
                default_config: json!({}),
                cache_policy: None,
                action: None,
                esi: false,
                timeout: None,
                status_code_if_error: None,
            },
        }
    }

    pub fn with_file(mut self, file: &str) -> Self {
        self.definition.file = file.to_string();
        self
    }

    pub fn with_action(mut self, action: &str) -> Self {
        self.definition.action = Some(action.to_string());
        self
    }

    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: ElementFactory + 'static,
    {
        self.definition.implementation = Arc::new(factory);
        self
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.definition.default_config = config;
        self
    }

    pub fn with_cache(mut self, policy: CachePolicy) -> Self {
        self.definition.cache_policy = Some(policy);
        self
    }

    pub fn with_esi(mut self) -> Self {
        self.definition.esi = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.definition.timeout = Some(timeout);
        self
    }

    pub fn with_status_code(mut self, status: u16) -> Self {
        self.definition.status_code_if_error = Some(status);
        self
    }

    pub fn build(self) -> ElementDefinition {
        self.definition
    }
}

/// Shared GET request for `path`
pub fn request_for(path: &str) -> Arc<RequestContext> {
    RequestContext::new(path).into_shared()
}
