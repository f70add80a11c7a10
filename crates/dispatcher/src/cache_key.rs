//! 缓存键推导：由元素引用、定义与请求上下文构造确定性的键

use elements_core::models::{ElementDefinition, ElementReference, RequestContext};
use elements_core::traits::CacheStore;
use serde_json::{json, Map, Value};

/// 构造参与缓存键计算的复合对象
///
/// 元素缓存策略声明 `page = false` 时不包含页面路径。
pub fn cache_key_object(
    reference: &ElementReference,
    definition: &ElementDefinition,
    request: &RequestContext,
) -> Value {
    let mut object = Map::new();
    object.insert(
        "element".to_string(),
        json!({
            "element": reference.element,
            "configOverwrite": reference.config_overwrite,
        }),
    );
    object.insert("esi".to_string(), Value::Bool(definition.esi));
    object.insert("reqIsEsi".to_string(), Value::Bool(request.esi));
    object.insert("query".to_string(), request.query.clone());
    object.insert("body".to_string(), request.body.clone());

    let page_sensitive = definition
        .cache_policy
        .as_ref()
        .map_or(true, |policy| policy.page);
    if page_sensitive {
        object.insert("page".to_string(), Value::String(request.path.clone()));
    }

    Value::Object(object)
}

/// 计算缓存键，规范化与哈希由缓存实现负责
pub fn derive_key(
    reference: &ElementReference,
    definition: &ElementDefinition,
    request: &RequestContext,
    store: &dyn CacheStore,
) -> String {
    store.key_from_object(&cache_key_object(reference, definition, request))
}
