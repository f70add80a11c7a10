use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 请求级元数据收集器
///
/// 多个并发完成的元素会向同一个收集器追加元数据，保证不丢失，但不保证顺序。
/// 克隆得到的实例共享同一份数据。
#[derive(Debug, Clone, Default)]
pub struct MetaAccumulator {
    data: Arc<Mutex<Vec<Value>>>,
}

impl MetaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend<I>(&self, items: I)
    where
        I: IntoIterator<Item = Value>,
    {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        data.extend(items);
    }

    pub fn snapshot(&self) -> Vec<Value> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.data.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 请求上下文
///
/// 调度时以 `Arc<RequestContext>` 的形式注入到每个元素实例。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestContext {
    pub request_id: String,
    /// 页面路径，参与缓存键计算
    pub path: String,
    pub url: String,
    pub method: String,
    pub query: Value,
    pub body: Value,
    /// 当前请求本身是否为ESI回源请求
    pub esi: bool,
    /// 强制跳过缓存读取
    pub clear_cache: bool,
    /// 预览请求的结果不写入缓存
    pub is_preview: bool,
    #[serde(skip)]
    pub meta: MetaAccumulator,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            path: "/".to_string(),
            url: "/".to_string(),
            method: "GET".to_string(),
            query: Value::Object(serde_json::Map::new()),
            body: Value::Null,
            esi: false,
            clear_cache: false,
            is_preview: false,
            meta: MetaAccumulator::new(),
        }
    }
}

impl RequestContext {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            url: path.clone(),
            path,
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_query(mut self, query: Value) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn as_esi(mut self) -> Self {
        self.esi = true;
        self
    }

    pub fn clearing_cache(mut self) -> Self {
        self.clear_cache = true;
        self
    }

    pub fn as_preview(mut self) -> Self {
        self.is_preview = true;
        self
    }

    /// 只读请求（GET）才允许将元素推迟给边缘缓存层
    pub fn is_safe_read(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_meta_accumulator_concurrent_append_loses_nothing() {
        let meta = MetaAccumulator::new();
        let mut handles = Vec::new();
        for i in 0..32 {
            let meta = meta.clone();
            handles.push(tokio::spawn(async move {
                meta.extend([json!(i), json!(i * 100)]);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(meta.len(), 64);
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: RequestContext =
            serde_json::from_value(json!({"path": "/news", "query": {"page": 2}})).unwrap();
        assert_eq!(request.path, "/news");
        assert_eq!(request.method, "GET");
        assert_eq!(request.query, json!({"page": 2}));
        assert!(!request.clear_cache);
        assert!(request.meta.is_empty());
    }

    #[test]
    fn test_safe_read() {
        assert!(RequestContext::new("/").is_safe_read());
        assert!(RequestContext::new("/").with_method("get").is_safe_read());
        assert!(!RequestContext::new("/").with_method("POST").is_safe_read());
    }
}
