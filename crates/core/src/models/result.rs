use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// 元素输出中请求跳过缓存写入的标记字段
pub const NO_CACHE_FIELD: &str = "NO_CACHE";

/// 结果记录自身的字段名，元素输出中的同名字段不会覆盖它们
const RESERVED_FIELDS: &[&str] = &[
    "slotName",
    "position",
    "page",
    "element",
    "id",
    "config",
    "statusCodeIfError",
    "esi",
    "doesNotExist",
    "actionMissing",
    "cached",
    "fromCache",
    "isError",
    "isFatal",
    "timedOut",
    "error",
    "stack",
    "duration",
    "meta",
    NO_CACHE_FIELD,
];

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// 结果元数据，`data` 会被并入请求级收集器
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultMeta {
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 宽松解析元素输出中的 `meta`
///
/// 非数组的 `data` 作为单个条目保留；非对象的 `meta` 整体保存在 `extra.value` 中。
impl From<Value> for ResultMeta {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(mut extra) => {
                let data = match extra.remove("data") {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::Array(items)) => items,
                    Some(other) => {
                        warn!("meta.data is not an array, keeping it as a single entry");
                        vec![other]
                    }
                };
                Self { data, extra }
            }
            other => {
                warn!("meta is not an object, keeping it under meta.value");
                let mut extra = Map::new();
                extra.insert("value".to_string(), other);
                Self {
                    data: Vec::new(),
                    extra,
                }
            }
        }
    }
}

/// 元素动作成功完成时交付的输出
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementOutput {
    fields: Map<String, Value>,
    meta: Option<ResultMeta>,
    no_cache: bool,
}

impl ElementOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_meta_data<I>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        self.meta
            .get_or_insert_with(ResultMeta::default)
            .data
            .extend(items);
        self
    }

    /// 本次结果不写入缓存
    pub fn without_cache(mut self) -> Self {
        self.no_cache = true;
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn meta(&self) -> Option<&ResultMeta> {
        self.meta.as_ref()
    }

    pub fn is_no_cache(&self) -> bool {
        self.no_cache
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.meta.is_none()
    }
}

impl From<Map<String, Value>> for ElementOutput {
    fn from(mut fields: Map<String, Value>) -> Self {
        let no_cache = fields
            .remove(NO_CACHE_FIELD)
            .is_some_and(|value| is_truthy(&value));
        let meta = fields
            .remove("meta")
            .filter(|value| !value.is_null())
            .map(ResultMeta::from);
        Self {
            fields,
            meta,
            no_cache,
        }
    }
}

/// 对象按字段展开；`null` 视为空输出；其他值放入 `content` 字段
impl From<Value> for ElementOutput {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => map.into(),
            Value::Null => Self::default(),
            other => Self::default().with_field("content", other),
        }
    }
}

/// 调度结果的最终分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    DoesNotExist,
    ActionMissing,
    Fatal,
    Error,
    Success,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::DoesNotExist => "does_not_exist",
            Classification::ActionMissing => "action_missing",
            Classification::Fatal => "fatal",
            Classification::Error => "error",
            Classification::Success => "success",
        }
    }
}

/// 单个元素的调度结果记录
///
/// 序列化为camelCase的JSON对象，元素自身输出的字段平铺在同一层。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default)]
    pub element: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code_if_error: Option<u16>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub esi: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub does_not_exist: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub action_missing: bool,
    #[serde(default)]
    pub cached: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub from_cache: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_fatal: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub timed_out: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// 执行耗时（毫秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResultMeta>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl DispatchResult {
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            ..Self::default()
        }
    }

    pub fn located(
        mut self,
        slot_name: Option<String>,
        position: Option<usize>,
        page: impl Into<String>,
    ) -> Self {
        self.slot_name = slot_name;
        self.position = position;
        self.page = Some(page.into());
        self
    }

    pub fn classification(&self) -> Classification {
        if self.does_not_exist {
            Classification::DoesNotExist
        } else if self.action_missing {
            Classification::ActionMissing
        } else if self.is_fatal {
            Classification::Fatal
        } else if self.is_error {
            Classification::Error
        } else {
            Classification::Success
        }
    }

    /// 合并元素输出；与记录自身字段同名的输出字段会被忽略
    pub fn merge_output(&mut self, output: &ElementOutput) {
        for (key, value) in output.fields() {
            if RESERVED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            self.data.insert(key.clone(), value.clone());
        }
        if let Some(meta) = output.meta() {
            self.meta = Some(meta.clone());
        }
    }

    pub fn meta_data(&self) -> &[Value] {
        self.meta.as_ref().map(|meta| meta.data.as_slice()).unwrap_or_default()
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn mark_error(&mut self, message: impl Into<String>, stack: Option<String>) {
        self.is_error = true;
        self.error = Some(message.into());
        self.stack = stack;
    }

    pub fn mark_fatal(&mut self, message: impl Into<String>, stack: Option<String>) {
        self.mark_error(message, stack);
        self.is_fatal = true;
    }

    pub fn mark_timed_out(&mut self, message: impl Into<String>) {
        self.mark_error(message, None);
        self.timed_out = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_from_map_extracts_markers() {
        let output: ElementOutput = json!({
            "html": "<p>hi</p>",
            "NO_CACHE": true,
            "meta": {"data": [{"title": "News"}]}
        })
        .into();
        assert!(output.is_no_cache());
        assert_eq!(output.fields().len(), 1);
        assert_eq!(output.meta().unwrap().data, vec![json!({"title": "News"})]);
    }

    #[test]
    fn test_malformed_meta_is_kept() {
        let output: ElementOutput =
            json!({"html": "x", "meta": {"data": "not-an-array", "title": "T"}}).into();
        let meta = output.meta().unwrap();
        assert_eq!(meta.data, vec![json!("not-an-array")]);
        assert_eq!(meta.extra["title"], json!("T"));
        assert_eq!(output.fields().len(), 1);

        let scalar: ElementOutput = json!({"meta": "robots"}).into();
        let meta = scalar.meta().unwrap();
        assert!(meta.data.is_empty());
        assert_eq!(meta.extra["value"], json!("robots"));

        let null: ElementOutput = json!({"meta": null}).into();
        assert!(null.meta().is_none());
    }

    #[test]
    fn test_kept_meta_survives_cache_round_trip() {
        let mut result = DispatchResult::new("news.list");
        result.merge_output(&json!({"meta": {"data": 7, "title": "T"}}).into());

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["meta"], json!({"data": [7], "title": "T"}));
        let back: DispatchResult = serde_json::from_value(value).unwrap();
        assert_eq!(back.meta_data(), &[json!(7)]);
    }

    #[test]
    fn test_output_from_scalar_and_null() {
        let output: ElementOutput = json!("plain").into();
        assert_eq!(output.fields()["content"], json!("plain"));
        assert!(ElementOutput::from(Value::Null).is_empty());
        let falsy: ElementOutput = json!({"NO_CACHE": 0}).into();
        assert!(!falsy.is_no_cache());
    }

    #[test]
    fn test_merge_output_skips_reserved_fields() {
        let mut result = DispatchResult::new("news.list").located(
            Some("content".to_string()),
            Some(1),
            "/",
        );
        let output = ElementOutput::new()
            .with_field("items", json!([1, 2]))
            .with_field("slotName", "hijacked")
            .with_field("isError", true);
        result.merge_output(&output);

        assert_eq!(result.slot_name.as_deref(), Some("content"));
        assert!(!result.is_error);
        assert_eq!(result.field("items"), Some(&json!([1, 2])));
        assert_eq!(result.data.len(), 1);
    }

    #[test]
    fn test_classification_flags() {
        let mut result = DispatchResult::new("a.b");
        assert_eq!(result.classification(), Classification::Success);

        result.mark_timed_out("too slow");
        assert_eq!(result.classification(), Classification::Error);
        assert!(result.timed_out && result.stack.is_none());

        let mut fatal = DispatchResult::new("a.b");
        fatal.mark_fatal("boom", Some("trace".to_string()));
        assert_eq!(fatal.classification(), Classification::Fatal);
        assert!(fatal.is_error);
    }

    #[test]
    fn test_serialization_flattens_output_fields() {
        let mut result = DispatchResult::new("news.list");
        result.merge_output(&ElementOutput::new().with_field("title", "Hello"));
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["title"], "Hello");
        assert_eq!(value["cached"], false);
        assert!(value.get("isError").is_none());

        let back: DispatchResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
    }
}
