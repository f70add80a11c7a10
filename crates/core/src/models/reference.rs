use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::DispatchResult;

/// 元素引用：页面布局中某个元素的一次出现
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ReferenceRepr")]
pub struct ElementReference {
    pub element: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_overwrite: Option<Value>,
}

/// 布局文件中的引用既可以是标识字符串，也可以是带配置覆盖的对象
#[derive(Deserialize)]
#[serde(untagged)]
enum ReferenceRepr {
    Id(String),
    Full {
        element: String,
        #[serde(default, rename = "configOverwrite")]
        config_overwrite: Option<Value>,
    },
}

impl From<ReferenceRepr> for ElementReference {
    fn from(repr: ReferenceRepr) -> Self {
        match repr {
            ReferenceRepr::Id(element) => Self::new(element),
            ReferenceRepr::Full {
                element,
                config_overwrite,
            } => Self::new(element).with_config_overwrite(config_overwrite),
        }
    }
}

impl ElementReference {
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            slot_name: None,
            position: None,
            config_overwrite: None,
        }
    }

    pub fn with_config_overwrite(mut self, config_overwrite: Option<Value>) -> Self {
        self.config_overwrite = config_overwrite.filter(|value| !value.is_null());
        self
    }

    pub fn in_slot(mut self, slot_name: impl Into<String>, position: usize) -> Self {
        self.slot_name = Some(slot_name.into());
        self.position = Some(position);
        self
    }
}

impl From<&str> for ElementReference {
    fn from(element: &str) -> Self {
        Self::new(element)
    }
}

impl From<String> for ElementReference {
    fn from(element: String) -> Self {
        Self::new(element)
    }
}

/// 页面布局：插槽名 -> 有序的元素引用列表，`None` 表示空位
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotLayout {
    slots: BTreeMap<String, Vec<Option<ElementReference>>>,
}

impl SlotLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slot<I, R>(mut self, name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ElementReference>,
    {
        self.slots.insert(
            name.into(),
            entries.into_iter().map(|entry| Some(entry.into())).collect(),
        );
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, entries: Vec<Option<ElementReference>>) {
        self.slots.insert(name.into(), entries);
    }

    pub fn push(&mut self, slot: &str, reference: impl Into<ElementReference>) {
        self.slots
            .entry(slot.to_string())
            .or_default()
            .push(Some(reference.into()));
    }

    pub fn push_empty(&mut self, slot: &str) {
        self.slots.entry(slot.to_string()).or_default().push(None);
    }

    pub fn get(&self, slot: &str) -> Option<&[Option<ElementReference>]> {
        self.slots.get(slot).map(Vec::as_slice)
    }

    pub fn contains_slot(&self, slot: &str) -> bool {
        self.slots.contains_key(slot)
    }

    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.slots.keys().map(String::as_str)
    }

    pub fn slots(&self) -> impl Iterator<Item = (&str, &[Option<ElementReference>])> {
        self.slots
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// 非空引用的总数
    pub fn reference_count(&self) -> usize {
        self.slots.values().flatten().filter(|entry| entry.is_some()).count()
    }
}

/// 调度后的布局：插槽名 -> 按原顺序排列的调度结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedLayout {
    slots: BTreeMap<String, Vec<DispatchResult>>,
}

impl ResolvedLayout {
    pub fn from_slots(slots: BTreeMap<String, Vec<DispatchResult>>) -> Self {
        Self { slots }
    }

    pub fn get(&self, slot: &str) -> Option<&[DispatchResult]> {
        self.slots.get(slot).map(Vec::as_slice)
    }

    pub fn slots(&self) -> impl Iterator<Item = (&str, &[DispatchResult])> {
        self.slots
            .iter()
            .map(|(name, results)| (name.as_str(), results.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<DispatchResult>> {
        self.slots
    }
}
