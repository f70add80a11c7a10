//! 插槽布局调度
//!
//! 布局中每个非空位置并发调度一次，全部完成后按 `(插槽名, 位置)` 放回原结构，
//! 并移除空位。插槽优先级列表只决定提交顺序，不影响最终结构。

use std::collections::BTreeMap;
use std::sync::Arc;

use elements_core::models::{DispatchResult, RequestContext, ResolvedLayout, SlotLayout};
use elements_core::{ElementsError, ElementsResult};
use futures::future::join_all;
use tracing::{debug, instrument};

use crate::element_dispatcher::ElementDispatcher;

impl ElementDispatcher {
    /// 插槽的提交顺序：先按配置的优先级，再按名称排列其余插槽
    pub fn submission_order<'a>(&'a self, layout: &'a SlotLayout) -> Vec<&'a str> {
        let configured = &self.settings().slot_order;
        let mut order: Vec<&str> = configured
            .iter()
            .map(String::as_str)
            .filter(|slot| layout.contains_slot(slot))
            .collect();
        order.extend(
            layout
                .slot_names()
                .filter(|slot| !configured.iter().any(|c| c == slot)),
        );
        order
    }

    /// 调度布局中的全部元素
    ///
    /// 调用方的布局不会被修改。唯一可能的 `Err` 是结果无法放回原位置。
    #[instrument(skip_all, fields(slots = layout.len(), references = layout.reference_count()))]
    pub async fn dispatch_slots(
        &self,
        layout: &SlotLayout,
        request: &Arc<RequestContext>,
    ) -> ElementsResult<ResolvedLayout> {
        if self.settings().show_dispatching_debug {
            debug!("Dispatching elements for slots");
        }

        let mut references = Vec::with_capacity(layout.reference_count());
        for slot in self.submission_order(layout) {
            let Some(entries) = layout.get(slot) else {
                continue;
            };
            for (position, entry) in entries.iter().enumerate() {
                if let Some(reference) = entry {
                    references.push(reference.clone().in_slot(slot, position));
                }
            }
        }

        let results = join_all(
            references
                .iter()
                .map(|reference| self.dispatch_element(reference, request)),
        )
        .await;

        reassemble(layout, results)
    }

    /// [`dispatch_slots`](Self::dispatch_slots) 的别名
    pub async fn dispatch_elements_in_slots(
        &self,
        layout: &SlotLayout,
        request: &Arc<RequestContext>,
    ) -> ElementsResult<ResolvedLayout> {
        self.dispatch_slots(layout, request).await
    }
}

/// 将结果放回布局中的原位置并移除空位
pub fn reassemble(layout: &SlotLayout, results: Vec<DispatchResult>) -> ElementsResult<ResolvedLayout> {
    let mut slots: BTreeMap<String, Vec<Option<DispatchResult>>> = layout
        .slots()
        .map(|(name, entries)| (name.to_string(), entries.iter().map(|_| None).collect()))
        .collect();

    for result in results {
        let (Some(slot), Some(position)) = (result.slot_name.as_deref(), result.position) else {
            return Err(ElementsError::Reassembly(format!(
                "元素 {} 的结果缺少插槽位置",
                result.element
            )));
        };
        let cell = slots
            .get_mut(slot)
            .and_then(|entries| entries.get_mut(position))
            .ok_or_else(|| {
                ElementsError::Reassembly(format!("布局中不存在位置 {slot}[{position}]"))
            })?;
        *cell = Some(result);
    }

    Ok(ResolvedLayout::from_slots(
        slots
            .into_iter()
            .map(|(name, entries)| (name, entries.into_iter().flatten().collect()))
            .collect(),
    ))
}
