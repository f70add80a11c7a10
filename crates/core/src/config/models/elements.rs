use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 默认的插槽调度顺序
pub const DEFAULT_SLOT_ORDER: &[&str] = &["html_head", "header", "content", "footer", "html_footer"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementsConfig {
    /// 元素声明位于 `<config_path>/elements/<category>.json`
    pub config_path: PathBuf,
    pub esi_enabled: bool,
    pub show_missing_element_warnings: bool,
    pub show_dispatching_debug: bool,
    pub default_timeout_ms: u64,
    pub slot_order: Vec<String>,
}

impl Default for ElementsConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("config"),
            esi_enabled: false,
            show_missing_element_warnings: true,
            show_dispatching_debug: true,
            default_timeout_ms: 5000,
            slot_order: DEFAULT_SLOT_ORDER.iter().map(|slot| slot.to_string()).collect(),
        }
    }
}

impl ElementsConfig {
    pub fn elements_dir(&self) -> PathBuf {
        self.config_path.join("elements")
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.default_timeout_ms == 0 {
            return Err(anyhow::anyhow!("默认超时时间必须大于0"));
        }

        if self.slot_order.is_empty() {
            return Err(anyhow::anyhow!("插槽顺序不能为空"));
        }

        let mut seen = HashSet::new();
        for slot in &self.slot_order {
            if slot.is_empty() {
                return Err(anyhow::anyhow!("插槽名称不能为空"));
            }
            if !seen.insert(slot.as_str()) {
                return Err(anyhow::anyhow!("插槽顺序中存在重复的插槽: {}", slot));
            }
        }

        Ok(())
    }
}
