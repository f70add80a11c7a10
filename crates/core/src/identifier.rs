//! 元素标识处理
//!
//! 元素标识采用 `分类.名称` 的点分形式。超过两段的标识会被折叠为两段：
//! 第三段及之后的每一段首字母大写后拼接到第二段末尾，
//! 例如 `cat.widget.subAction` 折叠为 `cat.widgetSubAction`。

/// 动作方法名的固定前缀
pub const ACTION_PREFIX: &str = "execute";

/// 将标识规范化为两段形式
///
/// 不超过两段的标识原样返回（包括空字符串）。
pub fn normalize_element_id(id: &str) -> String {
    let mut parts = id.split('.');
    let (Some(category), Some(name)) = (parts.next(), parts.next()) else {
        return id.to_string();
    };

    let rest: Vec<&str> = parts.collect();
    if rest.is_empty() {
        return id.to_string();
    }

    let mut normalized = String::with_capacity(id.len());
    normalized.push_str(category);
    normalized.push('.');
    normalized.push_str(name);
    for part in rest {
        normalized.push_str(&capitalize_first_letter(part));
    }
    normalized
}

/// 首字母大写，其余字符保持不变
pub fn capitalize_first_letter(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 解析动作方法名
///
/// 定义中显式声明了动作时使用声明的动作，否则取引用标识的最后一段。
pub fn action_method_name(declared_action: Option<&str>, reference_id: &str) -> String {
    let action = match declared_action {
        Some(action) if !action.is_empty() => action,
        _ => reference_id.rsplit('.').next().unwrap_or_default(),
    };
    format!("{ACTION_PREFIX}{}", capitalize_first_letter(action))
}

/// 结果记录中展示用的元素id：`分类.文件[动作]`
pub fn display_id(category: &str, file: &str, action: Option<&str>) -> String {
    match action {
        Some(action) if !action.is_empty() && action != file => {
            format!("{category}.{file}{}", capitalize_first_letter(action))
        }
        _ => format!("{category}.{file}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_ids_unchanged() {
        assert_eq!(normalize_element_id("news"), "news");
        assert_eq!(normalize_element_id("news.list"), "news.list");
        assert_eq!(normalize_element_id(""), "");
    }

    #[test]
    fn test_long_ids_collapse_to_two_segments() {
        assert_eq!(normalize_element_id("a.b.c.d"), "a.bCD");
        assert_eq!(
            normalize_element_id("cat.widget.subAction"),
            "cat.widgetSubAction"
        );
        let normalized = normalize_element_id("shop.product.detail.gallery.zoom");
        assert_eq!(normalized.split('.').count(), 2);
        assert_eq!(normalized, "shop.productDetailGalleryZoom");
    }

    #[test]
    fn test_empty_trailing_segment_is_tolerated() {
        assert_eq!(normalize_element_id("a.b."), "a.b");
    }

    #[test]
    fn test_capitalize_first_letter() {
        assert_eq!(capitalize_first_letter("index"), "Index");
        assert_eq!(capitalize_first_letter("Index"), "Index");
        assert_eq!(capitalize_first_letter(""), "");
        assert_eq!(capitalize_first_letter("über"), "Über");
    }

    #[test]
    fn test_action_method_name_prefers_declared_action() {
        assert_eq!(action_method_name(Some("teaser"), "news.list"), "executeTeaser");
        assert_eq!(action_method_name(None, "news.list"), "executeList");
        assert_eq!(action_method_name(Some(""), "news.list"), "executeList");
        assert_eq!(
            action_method_name(None, "news.list.compact"),
            "executeCompact"
        );
    }

    #[test]
    fn test_display_id() {
        assert_eq!(display_id("news", "list", None), "news.list");
        assert_eq!(display_id("news", "list", Some("list")), "news.list");
        assert_eq!(display_id("news", "list", Some("teaser")), "news.listTeaser");
    }
}
