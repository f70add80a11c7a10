use async_trait::async_trait;

use crate::errors::ElementsResult;
use crate::models::CategoryDeclaration;

/// 元素声明的来源
///
/// 按分类返回声明列表。来源本身不解析实现，实现的查找由注册表完成。
#[async_trait]
pub trait RegistrySource: Send + Sync {
    async fn load_categories(&self) -> ElementsResult<Vec<CategoryDeclaration>>;

    /// 用于日志的来源描述
    fn describe(&self) -> String;
}
