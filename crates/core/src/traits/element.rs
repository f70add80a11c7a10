//! 元素契约
//!
//! 每个元素实现都需要满足此模块定义的接口：
//! - 配置注入（[`Element::set_config`]）
//! - 请求上下文注入（[`Element::set_request`]）
//! - 以名称区分的动作方法（[`Element::has_action`] / [`Element::execute`]）
//!
//! 动作通过一次性的 [`Completion`] 交付结果。调度器在超时后不会中止动作，
//! 只会丢弃接收端；元素可以通过 [`Completion::is_cancelled`] 或
//! [`Completion::cancelled`] 协作式地感知这一点并提前退出。
//!
//! ## 使用示例
//!
//! ```rust
//! use async_trait::async_trait;
//! use elements_core::traits::{Completion, Element, ElementBase};
//! use elements_core::ElementResult;
//!
//! struct Greeting {
//!     base: ElementBase,
//! }
//!
//! #[async_trait]
//! impl Element for Greeting {
//!     fn set_config(&mut self, config: serde_json::Value) -> ElementResult<()> {
//!         self.base.config = config;
//!         Ok(())
//!     }
//!
//!     fn set_request(&mut self, request: std::sync::Arc<elements_core::models::RequestContext>) {
//!         self.base.request = Some(request);
//!     }
//!
//!     fn has_action(&self, action: &str) -> bool {
//!         action == "executeGreeting"
//!     }
//!
//!     async fn execute(&self, _action: &str, completion: Completion) -> ElementResult<()> {
//!         let name = self.base.config_str("name").unwrap_or("world");
//!         completion.resolve(serde_json::json!({ "text": format!("hello {name}") }));
//!         Ok(())
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::models::{ElementOutput, RequestContext};
use crate::ElementResult;

/// 元素动作的一次性完成句柄
///
/// `resolve`/`reject` 都会消耗句柄，因此每次调用最多完成一次。
/// 未完成就被丢弃时，调度器会将其记录为错误。
#[derive(Debug)]
pub struct Completion {
    sender: oneshot::Sender<ElementResult<ElementOutput>>,
}

/// 调度器持有的接收端
pub type CompletionReceiver = oneshot::Receiver<ElementResult<ElementOutput>>;

impl Completion {
    pub fn channel() -> (Completion, CompletionReceiver) {
        let (sender, receiver) = oneshot::channel();
        (Completion { sender }, receiver)
    }

    /// 交付成功结果，返回值表示结果是否仍被调度器接收
    pub fn resolve(self, output: impl Into<ElementOutput>) -> bool {
        self.settle(Ok(output.into()))
    }

    pub fn resolve_empty(self) -> bool {
        self.settle(Ok(ElementOutput::default()))
    }

    /// 交付失败结果
    pub fn reject<E>(self, error: E) -> bool
    where
        E: Into<anyhow::Error>,
    {
        self.settle(Err(error.into()))
    }

    pub fn settle(self, outcome: ElementResult<ElementOutput>) -> bool {
        self.sender.send(outcome).is_ok()
    }

    /// 调度器已放弃等待（超时）
    pub fn is_cancelled(&self) -> bool {
        self.sender.is_closed()
    }

    /// 等待调度器放弃本次调用
    pub async fn cancelled(&mut self) {
        self.sender.closed().await
    }
}

/// 元素实现
#[async_trait]
pub trait Element: Send + Sync {
    /// 注入合并后的配置
    fn set_config(&mut self, config: Value) -> ElementResult<()>;

    fn set_request(&mut self, request: Arc<RequestContext>);

    /// 实例是否提供名为 `action` 的动作方法（例如 `executeList`）
    fn has_action(&self, action: &str) -> bool;

    /// 执行动作，结果通过 `completion` 交付
    ///
    /// 同步返回 `Err` 或发生panic都会被视为致命错误。
    async fn execute(&self, action: &str, completion: Completion) -> ElementResult<()>;
}

/// 按规范化标识创建元素实例
pub trait ElementFactory: Send + Sync {
    fn create(&self, id: &str) -> ElementResult<Box<dyn Element>>;
}

impl<F> ElementFactory for F
where
    F: Fn(&str) -> ElementResult<Box<dyn Element>> + Send + Sync,
{
    fn create(&self, id: &str) -> ElementResult<Box<dyn Element>> {
        self(id)
    }
}

/// 元素实现的公共状态
#[derive(Debug, Clone, Default)]
pub struct ElementBase {
    pub id: String,
    pub config: Value,
    pub request: Option<Arc<RequestContext>>,
}

impl ElementBase {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            config: Value::Object(serde_json::Map::new()),
            request: None,
        }
    }

    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.config.get(key)
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    pub fn request(&self) -> Option<&RequestContext> {
        self.request.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_completion_delivers_once() {
        let (completion, receiver) = Completion::channel();
        assert!(completion.resolve(json!({"a": 1})));
        let output = receiver.await.unwrap().unwrap();
        assert_eq!(output.fields()["a"], json!(1));
    }

    #[tokio::test]
    async fn test_completion_observes_abandonment() {
        let (mut completion, receiver) = Completion::channel();
        assert!(!completion.is_cancelled());
        drop(receiver);
        completion.cancelled().await;
        assert!(completion.is_cancelled());
        assert!(!completion.reject(anyhow::anyhow!("late")));
    }

    #[test]
    fn test_closure_factory() {
        struct Noop;

        #[async_trait]
        impl Element for Noop {
            fn set_config(&mut self, _config: Value) -> ElementResult<()> {
                Ok(())
            }
            fn set_request(&mut self, _request: Arc<RequestContext>) {}
            fn has_action(&self, _action: &str) -> bool {
                false
            }
            async fn execute(&self, _action: &str, completion: Completion) -> ElementResult<()> {
                completion.resolve_empty();
                Ok(())
            }
        }

        let factory: Arc<dyn ElementFactory> =
            Arc::new(|_id: &str| -> ElementResult<Box<dyn Element>> { Ok(Box::new(Noop)) });
        let element = factory.create("a.b").unwrap();
        assert!(!element.has_action("executeB"));
    }

    #[test]
    fn test_element_base_accessors() {
        let mut base = ElementBase::new("news.list");
        base.config = json!({"title": "Latest", "limit": 3});
        assert_eq!(base.config_str("title"), Some("Latest"));
        assert_eq!(base.config_value("limit"), Some(&json!(3)));
        assert!(base.request().is_none());
    }
}
