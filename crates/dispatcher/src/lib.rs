//! 元素调度引擎
//!
//! - [`ElementRegistry`]：标识到元素定义的只读查找
//! - [`ElementDispatcher::dispatch_element`]：单元素调度（缓存、执行、超时、错误归一化）
//! - [`ElementDispatcher::dispatch_slots`]：整个插槽布局的并发调度与重组

pub mod cache_key;
pub mod element_dispatcher;
pub mod invocation;
pub mod registry;
pub mod slot_dispatcher;

pub use cache_key::{cache_key_object, derive_key};
pub use element_dispatcher::{DispatchSettings, ElementDispatcher};
pub use invocation::InvocationOutcome;
pub use registry::{ElementRegistry, ImplementationCatalog, RegistryDefaults};
pub use slot_dispatcher::reassemble;
