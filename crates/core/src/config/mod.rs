//! 配置管理
//!
//! 配置按以下顺序叠加，后者覆盖前者：
//! 1. 内置默认值
//! 2. TOML配置文件
//! 3. 环境变量（前缀 `ELEMENTS`，层级分隔符 `__`，例如 `ELEMENTS__CACHE__BACKEND=redis`）

pub mod models;

pub use models::*;
