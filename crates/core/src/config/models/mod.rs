pub mod app_config;
pub mod cache;
pub mod elements;
pub mod observability;

pub use app_config::AppConfig;
pub use cache::{CacheBackend, CacheConfig};
pub use elements::ElementsConfig;
pub use observability::ObservabilityConfig;
