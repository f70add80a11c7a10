pub mod cache;
pub mod registry_source;

pub use cache::{create_cache_store, MemoryCacheStore, RedisCacheStore};
pub use registry_source::{FileRegistrySource, StaticRegistrySource};
