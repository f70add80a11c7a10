//! Cache stores for dispatch results
//!
//! - [`MemoryCacheStore`]: in-process map with TTL expiry
//! - [`RedisCacheStore`]: shared Redis instance with a key prefix

pub mod factory;
pub mod memory;
pub mod redis_store;

pub use factory::create_cache_store;
pub use memory::MemoryCacheStore;
pub use redis_store::RedisCacheStore;
