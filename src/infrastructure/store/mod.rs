//! Key-value store implementations

mod in_memory;
mod redis;

pub use in_memory::InMemoryKeyValueStore;
pub use redis::{RedisKeyValueStore, RedisStoreConfig};
