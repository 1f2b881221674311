//! Concrete stores, providers and the orchestrating service

pub mod durable;
pub mod embedding;
pub mod service;
pub mod store;
pub mod volatile;

pub use durable::DurableStore;
pub use service::{SemanticCacheService, SetOptions};
pub use volatile::VolatileCache;
