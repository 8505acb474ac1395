//! Caching subsystem.
//!
//! Two tiers per resource kind, coordinated by [`CacheManager`]:
//!
//! - [`lru::LruCache`]: bounded in-memory map, one per kind, each behind
//!   its own lock so unrelated kinds never contend.
//!
//! - [`disk::DiskStore`]: content-addressed files that survive restarts.
//!   Records and tools entries are checked against their source file's
//!   modification time; embedding entries never go stale.
//!
//! Filtered tool views sit in a third, unbounded moka cache that lives
//! until [`CacheManager::clear_all`].

pub mod disk;
pub mod lru;
pub mod manager;

pub use disk::{DiskStore, content_key};
pub use lru::LruCache;
pub use manager::{CacheConfig, CacheManager, CacheStats};

/// The three kinds of cached resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Structured domain records loaded from data files.
    Records,
    /// Tool definition lists loaded from a tools file.
    Tools,
    /// Embedding vectors returned by the external embedding service.
    Embedding,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Records,
        ResourceKind::Tools,
        ResourceKind::Embedding,
    ];

    /// Sub-directory name under the cache root.
    pub fn dir_name(self) -> &'static str {
        match self {
            ResourceKind::Records => "records_cache",
            ResourceKind::Tools => "tools_cache",
            ResourceKind::Embedding => "embedding_cache",
        }
    }

    /// Label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Records => "records",
            ResourceKind::Tools => "tools",
            ResourceKind::Embedding => "embedding",
        }
    }
}
