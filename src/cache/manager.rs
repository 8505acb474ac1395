//! Two-tier cache coordinator.
//!
//! [`CacheManager`] fronts three expensive lookups:
//!
//! - records files and tools files, revalidated against the source file's
//!   modification time on every hit (RAM and disk);
//! - embeddings from the external [`EmbeddingProvider`], keyed by the
//!   SHA-256 of the input text and never stale.
//!
//! None of the lookup operations return errors. A missing source, a
//! corrupt cache file, or an exhausted external call degrades to an empty
//! result and a log line, so agents can always fall back to open dialogue.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use moka::sync::Cache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::ResourceKind;
use super::disk::{DiskStore, content_key, modified_time};
use super::lru::LruCache;
use crate::providers::{EmbeddingProvider, RetryPolicy, with_retry};
use crate::telemetry;
use crate::types::{Record, ToolDefinition, parse_records, parse_tools};
use crate::{MaitreError, Result};

/// Configuration for [`CacheManager`].
///
/// ```rust
/// # use maitre::CacheConfig;
/// let config = CacheConfig::new()
///     .root("/var/cache/maitre")
///     .ram_entries(500)
///     .batch_size(20);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding the per-kind cache sub-directories.
    /// Default: the platform cache dir + `maitre`.
    pub root: PathBuf,
    /// Maximum RAM entries per resource kind. Default: 1000.
    pub ram_entries: usize,
    /// Disk budget per resource kind, in bytes. Default: 1 GiB.
    pub max_disk_bytes: u64,
    /// Texts per batched embedding call. Default: 10.
    pub batch_size: usize,
    /// Run a disk-quota pass after this many disk writes. 0 disables.
    /// Default: 64.
    pub cleanup_every_writes: u64,
    /// Retry policy for embedding calls.
    pub retry: RetryPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            ram_entries: 1000,
            max_disk_bytes: 1024 * 1024 * 1024,
            batch_size: 10,
            cleanup_every_writes: 64,
            retry: RetryPolicy::default(),
        }
    }
}

fn default_root() -> PathBuf {
    dirs::cache_dir()
        .map(|d| d.join("maitre"))
        .unwrap_or_else(|| PathBuf::from(".maitre-cache"))
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn ram_entries(mut self, n: usize) -> Self {
        self.ram_entries = n.max(1);
        self
    }

    pub fn max_disk_bytes(mut self, bytes: u64) -> Self {
        self.max_disk_bytes = bytes;
        self
    }

    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }

    pub fn cleanup_every_writes(mut self, n: u64) -> Self {
        self.cleanup_every_writes = n;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }
}

/// Current RAM occupancy, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub records: usize,
    pub tools: usize,
    pub embeddings: usize,
    pub filtered_views: u64,
}

/// A records/tools value together with the source it was built from.
#[derive(Debug, Clone)]
struct SourceEntry<T> {
    value: Vec<T>,
    source: PathBuf,
    modified: SystemTime,
}

impl<T> SourceEntry<T> {
    fn is_fresh(&self, source: &Path, modified: SystemTime) -> bool {
        self.source == source && self.modified >= modified
    }
}

type SourceLru<T> = Mutex<LruCache<String, SourceEntry<T>>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FilterKey {
    tools_path: String,
    role: String,
    allow: Vec<String>,
    permissions: Option<Vec<String>>,
}

fn sorted(list: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = list.iter().map(|s| (*s).to_string()).collect();
    out.sort();
    out
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn hit(kind: ResourceKind, tier: &'static str) {
    metrics::counter!(telemetry::CACHE_HITS_TOTAL, "kind" => kind.as_str(), "tier" => tier)
        .increment(1);
}

fn miss(kind: ResourceKind) {
    metrics::counter!(telemetry::CACHE_MISSES_TOTAL, "kind" => kind.as_str()).increment(1);
}

/// Process-wide cache. Construct once and share through an `Arc`.
pub struct CacheManager {
    config: CacheConfig,
    disk: DiskStore,
    embedder: Arc<dyn EmbeddingProvider>,
    records: SourceLru<Record>,
    tools: SourceLru<ToolDefinition>,
    embeddings: Mutex<LruCache<String, Vec<f32>>>,
    filtered: Cache<FilterKey, Arc<Vec<ToolDefinition>>>,
    writes: AtomicU64,
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("root", &self.disk.root())
            .field("embedder", &self.embedder.name())
            .finish_non_exhaustive()
    }
}

impl CacheManager {
    /// Open the disk tier and run one quota pass.
    pub fn new(config: CacheConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        if config.root.as_os_str().is_empty() {
            return Err(MaitreError::Configuration("cache root is empty".into()));
        }
        let disk = DiskStore::open(&config.root)?;
        let capacity = config.ram_entries;
        let manager = Self {
            disk,
            embedder,
            records: Mutex::new(LruCache::new(capacity)),
            tools: Mutex::new(LruCache::new(capacity)),
            embeddings: Mutex::new(LruCache::new(capacity)),
            filtered: Cache::builder().build(),
            writes: AtomicU64::new(0),
            config,
        };
        let removed = manager.enforce_disk_quota();
        info!(
            root = %manager.disk.root().display(),
            ram_entries = capacity,
            removed,
            "cache manager ready"
        );
        Ok(manager)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn disk(&self) -> &DiskStore {
        &self.disk
    }

    // ========================================================================
    // Records and tools
    // ========================================================================

    /// Records from the first `dir/logical_path` that exists.
    ///
    /// Returns an empty list when no candidate exists or the file cannot
    /// be parsed. Misses are not remembered, so a file created later is
    /// picked up on the next call.
    pub fn records<P: AsRef<Path>>(
        &self,
        logical_path: impl AsRef<Path>,
        candidate_dirs: &[P],
    ) -> Vec<Record> {
        let logical_path = logical_path.as_ref();
        let source = candidate_dirs
            .iter()
            .map(|dir| dir.as_ref().join(logical_path))
            .find(|path| path.is_file());

        let Some(source) = source else {
            miss(ResourceKind::Records);
            debug!(
                path = %logical_path.display(),
                "records file not found in any candidate directory"
            );
            return Vec::new();
        };
        // Both tiers are keyed by the resolved file, not the logical name
        let key = source.to_string_lossy().into_owned();
        self.load_cached(ResourceKind::Records, &self.records, &key, &source, parse_records)
    }

    /// Tool definitions from `tools_path`.
    pub fn tools(&self, tools_path: impl AsRef<Path>) -> Vec<ToolDefinition> {
        let source = tools_path.as_ref();
        let key = source.to_string_lossy().into_owned();
        if !source.is_file() {
            miss(ResourceKind::Tools);
            warn!(path = %key, "tools file not found");
            return Vec::new();
        }
        self.load_cached(ResourceKind::Tools, &self.tools, &key, source, parse_tools)
    }

    /// Tools visible to a caller.
    ///
    /// An empty `allow_list` or an absent/empty `permission_list` means no
    /// restriction from that side; with both present the result is their
    /// intersection. File order is preserved. Views are cached until
    /// [`clear_all`](Self::clear_all).
    pub fn filtered_tools(
        &self,
        tools_path: impl AsRef<Path>,
        role: &str,
        allow_list: &[&str],
        permission_list: Option<&[&str]>,
    ) -> Vec<ToolDefinition> {
        let tools_path = tools_path.as_ref();
        let key = FilterKey {
            tools_path: tools_path.to_string_lossy().into_owned(),
            role: role.to_string(),
            allow: sorted(allow_list),
            permissions: permission_list.map(sorted),
        };
        if let Some(view) = self.filtered.get(&key) {
            return view.as_ref().clone();
        }

        let all = self.tools(tools_path);
        if all.is_empty() {
            return all;
        }
        let view: Vec<ToolDefinition> = all
            .into_iter()
            .filter(|t| key.allow.is_empty() || key.allow.contains(&t.name))
            .filter(|t| {
                key.permissions
                    .as_ref()
                    .is_none_or(|p| p.is_empty() || p.contains(&t.name))
            })
            .collect();
        debug!(role, tools = view.len(), "built filtered tool view");
        self.filtered.insert(key, Arc::new(view.clone()));
        view
    }

    fn load_cached<T>(
        &self,
        kind: ResourceKind,
        ram: &SourceLru<T>,
        key: &str,
        source: &Path,
        parse: fn(serde_json::Value) -> Result<Vec<T>>,
    ) -> Vec<T>
    where
        T: Clone + Serialize + DeserializeOwned,
    {
        let Some(modified) = modified_time(source) else {
            miss(kind);
            warn!(kind = kind.as_str(), path = %source.display(), "cannot stat source file");
            return Vec::new();
        };

        {
            let mut guard = lock(ram);
            let owned_key = key.to_string();
            let cached = guard
                .get(&owned_key)
                .map(|entry| entry.is_fresh(source, modified).then(|| entry.value.clone()));
            match cached {
                Some(Some(value)) => {
                    hit(kind, "ram");
                    return value;
                }
                Some(None) => {
                    debug!(kind = kind.as_str(), key, "ram entry stale");
                    guard.remove(&owned_key);
                }
                None => {}
            }
        }

        if let Some(value) = self.disk.read_json_fresh::<Vec<T>>(kind, key, modified) {
            hit(kind, "disk");
            self.remember(ram, key, source, modified, value.clone());
            return value;
        }

        miss(kind);
        let value = match read_source(source).and_then(parse) {
            Ok(value) => value,
            Err(e) => {
                warn!(kind = kind.as_str(), path = %source.display(), error = %e, "failed to load source file");
                return Vec::new();
            }
        };
        match self.disk.write_json(kind, key, &value) {
            Ok(()) => self.note_write(),
            Err(e) => warn!(kind = kind.as_str(), key, error = %e, "failed to write cache file"),
        }
        self.remember(ram, key, source, modified, value.clone());
        debug!(kind = kind.as_str(), key, entries = value.len(), "loaded from source");
        value
    }

    fn remember<T>(
        &self,
        ram: &SourceLru<T>,
        key: &str,
        source: &Path,
        modified: SystemTime,
        value: Vec<T>,
    ) {
        let entry = SourceEntry {
            value,
            source: source.to_path_buf(),
            modified,
        };
        if let Some((evicted, _)) = lock(ram).put(key.to_string(), entry) {
            debug!(key = %evicted, "evicted from ram");
        }
    }

    // ========================================================================
    // Embeddings
    // ========================================================================

    /// Embedding for `text`, or an empty vector if none could be obtained.
    pub async fn embedding(&self, text: &str) -> Vec<f32> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let key = content_key(text);
        if let Some(values) = self.cached_embedding(text, &key) {
            return values;
        }
        miss(ResourceKind::Embedding);
        self.fetch_embedding(text, &key).await
    }

    /// Embeddings for several texts, in input order.
    ///
    /// Uncached texts are embedded in chunks of `batch_size`, one batched
    /// call per chunk. A chunk whose call fails, or that returns the wrong
    /// number of vectors, falls back to one call per text; so do empty
    /// vectors inside an otherwise good batch. Duplicate texts are fetched
    /// once.
    pub async fn embeddings_batch(&self, texts: &[&str]) -> Vec<Vec<f32>> {
        let mut results = vec![Vec::new(); texts.len()];
        let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();
        let mut unique: Vec<&str> = Vec::new();
        for (index, text) in texts.iter().enumerate() {
            if text.trim().is_empty() {
                continue;
            }
            let slots = positions.entry(*text).or_default();
            if slots.is_empty() {
                unique.push(*text);
            }
            slots.push(index);
        }

        let mut resolved: HashMap<&str, Vec<f32>> = HashMap::with_capacity(unique.len());
        let mut missing: Vec<&str> = Vec::new();
        for text in unique {
            match self.cached_embedding(text, &content_key(text)) {
                Some(values) => {
                    resolved.insert(text, values);
                }
                None => {
                    miss(ResourceKind::Embedding);
                    missing.push(text);
                }
            }
        }

        for chunk in missing.chunks(self.config.batch_size.max(1)) {
            for (text, values) in self.fetch_chunk(chunk).await {
                resolved.insert(text, values);
            }
        }

        for (text, values) in resolved {
            if let Some(slots) = positions.get(text) {
                for &slot in slots {
                    results[slot] = values.clone();
                }
            }
        }
        results
    }

    async fn fetch_chunk<'a>(&self, chunk: &[&'a str]) -> Vec<(&'a str, Vec<f32>)> {
        let provider = self.embedder.name();
        let batch = with_retry(&self.config.retry, provider, "embed_batch", || {
            self.embedder.embed_batch(chunk)
        })
        .await;

        let mut out = Vec::with_capacity(chunk.len());
        match batch {
            Ok(embeddings) if embeddings.len() == chunk.len() => {
                for (text, embedding) in chunk.iter().zip(embeddings) {
                    let key = content_key(text);
                    let values = if embedding.is_empty() {
                        debug!(provider, "empty vector in batch, retrying individually");
                        self.fetch_embedding(text, &key).await
                    } else {
                        self.store_embedding(text, &key, &embedding.values);
                        embedding.values
                    };
                    out.push((*text, values));
                }
            }
            other => {
                match other {
                    Ok(embeddings) => warn!(
                        provider,
                        expected = chunk.len(),
                        got = embeddings.len(),
                        "batch returned wrong count, falling back to single calls"
                    ),
                    Err(e) => warn!(
                        provider,
                        size = chunk.len(),
                        error = %e,
                        "batch embedding failed, falling back to single calls"
                    ),
                }
                for text in chunk {
                    let values = self.fetch_embedding(text, &content_key(text)).await;
                    out.push((*text, values));
                }
            }
        }
        out
    }

    fn cached_embedding(&self, text: &str, key: &str) -> Option<Vec<f32>> {
        if let Some(values) = lock(&self.embeddings).get(&key.to_string()) {
            hit(ResourceKind::Embedding, "ram");
            return Some(values.clone());
        }
        let values = self.disk.read_vector(text)?;
        hit(ResourceKind::Embedding, "disk");
        lock(&self.embeddings).put(key.to_string(), values.clone());
        Some(values)
    }

    async fn fetch_embedding(&self, text: &str, key: &str) -> Vec<f32> {
        let provider = self.embedder.name();
        let result = with_retry(&self.config.retry, provider, "embed", || {
            self.embedder.embed(text)
        })
        .await;

        match result {
            Ok(embedding) if !embedding.is_empty() => {
                self.store_embedding(text, key, &embedding.values);
                embedding.values
            }
            Ok(_) => {
                metrics::counter!(telemetry::EXTERNAL_FAILURES_TOTAL, "operation" => "embed")
                    .increment(1);
                warn!(provider, "provider returned an empty embedding");
                Vec::new()
            }
            Err(e) => {
                metrics::counter!(telemetry::EXTERNAL_FAILURES_TOTAL, "operation" => "embed")
                    .increment(1);
                warn!(provider, error = %e, "embedding unavailable");
                Vec::new()
            }
        }
    }

    fn store_embedding(&self, text: &str, key: &str, values: &[f32]) {
        lock(&self.embeddings).put(key.to_string(), values.to_vec());
        match self.disk.write_vector(text, values) {
            Ok(()) => self.note_write(),
            Err(e) => warn!(key, error = %e, "failed to write embedding cache file"),
        }
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Empty every RAM tier, including filtered views. Disk is untouched.
    pub fn clear_all(&self) {
        lock(&self.records).clear();
        lock(&self.tools).clear();
        lock(&self.embeddings).clear();
        self.filtered.invalidate_all();
        info!("in-memory caches cleared");
    }

    /// Trim every disk directory to its budget. Returns files removed.
    pub fn enforce_disk_quota(&self) -> usize {
        ResourceKind::ALL
            .iter()
            .map(|kind| self.disk.enforce_quota(*kind, self.config.max_disk_bytes))
            .sum()
    }

    pub fn stats(&self) -> CacheStats {
        self.filtered.run_pending_tasks();
        CacheStats {
            records: lock(&self.records).len(),
            tools: lock(&self.tools).len(),
            embeddings: lock(&self.embeddings).len(),
            filtered_views: self.filtered.entry_count(),
        }
    }

    fn note_write(&self) {
        let every = self.config.cleanup_every_writes;
        if every == 0 {
            return;
        }
        let n = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if n % every == 0 {
            let removed = self.enforce_disk_quota();
            debug!(writes = n, removed, "periodic disk cleanup");
        }
    }
}

fn read_source(path: &Path) -> Result<serde_json::Value> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}
