//! Content-addressed on-disk cache.
//!
//! One sub-directory per [`ResourceKind`]. File names are the SHA-256 hex
//! digest of the logical key, so a given file path or text always lands
//! in the same file. Records and tools are stored as JSON; embeddings as
//! a raw little-endian `f32` blob.
//!
//! Writes go to a temporary file in the target directory and are renamed
//! over the destination, so a concurrent reader sees either the previous
//! file or the complete new one.
//!
//! Read failures are reported as misses. A file that exists but cannot be
//! decoded is deleted so the next write starts clean.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::ResourceKind;
use crate::telemetry;
use crate::{MaitreError, Result};

/// SHA-256 hex digest of `text`.
pub fn content_key(text: &str) -> String {
    Sha256::digest(text.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Modification time of a file, `None` if it cannot be read.
pub fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Disk tier shared by every resource kind.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Open (and create if needed) the cache directories under `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for kind in ResourceKind::ALL {
            fs::create_dir_all(root.join(kind.dir_name()))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding files of `kind`.
    pub fn dir(&self, kind: ResourceKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Cache file path for a logical key.
    pub fn path_for(&self, kind: ResourceKind, key: &str) -> PathBuf {
        let ext = match kind {
            ResourceKind::Records | ResourceKind::Tools => "json",
            ResourceKind::Embedding => "bin",
        };
        self.dir(kind).join(format!("{}.{ext}", content_key(key)))
    }

    /// Read a JSON entry if it was written no earlier than `source_mtime`.
    ///
    /// Stale entries are left in place (the caller overwrites them);
    /// undecodable entries are deleted.
    pub fn read_json_fresh<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        key: &str,
        source_mtime: SystemTime,
    ) -> Option<T> {
        let path = self.path_for(kind, key);
        let cached_at = modified_time(&path)?;
        if cached_at < source_mtime {
            debug!(kind = kind.as_str(), key, "disk entry older than source");
            return None;
        }
        let bytes = fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                self.discard_corrupt(kind, &path, &e.to_string());
                None
            }
        }
    }

    /// Atomically write a JSON entry.
    pub fn write_json<T: Serialize>(&self, kind: ResourceKind, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.write_atomic(&self.path_for(kind, key), &bytes)
    }

    /// Read an embedding vector. Embedding entries never go stale.
    pub fn read_vector(&self, key: &str) -> Option<Vec<f32>> {
        let path = self.path_for(ResourceKind::Embedding, key);
        let bytes = fs::read(&path).ok()?;
        match decode_vector(&bytes) {
            Some(values) => Some(values),
            None => {
                self.discard_corrupt(
                    ResourceKind::Embedding,
                    &path,
                    &format!("bad vector blob of {} bytes", bytes.len()),
                );
                None
            }
        }
    }

    /// Atomically write an embedding vector. Empty vectors are refused.
    pub fn write_vector(&self, key: &str, values: &[f32]) -> Result<()> {
        if values.is_empty() {
            return Err(MaitreError::InvalidInput(
                "refusing to cache an empty embedding".into(),
            ));
        }
        let path = self.path_for(ResourceKind::Embedding, key);
        self.write_atomic(&path, &encode_vector(values))
    }

    /// Total bytes currently stored for `kind`.
    pub fn size(&self, kind: ResourceKind) -> u64 {
        list_files(&self.dir(kind)).iter().map(|f| f.len).sum()
    }

    /// Delete oldest files of `kind` until the directory fits `max_bytes`.
    ///
    /// Files are removed in ascending modification-time order (ties broken
    /// by path), so no kept file is ever older than a deleted one. Returns
    /// the number of files removed.
    pub fn enforce_quota(&self, kind: ResourceKind, max_bytes: u64) -> usize {
        let mut files = list_files(&self.dir(kind));
        let mut total: u64 = files.iter().map(|f| f.len).sum();
        if total <= max_bytes {
            return 0;
        }

        files.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));

        let mut removed = 0;
        for file in files {
            if total <= max_bytes {
                break;
            }
            match fs::remove_file(&file.path) {
                Ok(()) => {
                    total = total.saturating_sub(file.len);
                    removed += 1;
                    metrics::counter!(telemetry::DISK_EVICTIONS_TOTAL, "kind" => kind.as_str())
                        .increment(1);
                    info!(kind = kind.as_str(), path = %file.path.display(), "removed old cache file");
                }
                Err(e) => {
                    warn!(path = %file.path.display(), error = %e, "failed to remove cache file")
                }
            }
        }
        removed
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| MaitreError::InvalidInput(format!("no parent for {path:?}")))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| MaitreError::Io(e.error))?;
        Ok(())
    }

    fn discard_corrupt(&self, kind: ResourceKind, path: &Path, reason: &str) {
        warn!(kind = kind.as_str(), path = %path.display(), reason, "corrupt cache file, removing");
        if let Err(e) = fs::remove_file(path) {
            debug!(path = %path.display(), error = %e, "could not remove corrupt cache file");
        }
    }
}

struct CacheFile {
    path: PathBuf,
    modified: SystemTime,
    len: u64,
}

fn list_files(dir: &Path) -> Vec<CacheFile> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let meta = entry.metadata().ok()?;
            if !meta.is_file() {
                return None;
            }
            Some(CacheFile {
                path: entry.path(),
                modified: meta.modified().ok()?,
                len: meta.len(),
            })
        })
        .collect()
}

fn encode_vector(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}
