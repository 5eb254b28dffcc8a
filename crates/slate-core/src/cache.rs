//! Persistent scan cache, one JSON document per set of root directories.
//!
//! A cache is keyed by a hash of the sorted absolute root paths, so the same
//! set always maps to the same file. Validity is judged against a snapshot of
//! the newest directory mtime under the roots taken when the cache was saved.

use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

use crate::error::CacheError;
use crate::pipeline::hash::{sorted_root_strings, Hasher};
use crate::types::{CacheMetadata, CacheRecord, SlateMap, CACHE_VERSION};

const COMPOSITE_PREFIX: &str = "composite_";

/// Why a present cache should not be trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// No metadata block, or an older format version
    LegacyFormat,
    /// A watched root no longer exists
    RootMissing(PathBuf),
    /// A watched root changed after the snapshot
    RootModified(PathBuf),
    /// The stored root set differs from the requested one
    RootSetChanged,
}

impl std::fmt::Display for StaleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StaleReason::LegacyFormat => write!(f, "cache uses a legacy format"),
            StaleReason::RootMissing(p) => write!(f, "directory {} no longer exists", p.display()),
            StaleReason::RootModified(p) => write!(f, "directory {} changed since the last scan", p.display()),
            StaleReason::RootSetChanged => write!(f, "cache was built for a different set of directories"),
        }
    }
}

/// Result of checking a cache against the current filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    Valid,
    Stale(StaleReason),
    Missing,
}

impl CacheStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, CacheStatus::Valid)
    }
}

#[derive(Serialize)]
struct CacheDocument<'a> {
    #[serde(rename = "_metadata")]
    metadata: &'a CacheMetadata,
    #[serde(flatten)]
    slates: &'a SlateMap,
}

/// Reads, writes and validates cache files in one directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic, order-independent key for a set of roots.
    pub fn cache_key(roots: &[PathBuf]) -> String {
        let roots = normalize(roots);
        let hash = Hasher::roots_hash(&roots);
        if roots.len() > 1 {
            format!("{COMPOSITE_PREFIX}{hash}")
        } else {
            hash
        }
    }

    /// File that holds the cache for `roots`.
    pub fn cache_path(&self, roots: &[PathBuf]) -> PathBuf {
        self.dir.join(format!("{}.json", Self::cache_key(roots)))
    }

    /// Newest directory mtime across the existing `roots`; missing roots are skipped.
    ///
    /// Take this before walking the roots so changes made during a scan
    /// leave the saved cache stale.
    pub fn dir_snapshot(roots: &[PathBuf]) -> f64 {
        normalize(roots)
            .iter()
            .filter_map(|root| tree_mtime(root))
            .fold(0.0, f64::max)
    }

    /// Persist `slates` for `roots`, replacing any previous file atomically.
    pub fn save(&self, roots: &[PathBuf], slates: &SlateMap) -> Result<PathBuf, CacheError> {
        self.save_at(roots, slates, Self::dir_snapshot(roots))
    }

    /// Like [`save`](Self::save), with a directory snapshot taken earlier.
    pub fn save_at(
        &self,
        roots: &[PathBuf],
        slates: &SlateMap,
        dir_mtime: f64,
    ) -> Result<PathBuf, CacheError> {
        let normalized = normalize(roots);
        let metadata = CacheMetadata {
            version: CACHE_VERSION,
            scan_time: now_secs(),
            file_count: slates.values().map(|s| s.images.len()).sum(),
            dir_mtime,
            root_dirs: (normalized.len() > 1).then(|| sorted_root_strings(&normalized)),
        };
        let json = serde_json::to_vec(&CacheDocument {
            metadata: &metadata,
            slates,
        })?;

        let path = self.cache_path(roots);
        fs::create_dir_all(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })?;
        write_atomic(&path, &json)?;

        tracing::info!(
            "Saved cache for {} images to {:?}",
            metadata.file_count,
            path
        );
        Ok(path)
    }

    /// Slate map stored for `roots`, or `None` when absent or unreadable.
    pub fn load(&self, roots: &[PathBuf]) -> Option<SlateMap> {
        self.load_record(roots).map(|record| record.slates)
    }

    /// `true` only when the cache exists and is current.
    pub fn validate(&self, roots: &[PathBuf]) -> bool {
        self.status(roots).is_valid()
    }

    /// Check the cache for `roots` against the filesystem.
    pub fn status(&self, roots: &[PathBuf]) -> CacheStatus {
        let Some(record) = self.load_record(roots) else {
            return CacheStatus::Missing;
        };
        let Some(metadata) = record.metadata else {
            return CacheStatus::Stale(StaleReason::LegacyFormat);
        };
        if metadata.version < CACHE_VERSION {
            return CacheStatus::Stale(StaleReason::LegacyFormat);
        }

        let normalized = normalize(roots);
        for root in &normalized {
            if !root.is_dir() {
                return CacheStatus::Stale(StaleReason::RootMissing(root.clone()));
            }
            if tree_mtime(root).is_some_and(|mtime| mtime > metadata.dir_mtime) {
                return CacheStatus::Stale(StaleReason::RootModified(root.clone()));
            }
        }

        if normalized.len() > 1
            && metadata.root_dirs.as_deref() != Some(sorted_root_strings(&normalized).as_slice())
        {
            return CacheStatus::Stale(StaleReason::RootSetChanged);
        }
        CacheStatus::Valid
    }

    /// Remove the cache for `roots`. Returns whether a file was deleted.
    pub fn clear(&self, roots: &[PathBuf]) -> Result<bool, CacheError> {
        let path = self.cache_path(roots);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    /// Remove every cache file. Returns how many were deleted.
    pub fn clear_all(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for path in self.entries() {
            fs::remove_file(&path).map_err(|source| CacheError::Io {
                path: path.clone(),
                source,
            })?;
            removed += 1;
        }
        Ok(removed)
    }

    /// All cache files in the store directory, sorted.
    pub fn entries(&self) -> Vec<PathBuf> {
        let Ok(read_dir) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut entries: Vec<PathBuf> = read_dir
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        entries.sort();
        entries
    }

    fn load_record(&self, roots: &[PathBuf]) -> Option<CacheRecord> {
        let path = self.cache_path(roots);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No cache at {:?}", path);
                return None;
            }
            Err(e) => {
                tracing::warn!("Could not read cache {:?}: {}", path, e);
                return None;
            }
        };
        match serde_json::from_str::<CacheRecord>(&content) {
            Ok(record) => Some(record.restore_names()),
            Err(e) => {
                tracing::warn!("Ignoring corrupt cache {:?}: {}", path, e);
                None
            }
        }
    }
}

/// Absolute forms of `roots` without trailing separators, as used for keys
/// and snapshots.
fn normalize(roots: &[PathBuf]) -> Vec<PathBuf> {
    roots
        .iter()
        .map(|r| {
            std::path::absolute(r)
                .unwrap_or_else(|_| r.clone())
                .components()
                .collect::<PathBuf>()
        })
        .collect()
}

/// Newest mtime among `root` and all directories below it.
///
/// File mtimes are not consulted: adding or removing a file bumps its
/// directory, and unchanged files keep their cached tags either way.
fn tree_mtime(root: &Path) -> Option<f64> {
    if !root.is_dir() {
        return None;
    }
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter_map(|e| e.metadata().ok()?.modified().ok())
        .filter_map(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .reduce(f64::max)
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(format!(".{}.tmp", std::process::id()));
    let tmp = path.with_file_name(tmp_name);

    let result = fs::write(&tmp, bytes).and_then(|()| fs::rename(&tmp, path));
    result.map_err(|source| {
        let _ = fs::remove_file(&tmp);
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}
