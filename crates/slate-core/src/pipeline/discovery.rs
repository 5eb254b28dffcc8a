//! Directory scanning: find images and group them into slates.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::ScanConfig;
use crate::types::{sort_by_filename, Image, Slate, SlateMap, METADATA_KEY};

/// Slate name used for a root directory's own files.
pub const ROOT_SLATE: &str = "/";

/// Result of scanning one or more roots.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Slates found across all existing roots
    pub slates: SlateMap,
    /// Roots that did not exist and contributed nothing
    pub missing_roots: Vec<PathBuf>,
}

impl ScanOutcome {
    pub fn image_count(&self) -> usize {
        self.slates.values().map(|s| s.images.len()).sum()
    }
}

/// Walks root directories and groups image files by containing directory.
pub struct DirectoryScanner {
    config: ScanConfig,
    exclude: Vec<glob::Pattern>,
}

impl DirectoryScanner {
    /// Create a new scanner. Invalid exclusion patterns are logged and ignored.
    pub fn new(config: ScanConfig) -> Self {
        let exclude = config
            .exclude_patterns
            .iter()
            .filter_map(|p| match glob::Pattern::new(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    tracing::warn!("Ignoring invalid exclude pattern {:?}: {}", p, e);
                    None
                }
            })
            .collect();
        Self { config, exclude }
    }

    /// Scan a single root.
    ///
    /// Returns `None` when the root does not exist. Symbolic links are not
    /// followed, and directories without matching files produce no slate.
    pub fn scan(&self, root: &Path) -> Option<SlateMap> {
        if !root.is_dir() {
            tracing::error!("Slate directory does not exist: {:?}", root);
            return None;
        }
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());

        let mut by_dir: BTreeMap<String, Vec<Image>> = BTreeMap::new();
        let walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded_dir(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {:?}: {}", root, e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.is_image_entry(&entry) {
                continue;
            }
            let parent = entry.path().parent().unwrap_or(&root);
            let slate_name = relative_slate_name(&root, parent);
            by_dir
                .entry(slate_name)
                .or_default()
                .push(Image::discovered(entry.path()));
        }

        let mut slates = SlateMap::new();
        for (dir_name, mut images) in by_dir {
            sort_by_filename(&mut images);
            let name = unique_name(&slates, &dir_name);
            if name != dir_name {
                tracing::warn!("Slate name {} is reserved: renamed to {}", dir_name, name);
            }
            tracing::info!("Found {} images in slate: {}", images.len(), name);
            slates.insert(name.clone(), Slate::new(name, images));
        }
        Some(slates)
    }

    /// Scan several roots together.
    ///
    /// With more than one root, slate names are prefixed by each root's
    /// basename (the root's own files become `"<basename>/Root"`); clashing
    /// names get a `_2`, `_3`, ... suffix.
    pub fn scan_roots(&self, roots: &[PathBuf]) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();

        if let [root] = roots {
            match self.scan(root) {
                Some(slates) => outcome.slates = slates,
                None => outcome.missing_roots.push(root.clone()),
            }
            return outcome;
        }

        for root in roots {
            let Some(slates) = self.scan(root) else {
                tracing::warn!("Skipping non-existent root directory: {:?}", root);
                outcome.missing_roots.push(root.clone());
                continue;
            };
            let prefix = root_prefix(root);
            tracing::info!("Scanned {:?} (prefix: {})", root, prefix);

            for (name, slate) in slates {
                let prefixed = if name == ROOT_SLATE {
                    format!("{prefix}/Root")
                } else {
                    format!("{prefix}/{}", name.trim_start_matches('/'))
                };
                let unique = unique_name(&outcome.slates, &prefixed);
                if unique != prefixed {
                    tracing::warn!("Slate name conflict: renamed {} to {}", prefixed, unique);
                }
                outcome
                    .slates
                    .insert(unique.clone(), Slate::new(unique, slate.images));
            }
        }

        tracing::info!(
            "Scan complete: {} slates from {} directories",
            outcome.slates.len(),
            roots.len()
        );
        outcome
    }

    /// Check if a file has a supported extension.
    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.to_lowercase() == ext_lower)
            })
            .unwrap_or(false)
    }

    /// Resource-fork files carry an image extension but are not images.
    pub fn is_resource_fork(&self, path: &Path) -> bool {
        !self.config.resource_fork_prefix.is_empty()
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&self.config.resource_fork_prefix))
    }

    fn is_image_entry(&self, entry: &DirEntry) -> bool {
        let path = entry.path();
        self.is_supported(path) && !self.is_resource_fork(path) && !self.matches_exclude(entry)
    }

    fn is_excluded_dir(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_dir() && self.matches_exclude(entry)
    }

    fn matches_exclude(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        self.exclude.iter().any(|p| p.matches(&name))
    }
}

/// Path of `dir` relative to `root`, joined with `/`; the root itself is `"/"`.
fn relative_slate_name(root: &Path, dir: &Path) -> String {
    let relative = dir.strip_prefix(root).unwrap_or(dir);
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        ROOT_SLATE.to_string()
    } else {
        parts.join("/")
    }
}

/// Namespace prefix for a root: its basename, or a sanitized form of the path.
fn root_prefix(root: &Path) -> String {
    if let Some(name) = root.file_name() {
        return name.to_string_lossy().into_owned();
    }
    let sanitized = root
        .to_string_lossy()
        .replace(['/', '\\'], "_")
        .trim_matches('_')
        .to_string();
    if sanitized.is_empty() {
        "Root".to_string()
    } else {
        sanitized
    }
}

/// `candidate`, or the first free `candidate_N`. The cache metadata key is
/// always taken.
fn unique_name(existing: &SlateMap, candidate: &str) -> String {
    let taken = |name: &str| name == METADATA_KEY || existing.contains_key(name);
    if !taken(candidate) {
        return candidate.to_string();
    }
    let mut counter = 2;
    loop {
        let name = format!("{candidate}_{counter}");
        if !taken(&name) {
            return name;
        }
        counter += 1;
    }
}
