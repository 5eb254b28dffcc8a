//! Content-independent hashing of paths and root-directory sets.
//!
//! Nothing here reads file contents: thumbnails and cache files are named
//! after *where* the source lives, so the names are stable across runs.

use blake3::Hasher as Blake3Hasher;
use std::path::{Path, PathBuf};

/// Hex characters kept in thumbnail filenames.
const PATH_HASH_LEN: usize = 8;

/// Hex characters kept in cache filenames.
const KEY_HASH_LEN: usize = 32;

/// Separator between sorted roots.
const ROOT_SEPARATOR: &[u8] = b"|";

/// Hashing helpers for deterministic file naming.
pub struct Hasher;

impl Hasher {
    /// Short BLAKE3 digest of a path string (8 hex chars).
    pub fn path_hash(path: &Path) -> String {
        let digest = blake3::hash(path.to_string_lossy().as_bytes());
        digest.to_hex().as_str()[..PATH_HASH_LEN].to_string()
    }

    /// Digest of a set of root directories, independent of input order.
    pub fn roots_hash(roots: &[PathBuf]) -> String {
        let sorted = sorted_root_strings(roots);
        let mut hasher = Blake3Hasher::new();
        for (i, root) in sorted.iter().enumerate() {
            if i > 0 {
                hasher.update(ROOT_SEPARATOR);
            }
            hasher.update(root.as_bytes());
        }
        hasher.finalize().to_hex().as_str()[..KEY_HASH_LEN].to_string()
    }
}

/// Root directories as strings, sorted.
pub fn sorted_root_strings(roots: &[PathBuf]) -> Vec<String> {
    let mut sorted: Vec<String> = roots
        .iter()
        .map(|r| r.to_string_lossy().into_owned())
        .collect();
    sorted.sort();
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_hash_is_stable_and_short() {
        let a = Hasher::path_hash(Path::new("/photos/trip/img_001.jpg"));
        let b = Hasher::path_hash(Path::new("/photos/trip/img_001.jpg"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_path_hash_differs_by_path() {
        let a = Hasher::path_hash(Path::new("/a/img.jpg"));
        let b = Hasher::path_hash(Path::new("/b/img.jpg"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_roots_hash_order_independent() {
        let ab = Hasher::roots_hash(&[PathBuf::from("/a"), PathBuf::from("/b")]);
        let ba = Hasher::roots_hash(&[PathBuf::from("/b"), PathBuf::from("/a")]);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_roots_hash_permutations_of_three() {
        let roots = ["/x", "/y/z", "/w"];
        let first = Hasher::roots_hash(&roots.iter().map(PathBuf::from).collect::<Vec<_>>());
        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in orders {
            let permuted: Vec<PathBuf> = order.iter().map(|&i| PathBuf::from(roots[i])).collect();
            assert_eq!(Hasher::roots_hash(&permuted), first);
        }
    }

    #[test]
    fn test_roots_hash_distinguishes_sets() {
        let one = Hasher::roots_hash(&[PathBuf::from("/a"), PathBuf::from("/b")]);
        let other = Hasher::roots_hash(&[PathBuf::from("/a"), PathBuf::from("/c")]);
        assert_ne!(one, other);
    }
}
