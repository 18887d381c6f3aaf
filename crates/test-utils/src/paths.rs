//! Path utilities for test datasets.
//!
//! Tests build their datasets on the fly, so this module only deals with
//! temporary directories and the `<location>/<tier>/<year>.zarr` layout.

use std::path::{Path, PathBuf};

/// Creates a temporary directory with a specific prefix.
///
/// # Arguments
///
/// * `prefix` - A prefix for the directory name (e.g., "zarr_test")
pub fn temp_test_dir_with_prefix(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temporary test directory")
}

/// Path of the yearly archive of `tier` under `location`.
pub fn archive_path(location: &Path, tier: &str, year: i32) -> PathBuf {
    location.join(tier).join(format!("{}.zarr", year))
}

/// Path of the statistics directory of `tier` under `location`.
pub fn stats_path(location: &Path, tier: &str) -> PathBuf {
    location.join(tier).join("stats")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let root = Path::new("/data");
        assert_eq!(
            archive_path(root, "HighRes", 2019),
            PathBuf::from("/data/HighRes/2019.zarr")
        );
        assert_eq!(stats_path(root, "LowRes"), PathBuf::from("/data/LowRes/stats"));
    }

    #[test]
    fn test_temp_dir_prefix() {
        let dir = temp_test_dir_with_prefix("stormcast_");
        let name = dir.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("stormcast_"));
    }
}
