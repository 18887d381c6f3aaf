//! Common test fixtures for stormcast-data tests.
//!
//! This module provides pre-defined test data that represents common
//! scenarios in paired dataset handling.

/// Common channel lists.
pub mod channels {
    /// Five generic channels, as in the dummy dataset.
    pub const GENERIC: [&str; 5] = ["a", "b", "c", "d", "e"];

    /// Surface variables of a typical high-resolution state.
    pub const SURFACE: [&str; 4] = ["t2m", "u10", "v10", "msl"];

    /// Owned copy of a channel list, as stored in archive metadata.
    pub fn owned(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }
}

/// Common bounding box definitions as `(lat_min, lat_max, lon_min, lon_max)`.
pub mod bbox {
    /// Domain of the dummy dataset (latitudes stored north to south).
    pub const DUMMY: (f64, f64, f64, f64) = (42.02, 42.06, 272.28, 272.32);
}

/// Common year sets.
pub mod years {
    /// A single non-leap year.
    pub const SINGLE: [i32; 1] = [2019];

    /// Two consecutive years spanning a leap year.
    pub const CONSECUTIVE: [i32; 2] = [2019, 2020];

    /// Years with a gap.
    pub const GAPPED: [i32; 2] = [2018, 2020];

    /// Hours in a non-leap year.
    pub const HOURS_365: usize = 365 * 24;

    /// Hours in a leap year.
    pub const HOURS_366: usize = 366 * 24;
}

/// Tier names used throughout the tests.
pub mod tiers {
    pub const BACKGROUND: &str = "LowRes";
    pub const STATE: &str = "HighRes";
}

/// YAML dataset configuration for `location` with the given years.
///
/// The state tier keeps channels `b` and `d`, the background tier keeps all.
pub fn dataset_yaml(location: &std::path::Path, train_years: &[i32], valid_years: &[i32]) -> String {
    format!(
        r#"location: {location}
train_years: {train:?}
valid_years: {valid:?}
lead_time_hours: 1
background:
  name: {background}
  channels: all
state:
  name: {state}
  channels: [b, d]
"#,
        location = location.display(),
        train = train_years,
        valid = valid_years,
        background = tiers::BACKGROUND,
        state = tiers::STATE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_fixtures_ordered() {
        let (lat_min, lat_max, lon_min, lon_max) = bbox::DUMMY;
        assert!(lat_min < lat_max);
        assert!(lon_min < lon_max);
    }

    #[test]
    fn test_dataset_yaml() {
        let yaml = dataset_yaml(std::path::Path::new("/data"), &[2019], &[]);
        assert!(yaml.contains("location: /data"));
        assert!(yaml.contains("train_years: [2019]"));
        assert!(yaml.contains("valid_years: []"));
    }

    #[test]
    fn test_owned_channels() {
        assert_eq!(channels::owned(&channels::GENERIC[..2]), vec!["a", "b"]);
    }
}
