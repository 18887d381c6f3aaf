//! Configuration for the paired dataset and the archive writer.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, Result};
use crate::types::{ChannelRequest, Split};

/// Default upper bound on simultaneously open archives per tier.
pub const DEFAULT_MAX_OPEN_ARCHIVES: usize = 32;

/// Configuration of one resolution tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    /// Directory name under the dataset location, also the data variable name.
    pub name: String,

    /// Channels to keep, `"all"` or a list of names.
    #[serde(default)]
    pub channels: ChannelRequest,
}

impl TierConfig {
    pub fn new(name: impl Into<String>, channels: ChannelRequest) -> Self {
        Self {
            name: name.into(),
            channels,
        }
    }
}

/// Configuration of the paired dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Root directory holding one sub-directory per tier.
    pub location: PathBuf,

    /// Years served by the training split.
    #[serde(default)]
    pub train_years: Vec<i32>,

    /// Years served by the validation split.
    #[serde(default)]
    pub valid_years: Vec<i32>,

    /// Hours between an input sample and its target (`dt`).
    pub lead_time_hours: u32,

    /// Low-resolution tier (background).
    pub background: TierConfig,

    /// High-resolution tier (state).
    pub state: TierConfig,

    /// Apply mean/std normalization to returned fields.
    #[serde(default = "default_true")]
    pub normalize: bool,

    /// Upper bound on open archives per tier.
    #[serde(default = "default_max_open_archives")]
    pub max_open_archives: usize,

    /// Expected `(height, width)` of the state grid, checked at open.
    #[serde(default)]
    pub image_size: Option<(usize, usize)>,

    /// Treat timestamps in years absent from the split as missing instead of
    /// failing on lookup.
    #[serde(default)]
    pub skip_uncovered_years: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_open_archives() -> usize {
    DEFAULT_MAX_OPEN_ARCHIVES
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            location: PathBuf::from("./data"),
            train_years: Vec::new(),
            valid_years: Vec::new(),
            lead_time_hours: 1,
            background: TierConfig::new("LowRes", ChannelRequest::All),
            state: TierConfig::new("HighRes", ChannelRequest::All),
            normalize: true,
            max_open_archives: DEFAULT_MAX_OPEN_ARCHIVES,
            image_size: None,
            skip_uncovered_years: false,
        }
    }
}

impl DatasetConfig {
    /// Load configuration from a YAML file, then apply environment overrides.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DatasetError::configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        let mut config: Self = serde_yaml::from_str(&content)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `STORMCAST_*` environment variables.
    pub fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("STORMCAST_LOCATION") {
            self.location = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("STORMCAST_LEAD_TIME_HOURS") {
            if let Ok(hours) = val.parse() {
                self.lead_time_hours = hours;
            }
        }

        if let Ok(val) = std::env::var("STORMCAST_MAX_OPEN_ARCHIVES") {
            if let Ok(max) = val.parse() {
                self.max_open_archives = max;
            }
        }

        if let Ok(val) = std::env::var("STORMCAST_NORMALIZE") {
            self.normalize = val.to_lowercase() == "true" || val == "1";
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.lead_time_hours == 0 {
            return Err(DatasetError::configuration("lead_time_hours must be > 0"));
        }

        if self.max_open_archives == 0 {
            return Err(DatasetError::configuration("max_open_archives must be > 0"));
        }

        if self.background.name.is_empty() || self.state.name.is_empty() {
            return Err(DatasetError::configuration("tier names must not be empty"));
        }

        if self.background.name == self.state.name {
            return Err(DatasetError::configuration(format!(
                "background and state tiers share the name '{}'",
                self.background.name
            )));
        }

        if let Some((h, w)) = self.image_size {
            if h == 0 || w == 0 {
                return Err(DatasetError::configuration("image_size must be non-zero"));
            }
        }

        Ok(())
    }

    /// Years of a split.
    pub fn years(&self, split: Split) -> &[i32] {
        match split {
            Split::Train => &self.train_years,
            Split::Valid => &self.valid_years,
        }
    }

    /// Directory of a tier.
    pub fn tier_dir(&self, tier: &TierConfig) -> PathBuf {
        self.location.join(&tier.name)
    }

    /// Directory holding a tier's `means.npy` / `stds.npy`.
    pub fn stats_dir(&self, tier: &TierConfig) -> PathBuf {
        self.tier_dir(tier).join("stats")
    }
}

/// Configuration for writing archives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveWriterConfig {
    /// Number of time steps per chunk.
    pub time_chunk: usize,

    /// Compression codec for the data cube.
    pub compression: ZarrCompression,

    /// Compression level (1-9).
    pub compression_level: u8,

    /// Enable byte shuffle filter for better compression.
    pub shuffle: bool,
}

impl Default for ArchiveWriterConfig {
    fn default() -> Self {
        Self {
            time_chunk: 1,
            compression: ZarrCompression::None,
            compression_level: 1,
            shuffle: true,
        }
    }
}

impl ArchiveWriterConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("ZARR_TIME_CHUNK") {
            if let Ok(size) = val.parse() {
                config.time_chunk = size;
            }
        }

        if let Ok(val) = std::env::var("ZARR_COMPRESSION") {
            config.compression = ZarrCompression::from_str(&val);
        }

        if let Ok(val) = std::env::var("ZARR_COMPRESSION_LEVEL") {
            if let Ok(level) = val.parse() {
                config.compression_level = level;
            }
        }

        if let Ok(val) = std::env::var("ZARR_SHUFFLE") {
            config.shuffle = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.time_chunk == 0 {
            return Err(DatasetError::configuration("time_chunk must be > 0"));
        }

        if self.compression_level == 0 || self.compression_level > 9 {
            return Err(DatasetError::configuration("compression_level must be 1-9"));
        }

        Ok(())
    }
}

/// Compression codec for Zarr arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ZarrCompression {
    /// No compression.
    #[default]
    None,
    /// LZ4 compression.
    Lz4,
    /// Zstd compression.
    Zstd,
    /// Blosc with LZ4.
    BloscLz4,
    /// Blosc with Zstd.
    BloscZstd,
}

impl ZarrCompression {
    /// Parse from string (case-insensitive); unknown names mean no compression.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "lz4" => Self::Lz4,
            "zstd" => Self::Zstd,
            "blosc_lz4" => Self::BloscLz4,
            "blosc_zstd" => Self::BloscZstd,
            _ => Self::None,
        }
    }

    /// Get the codec name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lz4 => "lz4",
            Self::Zstd => "zstd",
            Self::BloscLz4 => "blosc_lz4",
            Self::BloscZstd => "blosc_zstd",
        }
    }
}

impl std::fmt::Display for ZarrCompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
location: /data/stormcast
train_years: [2018, 2019]
valid_years: [2020]
lead_time_hours: 1
background:
  name: LowRes
  channels: all
state:
  name: HighRes
  channels: [t2m, u10]
image_size: [32, 32]
"#;

    #[test]
    fn test_parse_yaml() {
        let config: DatasetConfig = serde_yaml::from_str(YAML).unwrap();
        assert_eq!(config.location, PathBuf::from("/data/stormcast"));
        assert_eq!(config.years(Split::Train), &[2018, 2019]);
        assert_eq!(config.years(Split::Valid), &[2020]);
        assert_eq!(config.background.channels, ChannelRequest::All);
        assert_eq!(config.state.channels, ChannelRequest::names(["t2m", "u10"]));
        assert_eq!(config.image_size, Some((32, 32)));
        assert!(config.normalize);
        assert_eq!(config.max_open_archives, DEFAULT_MAX_OPEN_ARCHIVES);
        assert!(config.validate().is_ok());
        assert_eq!(
            config.stats_dir(&config.state),
            PathBuf::from("/data/stormcast/HighRes/stats")
        );
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.yaml");
        std::fs::write(&path, YAML).unwrap();
        let config = DatasetConfig::from_yaml(&path).unwrap();
        assert_eq!(config.state.name, "HighRes");

        assert!(DatasetConfig::from_yaml(dir.path().join("missing.yaml"))
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn test_validation() {
        let mut config = DatasetConfig::default();
        assert!(config.validate().is_ok());

        config.lead_time_hours = 0;
        assert!(config.validate().is_err());

        config = DatasetConfig::default();
        config.max_open_archives = 0;
        assert!(config.validate().is_err());

        config = DatasetConfig::default();
        config.state.name = config.background.name.clone();
        assert!(config.validate().is_err());

        config = DatasetConfig::default();
        config.image_size = Some((0, 32));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_writer_config_validation() {
        let mut config = ArchiveWriterConfig::default();
        assert!(config.validate().is_ok());

        config.time_chunk = 0;
        assert!(config.validate().is_err());

        config = ArchiveWriterConfig::default();
        config.compression_level = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zarr_compression_from_str() {
        assert_eq!(ZarrCompression::from_str("none"), ZarrCompression::None);
        assert_eq!(ZarrCompression::from_str("lz4"), ZarrCompression::Lz4);
        assert_eq!(ZarrCompression::from_str("BLOSC_ZSTD"), ZarrCompression::BloscZstd);
        assert_eq!(ZarrCompression::from_str("invalid"), ZarrCompression::None);
    }
}
