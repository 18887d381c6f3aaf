//! Paired low/high resolution sample dataset.
//!
//! Sample `i` pairs the background (low resolution) fields at the input time
//! with the state (high resolution) fields at the input and target times.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use ndarray::{Array3, ArrayView3};

use crate::archive::{discover, ArchiveLocation};
use crate::config::{DatasetConfig, TierConfig};
use crate::error::{DatasetError, Result};
use crate::extract::extract;
use crate::index::{NoMissing, SampleIndex, UncoveredYears};
use crate::normalize::NormalizationStats;
use crate::resolver::ArchiveResolver;
use crate::types::{ChannelSelection, Split};

/// One resolution tier: its archives, channel selection and statistics.
#[derive(Debug)]
pub struct TieredSource {
    resolver: ArchiveResolver,
    selection: ChannelSelection,
    stats: Option<NormalizationStats>,
}

impl TieredSource {
    /// Combine a resolver with a channel selection and optional statistics
    /// (already subset to the selection).
    pub fn new(
        resolver: ArchiveResolver,
        selection: ChannelSelection,
        stats: Option<NormalizationStats>,
    ) -> Result<Self> {
        if let Some(stats) = &stats {
            if stats.len() != selection.len() {
                return Err(DatasetError::configuration(format!(
                    "tier {}: statistics for {} channels, selection has {}",
                    resolver.tier(),
                    stats.len(),
                    selection.len()
                )));
            }
        }
        Ok(Self {
            resolver,
            selection,
            stats,
        })
    }

    /// Open the archives at `locations`, resolve the channel request and,
    /// when `stats_dir` is given, load and subset the statistics.
    pub fn open(
        tier: &TierConfig,
        locations: &[ArchiveLocation],
        max_open: usize,
        stats_dir: Option<&Path>,
    ) -> Result<Self> {
        let resolver = ArchiveResolver::open_zarr(&tier.name, locations, max_open)?;
        let selection = ChannelSelection::resolve(&tier.channels, resolver.channels())?;
        let stats = match stats_dir {
            Some(dir) => Some(
                NormalizationStats::load(dir, resolver.channels().len())?.select(&selection)?,
            ),
            None => None,
        };
        Self::new(resolver, selection, stats)
    }

    /// Selected fields at `timestamp`, normalized when statistics are loaded.
    pub fn read(&self, timestamp: DateTime<Utc>) -> Result<Array3<f32>> {
        let archive = self.resolver.resolve(timestamp)?;
        let fields = extract(archive.as_ref(), timestamp, &self.selection)?;
        match &self.stats {
            Some(stats) => stats.normalize(fields.view()),
            None => Ok(fields),
        }
    }

    pub fn normalize(&self, fields: ArrayView3<f32>) -> Result<Array3<f32>> {
        self.require_stats()?.normalize(fields)
    }

    pub fn denormalize(&self, fields: ArrayView3<f32>) -> Result<Array3<f32>> {
        self.require_stats()?.denormalize(fields)
    }

    fn require_stats(&self) -> Result<&NormalizationStats> {
        self.stats.as_ref().ok_or_else(|| {
            DatasetError::configuration(format!(
                "tier {} has no normalization statistics loaded",
                self.resolver.tier()
            ))
        })
    }

    pub fn name(&self) -> &str {
        self.resolver.tier()
    }

    pub fn channels(&self) -> &[String] {
        self.selection.names()
    }

    pub fn selection(&self) -> &ChannelSelection {
        &self.selection
    }

    pub fn stats(&self) -> Option<&NormalizationStats> {
        self.stats.as_ref()
    }

    pub fn resolver(&self) -> &ArchiveResolver {
        &self.resolver
    }
}

/// One training example.
#[derive(Debug, Clone)]
pub struct Sample {
    pub input_time: DateTime<Utc>,
    pub target_time: DateTime<Utc>,
    /// Low resolution fields at the input time, `(channel, y, x)`.
    pub background: Array3<f32>,
    /// High resolution fields at the input time.
    pub state_input: Array3<f32>,
    /// High resolution fields at the target time.
    pub state_target: Array3<f32>,
}

/// Index plus background and state tiers.
#[derive(Debug)]
pub struct PairedDataset {
    index: SampleIndex,
    background: TieredSource,
    state: TieredSource,
}

impl PairedDataset {
    /// Discover archives under the configured location and open the split.
    pub fn open(config: &DatasetConfig, split: Split) -> Result<Self> {
        config.validate()?;

        let wanted: BTreeSet<i32> = config.years(split).iter().copied().collect();
        if wanted.is_empty() {
            return Err(DatasetError::configuration(format!(
                "no years configured for the {} split",
                split
            )));
        }

        let background_locations = select_years(&config.location, &config.background, &wanted)?;
        let state_locations = select_years(&config.location, &config.state, &wanted)?;

        let background_years: Vec<i32> = background_locations.iter().map(|l| l.year).collect();
        let state_years: Vec<i32> = state_locations.iter().map(|l| l.year).collect();
        if background_years != state_years {
            return Err(DatasetError::configuration(format!(
                "{} years {:?} differ from {} years {:?}",
                config.background.name, background_years, config.state.name, state_years
            )));
        }
        if state_years.is_empty() {
            return Err(DatasetError::configuration(format!(
                "no archives for {} years {:?} under {}",
                split,
                wanted,
                config.location.display()
            )));
        }

        let stats_dir = |tier: &TierConfig| config.normalize.then(|| config.stats_dir(tier));
        let background = TieredSource::open(
            &config.background,
            &background_locations,
            config.max_open_archives,
            stats_dir(&config.background).as_deref(),
        )?;
        let state = TieredSource::open(
            &config.state,
            &state_locations,
            config.max_open_archives,
            stats_dir(&config.state).as_deref(),
        )?;

        let index = if config.skip_uncovered_years {
            SampleIndex::with_missing(
                &state_years,
                config.lead_time_hours,
                &UncoveredYears::new(state_years.iter().copied()),
            )?
        } else {
            SampleIndex::with_missing(&state_years, config.lead_time_hours, &NoMissing)?
        };

        let dataset = Self::from_parts(index, background, state)?;

        if let Some(expected) = config.image_size {
            if dataset.image_shape() != expected {
                return Err(DatasetError::configuration(format!(
                    "{} grid is {:?}, configured image_size is {:?}",
                    config.state.name,
                    dataset.image_shape(),
                    expected
                )));
            }
        }

        tracing::info!(
            split = %split,
            years = ?state_years,
            samples = dataset.len(),
            background_channels = ?dataset.background_channels(),
            state_channels = ?dataset.state_channels(),
            image_shape = ?dataset.image_shape(),
            "Opened paired dataset"
        );

        Ok(dataset)
    }

    /// Assemble a dataset from an index and two tiers.
    pub fn from_parts(
        index: SampleIndex,
        background: TieredSource,
        state: TieredSource,
    ) -> Result<Self> {
        if background.resolver().years() != state.resolver().years() {
            return Err(DatasetError::configuration(format!(
                "{} years {:?} differ from {} years {:?}",
                background.name(),
                background.resolver().years(),
                state.name(),
                state.resolver().years()
            )));
        }
        Ok(Self {
            index,
            background,
            state,
        })
    }

    pub fn len(&self) -> usize {
        self.index.count_valid()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Fetch sample `idx`.
    pub fn get(&self, idx: usize) -> Result<Sample> {
        let (input_time, target_time) = self.index.resolve(idx)?;
        let (_, _, same_archive) = self.state.resolver().resolve_pair(input_time, target_time)?;

        tracing::debug!(
            index = idx,
            input = %input_time,
            target = %target_time,
            same_archive,
            "Fetching sample"
        );

        Ok(Sample {
            input_time,
            target_time,
            background: self.background.read(input_time)?,
            state_input: self.state.read(input_time)?,
            state_target: self.state.read(target_time)?,
        })
    }

    pub fn index(&self) -> &SampleIndex {
        &self.index
    }

    pub fn background(&self) -> &TieredSource {
        &self.background
    }

    pub fn state(&self) -> &TieredSource {
        &self.state
    }

    pub fn background_channels(&self) -> &[String] {
        self.background.channels()
    }

    pub fn state_channels(&self) -> &[String] {
        self.state.channels()
    }

    /// `(height, width)` of the state grid.
    pub fn image_shape(&self) -> (usize, usize) {
        self.state.resolver().grid_shape()
    }

    pub fn normalize_background(&self, fields: ArrayView3<f32>) -> Result<Array3<f32>> {
        self.background.normalize(fields)
    }

    pub fn denormalize_background(&self, fields: ArrayView3<f32>) -> Result<Array3<f32>> {
        self.background.denormalize(fields)
    }

    pub fn normalize_state(&self, fields: ArrayView3<f32>) -> Result<Array3<f32>> {
        self.state.normalize(fields)
    }

    pub fn denormalize_state(&self, fields: ArrayView3<f32>) -> Result<Array3<f32>> {
        self.state.denormalize(fields)
    }
}

/// Archives of a tier whose year is in `wanted`.
fn select_years(
    location: &Path,
    tier: &TierConfig,
    wanted: &BTreeSet<i32>,
) -> Result<Vec<ArchiveLocation>> {
    Ok(discover(location, &tier.name)?
        .into_iter()
        .filter(|loc| wanted.contains(&loc.year))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{meshgrid, ArchiveData, MemoryArchive, YearArchive};
    use crate::types::ChannelRequest;
    use chrono::{Duration, TimeZone};
    use ndarray::{array, Array1, Array4};
    use std::sync::Arc;

    const HOURS: i64 = 6;

    fn archive(year: i32, channels: &[&str], size: usize, offset: f32) -> Arc<dyn YearArchive> {
        let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
        let (lon, lat) = meshgrid(
            &Array1::linspace(0.0, 1.0, size),
            &Array1::linspace(0.0, 1.0, size),
        );
        let data = ArchiveData {
            variable: "v".into(),
            channels: channels.iter().map(|s| s.to_string()).collect(),
            times: (0..HOURS).map(|h| start + Duration::hours(h)).collect(),
            latitude: lat,
            longitude: lon,
            fields: Array4::from_shape_fn((HOURS as usize, channels.len(), size, size), |(t, c, _, _)| {
                offset + (t * 10 + c) as f32
            }),
        };
        Arc::new(MemoryArchive::new(year, "mem", data).unwrap())
    }

    fn tier(name: &str, channels: &[&str], size: usize, offset: f32, keep: &[&str]) -> TieredSource {
        let resolver = ArchiveResolver::new(name, vec![archive(2019, channels, size, offset)], 4)
            .unwrap();
        let selection =
            ChannelSelection::resolve(&ChannelRequest::names(keep.iter().copied()), resolver.channels())
                .unwrap();
        TieredSource::new(resolver, selection, None).unwrap()
    }

    fn dataset() -> PairedDataset {
        PairedDataset::from_parts(
            SampleIndex::new(&[2019], 1).unwrap(),
            tier("LowRes", &["u", "v", "w"], 2, 100.0, &["w", "u"]),
            tier("HighRes", &["a", "b", "c", "d", "e"], 4, 0.0, &["b", "d"]),
        )
        .unwrap()
    }

    #[test]
    fn test_get_pairs_tiers() {
        let ds = dataset();
        assert_eq!(ds.len(), 8759);
        assert_eq!(ds.image_shape(), (4, 4));
        assert_eq!(ds.state_channels(), &["b".to_string(), "d".to_string()]);

        let sample = ds.get(2).unwrap();
        assert_eq!(sample.target_time - sample.input_time, Duration::hours(1));
        assert_eq!(sample.background.dim(), (2, 2, 2));
        assert_eq!(sample.background[[0, 0, 0]], 122.0);
        assert_eq!(sample.background[[1, 0, 0]], 120.0);
        assert_eq!(sample.state_input[[0, 3, 3]], 21.0);
        assert_eq!(sample.state_input[[1, 0, 0]], 23.0);
        assert_eq!(sample.state_target[[1, 0, 0]], 33.0);
    }

    #[test]
    fn test_get_beyond_archive_times() {
        let err = dataset().get(HOURS as usize).unwrap_err();
        assert!(matches!(err, DatasetError::TimestampNotFound { .. }));
    }

    #[test]
    fn test_get_out_of_range() {
        let ds = dataset();
        let err = ds.get(ds.len()).unwrap_err();
        assert!(matches!(err, DatasetError::IndexOutOfRange { len: 8759, .. }));
    }

    #[test]
    fn test_normalization_requires_stats() {
        let ds = dataset();
        let fields = Array3::<f32>::zeros((2, 4, 4));
        assert!(ds.normalize_state(fields.view()).unwrap_err().is_configuration());
    }

    #[test]
    fn test_tier_applies_stats() {
        let resolver =
            ArchiveResolver::new("HighRes", vec![archive(2019, &["a", "b"], 2, 0.0)], 4).unwrap();
        let selection = ChannelSelection::all(resolver.channels());
        let stats = NormalizationStats::new(array![1.0, 1.0], array![2.0, 0.5]).unwrap();
        let source = TieredSource::new(resolver, selection, Some(stats)).unwrap();

        let t = Utc.with_ymd_and_hms(2019, 1, 1, 3, 0, 0).unwrap();
        let fields = source.read(t).unwrap();
        assert_eq!(fields[[0, 0, 0]], 14.5);
        assert_eq!(fields[[1, 1, 1]], 60.0);

        let back = source.denormalize(fields.view()).unwrap();
        assert_eq!(back[[1, 1, 1]], 31.0);
    }

    #[test]
    fn test_mismatched_tier_years() {
        let background = tier("LowRes", &["u"], 2, 0.0, &["u"]);
        let resolver = ArchiveResolver::new("HighRes", vec![archive(2020, &["a"], 2, 0.0)], 4)
            .unwrap();
        let selection = ChannelSelection::all(resolver.channels());
        let state = TieredSource::new(resolver, selection, None).unwrap();
        let err =
            PairedDataset::from_parts(SampleIndex::new(&[2019], 1).unwrap(), background, state)
                .unwrap_err();
        assert!(err.is_configuration());
    }
}
