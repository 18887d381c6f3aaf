//! Synthetic archives for smoke tests and local development.
//!
//! Produces the on-disk layout [`PairedDataset`](crate::dataset::PairedDataset)
//! expects:
//!
//! ```text
//! <location>/<tier>/<year>.zarr
//! <location>/<tier>/stats/means.npy
//! <location>/<tier>/stats/stds.npy
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, TimeZone, Utc};
use ndarray::{Array1, Array4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::archive::{meshgrid, ArchiveData};
use crate::config::ArchiveWriterConfig;
use crate::error::{DatasetError, Result};
use crate::normalize::NormalizationStats;
use crate::types::BoundingBox;
use crate::writer::ArchiveWriter;

/// Shape and content of a dummy dataset.
#[derive(Debug, Clone)]
pub struct DummySpec {
    pub channels: Vec<String>,
    /// `(height, width)` of every grid.
    pub grid: (usize, usize),
    /// Longitudes run west to east, latitudes north to south.
    pub bbox: BoundingBox,
    /// Hours per year; `None` covers the whole calendar year.
    pub hours: Option<usize>,
    pub seed: u64,
}

impl Default for DummySpec {
    fn default() -> Self {
        Self {
            channels: ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect(),
            grid: (32, 32),
            bbox: BoundingBox::from_lat_lon(42.02, 42.06, 272.28, 272.32),
            hours: None,
            seed: 0,
        }
    }
}

/// Number of hours in a calendar year.
pub fn hours_in_year(year: i32) -> Result<usize> {
    let start = Utc
        .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| DatasetError::configuration(format!("invalid year {}", year)))?;
    let end = Utc
        .with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| DatasetError::configuration(format!("invalid year {}", year + 1)))?;
    Ok((end - start).num_hours() as usize)
}

/// Uniform random data in `[0, 1)` for one tier and year.
pub fn dummy_archive_data(year: i32, variable: &str, spec: &DummySpec) -> Result<ArchiveData> {
    let (ny, nx) = spec.grid;
    if spec.channels.is_empty() || ny == 0 || nx == 0 {
        return Err(DatasetError::configuration(
            "dummy data needs at least one channel and a non-empty grid",
        ));
    }

    let hours = match spec.hours {
        Some(h) => h,
        None => hours_in_year(year)?,
    };
    let start: DateTime<Utc> = Utc
        .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| DatasetError::configuration(format!("invalid year {}", year)))?;

    let lon = Array1::linspace(spec.bbox.min_lon, spec.bbox.max_lon, nx);
    let lat = Array1::linspace(spec.bbox.max_lat, spec.bbox.min_lat, ny);
    let (longitude, latitude) = meshgrid(&lon, &lat);

    let mut rng = StdRng::seed_from_u64(spec.seed ^ year as u64);
    let fields = Array4::from_shape_simple_fn((hours, spec.channels.len(), ny, nx), || {
        rng.gen::<f32>()
    });

    Ok(ArchiveData {
        variable: variable.to_string(),
        channels: spec.channels.clone(),
        times: (0..hours).map(|h| start + Duration::hours(h as i64)).collect(),
        latitude,
        longitude,
        fields,
    })
}

/// Random statistics with standard deviations in `[0.5, 1.5)`.
pub fn dummy_stats(channels: usize, seed: u64) -> Result<NormalizationStats> {
    let mut rng = StdRng::seed_from_u64(seed);
    let means: Array1<f32> = (0..channels).map(|_| rng.gen::<f32>()).collect();
    let stds: Array1<f32> = (0..channels).map(|_| rng.gen_range(0.5f32..1.5)).collect();
    NormalizationStats::new(means, stds)
}

/// Write dummy archives and statistics for every tier and year under
/// `location`. Returns the archive paths written.
pub fn write_dummy_dataset(
    location: &Path,
    tiers: &[&str],
    years: &[i32],
    spec: &DummySpec,
    writer_config: ArchiveWriterConfig,
) -> Result<Vec<PathBuf>> {
    let writer = ArchiveWriter::new(writer_config);
    let mut written = Vec::with_capacity(tiers.len() * years.len());

    for (i, tier) in tiers.iter().enumerate() {
        let tier_dir = location.join(tier);
        dummy_stats(spec.channels.len(), spec.seed.wrapping_add(i as u64))?
            .save(&tier_dir.join("stats"))?;

        for &year in years {
            let path = tier_dir.join(format!("{}.zarr", year));
            let data = dummy_archive_data(year, tier, spec)?;
            writer.write_to_path(&path, &data)?;
            written.push(path);
        }
    }

    tracing::info!(
        location = %location.display(),
        tiers = ?tiers,
        years = ?years,
        archives = written.len(),
        "Wrote dummy dataset"
    );
    Ok(written)
}
