//! Per-channel mean/std normalization.
//!
//! Statistics live next to each tier as `stats/means.npy` and
//! `stats/stds.npy`, one value per stored channel, and are subset to the
//! channel selection once at setup.

use std::path::Path;

use ndarray::{Array1, Array3, ArrayView1, ArrayView3, Axis};
use ndarray_npy::{read_npy, write_npy};

use crate::error::{DatasetError, Result};
use crate::types::ChannelSelection;

/// File name of the per-channel means.
pub const MEANS_FILE: &str = "means.npy";
/// File name of the per-channel standard deviations.
pub const STDS_FILE: &str = "stds.npy";

/// Validated per-channel statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationStats {
    means: Array1<f32>,
    stds: Array1<f32>,
}

impl NormalizationStats {
    /// Validate and wrap statistics.
    ///
    /// Lengths must agree, every mean must be finite and every std finite
    /// and non-zero.
    pub fn new(means: Array1<f32>, stds: Array1<f32>) -> Result<Self> {
        if means.len() != stds.len() {
            return Err(DatasetError::configuration(format!(
                "{} means but {} stds",
                means.len(),
                stds.len()
            )));
        }
        if let Some((i, m)) = means.iter().enumerate().find(|(_, m)| !m.is_finite()) {
            return Err(DatasetError::configuration(format!(
                "mean of channel {} is {}",
                i, m
            )));
        }
        if let Some((i, s)) = stds
            .iter()
            .enumerate()
            .find(|(_, s)| !s.is_finite() || **s == 0.0)
        {
            return Err(DatasetError::configuration(format!(
                "std of channel {} is {}",
                i, s
            )));
        }
        Ok(Self { means, stds })
    }

    /// Load `means.npy` and `stds.npy` from `dir`, checking that they hold
    /// one value per stored channel.
    pub fn load(dir: &Path, expected_channels: usize) -> Result<Self> {
        let means = read_stats_file(&dir.join(MEANS_FILE))?;
        let stds = read_stats_file(&dir.join(STDS_FILE))?;

        for (name, values) in [(MEANS_FILE, &means), (STDS_FILE, &stds)] {
            if values.len() != expected_channels {
                return Err(DatasetError::configuration(format!(
                    "{} in {} has {} values for {} channels",
                    name,
                    dir.display(),
                    values.len(),
                    expected_channels
                )));
            }
        }

        let stats = Self::new(means, stds)?;
        tracing::debug!(dir = %dir.display(), channels = expected_channels, "Loaded statistics");
        Ok(stats)
    }

    /// Write `means.npy` and `stds.npy` (f32) into `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        write_npy(dir.join(MEANS_FILE), &self.means).map_err(DatasetError::write)?;
        write_npy(dir.join(STDS_FILE), &self.stds).map_err(DatasetError::write)?;
        Ok(())
    }

    /// Statistics of the selected channels, in selection order.
    pub fn select(&self, selection: &ChannelSelection) -> Result<Self> {
        if let Some(&bad) = selection.positions().iter().find(|&&p| p >= self.len()) {
            return Err(DatasetError::configuration(format!(
                "channel position {} outside statistics of length {}",
                bad,
                self.len()
            )));
        }
        Ok(Self {
            means: self.means.select(Axis(0), selection.positions()),
            stds: self.stds.select(Axis(0), selection.positions()),
        })
    }

    pub fn means(&self) -> &Array1<f32> {
        &self.means
    }

    pub fn stds(&self) -> &Array1<f32> {
        &self.stds
    }

    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    pub fn normalize(&self, fields: ArrayView3<f32>) -> Result<Array3<f32>> {
        normalize(fields, self.means.view(), self.stds.view())
    }

    pub fn denormalize(&self, fields: ArrayView3<f32>) -> Result<Array3<f32>> {
        denormalize(fields, self.means.view(), self.stds.view())
    }
}

/// `(fields - means) / stds`, statistics broadcast over `(channel, 1, 1)`.
pub fn normalize(
    fields: ArrayView3<f32>,
    means: ArrayView1<f32>,
    stds: ArrayView1<f32>,
) -> Result<Array3<f32>> {
    check_channels(&fields, &means, &stds)?;
    let means = per_channel(means);
    let stds = per_channel(stds);
    Ok((&fields - &means) / &stds)
}

/// `fields * stds + means`, the inverse of [`normalize`].
pub fn denormalize(
    fields: ArrayView3<f32>,
    means: ArrayView1<f32>,
    stds: ArrayView1<f32>,
) -> Result<Array3<f32>> {
    check_channels(&fields, &means, &stds)?;
    let means = per_channel(means);
    let stds = per_channel(stds);
    Ok(&fields * &stds + &means)
}

fn per_channel(values: ArrayView1<f32>) -> ArrayView3<f32> {
    values.insert_axis(Axis(1)).insert_axis(Axis(2))
}

fn check_channels(
    fields: &ArrayView3<f32>,
    means: &ArrayView1<f32>,
    stds: &ArrayView1<f32>,
) -> Result<()> {
    let channels = fields.len_of(Axis(0));
    if means.len() != channels || stds.len() != channels {
        return Err(DatasetError::configuration(format!(
            "statistics for {}/{} channels applied to {} channels",
            means.len(),
            stds.len(),
            channels
        )));
    }
    Ok(())
}

/// Read a 1-D statistics file stored as f32 or f64.
fn read_stats_file(path: &Path) -> Result<Array1<f32>> {
    let location = path.display().to_string();
    if !path.is_file() {
        return Err(DatasetError::stats_load(&location, "file not found"));
    }

    match read_npy::<_, Array1<f32>>(path) {
        Ok(values) => Ok(values),
        Err(_) => read_npy::<_, Array1<f64>>(path)
            .map(|values| values.mapv(|v| v as f32))
            .map_err(|e| DatasetError::stats_load(&location, e)),
    }
}
