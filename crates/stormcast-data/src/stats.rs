//! Offline computation of normalization statistics.

use chrono::{DateTime, Utc};
use ndarray::{Array1, Axis};

use crate::archive::YearArchive;
use crate::error::{DatasetError, Result};
use crate::normalize::NormalizationStats;
use crate::types::ChannelSelection;

/// Streaming mean/variance of one channel (Welford, f64).
#[derive(Debug, Clone, Copy, Default)]
struct Running {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Running {
    fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    fn std(&self) -> f64 {
        (self.m2 / self.count as f64).sqrt()
    }
}

/// Per-channel mean and population standard deviation over every plane
/// with a timestamp in `start..=end`.
///
/// NaN values are ignored. Accumulation is in f64; the result is stored as
/// f32. A channel without a single finite value is an error, as is a range
/// that matches no timestamp.
pub fn compute_stats(
    archives: &[&dyn YearArchive],
    selection: &ChannelSelection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<NormalizationStats> {
    if start > end {
        return Err(DatasetError::configuration(format!(
            "statistics range starts at {} after its end {}",
            start, end
        )));
    }

    let mut running = vec![Running::default(); selection.len()];
    let mut planes = 0usize;

    for archive in archives {
        for (position, t) in archive.times().iter().enumerate() {
            if *t < start || *t > end {
                continue;
            }
            let fields = archive.read_fields(position, selection.positions())?;
            for (acc, plane) in running.iter_mut().zip(fields.axis_iter(Axis(0))) {
                for &v in plane.iter().filter(|v| !v.is_nan()) {
                    acc.push(f64::from(v));
                }
            }
            planes += 1;
        }
        tracing::debug!(year = archive.year(), planes, "Accumulated statistics");
    }

    if planes == 0 {
        return Err(DatasetError::configuration(format!(
            "no timestamps between {} and {}",
            start, end
        )));
    }

    if let Some(i) = running.iter().position(|r| r.count == 0) {
        return Err(DatasetError::configuration(format!(
            "channel '{}' has no finite values between {} and {}",
            selection.names()[i],
            start,
            end
        )));
    }

    let means: Array1<f32> = running.iter().map(|r| r.mean as f32).collect();
    let stds: Array1<f32> = running.iter().map(|r| r.std() as f32).collect();

    tracing::info!(
        channels = ?selection.names(),
        planes,
        means = ?means.to_vec(),
        stds = ?stds.to_vec(),
        "Computed statistics"
    );

    NormalizationStats::new(means, stds)
}
