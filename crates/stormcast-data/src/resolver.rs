//! Per-year archive resolver.
//!
//! Holds one open archive per calendar year of a tier for the resolver's
//! whole lifetime and maps timestamps to them by year.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};

use crate::archive::{ArchiveLocation, YearArchive, ZarrArchive};
use crate::error::{DatasetError, Result};

/// Archives of one tier, keyed by year.
pub struct ArchiveResolver {
    tier: String,
    channels: Vec<String>,
    archives: BTreeMap<i32, Arc<dyn YearArchive>>,
    max_open: usize,
}

impl ArchiveResolver {
    /// Build a resolver over already opened archives.
    ///
    /// Every archive must carry the first archive's channel list and a
    /// distinct year, and there may be at most `max_open` of them.
    pub fn new(
        tier: impl Into<String>,
        archives: Vec<Arc<dyn YearArchive>>,
        max_open: usize,
    ) -> Result<Self> {
        let tier = tier.into();

        let channels = match archives.first() {
            Some(first) => first.channels().to_vec(),
            None => {
                return Err(DatasetError::configuration(format!(
                    "no archives for tier {}",
                    tier
                )))
            }
        };

        if archives.len() > max_open {
            return Err(DatasetError::configuration(format!(
                "tier {} has {} archives, more than the limit of {}",
                tier,
                archives.len(),
                max_open
            )));
        }
        if archives.len().saturating_mul(4) > max_open.saturating_mul(3) {
            tracing::warn!(
                tier = %tier,
                open = archives.len(),
                max_open,
                "Archive pool is more than three quarters full"
            );
        }

        let mut by_year = BTreeMap::new();
        for archive in archives {
            if archive.channels() != channels.as_slice() {
                return Err(DatasetError::configuration(format!(
                    "tier {}: archive {} has channels {:?}, expected {:?}",
                    tier,
                    archive.location(),
                    archive.channels(),
                    channels
                )));
            }

            let year = archive.year();
            if let Some(previous) = by_year.insert(year, archive) {
                return Err(DatasetError::configuration(format!(
                    "tier {}: two archives for year {} ({})",
                    tier,
                    year,
                    previous.location()
                )));
            }
        }

        tracing::info!(
            tier = %tier,
            years = ?by_year.keys().collect::<Vec<_>>(),
            channels = ?channels,
            "Opened archives"
        );

        Ok(Self {
            tier,
            channels,
            archives: by_year,
            max_open,
        })
    }

    /// Open every location as a Zarr archive, then build the resolver.
    pub fn open_zarr(
        tier: impl Into<String>,
        locations: &[ArchiveLocation],
        max_open: usize,
    ) -> Result<Self> {
        let tier = tier.into();
        if locations.len() > max_open {
            return Err(DatasetError::configuration(format!(
                "tier {} has {} archives, more than the limit of {}",
                tier,
                locations.len(),
                max_open
            )));
        }

        let archives = locations
            .iter()
            .map(|loc| {
                ZarrArchive::open(&loc.path, loc.year).map(|a| Arc::new(a) as Arc<dyn YearArchive>)
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(tier, archives, max_open)
    }

    /// Archive whose calendar year contains `timestamp`.
    pub fn resolve(&self, timestamp: DateTime<Utc>) -> Result<&Arc<dyn YearArchive>> {
        let year = timestamp.year();
        self.archives
            .get(&year)
            .ok_or_else(|| DatasetError::YearNotFound {
                tier: self.tier.clone(),
                year,
            })
    }

    /// Whether both timestamps resolve to the same archive.
    pub fn same_archive(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> Result<bool> {
        Ok(Arc::ptr_eq(self.resolve(a)?, self.resolve(b)?))
    }

    /// Archives of an input/target pair and whether they are the same one.
    pub fn resolve_pair(
        &self,
        input: DateTime<Utc>,
        target: DateTime<Utc>,
    ) -> Result<(&Arc<dyn YearArchive>, &Arc<dyn YearArchive>, bool)> {
        let a = self.resolve(input)?;
        let b = self.resolve(target)?;
        Ok((a, b, Arc::ptr_eq(a, b)))
    }

    pub fn tier(&self) -> &str {
        &self.tier
    }

    /// Channel list shared by every archive of the tier.
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn years(&self) -> Vec<i32> {
        self.archives.keys().copied().collect()
    }

    /// Archives in ascending year order.
    pub fn archives(&self) -> impl Iterator<Item = &Arc<dyn YearArchive>> {
        self.archives.values()
    }

    /// `(height, width)` of the first archive's grid.
    pub fn grid_shape(&self) -> (usize, usize) {
        self.archives
            .values()
            .next()
            .map(|a| a.grid_shape())
            .unwrap_or((0, 0))
    }

    pub fn len(&self) -> usize {
        self.archives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    pub fn max_open(&self) -> usize {
        self.max_open
    }
}

impl std::fmt::Debug for ArchiveResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveResolver")
            .field("tier", &self.tier)
            .field("channels", &self.channels)
            .field("years", &self.years())
            .field("max_open", &self.max_open)
            .finish()
    }
}
