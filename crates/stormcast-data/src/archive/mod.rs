//! Yearly archive abstraction.
//!
//! An archive holds one calendar year of gridded data for one resolution
//! tier: an ordered channel list, a time coordinate, 2-D latitude/longitude
//! grids and a `(time, channel, y, x)` data cube.

mod memory;
mod time_units;
mod zarr;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2, Array3, Array4};

use crate::error::{DatasetError, Result};

pub use memory::MemoryArchive;
pub use time_units::{parse_datetime, TimeUnits};
pub use zarr::ZarrArchive;

/// Path of the data cube inside an archive group.
pub const FIELDS_ARRAY: &str = "/fields";
/// Path of the time coordinate inside an archive group.
pub const TIME_ARRAY: &str = "/time";
/// Path of the latitude grid inside an archive group.
pub const LATITUDE_ARRAY: &str = "/latitude";
/// Path of the longitude grid inside an archive group.
pub const LONGITUDE_ARRAY: &str = "/longitude";

/// Read access to one year of one tier.
///
/// Implementations are read-only after construction.
pub trait YearArchive: Send + Sync + std::fmt::Debug {
    /// Coordinates and channel metadata of the archive.
    fn header(&self) -> &ArchiveHeader;

    /// Read the `(channel, y, x)` planes at a time position, in the order
    /// given by `channel_positions`.
    fn read_fields(&self, time_position: usize, channel_positions: &[usize])
        -> Result<Array3<f32>>;

    fn year(&self) -> i32 {
        self.header().year
    }

    fn location(&self) -> &str {
        &self.header().location
    }

    fn channels(&self) -> &[String] {
        &self.header().channels
    }

    fn times(&self) -> &[DateTime<Utc>] {
        &self.header().times
    }

    fn latitude(&self) -> &Array2<f64> {
        &self.header().latitude
    }

    fn longitude(&self) -> &Array2<f64> {
        &self.header().longitude
    }

    /// Exact-match lookup of a timestamp on the time coordinate.
    fn time_position(&self, timestamp: DateTime<Utc>) -> Option<usize> {
        self.header().time_lookup.get(&timestamp).copied()
    }

    /// `(height, width)` of one plane.
    fn grid_shape(&self) -> (usize, usize) {
        self.header().latitude.dim()
    }
}

/// Metadata shared by every archive implementation.
#[derive(Debug, Clone)]
pub struct ArchiveHeader {
    pub year: i32,
    pub location: String,
    pub variable: String,
    pub channels: Vec<String>,
    pub times: Vec<DateTime<Utc>>,
    pub latitude: Array2<f64>,
    pub longitude: Array2<f64>,
    time_lookup: HashMap<DateTime<Utc>, usize>,
}

impl ArchiveHeader {
    /// Validate coordinates and build the time lookup table.
    ///
    /// Duplicate timestamps and duplicate channel names are rejected, as are
    /// latitude/longitude grids of different shapes.
    pub fn new(
        year: i32,
        location: impl Into<String>,
        variable: impl Into<String>,
        channels: Vec<String>,
        times: Vec<DateTime<Utc>>,
        latitude: Array2<f64>,
        longitude: Array2<f64>,
    ) -> Result<Self> {
        let location = location.into();

        if channels.is_empty() {
            return Err(DatasetError::archive_open(&location, "archive has no channels"));
        }

        for (i, name) in channels.iter().enumerate() {
            if channels[..i].contains(name) {
                return Err(DatasetError::configuration(format!(
                    "duplicate channel '{}' in archive {}",
                    name, location
                )));
            }
        }

        if latitude.dim() != longitude.dim() {
            return Err(DatasetError::archive_open(
                &location,
                format!(
                    "latitude grid {:?} and longitude grid {:?} differ in shape",
                    latitude.dim(),
                    longitude.dim()
                ),
            ));
        }

        let mut time_lookup = HashMap::with_capacity(times.len());
        for (pos, t) in times.iter().enumerate() {
            if time_lookup.insert(*t, pos).is_some() {
                return Err(DatasetError::configuration(format!(
                    "duplicate timestamp {} in archive {}",
                    t, location
                )));
            }
        }

        Ok(Self {
            year,
            location,
            variable: variable.into(),
            channels,
            times,
            latitude,
            longitude,
            time_lookup,
        })
    }

    /// Check that a data cube shape agrees with the coordinates.
    pub(crate) fn check_cube_shape(&self, shape: &[usize]) -> Result<()> {
        let (ny, nx) = self.latitude.dim();
        let expected = [self.times.len(), self.channels.len(), ny, nx];
        if shape != expected {
            return Err(DatasetError::archive_open(
                &self.location,
                format!(
                    "data shape {:?} does not match (time, channel, y, x) = {:?}",
                    shape, expected
                ),
            ));
        }
        Ok(())
    }
}

/// Everything needed to create an archive.
#[derive(Debug, Clone)]
pub struct ArchiveData {
    /// Name of the stored variable (used as the channel name of 3-D tiers).
    pub variable: String,
    pub channels: Vec<String>,
    pub times: Vec<DateTime<Utc>>,
    pub latitude: Array2<f64>,
    pub longitude: Array2<f64>,
    /// `(time, channel, y, x)` cube.
    pub fields: Array4<f32>,
}

/// A yearly archive on disk, tagged with its year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveLocation {
    pub year: i32,
    pub path: PathBuf,
}

impl ArchiveLocation {
    pub fn new(year: i32, path: impl Into<PathBuf>) -> Self {
        Self {
            year,
            path: path.into(),
        }
    }

    /// Conventional location of `<root>/<tier>/<year>.zarr`.
    pub fn for_year(root: &Path, tier: &str, year: i32) -> Self {
        Self::new(year, root.join(tier).join(format!("{}.zarr", year)))
    }

    /// Year encoded in a `YYYY.zarr` directory name.
    pub fn year_from_path(path: &Path) -> Option<i32> {
        let name = path.file_name()?.to_str()?;
        let stem = name.strip_suffix(".zarr")?;
        if stem.len() == 4 && stem.bytes().all(|b| b.is_ascii_digit()) {
            stem.parse().ok()
        } else {
            None
        }
    }
}

/// Find every `YYYY.zarr` directory under `<root>/<tier>`, sorted by year.
pub fn discover(root: &Path, tier: &str) -> Result<Vec<ArchiveLocation>> {
    let tier_dir = root.join(tier);
    if !tier_dir.is_dir() {
        return Err(DatasetError::configuration(format!(
            "tier directory {} does not exist",
            tier_dir.display()
        )));
    }

    let mut found = Vec::new();
    let mut walker = walkdir::WalkDir::new(&tier_dir).follow_links(true).into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry.map_err(|e| DatasetError::configuration(e.to_string()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        if let Some(year) = ArchiveLocation::year_from_path(entry.path()) {
            found.push(ArchiveLocation::new(year, entry.path()));
            // Do not descend into the archive itself.
            walker.skip_current_dir();
        }
    }

    found.sort_by_key(|loc| loc.year);
    tracing::info!(
        tier = %tier,
        root = %root.display(),
        archives = found.len(),
        "Discovered archives"
    );
    Ok(found)
}

/// Expand 1-D latitude/longitude axes into `(y, x)` grids.
///
/// Returns `(lon_grid, lat_grid)` like a numpy meshgrid of `(lon, lat)`.
pub fn meshgrid(lon: &Array1<f64>, lat: &Array1<f64>) -> (Array2<f64>, Array2<f64>) {
    let (ny, nx) = (lat.len(), lon.len());
    let lon_grid = Array2::from_shape_fn((ny, nx), |(_, j)| lon[j]);
    let lat_grid = Array2::from_shape_fn((ny, nx), |(i, _)| lat[i]);
    (lon_grid, lat_grid)
}
