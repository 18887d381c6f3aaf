//! Zarr V3 archive reader.
//!
//! Layout of one yearly archive group:
//!
//! ```text
//! 2019.zarr/
//!   fields      f32 (time, channel, y, x) or (time, y, x)
//!               attrs: variable, channels
//!   time        i64 or f64 (time,), attrs: units = "<unit> since <datetime>"
//!   latitude    f64 (y, x) or (y,)
//!   longitude   f64 (y, x) or (x,)
//! ```

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use ndarray::{Array1, Array2, Array3, Axis};
use zarrs::array::{Array, DataType};
use zarrs::array_subset::ArraySubset;
use zarrs::storage::ReadableStorageTraits;
use zarrs_filesystem::FilesystemStore;

use super::{
    meshgrid, ArchiveHeader, TimeUnits, YearArchive, FIELDS_ARRAY, LATITUDE_ARRAY,
    LONGITUDE_ARRAY, TIME_ARRAY,
};
use crate::error::{DatasetError, Result};

/// Whether the data cube carries an explicit channel dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CubeLayout {
    /// `(time, channel, y, x)`
    Channels,
    /// `(time, y, x)`, exposed as a single channel named after the variable.
    Single,
}

/// Yearly archive backed by a Zarr V3 group.
pub struct ZarrArchive<S: ?Sized = FilesystemStore> {
    header: ArchiveHeader,
    fields: Array<S>,
    layout: CubeLayout,
}

impl ZarrArchive<FilesystemStore> {
    /// Open the archive directory at `path` for `year`.
    pub fn open(path: &Path, year: i32) -> Result<Self> {
        let location = path.display().to_string();
        if !path.is_dir() {
            return Err(DatasetError::archive_open(&location, "not a directory"));
        }
        let store = FilesystemStore::new(path)
            .map_err(|e| DatasetError::archive_open(&location, e))?;
        Self::open_storage(Arc::new(store), year, location)
    }
}

impl<S: ReadableStorageTraits + ?Sized + 'static> ZarrArchive<S> {
    /// Open the archive group at the root of `storage`.
    pub fn open_storage(storage: Arc<S>, year: i32, location: impl Into<String>) -> Result<Self> {
        let location = location.into();
        let open = |path: &str| {
            Array::open(storage.clone(), path)
                .map_err(|e| DatasetError::archive_open(&location, format!("{}: {}", path, e)))
        };

        let fields = open(FIELDS_ARRAY)?;
        let time = open(TIME_ARRAY)?;
        let latitude = open(LATITUDE_ARRAY)?;
        let longitude = open(LONGITUDE_ARRAY)?;

        if *fields.data_type() != DataType::Float32 {
            return Err(DatasetError::archive_open(
                &location,
                format!("fields must be float32, found {:?}", fields.data_type()),
            ));
        }

        let attrs = fields.attributes();
        let variable = attrs
            .get("variable")
            .and_then(|v| v.as_str())
            .unwrap_or("fields")
            .to_string();

        let layout = match fields.shape().len() {
            4 => CubeLayout::Channels,
            3 => CubeLayout::Single,
            n => {
                return Err(DatasetError::archive_open(
                    &location,
                    format!("fields must have 3 or 4 dimensions, found {}", n),
                ))
            }
        };

        let channels = match layout {
            CubeLayout::Single => vec![variable.clone()],
            CubeLayout::Channels => attrs
                .get("channels")
                .and_then(|v| v.as_array())
                .and_then(|names| {
                    names
                        .iter()
                        .map(|n| n.as_str().map(str::to_string))
                        .collect::<Option<Vec<_>>>()
                })
                .ok_or_else(|| {
                    DatasetError::archive_open(&location, "missing or invalid 'channels' attribute")
                })?,
        };

        let times = read_times(&time).map_err(|e| DatasetError::archive_open(&location, e))?;
        let (latitude, longitude) = read_grids(&latitude, &longitude)
            .map_err(|e| DatasetError::archive_open(&location, e))?;

        let header = ArchiveHeader::new(
            year, &location, variable, channels, times, latitude, longitude,
        )?;

        let mut shape: Vec<usize> = fields.shape().iter().map(|&d| d as usize).collect();
        if layout == CubeLayout::Single {
            shape.insert(1, 1);
        }
        header.check_cube_shape(&shape)?;

        if let Some(stray) = header.times.iter().find(|t| t.year() != year) {
            tracing::warn!(
                path = %location,
                year,
                timestamp = %stray,
                "Archive contains timestamps outside its year"
            );
        }

        tracing::debug!(
            path = %location,
            year,
            channels = ?header.channels,
            times = header.times.len(),
            grid = ?header.latitude.dim(),
            "Opened archive"
        );

        Ok(Self {
            header,
            fields,
            layout,
        })
    }

    /// Read one `(y, x)` plane.
    fn read_plane(&self, time_position: usize, channel: usize) -> Result<Array2<f32>> {
        let (ny, nx) = self.header.latitude.dim();
        let (start, shape) = match self.layout {
            CubeLayout::Channels => (
                vec![time_position as u64, channel as u64, 0, 0],
                vec![1, 1, ny as u64, nx as u64],
            ),
            CubeLayout::Single => (
                vec![time_position as u64, 0, 0],
                vec![1, ny as u64, nx as u64],
            ),
        };

        let subset = ArraySubset::new_with_start_shape(start, shape).map_err(DatasetError::read)?;
        let data: Vec<f32> = self
            .fields
            .retrieve_array_subset_elements(&subset)
            .map_err(DatasetError::read)?;

        Array2::from_shape_vec((ny, nx), data).map_err(DatasetError::read)
    }
}

impl<S: ?Sized> std::fmt::Debug for ZarrArchive<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZarrArchive")
            .field("location", &self.header.location)
            .field("year", &self.header.year)
            .field("layout", &self.layout)
            .field("channels", &self.header.channels)
            .field("times", &self.header.times.len())
            .finish()
    }
}

impl<S: ReadableStorageTraits + ?Sized + Send + Sync + 'static> YearArchive for ZarrArchive<S> {
    fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    fn read_fields(
        &self,
        time_position: usize,
        channel_positions: &[usize],
    ) -> Result<Array3<f32>> {
        if time_position >= self.header.times.len() {
            return Err(DatasetError::read(format!(
                "time position {} out of range for {}",
                time_position, self.header.location
            )));
        }

        let (ny, nx) = self.header.latitude.dim();
        let mut out = Array3::<f32>::zeros((channel_positions.len(), ny, nx));
        for (mut plane, &channel) in out.axis_iter_mut(Axis(0)).zip(channel_positions) {
            if channel >= self.header.channels.len() {
                return Err(DatasetError::read(format!(
                    "channel position {} out of range for {}",
                    channel, self.header.location
                )));
            }
            plane.assign(&self.read_plane(time_position, channel)?);
        }
        Ok(out)
    }
}

fn whole<S: ?Sized>(array: &Array<S>) -> std::result::Result<ArraySubset, String> {
    ArraySubset::new_with_start_shape(vec![0; array.shape().len()], array.shape().to_vec())
        .map_err(|e| e.to_string())
}

fn read_f64<S: ReadableStorageTraits + ?Sized + 'static>(
    array: &Array<S>,
) -> std::result::Result<Vec<f64>, String> {
    match array.data_type() {
        DataType::Float64 => array
            .retrieve_array_subset_elements::<f64>(&whole(array)?)
            .map_err(|e| e.to_string()),
        DataType::Float32 => array
            .retrieve_array_subset_elements::<f32>(&whole(array)?)
            .map(|v| v.into_iter().map(f64::from).collect())
            .map_err(|e| e.to_string()),
        other => Err(format!("expected a float coordinate, found {:?}", other)),
    }
}

fn read_times<S: ReadableStorageTraits + ?Sized + 'static>(
    time: &Array<S>,
) -> std::result::Result<Vec<DateTime<Utc>>, String> {
    if time.shape().len() != 1 {
        return Err(format!("time must be 1-D, found shape {:?}", time.shape()));
    }

    let units = match time.attributes().get("units").and_then(|v| v.as_str()) {
        Some(u) => TimeUnits::parse(u).map_err(|e| e.to_string())?,
        None => return Err("time has no 'units' attribute".to_string()),
    };

    let raw: Vec<i64> = match time.data_type() {
        DataType::Int64 => time
            .retrieve_array_subset_elements::<i64>(&whole(time)?)
            .map_err(|e| e.to_string())?,
        DataType::Float64 | DataType::Float32 => read_f64(time)?
            .into_iter()
            .map(whole_step)
            .collect::<std::result::Result<_, _>>()?,
        other => return Err(format!("unsupported time data type {:?}", other)),
    };

    raw.into_iter()
        .map(|v| units.decode(v).map_err(|e| e.to_string()))
        .collect()
}

/// Float time values must be whole numbers of steps; lookups are exact.
fn whole_step(value: f64) -> std::result::Result<i64, String> {
    if !value.is_finite() || value.fract() != 0.0 || value.abs() >= i64::MAX as f64 {
        return Err(format!("time value {} is not a whole number of steps", value));
    }
    Ok(value as i64)
}

/// Read latitude/longitude as 2-D grids, expanding 1-D axes.
fn read_grids<S: ReadableStorageTraits + ?Sized + 'static>(
    latitude: &Array<S>,
    longitude: &Array<S>,
) -> std::result::Result<(Array2<f64>, Array2<f64>), String> {
    let lat = read_f64(latitude)?;
    let lon = read_f64(longitude)?;

    match (latitude.shape(), longitude.shape()) {
        ([ny, nx], [ny2, nx2]) if ny == ny2 && nx == nx2 => {
            let shape = (*ny as usize, *nx as usize);
            let lat = Array2::from_shape_vec(shape, lat).map_err(|e| e.to_string())?;
            let lon = Array2::from_shape_vec(shape, lon).map_err(|e| e.to_string())?;
            Ok((lat, lon))
        }
        ([_], [_]) => {
            let (lon_grid, lat_grid) = meshgrid(&Array1::from(lon), &Array1::from(lat));
            Ok((lat_grid, lon_grid))
        }
        (a, b) => Err(format!(
            "incompatible latitude {:?} and longitude {:?} shapes",
            a, b
        )),
    }
}
