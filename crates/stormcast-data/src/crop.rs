//! Nearest-index spatial cropping.
//!
//! A bounding box is turned into inclusive row/column ranges by snapping each
//! edge to the nearest coordinate value. The cropped region can therefore
//! extend up to half a grid cell inside or outside the requested box.

use std::ops::RangeInclusive;

use ndarray::{Array1, Array2, ArrayBase, ArrayView, ArrayView1, Axis, Data, Dimension, Slice};

use crate::archive::{meshgrid, ArchiveData};
use crate::error::{DatasetError, Result};
use crate::types::BoundingBox;

/// Index of the coordinate closest to `value`.
///
/// Ties resolve to the first minimum. NaN coordinates are skipped.
pub fn nearest_index(axis: ArrayView1<f64>, value: f64) -> Result<usize> {
    if value.is_nan() {
        return Err(DatasetError::configuration("cannot snap a NaN coordinate"));
    }

    let mut best: Option<(usize, f64)> = None;
    for (i, &coord) in axis.iter().enumerate() {
        if coord.is_nan() {
            continue;
        }
        let dist = (coord - value).abs();
        if best.map_or(true, |(_, d)| dist < d) {
            best = Some((i, dist));
        }
    }

    best.map(|(i, _)| i).ok_or_else(|| {
        DatasetError::configuration(format!(
            "axis of length {} has no finite coordinates",
            axis.len()
        ))
    })
}

/// Nearest indices of `vmin` and `vmax`, in ascending order.
pub fn index_bounds(axis: ArrayView1<f64>, vmin: f64, vmax: f64) -> Result<(usize, usize)> {
    let a = nearest_index(axis, vmin)?;
    let b = nearest_index(axis, vmax)?;
    Ok((a.min(b), a.max(b)))
}

/// Inclusive row and column ranges of a crop. Bounds are always ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropWindow {
    rows: RangeInclusive<usize>,
    cols: RangeInclusive<usize>,
}

impl CropWindow {
    /// Window over the given ranges; reversed bounds are swapped.
    pub fn new(rows: RangeInclusive<usize>, cols: RangeInclusive<usize>) -> Self {
        Self {
            rows: ascending(rows),
            cols: ascending(cols),
        }
    }

    pub fn rows(&self) -> &RangeInclusive<usize> {
        &self.rows
    }

    pub fn cols(&self) -> &RangeInclusive<usize> {
        &self.cols
    }

    /// Window over 1-D latitude (rows) and longitude (columns) axes.
    pub fn from_bbox(lat: ArrayView1<f64>, lon: ArrayView1<f64>, bbox: &BoundingBox) -> Result<Self> {
        let (i0, i1) = index_bounds(lat, bbox.min_lat, bbox.max_lat)?;
        let (j0, j1) = index_bounds(lon, bbox.min_lon, bbox.max_lon)?;
        Ok(Self::new(i0..=i1, j0..=j1))
    }

    /// Window over 2-D rectilinear grids, using the first column of the
    /// latitude grid and the first row of the longitude grid as axes.
    pub fn from_grids(
        latitude: &Array2<f64>,
        longitude: &Array2<f64>,
        bbox: &BoundingBox,
    ) -> Result<Self> {
        if latitude.is_empty() || longitude.is_empty() {
            return Err(DatasetError::configuration("cannot crop an empty grid"));
        }
        Self::from_bbox(
            latitude.index_axis(Axis(1), 0),
            longitude.index_axis(Axis(0), 0),
            bbox,
        )
    }

    /// `(height, width)` of the cropped region.
    pub fn shape(&self) -> (usize, usize) {
        (
            self.rows.end() + 1 - self.rows.start(),
            self.cols.end() + 1 - self.cols.start(),
        )
    }

    /// View of `array` restricted to the window on its trailing `(y, x)`
    /// axes; leading axes are kept whole.
    pub fn apply<'a, A, S, D>(&self, array: &'a ArrayBase<S, D>) -> Result<ArrayView<'a, A, D>>
    where
        S: Data<Elem = A>,
        D: Dimension,
    {
        let ndim = array.ndim();
        if ndim < 2 {
            return Err(DatasetError::configuration(format!(
                "cannot crop an array with {} dimensions",
                ndim
            )));
        }

        let (ny, nx) = (array.len_of(Axis(ndim - 2)), array.len_of(Axis(ndim - 1)));
        if *self.rows.end() >= ny || *self.cols.end() >= nx {
            return Err(DatasetError::configuration(format!(
                "crop rows {:?} cols {:?} outside a {}x{} grid",
                self.rows, self.cols, ny, nx
            )));
        }

        let mut view = array.view();
        view.slice_axis_inplace(
            Axis(ndim - 2),
            Slice::from(*self.rows.start()..*self.rows.end() + 1),
        );
        view.slice_axis_inplace(
            Axis(ndim - 1),
            Slice::from(*self.cols.start()..*self.cols.end() + 1),
        );
        Ok(view)
    }

    /// Cropped `(lon_grid, lat_grid)` from 1-D axes.
    pub fn meshgrid(
        &self,
        lat: ArrayView1<f64>,
        lon: ArrayView1<f64>,
    ) -> Result<(Array2<f64>, Array2<f64>)> {
        if *self.rows.end() >= lat.len() || *self.cols.end() >= lon.len() {
            return Err(DatasetError::configuration(format!(
                "crop rows {:?} cols {:?} outside axes of length {}/{}",
                self.rows,
                self.cols,
                lat.len(),
                lon.len()
            )));
        }
        let lat: Array1<f64> = lat
            .slice_axis(Axis(0), Slice::from(*self.rows.start()..*self.rows.end() + 1))
            .to_owned();
        let lon: Array1<f64> = lon
            .slice_axis(Axis(0), Slice::from(*self.cols.start()..*self.cols.end() + 1))
            .to_owned();
        Ok(meshgrid(&lon, &lat))
    }

    /// Crop every field and both coordinate grids of an archive.
    pub fn crop_archive(&self, data: &ArchiveData) -> Result<ArchiveData> {
        Ok(ArchiveData {
            variable: data.variable.clone(),
            channels: data.channels.clone(),
            times: data.times.clone(),
            latitude: self.apply(&data.latitude)?.to_owned(),
            longitude: self.apply(&data.longitude)?.to_owned(),
            fields: self.apply(&data.fields)?.to_owned(),
        })
    }
}

fn ascending(range: RangeInclusive<usize>) -> RangeInclusive<usize> {
    let (a, b) = range.into_inner();
    a.min(b)..=a.max(b)
}
