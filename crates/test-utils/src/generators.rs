//! Test data generators for creating synthetic archive contents.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

use chrono::{DateTime, Duration, TimeZone, Utc};
use ndarray::{Array1, Array2, Array4};

/// Creates `hours` consecutive hourly timestamps starting at Jan 1 00:00 UTC
/// of `year`.
///
/// # Example
///
/// ```
/// use test_utils::hourly_times;
///
/// let times = hourly_times(2019, 3);
/// assert_eq!(times.len(), 3);
/// assert_eq!(times[2].to_rfc3339(), "2019-01-01T02:00:00+00:00");
/// ```
pub fn hourly_times(year: i32, hours: usize) -> Vec<DateTime<Utc>> {
    let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
    (0..hours)
        .map(|h| start + Duration::hours(h as i64))
        .collect()
}

/// Value stored at `(t, c, y, x)` by [`create_patterned_cube`].
///
/// Each cell value is calculated as: `t * 1000 + c * 100 + y * 10 + x`
///
/// This makes it easy to verify that the right time step, channel and cell
/// came back, as long as every dimension stays below 10 (100 for time).
pub fn patterned_value(t: usize, c: usize, y: usize, x: usize) -> f32 {
    (t * 1000 + c * 100 + y * 10 + x) as f32
}

/// Creates a `(time, channel, y, x)` cube filled with [`patterned_value`].
///
/// # Example
///
/// ```
/// use test_utils::create_patterned_cube;
///
/// let cube = create_patterned_cube(3, 2, 4, 5);
/// assert_eq!(cube.dim(), (3, 2, 4, 5));
/// assert_eq!(cube[[2, 1, 3, 4]], 2134.0);
/// ```
pub fn create_patterned_cube(times: usize, channels: usize, ny: usize, nx: usize) -> Array4<f32> {
    Array4::from_shape_fn((times, channels, ny, nx), |(t, c, y, x)| {
        patterned_value(t, c, y, x)
    })
}

/// Sets the given `(y, x)` cells to NaN at every time step and channel.
///
/// Useful for testing missing data handling.
pub fn with_nans(mut cube: Array4<f32>, nan_cells: &[(usize, usize)]) -> Array4<f32> {
    let (_, _, ny, nx) = cube.dim();
    for &(y, x) in nan_cells {
        if y < ny && x < nx {
            cube.slice_mut(ndarray::s![.., .., y, x]).fill(f32::NAN);
        }
    }
    cube
}

/// Creates `(lon_grid, lat_grid)` for a regular grid.
///
/// Latitude runs from `lat_start` (row 0) to `lat_end`, so a descending
/// latitude axis is obtained with `lat_start > lat_end`.
pub fn create_coordinate_grids(
    lon_start: f64,
    lon_end: f64,
    lat_start: f64,
    lat_end: f64,
    ny: usize,
    nx: usize,
) -> (Array2<f64>, Array2<f64>) {
    let lon = Array1::linspace(lon_start, lon_end, nx);
    let lat = Array1::linspace(lat_start, lat_end, ny);
    let lon_grid = Array2::from_shape_fn((ny, nx), |(_, j)| lon[j]);
    let lat_grid = Array2::from_shape_fn((ny, nx), |(i, _)| lat[i]);
    (lon_grid, lat_grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hourly_times_cross_midnight() {
        let times = hourly_times(2020, 30);
        assert_eq!(times[24], Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_patterned_cube() {
        let cube = create_patterned_cube(2, 3, 4, 5);
        assert_eq!(cube[[0, 0, 0, 0]], 0.0);
        assert_eq!(cube[[1, 2, 3, 4]], 1234.0);
    }

    #[test]
    fn test_with_nans() {
        let cube = with_nans(create_patterned_cube(2, 2, 3, 3), &[(1, 1), (9, 9)]);
        assert!(cube[[1, 1, 1, 1]].is_nan());
        assert_eq!(cube.iter().filter(|v| v.is_nan()).count(), 4);
    }

    #[test]
    fn test_coordinate_grids() {
        let (lon, lat) = create_coordinate_grids(121.0, 122.0, 26.0, 25.0, 3, 5);
        assert_eq!(lon.dim(), (3, 5));
        assert_eq!(lon[[2, 4]], 122.0);
        assert_eq!(lat[[0, 3]], 26.0);
        assert_eq!(lat[[2, 0]], 25.0);
    }
}
