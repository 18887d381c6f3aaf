//! Integration test: read yearly archives written in different layouts.
//!
//! 1. Archives written by `ArchiveWriter` (4-D cube, 2-D coordinate grids)
//! 2. Archives written directly with zarrs (3-D cube, 1-D axes, float time)
//! 3. Resolver construction over archives on disk

use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use stormcast_data::{
    ArchiveData, ArchiveLocation, ArchiveResolver, ArchiveWriter, ArchiveWriterConfig,
    ChannelSelection, DatasetError, YearArchive, ZarrArchive, ZarrCompression,
};
use test_utils::{channels, create_coordinate_grids, create_patterned_cube, hourly_times};
use zarrs::array::{ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::GroupBuilder;
use zarrs_filesystem::FilesystemStore;

const SECONDS_2019: &str = "seconds since 2019-01-01 00:00:00";

fn archive_data(year: i32, channel_names: &[&str]) -> ArchiveData {
    let (longitude, latitude) = create_coordinate_grids(121.0, 122.0, 26.0, 25.0, 4, 5);
    ArchiveData {
        variable: "HighRes".into(),
        channels: channels::owned(channel_names),
        times: hourly_times(year, 6),
        latitude,
        longitude,
        fields: create_patterned_cube(6, channel_names.len(), 4, 5),
    }
}

/// Write a 3-D single-variable archive with 1-D axes and a float time axis.
fn write_single_variable_archive(
    path: &Path,
    times: &[f64],
    units: Option<&str>,
    ny: usize,
    nx: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let hours = times.len();
    std::fs::create_dir_all(path)?;
    let store = Arc::new(FilesystemStore::new(path)?);
    GroupBuilder::new().build(store.clone(), "/")?.store_metadata()?;

    let mut attrs = serde_json::Map::new();
    attrs.insert("variable".to_string(), serde_json::json!("t2m"));
    let fields = ArrayBuilder::new(
        vec![hours as u64, ny as u64, nx as u64],
        DataType::Float32,
        vec![1, ny as u64, nx as u64].try_into()?,
        FillValue::from(f32::NAN),
    )
    .attributes(attrs)
    .build(store.clone(), "/fields")?;
    fields.store_metadata()?;
    let data: Vec<f32> = (0..hours * ny * nx).map(|i| i as f32).collect();
    let subset = ArraySubset::new_with_start_shape(
        vec![0, 0, 0],
        vec![hours as u64, ny as u64, nx as u64],
    )?;
    fields.store_array_subset_elements(&subset, data.as_slice())?;

    let mut time_attrs = serde_json::Map::new();
    if let Some(units) = units {
        time_attrs.insert("units".to_string(), serde_json::json!(units));
    }
    let time = ArrayBuilder::new(
        vec![hours as u64],
        DataType::Float64,
        vec![hours as u64].try_into()?,
        FillValue::from(0.0f64),
    )
    .attributes(time_attrs)
    .build(store.clone(), "/time")?;
    time.store_metadata()?;
    time.store_array_subset_elements(
        &ArraySubset::new_with_start_shape(vec![0], vec![hours as u64])?,
        times,
    )?;

    for (name, values) in [
        ("/latitude", (0..ny).map(|i| 25.0 + i as f64).collect::<Vec<_>>()),
        ("/longitude", (0..nx).map(|j| 120.0 + j as f64).collect::<Vec<_>>()),
    ] {
        let axis = ArrayBuilder::new(
            vec![values.len() as u64],
            DataType::Float64,
            vec![values.len() as u64].try_into()?,
            FillValue::from(f64::NAN),
        )
        .build(store.clone(), name)?;
        axis.store_metadata()?;
        axis.store_array_subset_elements(
            &ArraySubset::new_with_start_shape(vec![0], vec![values.len() as u64])?,
            values.as_slice(),
        )?;
    }

    Ok(())
}

#[test]
fn test_written_archive_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("HighRes/2019.zarr");
    let data = archive_data(2019, &channels::GENERIC);
    ArchiveWriter::new(ArchiveWriterConfig {
        compression: ZarrCompression::BloscLz4,
        ..Default::default()
    })
    .write_to_path(&path, &data)
    .unwrap();

    let archive = ZarrArchive::open(&path, 2019).unwrap();
    assert_eq!(archive.year(), 2019);
    assert_eq!(archive.channels(), data.channels.as_slice());
    assert_eq!(archive.times(), data.times.as_slice());
    assert_eq!(archive.latitude(), &data.latitude);
    assert_eq!(archive.longitude(), &data.longitude);
    assert_eq!(archive.grid_shape(), (4, 5));

    let t = Utc.with_ymd_and_hms(2019, 1, 1, 3, 0, 0).unwrap();
    let position = archive.time_position(t).unwrap();
    let selection = ChannelSelection::from_names(&["d", "b"], archive.channels()).unwrap();
    let planes = archive.read_fields(position, selection.positions()).unwrap();
    assert_eq!(planes.dim(), (2, 4, 5));
    assert_eq!(planes[[0, 2, 4]], 3324.0);
    assert_eq!(planes[[1, 0, 0]], 3100.0);
}

#[test]
fn test_single_variable_archive_with_axes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("2019.zarr");
    let seconds: Vec<f64> = (0..4).map(|h| (h * 3600) as f64).collect();
    write_single_variable_archive(&path, &seconds, Some(SECONDS_2019), 2, 3).unwrap();

    let archive = ZarrArchive::open(&path, 2019).unwrap();
    assert_eq!(archive.channels(), &["t2m".to_string()]);
    assert_eq!(archive.latitude().dim(), (2, 3));
    assert_eq!(archive.latitude()[[1, 2]], 26.0);
    assert_eq!(archive.longitude()[[1, 2]], 122.0);

    let t = Utc.with_ymd_and_hms(2019, 1, 1, 2, 0, 0).unwrap();
    assert_eq!(archive.time_position(t), Some(2));
    assert_eq!(archive.time_position(t + Duration::minutes(30)), None);

    let planes = archive.read_fields(2, &[0]).unwrap();
    assert_eq!(planes[[0, 0, 0]], 12.0);
    assert_eq!(planes[[0, 1, 2]], 17.0);
}

#[test]
fn test_fractional_time_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("2019.zarr");
    write_single_variable_archive(
        &path,
        &[0.0, 1.0, 1.5, 3.0],
        Some("hours since 2019-01-01 00:00:00"),
        2,
        3,
    )
    .unwrap();

    let err = ZarrArchive::open(&path, 2019).unwrap_err();
    assert!(matches!(err, DatasetError::ArchiveOpen { .. }));
}

#[test]
fn test_time_without_units_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("2019.zarr");
    write_single_variable_archive(&path, &[0.0, 3600.0], None, 2, 3).unwrap();

    let err = ZarrArchive::open(&path, 2019).unwrap_err();
    assert!(matches!(err, DatasetError::ArchiveOpen { .. }));
}

#[test]
fn test_open_rejects_non_archive() {
    let dir = tempfile::tempdir().unwrap();
    let err = ZarrArchive::open(dir.path(), 2019).unwrap_err();
    assert!(matches!(err, DatasetError::ArchiveOpen { .. }));

    let err = ZarrArchive::open(&dir.path().join("missing.zarr"), 2019).unwrap_err();
    assert!(matches!(err, DatasetError::ArchiveOpen { .. }));
}

#[test]
fn test_resolver_rejects_channel_mismatch_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let writer = ArchiveWriter::new(ArchiveWriterConfig::default());
    let first = ArchiveLocation::for_year(dir.path(), "HighRes", 2019);
    let second = ArchiveLocation::for_year(dir.path(), "HighRes", 2020);
    writer
        .write_to_path(&first.path, &archive_data(2019, &channels::GENERIC))
        .unwrap();
    writer
        .write_to_path(&second.path, &archive_data(2020, &channels::SURFACE))
        .unwrap();

    let err = ArchiveResolver::open_zarr("HighRes", &[first.clone(), second], 8).unwrap_err();
    assert!(err.is_configuration());

    let resolver = ArchiveResolver::open_zarr("HighRes", &[first], 8).unwrap();
    assert_eq!(resolver.years(), vec![2019]);
    assert_eq!(resolver.channels(), &channels::owned(&channels::GENERIC)[..]);
}
