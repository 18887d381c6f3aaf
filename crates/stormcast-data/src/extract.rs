//! Time-slice extraction from a yearly archive.

use chrono::{DateTime, Utc};
use ndarray::Array3;

use crate::archive::YearArchive;
use crate::error::{DatasetError, Result};
use crate::types::ChannelSelection;

/// Read the `(channel, y, x)` fields of `archive` at exactly `timestamp`.
///
/// Channels come out in the order of `selection`. The timestamp must equal a
/// value of the archive's time coordinate; there is no nearest-time fallback.
pub fn extract(
    archive: &dyn YearArchive,
    timestamp: DateTime<Utc>,
    selection: &ChannelSelection,
) -> Result<Array3<f32>> {
    let position = archive
        .time_position(timestamp)
        .ok_or(DatasetError::TimestampNotFound {
            year: archive.year(),
            timestamp,
        })?;

    archive.read_fields(position, selection.positions())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{meshgrid, ArchiveData, MemoryArchive};
    use chrono::{Duration, TimeZone};
    use ndarray::Array1;
    use test_utils::create_patterned_cube;

    fn archive() -> MemoryArchive {
        let start = Utc.with_ymd_and_hms(2019, 3, 1, 0, 0, 0).unwrap();
        let (lon, lat) = meshgrid(&Array1::linspace(0.0, 3.0, 4), &Array1::linspace(0.0, 2.0, 3));
        let channels: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        MemoryArchive::new(
            2019,
            "mem",
            ArchiveData {
                variable: "fields".into(),
                channels,
                times: (0..6).map(|h| start + Duration::hours(h)).collect(),
                latitude: lat,
                longitude: lon,
                fields: create_patterned_cube(6, 5, 3, 4),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_extract_selected_channels_in_order() {
        let archive = archive();
        let selection = ChannelSelection::from_names(&["b", "d"], archive.channels()).unwrap();
        let t = Utc.with_ymd_and_hms(2019, 3, 1, 2, 0, 0).unwrap();

        let out = extract(&archive, t, &selection).unwrap();
        assert_eq!(out.dim(), (2, 3, 4));
        assert_eq!(out[[0, 0, 0]], 2100.0);
        assert_eq!(out[[1, 2, 3]], 2323.0);
    }

    #[test]
    fn test_extract_requires_exact_timestamp() {
        let archive = archive();
        let selection = ChannelSelection::all(archive.channels());
        let t = Utc.with_ymd_and_hms(2019, 3, 1, 2, 30, 0).unwrap();

        let err = extract(&archive, t, &selection).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::TimestampNotFound { year: 2019, timestamp } if timestamp == t
        ));
    }

    #[test]
    fn test_extract_does_not_modify_archive() {
        let archive = archive();
        let before = archive.fields().clone();
        let selection = ChannelSelection::from_names(&["e"], archive.channels()).unwrap();
        let t = Utc.with_ymd_and_hms(2019, 3, 1, 5, 0, 0).unwrap();

        let mut out = extract(&archive, t, &selection).unwrap();
        out.fill(0.0);
        assert_eq!(archive.fields(), &before);
    }
}
