//! Paired sample index.
//!
//! Enumerates every hourly input timestamp between Jan 1 00:00 of the first
//! year and Dec 31 23:00 of the last year whose target (`input + lead time`)
//! is still inside that range, and maps a flat sample index to the
//! `(input, target)` pair.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::error::{DatasetError, Result};

/// Decides whether a timestamp has no usable data.
///
/// Any `Fn(DateTime<Utc>) -> bool` is a predicate.
pub trait MissingSamples {
    fn is_missing(&self, timestamp: DateTime<Utc>) -> bool;
}

impl<F> MissingSamples for F
where
    F: Fn(DateTime<Utc>) -> bool,
{
    fn is_missing(&self, timestamp: DateTime<Utc>) -> bool {
        self(timestamp)
    }
}

/// Predicate that reports nothing as missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMissing;

impl MissingSamples for NoMissing {
    fn is_missing(&self, _timestamp: DateTime<Utc>) -> bool {
        false
    }
}

/// Marks every timestamp whose calendar year is not in the set as missing.
#[derive(Debug, Clone, Default)]
pub struct UncoveredYears {
    years: BTreeSet<i32>,
}

impl UncoveredYears {
    pub fn new(years: impl IntoIterator<Item = i32>) -> Self {
        Self {
            years: years.into_iter().collect(),
        }
    }
}

impl MissingSamples for UncoveredYears {
    fn is_missing(&self, timestamp: DateTime<Utc>) -> bool {
        use chrono::Datelike;
        !self.years.contains(&timestamp.year())
    }
}

/// Sorted list of valid input timestamps for a year range and lead time.
#[derive(Debug, Clone)]
pub struct SampleIndex {
    years: Vec<i32>,
    lead_time: Duration,
    first_sample: DateTime<Utc>,
    last_sample: DateTime<Utc>,
    total_timestamps: usize,
    valid: Vec<DateTime<Utc>>,
}

impl SampleIndex {
    /// Build the index with no missing timestamps.
    pub fn new(years: &[i32], lead_time_hours: u32) -> Result<Self> {
        Self::with_missing(years, lead_time_hours, &NoMissing)
    }

    /// Build the index, skipping inputs or targets flagged by `missing`.
    pub fn with_missing(
        years: &[i32],
        lead_time_hours: u32,
        missing: &dyn MissingSamples,
    ) -> Result<Self> {
        let years: Vec<i32> = years
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let (first_year, last_year) = match (years.first(), years.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(DatasetError::configuration("year set is empty")),
        };

        if lead_time_hours == 0 {
            return Err(DatasetError::configuration(
                "lead_time_hours must be > 0",
            ));
        }

        let first_sample = hour_of(first_year, 1, 1, 0)?;
        let last_sample = hour_of(last_year, 12, 31, 23)?;
        let lead_time = Duration::hours(lead_time_hours as i64);

        let total_timestamps = (last_sample - first_sample).num_hours() as usize + 1;

        let valid: Vec<DateTime<Utc>> = (0..total_timestamps)
            .map(|h| first_sample + Duration::hours(h as i64))
            .filter(|&t| match t.checked_add_signed(lead_time) {
                Some(target) => {
                    target <= last_sample && !missing.is_missing(t) && !missing.is_missing(target)
                }
                None => false,
            })
            .collect();

        tracing::info!(
            first_sample = %first_sample,
            last_sample = %last_sample,
            total = total_timestamps,
            valid = valid.len(),
            lead_time_hours,
            "Built sample index"
        );

        Ok(Self {
            years,
            lead_time,
            first_sample,
            last_sample,
            total_timestamps,
            valid,
        })
    }

    /// Number of servable samples.
    pub fn count_valid(&self) -> usize {
        self.valid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valid.is_empty()
    }

    /// Map a global sample index to its `(input, target)` timestamps.
    pub fn resolve(&self, global_idx: usize) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        let input = self
            .valid
            .get(global_idx)
            .copied()
            .ok_or(DatasetError::IndexOutOfRange {
                index: global_idx,
                len: self.valid.len(),
            })?;
        Ok((input, input + self.lead_time))
    }

    /// Position of an input timestamp in the index, if it is valid.
    pub fn position_of(&self, input: DateTime<Utc>) -> Option<usize> {
        self.valid.binary_search(&input).ok()
    }

    /// Deduplicated, ascending years the index was built from.
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn lead_time(&self) -> Duration {
        self.lead_time
    }

    pub fn first_sample(&self) -> DateTime<Utc> {
        self.first_sample
    }

    pub fn last_sample(&self) -> DateTime<Utc> {
        self.last_sample
    }

    /// Size of the dense hourly range, before filtering.
    pub fn total_timestamps(&self) -> usize {
        self.total_timestamps
    }

    pub fn valid_timestamps(&self) -> &[DateTime<Utc>] {
        &self.valid
    }
}

fn hour_of(year: i32, month: u32, day: u32, hour: u32) -> Result<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
        .ok_or_else(|| DatasetError::configuration(format!("year {} is out of range", year)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_single_year_lead_one() {
        let index = SampleIndex::new(&[2019], 1).unwrap();
        assert_eq!(index.total_timestamps(), 365 * 24);
        assert_eq!(index.count_valid(), 365 * 24 - 1);
        assert_eq!(index.first_sample(), ts(2019, 1, 1, 0));
        assert_eq!(index.last_sample(), ts(2019, 12, 31, 23));
    }

    #[test]
    fn test_count_matches_range_for_several_leads() {
        for lead in [1u32, 6, 24, 100] {
            let index = SampleIndex::new(&[2020, 2021], lead).unwrap();
            let total = (366 + 365) * 24;
            assert_eq!(index.total_timestamps(), total);
            assert_eq!(index.count_valid(), total - lead as usize);
        }
    }

    #[test]
    fn test_resolve_pairs() {
        let index = SampleIndex::new(&[2019], 3).unwrap();
        let (a, b) = index.resolve(0).unwrap();
        assert_eq!(a, ts(2019, 1, 1, 0));
        assert_eq!(b, ts(2019, 1, 1, 3));

        let last = index.count_valid() - 1;
        let (a, b) = index.resolve(last).unwrap();
        assert_eq!(a, ts(2019, 12, 31, 20));
        assert_eq!(b, index.last_sample());

        let mut prev = None;
        for i in (0..index.count_valid()).step_by(97) {
            let (a, b) = index.resolve(i).unwrap();
            assert_eq!(b - a, Duration::hours(3));
            if let Some(p) = prev {
                assert!(a > p);
            }
            prev = Some(a);
        }
    }

    #[test]
    fn test_resolve_out_of_range() {
        let index = SampleIndex::new(&[2019], 1).unwrap();
        let err = index.resolve(index.count_valid()).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::IndexOutOfRange { index: 8759, len: 8759 }
        ));
        assert!(index.resolve(usize::MAX).is_err());
    }

    #[test]
    fn test_empty_years_rejected() {
        let err = SampleIndex::new(&[], 1).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_zero_lead_rejected() {
        assert!(SampleIndex::new(&[2019], 0).unwrap_err().is_configuration());
    }

    #[test]
    fn test_lead_longer_than_range_gives_empty_index() {
        let index = SampleIndex::new(&[2019], 365 * 24).unwrap();
        assert_eq!(index.count_valid(), 0);
        assert!(index.is_empty());
        assert!(index.resolve(0).is_err());
    }

    #[test]
    fn test_lead_past_representable_dates_gives_empty_index() {
        let index = SampleIndex::new(&[2019], u32::MAX).unwrap();
        assert_eq!(index.count_valid(), 0);
        assert_eq!(index.total_timestamps(), 365 * 24);
    }

    #[test]
    fn test_years_are_sorted_and_deduplicated() {
        let index = SampleIndex::new(&[2021, 2019, 2021], 1).unwrap();
        assert_eq!(index.years(), &[2019, 2021]);
        assert_eq!(index.first_sample(), ts(2019, 1, 1, 0));
        assert_eq!(index.last_sample(), ts(2021, 12, 31, 23));
    }

    #[test]
    fn test_missing_predicate_skips_inputs_and_targets() {
        let gap = ts(2019, 3, 1, 12);
        let missing = move |t: DateTime<Utc>| t == gap;
        let index = SampleIndex::with_missing(&[2019], 1, &missing).unwrap();

        // The gap is dropped as an input, and the hour before it loses its target.
        assert_eq!(index.count_valid(), 365 * 24 - 1 - 2);
        assert!(index.position_of(gap).is_none());
        assert!(index.position_of(gap - Duration::hours(1)).is_none());
        assert!(index.position_of(gap + Duration::hours(1)).is_some());
    }

    #[test]
    fn test_uncovered_years_predicate() {
        let index =
            SampleIndex::with_missing(&[2018, 2020], 1, &UncoveredYears::new([2018, 2020]))
                .unwrap();
        let in_2019 = index
            .valid_timestamps()
            .iter()
            .any(|t| chrono::Datelike::year(t) == 2019);
        assert!(!in_2019);
        // Dec 31 23:00 of 2018 targets 2019 and is dropped too.
        assert!(index.position_of(ts(2018, 12, 31, 23)).is_none());
        assert_eq!(index.count_valid(), (365 * 24 - 1) + (366 * 24 - 1));
    }

    #[test]
    fn test_position_of_roundtrip() {
        let index = SampleIndex::new(&[2019], 6).unwrap();
        let (input, _) = index.resolve(1234).unwrap();
        assert_eq!(index.position_of(input), Some(1234));
    }
}
