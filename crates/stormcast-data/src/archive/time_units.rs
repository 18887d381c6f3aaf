//! CF-style time coordinate encoding (`"hours since 1970-01-01T00:00:00"`).

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};

use crate::error::{DatasetError, Result};

/// Step and epoch of an integer time coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnits {
    pub step: Duration,
    pub epoch: DateTime<Utc>,
}

impl Default for TimeUnits {
    fn default() -> Self {
        Self {
            step: Duration::seconds(1),
            epoch: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl TimeUnits {
    /// Hours since the Unix epoch.
    pub fn hours_since_epoch() -> Self {
        Self {
            step: Duration::hours(1),
            ..Self::default()
        }
    }

    /// Parse `"<seconds|minutes|hours|days> since <datetime>"`.
    pub fn parse(units: &str) -> Result<Self> {
        let (unit, reference) = units
            .split_once(" since ")
            .ok_or_else(|| DatasetError::read(format!("unsupported time units '{}'", units)))?;

        let step = match unit.trim().to_lowercase().as_str() {
            "seconds" | "second" | "s" => Duration::seconds(1),
            "minutes" | "minute" | "min" => Duration::minutes(1),
            "hours" | "hour" | "h" => Duration::hours(1),
            "days" | "day" | "d" => Duration::days(1),
            other => {
                return Err(DatasetError::read(format!(
                    "unsupported time unit '{}' in '{}'",
                    other, units
                )))
            }
        };

        Ok(Self {
            step,
            epoch: parse_datetime(reference.trim())?,
        })
    }

    /// Decode one raw coordinate value.
    pub fn decode(&self, value: i64) -> Result<DateTime<Utc>> {
        const MAX_SECONDS: i64 = i64::MAX / 1000;

        self.step
            .num_seconds()
            .checked_mul(value)
            .filter(|secs| secs.abs() < MAX_SECONDS)
            .and_then(|secs| self.epoch.checked_add_signed(Duration::seconds(secs)))
            .ok_or_else(|| DatasetError::read(format!("time value {} overflows", value)))
    }

    /// Encode a timestamp; it must be a whole number of steps from the epoch.
    pub fn encode(&self, timestamp: DateTime<Utc>) -> Result<i64> {
        let delta = timestamp - self.epoch;
        let step_secs = self.step.num_seconds();
        let delta_secs = delta.num_seconds();
        if delta_secs % step_secs != 0 || delta.subsec_nanos() != 0 {
            return Err(DatasetError::write(format!(
                "{} is not a whole number of {}s steps from {}",
                timestamp, step_secs, self.epoch
            )));
        }
        Ok(delta_secs / step_secs)
    }

    /// Render as a `units` attribute.
    pub fn to_attribute(&self) -> String {
        let unit = match self.step.num_seconds() {
            1 => "seconds",
            60 => "minutes",
            3600 => "hours",
            _ => "days",
        };
        format!("{} since {}", unit, self.epoch.format("%Y-%m-%dT%H:%M:%S"))
    }
}

/// Parse RFC 3339, naive `YYYY-MM-DDTHH:MM:SS` / `YYYY-MM-DD HH:MM:SS`, or a
/// bare date (midnight UTC).
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(&format!("{}T00:00:00", s), "%Y-%m-%dT%H:%M:%S")
    {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(DatasetError::read(format!("invalid time reference '{}'", s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_units() {
        let units = TimeUnits::parse("hours since 1970-01-01T00:00:00").unwrap();
        assert_eq!(units, TimeUnits::hours_since_epoch());

        let units = TimeUnits::parse("seconds since 2019-01-01 00:00:00").unwrap();
        assert_eq!(units.step, Duration::seconds(1));
        assert_eq!(units.epoch, Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap());

        let units = TimeUnits::parse("days since 2000-01-01").unwrap();
        assert_eq!(units.step, Duration::days(1));

        assert!(TimeUnits::parse("fortnights since 2000-01-01").is_err());
        assert!(TimeUnits::parse("hours").is_err());
    }

    #[test]
    fn test_decode_encode() {
        let units = TimeUnits::hours_since_epoch();
        let t = Utc.with_ymd_and_hms(2019, 8, 3, 5, 0, 0).unwrap();
        let raw = units.encode(t).unwrap();
        assert_eq!(units.decode(raw).unwrap(), t);

        let off_grid = t + Duration::minutes(30);
        assert!(units.encode(off_grid).is_err());
    }

    #[test]
    fn test_parse_datetime_formats() {
        let expected = Utc.with_ymd_and_hms(2019, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_datetime("2019-06-01T12:00:00Z").unwrap(), expected);
        assert_eq!(parse_datetime("2019-06-01T14:00:00+02:00").unwrap(), expected);
        assert_eq!(parse_datetime("2019-06-01 12:00:00").unwrap(), expected);
        assert_eq!(
            parse_datetime("2019-06-01").unwrap(),
            Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap()
        );
        assert!(parse_datetime("June 1st").is_err());
    }

    #[test]
    fn test_to_attribute_parses_back() {
        let units = TimeUnits::hours_since_epoch();
        assert_eq!(units.to_attribute(), "hours since 1970-01-01T00:00:00");
        assert_eq!(TimeUnits::parse(&units.to_attribute()).unwrap(), units);
    }
}
