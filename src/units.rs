//! CF time units ("<unit> since <reference>") and UTC formatting

use crate::errors::{GliderError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Units string written on `time` and `time_uv`.
pub const EPOCH_SECONDS_UNITS: &str = "seconds since 1970-01-01 00:00:00 UTC";

/// Calendar written on `time` and `time_uv`.
pub const DEFAULT_CALENDAR: &str = "gregorian";

/// Fixed-precision format for coverage attributes.
pub const COVERAGE_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

const SUPPORTED_CALENDARS: [&str; 3] = ["gregorian", "standard", "proleptic_gregorian"];

/// Step size of a CF time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeStep {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeStep {
    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => Some(TimeStep::Seconds),
            "min" | "mins" | "minute" | "minutes" => Some(TimeStep::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(TimeStep::Hours),
            "d" | "day" | "days" => Some(TimeStep::Days),
            _ => None,
        }
    }

    const fn seconds(self) -> f64 {
        match self {
            TimeStep::Seconds => 1.0,
            TimeStep::Minutes => 60.0,
            TimeStep::Hours => 3_600.0,
            TimeStep::Days => 86_400.0,
        }
    }
}

/// A decoded CF time axis definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeUnits {
    pub step: TimeStep,
    pub reference: DateTime<Utc>,
}

impl TimeUnits {
    /// Parse a units string and optional calendar.
    ///
    /// Only Gregorian-style calendars are accepted; anything else fails with
    /// `UnitsParse` because offsets could not be converted to UTC instants.
    pub fn parse(units: &str, calendar: Option<&str>) -> Result<Self> {
        let fail = |message: &str| GliderError::UnitsParse {
            units: units.to_string(),
            message: message.to_string(),
        };

        if let Some(cal) = calendar {
            let cal = cal.trim().to_ascii_lowercase();
            if !SUPPORTED_CALENDARS.contains(&cal.as_str()) {
                return Err(GliderError::UnitsParse {
                    units: units.to_string(),
                    message: format!("unsupported calendar '{}'", cal),
                });
            }
        }

        let (step, reference) = units
            .split_once(" since ")
            .ok_or_else(|| fail("expected '<unit> since <reference>'"))?;
        let step = TimeStep::parse(step.trim()).ok_or_else(|| fail("unknown time step"))?;
        let reference = parse_reference(reference).ok_or_else(|| fail("unparseable reference time"))?;

        Ok(Self { step, reference })
    }

    /// Convert an axis offset into an instant.
    pub fn to_datetime(&self, offset: f64) -> Result<DateTime<Utc>> {
        if !offset.is_finite() {
            return Err(GliderError::InvalidInput(format!(
                "non-finite time offset {}",
                offset
            )));
        }
        let out_of_range = || GliderError::InvalidInput(format!("time offset {} out of range", offset));
        let millis = (offset * self.step.seconds() * 1_000.0).round();
        if millis.abs() >= i64::MAX as f64 {
            return Err(out_of_range());
        }
        let delta = Duration::try_milliseconds(millis as i64).ok_or_else(out_of_range)?;
        self.reference
            .checked_add_signed(delta)
            .ok_or_else(out_of_range)
    }

    /// Convert an instant into an axis offset.
    pub fn offset_of(&self, instant: &DateTime<Utc>) -> f64 {
        let delta = instant.signed_duration_since(self.reference);
        let seconds = delta.num_seconds() as f64 + f64::from(delta.subsec_nanos()) * 1e-9;
        seconds / self.step.seconds()
    }
}

/// Seconds since the Unix epoch, with sub-second precision.
pub fn epoch_seconds(instant: &DateTime<Utc>) -> f64 {
    instant.timestamp() as f64 + f64::from(instant.timestamp_subsec_nanos()) * 1e-9
}

/// Format an instant the way coverage attributes are stored.
pub fn format_coverage(instant: &DateTime<Utc>) -> String {
    instant.format(COVERAGE_FORMAT).to_string()
}

fn parse_reference(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    let trimmed = trimmed
        .strip_suffix("UTC")
        .or_else(|| trimmed.strip_suffix('Z'))
        .unwrap_or(trimmed)
        .trim();

    const DATETIME_FORMATS: [&str; 5] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| Utc.from_utc_datetime(&naive))
}
