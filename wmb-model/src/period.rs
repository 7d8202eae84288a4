use crate::error::{BulletinError, Result};
use crate::project::TimeConvention;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use wmb_utils::dates::{local_hour_to_utc, utc_midnight};

/// A closed time window `[start, end]` in UTC.
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn contains(&self, time: &DateTime<Utc>) -> bool {
        self.start <= *time && *time <= self.end
    }

    /// The same window extended backwards by `periods` extra lengths, so a
    /// single read also covers the earlier comparison samples.
    pub fn extended_back(&self, length: Duration, periods: i32) -> Result<TimeWindow> {
        let start = length
            .checked_mul(periods)
            .and_then(|back| self.start.checked_sub_signed(back))
            .ok_or_else(|| out_of_range(periods, length))?;
        Ok(TimeWindow {
            start,
            end: self.end,
        })
    }
}

/// The reporting period of a bulletin run.
///
/// The period ends at the bulletin's sample hour (local time) on `date` and
/// spans `length_hours` back. Projects on the GMT/midnight convention are
/// sampled at 00:00 UTC of `date` instead.
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct ReportingPeriod {
    pub date: NaiveDate,
    pub sample_hour: u32,
    pub utc_offset_hours: i32,
    pub length_hours: i64,
}

impl ReportingPeriod {
    pub fn length(&self) -> Result<Duration> {
        Duration::try_hours(self.length_hours).ok_or_else(|| {
            BulletinError::DateTime(format!("period of {} hours is out of range", self.length_hours))
        })
    }

    /// The instant a project's "current" sample is read at.
    pub fn sample_instant(&self, convention: TimeConvention) -> Result<DateTime<Utc>> {
        match convention {
            TimeConvention::Local => {
                local_hour_to_utc(&self.date, self.sample_hour, self.utc_offset_hours)
                    .map_err(|e| BulletinError::DateTime(e.to_string()))
            }
            TimeConvention::GmtMidnight => Ok(utc_midnight(&self.date)),
        }
    }

    /// The closed window ending at the project's sample instant.
    pub fn window(&self, convention: TimeConvention) -> Result<TimeWindow> {
        let end = self.sample_instant(convention)?;
        let length = self.length()?;
        let start = end
            .checked_sub_signed(length)
            .ok_or_else(|| out_of_range(1, length))?;
        Ok(TimeWindow { start, end })
    }
}

fn out_of_range(periods: i32, length: Duration) -> BulletinError {
    BulletinError::DateTime(format!(
        "{} period(s) of {} hours reach outside the supported date range",
        periods,
        length.num_hours()
    ))
}
