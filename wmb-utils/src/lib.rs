//! Shared utility functions for WMB crates.

/// Date and timestamp utility functions
pub mod dates {
    use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    /// Timestamp format used for stored samples, always UTC: "YYYY-MM-DDTHH:MM"
    pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M";

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?)
    }

    /// Format a UTC instant in the stored timestamp format.
    pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
        ts.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Parse a stored timestamp ("YYYY-MM-DDTHH:MM", or "YYYY-MM-DD HH:MM") as UTC.
    pub fn parse_timestamp(s: &str) -> anyhow::Result<DateTime<Utc>> {
        let normalized = s.trim().replacen(' ', "T", 1);
        let naive = NaiveDateTime::parse_from_str(&normalized, TIMESTAMP_FORMAT)?;
        Ok(Utc.from_utc_datetime(&naive))
    }

    /// Convert a local wall-clock hour on `date` to a UTC instant, given a
    /// fixed offset from UTC in hours (e.g. -6 for Central Standard Time).
    pub fn local_hour_to_utc(
        date: &NaiveDate,
        hour: u32,
        utc_offset_hours: i32,
    ) -> anyhow::Result<DateTime<Utc>> {
        let time = NaiveTime::from_hms_opt(hour, 0, 0)
            .ok_or_else(|| anyhow::anyhow!("invalid hour of day: {}", hour))?;
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
            .ok_or_else(|| anyhow::anyhow!("invalid UTC offset: {} hours", utc_offset_hours))?;
        let local = offset
            .from_local_datetime(&date.and_time(time))
            .single()
            .ok_or_else(|| anyhow::anyhow!("ambiguous local time {} {:02}:00", date, hour))?;
        Ok(local.with_timezone(&Utc))
    }

    /// Midnight UTC at the start of `date`.
    pub fn utc_midnight(date: &NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
    }

}

/// Number formatting for bulletin cells
pub mod numbers {
    /// Format `value` with `decimals` fraction digits and comma thousands
    /// grouping, e.g. `1234567.26` with 1 decimal -> `"1,234,567.3"`.
    ///
    /// A value that rounds to zero never carries a minus sign.
    pub fn format_grouped(value: f64, decimals: usize) -> String {
        let rounded = format!("{:.*}", decimals, value.abs());
        let (int_part, frac_part) = match rounded.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (rounded.as_str(), None),
        };

        let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        let is_zero = rounded.chars().all(|c| c == '0' || c == '.');
        let mut out = String::new();
        if value < 0.0 && !is_zero {
            out.push('-');
        }
        out.push_str(&grouped);
        if let Some(f) = frac_part {
            out.push('.');
            out.push_str(f);
        }
        out
    }

}
