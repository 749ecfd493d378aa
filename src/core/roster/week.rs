// GPQ weeks end on Wednesdays (UTC). Every score submitted between one
// deadline and the next belongs to the upcoming deadline, so the week is
// identified by the date of the next Thursday midnight, strictly in the
// future. All arithmetic here assumes UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use std::fmt;

/// Identifier for a GPQ week: the Thursday date the week's scores roll
/// over on. Renders as `MM/DD/YYYY`, which is also the sheet column header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekKey(NaiveDate);

impl WeekKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parses a week header. Old sheets mixed two- and four-digit years
    /// (`1/9/25` vs `01/09/2025`), so both are accepted.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let parts: Vec<&str> = raw.split('/').collect();
        if parts.len() != 3 {
            return None;
        }
        let fmt = if parts[2].len() == 2 { "%m/%d/%y" } else { "%m/%d/%Y" };
        NaiveDate::parse_from_str(raw, fmt).ok().map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn minus_weeks(&self, n: u32) -> Self {
        Self(self.0 - Duration::weeks(n as i64))
    }

    /// Short axis label for charts, e.g. `1/9`.
    pub fn short_label(&self) -> String {
        format!("{}/{}", self.0.month(), self.0.day())
    }

    /// The deadline instant this week rolls over on.
    pub fn deadline(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.0.and_time(NaiveTime::MIN))
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}/{:02}/{}",
            self.0.month(),
            self.0.day(),
            self.0.year()
        )
    }
}

/// Midnight of the next `weekday` strictly after `from`. If `from` already
/// falls on `weekday`, the result is a full week out.
pub fn next_weekday_midnight(from: DateTime<Utc>, weekday: Weekday) -> DateTime<Utc> {
    let today = from.date_naive();
    let mut days = (weekday.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        .rem_euclid(7);
    if days == 0 {
        days = 7;
    }
    let next = today + Duration::days(days);
    Utc.from_utc_datetime(&next.and_time(NaiveTime::MIN))
}

/// The week the current instant belongs to.
pub fn current_week(now: DateTime<Utc>) -> WeekKey {
    WeekKey::from_date(next_weekday_midnight(now, Weekday::Thu).date_naive())
}

pub fn week_ago(now: DateTime<Utc>, n: u32) -> WeekKey {
    current_week(now).minus_weeks(n)
}

pub fn last_week(now: DateTime<Utc>) -> WeekKey {
    week_ago(now, 1)
}

/// How long until the weekly reminder should fire (Wednesday midnight UTC).
pub fn time_until_reminder(now: DateTime<Utc>) -> std::time::Duration {
    (next_weekday_midnight(now, Weekday::Wed) - now)
        .to_std()
        .unwrap_or_default()
}
