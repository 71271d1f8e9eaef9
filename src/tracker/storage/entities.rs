use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Session that is still running. It only exists in memory; once closed it turns into a
/// [TimeEntry] and can't be reopened.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct OpenTimeEntry {
    pub identifier: u64,
    pub start_datetime: DateTime<Utc>,
}

impl OpenTimeEntry {
    pub fn open(identifier: u64, now: DateTime<Utc>) -> Self {
        Self {
            identifier,
            start_datetime: now,
        }
    }

    /// Closes the session at `now`. Durations are floored to whole units. A clock that moved
    /// backwards produces an empty entry instead of a negative one.
    pub fn close(self, now: DateTime<Utc>) -> TimeEntry {
        let end_datetime = now.max(self.start_datetime);
        let seconds = (end_datetime - self.start_datetime).num_seconds();
        TimeEntry {
            identifier: self.identifier,
            start_datetime: self.start_datetime,
            end_datetime,
            time_in_seconds: seconds,
            time_in_minutes: seconds / 60,
            time_in_hours: seconds / 3600,
        }
    }
}

/// One closed session as it is stored in the history document.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct TimeEntry {
    pub identifier: u64,
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub time_in_seconds: i64,
    pub time_in_minutes: i64,
    pub time_in_hours: i64,
}

impl TimeEntry {
    pub fn duration(&self) -> Duration {
        self.end_datetime - self.start_datetime
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct Totals {
    pub seconds: i64,
    pub minutes: i64,
    pub hours: i64,
    pub days: i64,
}

impl Totals {
    pub fn from_seconds(seconds: i64) -> Self {
        Self {
            seconds,
            minutes: seconds / 60,
            hours: seconds / 3600,
            days: seconds / 86400,
        }
    }

    pub fn of(entries: &[TimeEntry]) -> Self {
        Self::from_seconds(entries.iter().map(|v| v.time_in_seconds).sum())
    }
}

/// Value stored under a project's name in the history document.
///
/// Totals may be missing, `time_entries` may not: a slot without it is some other record and
/// has to surface as malformed instead of being read as a project with no sessions.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProjectReport {
    #[serde(default)]
    pub total_time_in_seconds: i64,
    #[serde(default)]
    pub total_time_in_minutes: i64,
    #[serde(default)]
    pub total_time_in_hours: i64,
    #[serde(default)]
    pub total_time_in_days: i64,
    pub time_entries: Vec<TimeEntry>,
}

impl ProjectReport {
    /// Builds a report whose totals are derived from `time_entries`.
    pub fn from_entries(time_entries: Vec<TimeEntry>) -> Self {
        let totals = Totals::of(&time_entries);
        Self {
            total_time_in_seconds: totals.seconds,
            total_time_in_minutes: totals.minutes,
            total_time_in_hours: totals.hours,
            total_time_in_days: totals.days,
            time_entries,
        }
    }

    /// Totals as they were written, which may disagree with the entries for files produced by
    /// other tools.
    pub fn stored_totals(&self) -> Totals {
        Totals {
            seconds: self.total_time_in_seconds,
            minutes: self.total_time_in_minutes,
            hours: self.total_time_in_hours,
            days: self.total_time_in_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

    use super::{OpenTimeEntry, ProjectReport, TimeEntry, Totals};

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), NaiveTime::MIN);

    #[test]
    fn test_close_floors_durations() {
        let start = Utc.from_utc_datetime(&TEST_START_DATE);
        let entry = OpenTimeEntry::open(3, start)
            .close(start + Duration::seconds(3725) + Duration::milliseconds(900));

        assert_eq!(entry.identifier, 3);
        assert_eq!(entry.time_in_seconds, 3725);
        assert_eq!(entry.time_in_minutes, 62);
        assert_eq!(entry.time_in_hours, 1);
        assert_eq!(entry.duration(), Duration::milliseconds(3725_900));
    }

    #[test]
    fn test_close_with_clock_moved_backwards() {
        let start = Utc.from_utc_datetime(&TEST_START_DATE);
        let entry = OpenTimeEntry::open(0, start).close(start - Duration::seconds(10));

        assert_eq!(entry.end_datetime, start);
        assert_eq!(entry.time_in_seconds, 0);
    }

    #[test]
    fn test_entry_survives_serialization() -> Result<()> {
        let start = Utc.from_utc_datetime(&TEST_START_DATE) + Duration::microseconds(1234);
        let entry = OpenTimeEntry::open(7, start).close(start + Duration::seconds(95));

        let value = serde_json::to_value(&entry)?;
        let object = value.as_object().unwrap();
        let mut keys = object.keys().map(String::as_str).collect::<Vec<_>>();
        keys.sort();
        assert_eq!(
            keys,
            [
                "end_datetime",
                "identifier",
                "start_datetime",
                "time_in_hours",
                "time_in_minutes",
                "time_in_seconds"
            ]
        );

        let restored: TimeEntry = serde_json::from_value(value)?;
        assert_eq!(restored, entry);
        Ok(())
    }

    #[test]
    fn test_report_totals_follow_entries() {
        let start = Utc.from_utc_datetime(&TEST_START_DATE);
        let entries = vec![
            OpenTimeEntry::open(0, start).close(start + Duration::hours(20)),
            OpenTimeEntry::open(1, start + Duration::days(1))
                .close(start + Duration::days(1) + Duration::hours(5) + Duration::seconds(30)),
        ];

        let report = ProjectReport::from_entries(entries);

        assert_eq!(
            report.stored_totals(),
            Totals {
                seconds: 25 * 3600 + 30,
                minutes: 25 * 60,
                hours: 25,
                days: 1,
            }
        );
        assert_eq!(report.time_entries.len(), 2);
    }

    #[test]
    fn test_report_without_totals_parses() -> Result<()> {
        let report: ProjectReport = serde_json::from_str(r#"{"time_entries": []}"#)?;
        assert_eq!(report, ProjectReport::default());
        Ok(())
    }

    #[test]
    fn test_report_requires_entries() {
        for slot in [
            "{}",
            r#"{"total_time_in_seconds": 12}"#,
            r#"{"start_datetime": "2023-01-01 10:00:00.123456", "end_datetime": "2023-01-01 11:00:00.654321"}"#,
        ] {
            assert!(serde_json::from_str::<ProjectReport>(slot).is_err(), "{slot}");
        }
    }
}
