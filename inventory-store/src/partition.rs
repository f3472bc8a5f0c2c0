use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Range-partitioned legacy event table.
pub const PARTITIONED_TABLE: &str = "aws_events_ips_hostnames";

/// Receives the events whose timestamp no registered partition covers.
pub const DEFAULT_PARTITION: &str = "aws_events_ips_hostnames_default";

/// Auto-generation waits until the latest partition ends within this many days.
pub const LEAD_DAYS: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "pg", derive(sqlx::FromRow))]
pub struct Partition {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[cfg_attr(feature = "pg", sqlx(default))]
    pub count: i64,
}

impl Partition {
    pub fn range(&self) -> PartitionRange {
        PartitionRange {
            begin: self.begin,
            end: self.end,
        }
    }
}

/// Half-open `[begin, end)` range of one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionRange {
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PartitionRange {
    /// `days` days from `begin`, or up to the next calendar quarter when `days` is zero.
    pub fn new(begin: DateTime<Utc>, days: u32) -> Result<Self> {
        let end = if days == 0 {
            next_quarter(begin)?
        } else {
            begin + Duration::days(i64::from(days))
        };

        Ok(Self { begin, end })
    }

    /// `<table>_YYYY_MM_DDtoYYYY_MM_DD`
    pub fn name(&self) -> String {
        format!(
            "{PARTITIONED_TABLE}_{:04}_{:02}_{:02}to{:04}_{:02}_{:02}",
            self.begin.year(),
            self.begin.month(),
            self.begin.day(),
            self.end.year(),
            self.end.month(),
            self.end.day()
        )
    }

    pub fn overlaps(&self, other: &PartitionRange) -> bool {
        self.begin < other.end && self.end > other.begin
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.begin <= ts && ts < self.end
    }
}

/// First instant of the calendar quarter following the one containing `ts`.
pub fn next_quarter(ts: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let month = (ts.month0() / 3 + 1) * 3 + 1;
    let (year, month) = if month > 12 {
        (ts.year() + 1, month - 12)
    } else {
        (ts.year(), month)
    };

    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| Utc.from_utc_datetime(&date))
        .ok_or_else(|| StoreError::invalid_input("begin", format!("no quarter after `{ts}`")))
}

/// Range the next partition should cover, if any.
///
/// An explicit `begin` always yields a range. Without one the partition
/// follows the latest registered partition, and nothing is planned while that
/// partition starts in the future or ends more than [`LEAD_DAYS`] from `now`.
pub fn plan(
    begin: Option<DateTime<Utc>>,
    days: u32,
    latest: Option<&PartitionRange>,
    now: DateTime<Utc>,
) -> Result<Option<PartitionRange>> {
    if let Some(begin) = begin {
        return PartitionRange::new(begin, days).map(Some);
    }

    let begin = match latest {
        Some(latest) => {
            if latest.begin > now || latest.end - now > Duration::days(LEAD_DAYS) {
                return Ok(None);
            }

            latest.end
        }
        None => now,
    };

    PartitionRange::new(begin, days).map(Some)
}

/// Names interpolated into DDL must be a partition of the event table.
pub fn validate_name(name: &str) -> Result<()> {
    let valid = name
        .strip_prefix(PARTITIONED_TABLE)
        .and_then(|suffix| suffix.strip_prefix('_'))
        .is_some_and(|suffix| {
            !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if valid {
        Ok(())
    } else {
        Err(StoreError::invalid_input(
            "name",
            format!("`{name}` is not a partition name"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn explicit_days() {
        let range = PartitionRange::new(at(2019, 8, 1), 30).unwrap();

        assert_eq!(range.end, at(2019, 8, 31));
        assert_eq!(
            range.name(),
            "aws_events_ips_hostnames_2019_08_01to2019_08_31"
        );
    }

    #[test]
    fn zero_days_ends_at_next_quarter() {
        assert_eq!(
            PartitionRange::new(at(2019, 8, 9), 0).unwrap().end,
            at(2019, 10, 1)
        );
        assert_eq!(
            PartitionRange::new(at(2019, 10, 1), 0).unwrap().end,
            at(2020, 1, 1)
        );
        assert_eq!(
            PartitionRange::new(at(2019, 12, 31), 0).unwrap().end,
            at(2020, 1, 1)
        );
        assert_eq!(
            PartitionRange::new(at(2020, 1, 1), 0).unwrap().end,
            at(2020, 4, 1)
        );
    }

    #[test]
    fn overlap_is_half_open() {
        let a = PartitionRange::new(at(2019, 1, 1), 0).unwrap();
        let b = PartitionRange::new(at(2019, 4, 1), 0).unwrap();
        let c = PartitionRange::new(at(2019, 3, 1), 10).unwrap();
        let across = PartitionRange::new(at(2019, 3, 25), 10).unwrap();
        let inner = PartitionRange::new(at(2019, 2, 1), 1).unwrap();

        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(!b.overlaps(&c));
        assert!(a.overlaps(&across));
        assert!(b.overlaps(&across));
        assert!(a.overlaps(&inner));
        assert!(inner.overlaps(&a));
        assert!(a.contains(at(2019, 1, 1)));
        assert!(!a.contains(at(2019, 4, 1)));
    }

    #[test]
    fn plan_without_partitions_starts_now() {
        let now = at(2019, 8, 9);

        assert_eq!(
            plan(None, 0, None, now).unwrap(),
            Some(PartitionRange {
                begin: now,
                end: at(2019, 10, 1)
            })
        );
    }

    #[test]
    fn plan_waits_for_lead_time() {
        let latest = PartitionRange::new(at(2019, 7, 1), 0).unwrap();

        assert_eq!(plan(None, 0, Some(&latest), at(2019, 8, 9)).unwrap(), None);

        let next = plan(None, 0, Some(&latest), at(2019, 9, 29)).unwrap();
        assert_eq!(
            next,
            Some(PartitionRange {
                begin: at(2019, 10, 1),
                end: at(2020, 1, 1)
            })
        );
    }

    #[test]
    fn plan_skips_future_partition() {
        let latest = PartitionRange::new(at(2019, 10, 1), 1).unwrap();

        assert_eq!(plan(None, 0, Some(&latest), at(2019, 9, 30)).unwrap(), None);
    }

    #[test]
    fn explicit_begin_ignores_latest() {
        let latest = PartitionRange::new(at(2019, 7, 1), 0).unwrap();
        let range = plan(Some(at(2018, 1, 1)), 7, Some(&latest), at(2019, 8, 9)).unwrap();

        assert_eq!(range.map(|r| r.end), Some(at(2018, 1, 8)));
    }

    #[test]
    fn names() {
        assert!(validate_name("aws_events_ips_hostnames_2019_08_01to2019_08_31").is_ok());
        assert!(validate_name("aws_events_ips_hostnames_").is_err());
        assert!(validate_name("aws_events_ips_hostnames_x; DROP TABLE person").is_err());
        assert!(validate_name("person").is_err());
    }
}
